use std::sync::Arc;

use crate::{
    db::{ActivityStore, MovieStore, UserStore},
    error::{AppError, AppResult},
    models::{Movie, Rating, RatingOutcome, RatingValue, User, WatchHistoryEntry, WatchlistEntry},
    services::{catalog, providers::CatalogProvider},
};

pub const DEFAULT_HISTORY_LIMIT: usize = 12;

/// Watch history, watchlist and ratings for registered users
///
/// Movies are addressed by TMDB id and cached locally on first reference.
#[derive(Clone)]
pub struct ActivityService {
    provider: Arc<dyn CatalogProvider>,
    movies: Arc<dyn MovieStore>,
    activity: Arc<dyn ActivityStore>,
    users: Arc<dyn UserStore>,
}

impl ActivityService {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        movies: Arc<dyn MovieStore>,
        activity: Arc<dyn ActivityStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            provider,
            movies,
            activity,
            users,
        }
    }

    async fn require_user(&self, user_id: i64) -> AppResult<User> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn resolve(&self, tmdb_id: i64) -> AppResult<Movie> {
        catalog::resolve_movie(self.provider.as_ref(), self.movies.as_ref(), tmdb_id).await
    }

    /// Records a watch; watching the same movie again is a no-op
    pub async fn add_to_watch_history(&self, user_id: i64, tmdb_id: i64) -> AppResult<Movie> {
        self.require_user(user_id).await?;
        let movie = self.resolve(tmdb_id).await?;

        let added = self.activity.add_watched(user_id, movie.id).await?;
        tracing::info!(user_id, movie_id = tmdb_id, added, "Watch recorded");
        Ok(movie)
    }

    pub async fn watch_history(
        &self,
        user_id: i64,
        limit: Option<usize>,
    ) -> AppResult<Vec<WatchHistoryEntry>> {
        self.require_user(user_id).await?;
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        self.activity.watch_history(user_id, limit).await
    }

    pub async fn remove_from_watch_history(&self, user_id: i64, tmdb_id: i64) -> AppResult<()> {
        if self.activity.remove_watched(user_id, tmdb_id).await? {
            tracing::info!(user_id, movie_id = tmdb_id, "Watch removed");
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "Movie {} is not in watch history",
                tmdb_id
            )))
        }
    }

    pub async fn watchlist(&self, user_id: i64) -> AppResult<Vec<WatchlistEntry>> {
        self.require_user(user_id).await?;
        self.activity.watchlist(user_id).await
    }

    /// Adds the movie when absent, removes it when present
    ///
    /// Returns whether the movie is in the watchlist afterwards.
    pub async fn toggle_watchlist(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool> {
        self.require_user(user_id).await?;

        if self.activity.is_in_watchlist(user_id, tmdb_id).await? {
            self.activity.remove_from_watchlist(user_id, tmdb_id).await?;
            tracing::info!(user_id, movie_id = tmdb_id, "Removed from watchlist");
            return Ok(false);
        }

        let movie = self.resolve(tmdb_id).await?;
        self.activity.add_to_watchlist(user_id, movie.id).await?;
        tracing::info!(user_id, movie_id = tmdb_id, "Added to watchlist");
        Ok(true)
    }

    /// Creates or replaces the user's rating for a movie
    ///
    /// The rating is validated before the catalog or any store is touched.
    pub async fn rate_movie(
        &self,
        user_id: i64,
        tmdb_id: i64,
        rating: i32,
    ) -> AppResult<RatingOutcome> {
        let rating = RatingValue::new(rating)?;
        self.require_user(user_id).await?;
        let movie = self.resolve(tmdb_id).await?;

        let outcome = self.activity.upsert_rating(user_id, movie.id, rating).await?;
        tracing::info!(
            user_id,
            movie_id = tmdb_id,
            rating = rating.get(),
            ?outcome,
            "Rating saved"
        );
        Ok(outcome)
    }

    pub async fn rating_for(&self, user_id: i64, tmdb_id: i64) -> AppResult<Option<Rating>> {
        self.require_user(user_id).await?;
        self.activity.rating_for(user_id, tmdb_id).await
    }

    pub async fn ratings(&self, user_id: i64) -> AppResult<Vec<Rating>> {
        self.require_user(user_id).await?;
        self.activity.ratings(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::NewUser;
    use crate::services::providers::MockCatalogProvider;
    use crate::services::test_support::tmdb_movie;

    async fn service_with(provider: MockCatalogProvider) -> (ActivityService, InMemoryStore, i64) {
        let store = InMemoryStore::new();
        let user = store
            .create_user(&NewUser {
                username: "trinity".to_string(),
                email: "trinity@example.com".to_string(),
                full_name: None,
                location: None,
                hashed_password: "opaque".to_string(),
            })
            .await
            .unwrap();

        let shared = Arc::new(store.clone());
        let service = ActivityService::new(Arc::new(provider), shared.clone(), shared.clone(), shared);
        (service, store, user.id)
    }

    fn provider_with_details() -> MockCatalogProvider {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_details()
            .returning(|id| Ok(tmdb_movie(id, 7.0, 20.0)));
        provider
    }

    #[tokio::test]
    async fn test_rating_validated_before_any_lookup() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_details().times(0);
        let (service, store, user_id) = service_with(provider).await;

        let err = service.rate_movie(user_id, 550, 11).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.find_by_external_id(550).await.unwrap().is_none());
        assert!(store.ratings(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rating_created_then_updated() {
        let (service, _store, user_id) = service_with(provider_with_details()).await;

        assert_eq!(
            service.rate_movie(user_id, 550, 6).await.unwrap(),
            RatingOutcome::Created
        );
        assert_eq!(
            service.rate_movie(user_id, 550, 9).await.unwrap(),
            RatingOutcome::Updated
        );

        let ratings = service.ratings(user_id).await.unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].rating, 9);
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let (service, _store, user_id) = service_with(provider_with_details()).await;

        let err = service
            .add_to_watch_history(user_id + 100, 550)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rating_for_unrated_movie_is_none() {
        let (service, _store, user_id) = service_with(provider_with_details()).await;

        assert!(service.rating_for(user_id, 550).await.unwrap().is_none());
        service.rate_movie(user_id, 550, 7).await.unwrap();
        let rating = service.rating_for(user_id, 550).await.unwrap().unwrap();
        assert_eq!(rating.rating, 7);

        let err = service.rating_for(user_id + 100, 550).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_watch_is_noop() {
        let (service, _store, user_id) = service_with(provider_with_details()).await;

        service.add_to_watch_history(user_id, 550).await.unwrap();
        service.add_to_watch_history(user_id, 550).await.unwrap();

        let history = service.watch_history(user_id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movie.tmdb_id, 550);
    }

    #[tokio::test]
    async fn test_watch_of_unknown_movie_is_not_found() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_details()
            .returning(|id| Err(AppError::NotFound(format!("movie {}", id))));
        let (service, _store, user_id) = service_with(provider).await;

        let err = service.add_to_watch_history(user_id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_absent_watch_is_not_found() {
        let (service, _store, user_id) = service_with(provider_with_details()).await;

        let err = service
            .remove_from_watch_history(user_id, 550)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        service.add_to_watch_history(user_id, 550).await.unwrap();
        service.remove_from_watch_history(user_id, 550).await.unwrap();
        assert!(service.watch_history(user_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_watchlist_round_trip() {
        let (service, _store, user_id) = service_with(provider_with_details()).await;

        assert!(service.toggle_watchlist(user_id, 603).await.unwrap());
        assert_eq!(service.watchlist(user_id).await.unwrap().len(), 1);

        assert!(!service.toggle_watchlist(user_id, 603).await.unwrap());
        assert!(service.watchlist(user_id).await.unwrap().is_empty());
    }
}

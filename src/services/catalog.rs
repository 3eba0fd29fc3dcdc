use crate::{
    db::MovieStore,
    error::{AppError, AppResult},
    models::{DiscoverFilter, Genre, Movie, NewMovie, TmdbMovie, TmdbPage},
    services::providers::CatalogProvider,
};

pub const MAX_SIMILAR_LIMIT: usize = 20;

/// Searches the remote catalog by title
///
/// A blank query short-circuits to an empty page. Adult titles and titles
/// without a poster are dropped. A catalog failure yields an empty page.
pub async fn search_movies(
    provider: &dyn CatalogProvider,
    query: &str,
    page: u32,
) -> TmdbPage<TmdbMovie> {
    let query = query.trim();
    if query.is_empty() {
        tracing::warn!("Empty search query received");
        return TmdbPage::empty(1);
    }

    match provider.search(query, page).await {
        Ok(results) => results
            .without_adult()
            .retain(|movie| movie.poster_path.is_some()),
        Err(e) => {
            tracing::warn!(error = %e, query = %query, "Search failed, returning empty page");
            TmdbPage::empty(page)
        }
    }
}

pub async fn popular_movies(provider: &dyn CatalogProvider, page: u32) -> TmdbPage<TmdbMovie> {
    match provider.popular(page).await {
        Ok(results) => results.without_adult(),
        Err(e) => {
            tracing::warn!(error = %e, page, "Popular list unavailable, returning empty page");
            TmdbPage::empty(page)
        }
    }
}

/// Genre list, seeded from the remote catalog on first use
pub async fn genres(
    provider: &dyn CatalogProvider,
    movies: &dyn MovieStore,
) -> AppResult<Vec<Genre>> {
    let stored = movies.list_genres().await?;
    if !stored.is_empty() {
        return Ok(stored);
    }

    let fetched = match provider.genres().await {
        Ok(list) => list.genres,
        Err(e) => {
            tracing::warn!(error = %e, "Genre list unavailable");
            return Ok(Vec::new());
        }
    };

    let genres: Vec<Genre> = fetched.into_iter().map(Genre::from).collect();
    movies.upsert_genres(&genres).await?;
    tracing::info!(count = genres.len(), "Seeded genre table from catalog");

    movies.list_genres().await
}

/// Returns the locally cached movie, fetching and caching it on first
/// reference
///
/// Unknown ids surface as `NotFound`, catalog outages as `Transport`.
pub async fn resolve_movie(
    provider: &dyn CatalogProvider,
    movies: &dyn MovieStore,
    tmdb_id: i64,
) -> AppResult<Movie> {
    if let Some(movie) = movies.find_by_external_id(tmdb_id).await? {
        return Ok(movie);
    }

    let details = provider.details(tmdb_id).await?;
    let movie = movies.insert_movie(&NewMovie::from(&details)).await?;
    tracing::debug!(tmdb_id, id = movie.id, "Movie resolved from catalog");
    Ok(movie)
}

/// Provider "similar" list for a movie, truncated to `limit`
pub async fn similar_movies(
    provider: &dyn CatalogProvider,
    movie_id: i64,
    page: u32,
    limit: usize,
) -> AppResult<Vec<TmdbMovie>> {
    check_similar_limit(limit)?;

    match provider.similar(movie_id, page).await {
        Ok(results) => Ok(results
            .without_adult()
            .results
            .into_iter()
            .take(limit)
            .collect()),
        Err(e) => {
            tracing::warn!(error = %e, movie_id, "Similar list unavailable");
            Ok(Vec::new())
        }
    }
}

/// Popular movies sharing a genre with the given one
pub async fn similar_by_genre(
    provider: &dyn CatalogProvider,
    movie_id: i64,
    limit: usize,
) -> AppResult<Vec<TmdbMovie>> {
    check_similar_limit(limit)?;

    let details = provider.details(movie_id).await?;
    let mut genre_ids: Vec<i64> = details.genres.iter().map(|g| g.id).collect();
    if genre_ids.is_empty() {
        genre_ids = details.genre_ids.clone();
    }
    if genre_ids.is_empty() {
        return Err(AppError::NotFound(format!(
            "No genres found for movie {}",
            movie_id
        )));
    }

    let filter = DiscoverFilter::by_genres(genre_ids, 1);
    let results = match provider.discover(&filter).await {
        Ok(results) => results.without_adult(),
        Err(e) => {
            tracing::warn!(error = %e, movie_id, "Discover by genre unavailable");
            return Ok(Vec::new());
        }
    };

    Ok(results
        .results
        .into_iter()
        .filter(|movie| movie.id != movie_id)
        .take(limit)
        .collect())
}

pub async fn movies_by_genre(
    provider: &dyn CatalogProvider,
    genre_id: i64,
    page: u32,
) -> TmdbPage<TmdbMovie> {
    let filter = DiscoverFilter::by_genres(vec![genre_id], page);
    match provider.discover(&filter).await {
        Ok(results) => results.without_adult(),
        Err(e) => {
            tracing::warn!(error = %e, genre_id, "Discover by genre unavailable");
            TmdbPage::empty(page)
        }
    }
}

fn check_similar_limit(limit: usize) -> AppResult<()> {
    if (1..=MAX_SIMILAR_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_SIMILAR_LIMIT
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{TmdbGenre, TmdbGenreList};
    use crate::services::providers::MockCatalogProvider;
    use crate::services::test_support::{page_of, tmdb_movie};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_blank_search_makes_no_remote_call() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_search().times(0);

        let page = search_movies(&provider, "   ", 1).await;
        assert!(page.results.is_empty());
        assert_eq!(page.total_results, 0);
    }

    #[tokio::test]
    async fn test_search_drops_adult_and_posterless() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_search()
            .with(eq("matrix"), eq(1))
            .returning(|_, _| {
                let mut adult = tmdb_movie(2, 5.0, 5.0);
                adult.adult = true;
                let mut no_poster = tmdb_movie(3, 5.0, 5.0);
                no_poster.poster_path = None;
                Ok(page_of(vec![tmdb_movie(1, 8.0, 10.0), adult, no_poster]))
            });

        let page = search_movies(&provider, " matrix ", 1).await;
        let ids: Vec<i64> = page.results.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(page.total_results, 1);
    }

    #[tokio::test]
    async fn test_search_failure_yields_empty_page() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_search()
            .returning(|_, _| Err(AppError::Transport("down".to_string())));

        let page = search_movies(&provider, "matrix", 2).await;
        assert!(page.results.is_empty());
        assert_eq!(page.page, 2);
    }

    #[tokio::test]
    async fn test_genres_seeded_once_from_catalog() {
        let store = InMemoryStore::new();
        let mut provider = MockCatalogProvider::new();
        provider.expect_genres().times(1).returning(|| {
            Ok(TmdbGenreList {
                genres: vec![
                    TmdbGenre { id: 28, name: "Action".to_string() },
                    TmdbGenre { id: 18, name: "Drama".to_string() },
                ],
            })
        });

        let first = genres(&provider, &store).await.unwrap();
        let second = genres(&provider, &store).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_resolve_movie_caches_on_first_reference() {
        let store = InMemoryStore::new();
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_details()
            .with(eq(550))
            .times(1)
            .returning(|id| Ok(tmdb_movie(id, 8.4, 60.0)));

        let first = resolve_movie(&provider, &store, 550).await.unwrap();
        let second = resolve_movie(&provider, &store, 550).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.tmdb_id, 550);
    }

    #[tokio::test]
    async fn test_resolve_unknown_movie_is_not_found() {
        let store = InMemoryStore::new();
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_details()
            .returning(|id| Err(AppError::NotFound(format!("movie {}", id))));

        let err = resolve_movie(&provider, &store, 9).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.find_by_external_id(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_similar_limit_validated_before_remote_call() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_similar().times(0);

        for limit in [0, 21] {
            let err = similar_movies(&provider, 550, 1, limit).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_similar_by_genre_excludes_the_movie_itself() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_details().returning(|id| {
            let mut movie = tmdb_movie(id, 8.0, 10.0);
            movie.genres = vec![TmdbGenre { id: 878, name: "Science Fiction".to_string() }];
            Ok(movie)
        });
        provider
            .expect_discover()
            .withf(|filter| filter.with_genres == vec![878])
            .returning(|_| {
                Ok(page_of(vec![
                    tmdb_movie(603, 8.2, 80.0),
                    tmdb_movie(604, 7.0, 40.0),
                    tmdb_movie(605, 6.5, 30.0),
                ]))
            });

        let movies = similar_by_genre(&provider, 603, 5).await.unwrap();
        let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![604, 605]);
    }

    #[tokio::test]
    async fn test_similar_by_genre_without_genres_is_not_found() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_details()
            .returning(|id| Ok(tmdb_movie(id, 8.0, 10.0)));
        provider.expect_discover().times(0);

        let err = similar_by_genre(&provider, 42, 5).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_movies_by_genre_sorts_by_popularity() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_discover()
            .withf(|filter| {
                filter.with_genres == vec![35]
                    && filter.sort_by.as_deref() == Some("popularity.desc")
                    && filter.page == Some(2)
            })
            .returning(|_| Ok(page_of(vec![tmdb_movie(1, 6.0, 9.0)])));

        let page = movies_by_genre(&provider, 35, 2).await;
        assert_eq!(page.results.len(), 1);
    }
}

//! Storage seams
//!
//! The local catalog, user activity and user account stores are consumed
//! through these traits so that Postgres and the in-memory store are
//! interchangeable behind `Arc<dyn ...>`.

use crate::{
    error::AppResult,
    models::{
        Genre, Movie, NewMovie, NewUser, ProfileUpdate, Rating, RatingOutcome, RatingValue, User,
        WatchHistoryEntry, WatchlistEntry,
    },
};

/// Local mirror of the remote catalog, keyed by TMDB id
#[async_trait::async_trait]
pub trait MovieStore: Send + Sync {
    async fn find_by_external_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>>;

    /// Inserts a movie, or returns the existing row when the TMDB id is
    /// already cached (including when a concurrent caller won the race)
    async fn insert_movie(&self, movie: &NewMovie) -> AppResult<Movie>;

    /// Non-adult cached movies ordered by popularity then rating, both
    /// descending with missing values last
    async fn popular_cached(&self, limit: usize) -> AppResult<Vec<Movie>>;

    async fn list_genres(&self) -> AppResult<Vec<Genre>>;

    async fn upsert_genres(&self, genres: &[Genre]) -> AppResult<()>;
}

/// Per-user watch history, watchlist and ratings
///
/// Movie arguments are internal movie ids for writes and TMDB ids for
/// lookups/removals coming straight from the API boundary.
#[async_trait::async_trait]
pub trait ActivityStore: Send + Sync {
    /// Most recently watched movies, newest first
    async fn recent_watched(
        &self,
        user_id: i64,
        cap: usize,
        exclude_adult: bool,
    ) -> AppResult<Vec<Movie>>;

    async fn watch_history(&self, user_id: i64, limit: usize) -> AppResult<Vec<WatchHistoryEntry>>;

    /// Returns `false` when the movie was already in the history
    async fn add_watched(&self, user_id: i64, movie_id: i64) -> AppResult<bool>;

    /// Returns `false` when the movie was not in the history
    async fn remove_watched(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool>;

    async fn watchlist(&self, user_id: i64) -> AppResult<Vec<WatchlistEntry>>;

    async fn is_in_watchlist(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool>;

    async fn add_to_watchlist(&self, user_id: i64, movie_id: i64) -> AppResult<()>;

    async fn remove_from_watchlist(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool>;

    async fn upsert_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        rating: RatingValue,
    ) -> AppResult<RatingOutcome>;

    async fn rating_for(&self, user_id: i64, tmdb_id: i64) -> AppResult<Option<Rating>>;

    async fn ratings(&self, user_id: i64) -> AppResult<Vec<Rating>>;
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken
    async fn create_user(&self, user: &NewUser) -> AppResult<User>;

    async fn find_user(&self, user_id: i64) -> AppResult<Option<User>>;

    /// Fails with `Conflict` when the new username or email belongs to
    /// someone else, `NotFound` when the user does not exist
    async fn update_profile(&self, user_id: i64, update: &ProfileUpdate) -> AppResult<User>;
}

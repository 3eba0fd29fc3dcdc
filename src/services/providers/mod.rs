/// Remote movie catalog abstraction
///
/// The catalog is consumed only through `CatalogProvider` so the engine and
/// services can run against TMDB in production and mocks in tests.
use crate::{
    error::AppResult,
    models::{DiscoverFilter, TmdbGenreList, TmdbMovie, TmdbPage},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Read-only access to a third-party movie catalog
///
/// Implementations always exclude adult titles at the source and use a
/// fixed locale. `details` reports an unknown id as `NotFound`, distinct
/// from a `Transport` failure; list calls report failures as errors and
/// leave the "empty on failure" policy to their callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn search(&self, query: &str, page: u32) -> AppResult<TmdbPage<TmdbMovie>>;

    async fn popular(&self, page: u32) -> AppResult<TmdbPage<TmdbMovie>>;

    async fn genres(&self) -> AppResult<TmdbGenreList>;

    async fn details(&self, movie_id: i64) -> AppResult<TmdbMovie>;

    /// The provider's own "recommended for this movie" list
    async fn recommendations(&self, movie_id: i64) -> AppResult<TmdbPage<TmdbMovie>>;

    async fn similar(&self, movie_id: i64, page: u32) -> AppResult<TmdbPage<TmdbMovie>>;

    async fn discover(&self, filter: &DiscoverFilter) -> AppResult<TmdbPage<TmdbMovie>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

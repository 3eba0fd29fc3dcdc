use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{AppState, PageQuery};
use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{Genre, MovieResponse, TmdbMovie, TmdbPage},
    services::catalog,
};

const DEFAULT_SIMILAR_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub page: Option<u32>,
    pub limit: Option<usize>,
}

pub async fn search(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<TmdbPage<TmdbMovie>>> {
    let page = PageQuery { page: params.page }.page()?;
    let results = catalog::search_movies(state.provider.as_ref(), &params.query, page).await;

    tracing::info!(
        request_id = %request_id,
        query = %params.query,
        results_count = results.results.len(),
        "Movie search"
    );
    Ok(Json(results))
}

pub async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<TmdbPage<TmdbMovie>>> {
    let page = params.page()?;
    Ok(Json(
        catalog::popular_movies(state.provider.as_ref(), page).await,
    ))
}

pub async fn genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    let genres = catalog::genres(state.provider.as_ref(), state.movies.as_ref()).await?;
    Ok(Json(genres))
}

pub async fn by_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<TmdbPage<TmdbMovie>>> {
    let page = params.page()?;
    Ok(Json(
        catalog::movies_by_genre(state.provider.as_ref(), genre_id, page).await,
    ))
}

/// Movie details from the local cache, fetched from the catalog on first view
pub async fn details(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<MovieResponse>> {
    let movie =
        catalog::resolve_movie(state.provider.as_ref(), state.movies.as_ref(), movie_id).await?;
    tracing::debug!(request_id = %request_id, movie_id, "Movie details served");
    Ok(Json(MovieResponse::from(movie)))
}

pub async fn similar(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    Query(params): Query<SimilarQuery>,
) -> AppResult<Json<Vec<TmdbMovie>>> {
    let page = PageQuery { page: params.page }.page()?;
    let limit = params.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT);
    let movies = catalog::similar_movies(state.provider.as_ref(), movie_id, page, limit).await?;
    Ok(Json(movies))
}

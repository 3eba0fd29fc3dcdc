use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{AppState, PageQuery};
use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{MovieResponse, TmdbMovie, TmdbPage},
    services::{catalog, users},
};

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 12;
pub const MAX_RECOMMENDATION_LIMIT: usize = 50;
pub const DEFAULT_SIMILAR_BY_GENRE_LIMIT: usize = 8;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Personalized recommendations; degrades to popular cached movies and
/// never fails once the user is known
pub async fn for_user(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(user_id): Path<i64>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<MovieResponse>>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
    if !(1..=MAX_RECOMMENDATION_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_RECOMMENDATION_LIMIT
        )));
    }
    users::profile(state.users.as_ref(), user_id).await?;

    let movies = state.recommender.recommend(user_id, limit).await;
    tracing::info!(
        request_id = %request_id,
        user_id,
        count = movies.len(),
        "Recommendations served"
    );
    Ok(Json(movies.iter().map(MovieResponse::from).collect()))
}

pub async fn similar_by_genre(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<TmdbMovie>>> {
    let limit = params.limit.unwrap_or(DEFAULT_SIMILAR_BY_GENRE_LIMIT);
    let movies = catalog::similar_by_genre(state.provider.as_ref(), movie_id, limit).await?;
    Ok(Json(movies))
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

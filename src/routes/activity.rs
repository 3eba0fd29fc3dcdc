use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{
        MovieRef, MovieResponse, RateMovieRequest, RatingItem, RatingOutcome, WatchHistoryItem,
        WatchlistItem,
    },
};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WatchlistToggleResponse {
    pub movie_id: i64,
    pub in_watchlist: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingSaved {
    pub movie_id: i64,
    pub rating: i32,
    pub status: RatingOutcome,
}

/// The user's rating of one movie, `null` when they have not rated it
#[derive(Debug, Serialize, Deserialize)]
pub struct UserRating {
    pub movie_id: i64,
    pub rating: Option<i32>,
}

pub async fn watch_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(params): Query<HistoryQuery>,
) -> AppResult<Json<Vec<WatchHistoryItem>>> {
    let entries = state.activity.watch_history(user_id, params.limit).await?;
    Ok(Json(entries.iter().map(WatchHistoryItem::from).collect()))
}

pub async fn add_to_watch_history(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(user_id): Path<i64>,
    Json(payload): Json<MovieRef>,
) -> AppResult<(StatusCode, Json<MovieResponse>)> {
    let movie = state
        .activity
        .add_to_watch_history(user_id, payload.movie_id)
        .await?;
    tracing::info!(
        request_id = %request_id,
        user_id,
        movie_id = payload.movie_id,
        "Added to watch history"
    );
    Ok((StatusCode::CREATED, Json(MovieResponse::from(movie))))
}

pub async fn remove_from_watch_history(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state
        .activity
        .remove_from_watch_history(user_id, movie_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<WatchlistItem>>> {
    let entries = state.activity.watchlist(user_id).await?;
    Ok(Json(entries.iter().map(WatchlistItem::from).collect()))
}

pub async fn toggle_watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<MovieRef>,
) -> AppResult<Json<WatchlistToggleResponse>> {
    let in_watchlist = state
        .activity
        .toggle_watchlist(user_id, payload.movie_id)
        .await?;
    Ok(Json(WatchlistToggleResponse {
        movie_id: payload.movie_id,
        in_watchlist,
    }))
}

pub async fn rate_movie(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(user_id): Path<i64>,
    Json(payload): Json<RateMovieRequest>,
) -> AppResult<Json<RatingSaved>> {
    let status = state
        .activity
        .rate_movie(user_id, payload.movie_id, payload.rating)
        .await?;
    tracing::debug!(request_id = %request_id, user_id, ?status, "Rating request handled");

    Ok(Json(RatingSaved {
        movie_id: payload.movie_id,
        rating: payload.rating,
        status,
    }))
}

pub async fn ratings(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<RatingItem>>> {
    let ratings = state.activity.ratings(user_id).await?;
    Ok(Json(ratings.iter().map(RatingItem::from).collect()))
}

pub async fn rating_for(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(i64, i64)>,
) -> AppResult<Json<UserRating>> {
    let rating = state.activity.rating_for(user_id, movie_id).await?;
    Ok(Json(UserRating {
        movie_id,
        rating: rating.map(|r| r.rating),
    }))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::movie::{Movie, MovieResponse};
use crate::error::{AppError, AppResult};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 10;

/// A user rating, guaranteed to lie in `1..=10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RatingValue(i32);

impl RatingValue {
    pub fn new(value: i32) -> AppResult<Self> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AppError::Validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )))
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

/// Whether a rating upsert created a row or replaced an existing value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct WatchHistoryEntry {
    #[sqlx(flatten)]
    pub movie: Movie,
    pub watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct WatchlistEntry {
    #[sqlx(flatten)]
    pub movie: Movie,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Rating {
    #[sqlx(flatten)]
    pub movie: Movie,
    pub rating: i32,
    /// When the rating was first given
    pub rated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct MovieRef {
    pub movie_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RateMovieRequest {
    pub movie_id: i64,
    pub rating: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WatchHistoryItem {
    #[serde(flatten)]
    pub movie: MovieResponse,
    pub watched_at: DateTime<Utc>,
}

impl From<&WatchHistoryEntry> for WatchHistoryItem {
    fn from(entry: &WatchHistoryEntry) -> Self {
        Self {
            movie: MovieResponse::from(&entry.movie),
            watched_at: entry.watched_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WatchlistItem {
    #[serde(flatten)]
    pub movie: MovieResponse,
    pub added_at: DateTime<Utc>,
}

impl From<&WatchlistEntry> for WatchlistItem {
    fn from(entry: &WatchlistEntry) -> Self {
        Self {
            movie: MovieResponse::from(&entry.movie),
            added_at: entry.added_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingItem {
    pub movie_id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Rating> for RatingItem {
    fn from(rating: &Rating) -> Self {
        Self {
            movie_id: rating.movie.tmdb_id,
            title: rating.movie.title.clone(),
            poster_path: rating.movie.poster_path.clone(),
            rating: rating.rating,
            created_at: rating.rated_at,
            updated_at: rating.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds_inclusive() {
        assert_eq!(RatingValue::new(1).unwrap().get(), 1);
        assert_eq!(RatingValue::new(10).unwrap().get(), 10);
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        for value in [0, 11, -3, 100] {
            let err = RatingValue::new(value).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn test_rating_outcome_parses_wire_form() {
        let outcome: RatingOutcome = serde_json::from_str("\"updated\"").unwrap();
        assert_eq!(outcome, RatingOutcome::Updated);
        assert!(serde_json::from_str::<RatingOutcome>("\"replaced\"").is_err());
    }

    #[test]
    fn test_rating_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&RatingOutcome::Created).unwrap(),
            "\"created\""
        );
        assert_eq!(
            serde_json::to_string(&RatingOutcome::Updated).unwrap(),
            "\"updated\""
        );
    }
}

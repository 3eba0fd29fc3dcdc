use super::postgres::{PgStore, MOVIE_COLUMNS};
use super::store::ActivityStore;
use crate::{
    error::AppResult,
    models::{Movie, Rating, RatingOutcome, RatingValue, WatchHistoryEntry, WatchlistEntry},
};

#[async_trait::async_trait]
impl ActivityStore for PgStore {
    async fn recent_watched(
        &self,
        user_id: i64,
        cap: usize,
        exclude_adult: bool,
    ) -> AppResult<Vec<Movie>> {
        let mut movies: Vec<Movie> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM watch_history wh
            JOIN movies m ON m.id = wh.movie_id
            WHERE wh.user_id = $1 AND (NOT $3 OR NOT m.adult)
            ORDER BY wh.watched_at DESC, wh.seq DESC
            LIMIT $2
            "#,
            MOVIE_COLUMNS
        ))
        .bind(user_id)
        .bind(cap as i64)
        .bind(exclude_adult)
        .fetch_all(&self.pool)
        .await?;

        self.attach_genres(&mut movies).await?;
        Ok(movies)
    }

    async fn watch_history(&self, user_id: i64, limit: usize) -> AppResult<Vec<WatchHistoryEntry>> {
        let mut entries: Vec<WatchHistoryEntry> = sqlx::query_as(&format!(
            r#"
            SELECT {}, wh.watched_at
            FROM watch_history wh
            JOIN movies m ON m.id = wh.movie_id
            WHERE wh.user_id = $1
            ORDER BY wh.watched_at DESC, wh.seq DESC
            LIMIT $2
            "#,
            MOVIE_COLUMNS
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut movies: Vec<Movie> = entries.iter().map(|e| e.movie.clone()).collect();
        self.attach_genres(&mut movies).await?;
        for (entry, movie) in entries.iter_mut().zip(movies) {
            entry.movie = movie;
        }
        Ok(entries)
    }

    async fn add_watched(&self, user_id: i64, movie_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO watch_history (user_id, movie_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, movie_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_watched(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM watch_history wh
            USING movies m
            WHERE wh.movie_id = m.id AND wh.user_id = $1 AND m.tmdb_id = $2
            "#,
        )
        .bind(user_id)
        .bind(tmdb_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn watchlist(&self, user_id: i64) -> AppResult<Vec<WatchlistEntry>> {
        let mut entries: Vec<WatchlistEntry> = sqlx::query_as(&format!(
            r#"
            SELECT {}, wl.added_at
            FROM watchlist wl
            JOIN movies m ON m.id = wl.movie_id
            WHERE wl.user_id = $1
            ORDER BY wl.added_at DESC, wl.seq DESC
            "#,
            MOVIE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut movies: Vec<Movie> = entries.iter().map(|e| e.movie.clone()).collect();
        self.attach_genres(&mut movies).await?;
        for (entry, movie) in entries.iter_mut().zip(movies) {
            entry.movie = movie;
        }
        Ok(entries)
    }

    async fn is_in_watchlist(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool> {
        let present: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM watchlist wl
                JOIN movies m ON m.id = wl.movie_id
                WHERE wl.user_id = $1 AND m.tmdb_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(tmdb_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(present)
    }

    async fn add_to_watchlist(&self, user_id: i64, movie_id: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO watchlist (user_id, movie_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, movie_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_from_watchlist(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM watchlist wl
            USING movies m
            WHERE wl.movie_id = m.id AND wl.user_id = $1 AND m.tmdb_id = $2
            "#,
        )
        .bind(user_id)
        .bind(tmdb_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        rating: RatingValue,
    ) -> AppResult<RatingOutcome> {
        // xmax is zero only for a freshly inserted tuple
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO ratings (user_id, movie_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, movie_id)
            DO UPDATE SET rating = EXCLUDED.rating, updated_at = now()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(rating.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            RatingOutcome::Created
        } else {
            RatingOutcome::Updated
        })
    }

    async fn rating_for(&self, user_id: i64, tmdb_id: i64) -> AppResult<Option<Rating>> {
        let rating: Option<Rating> = sqlx::query_as(&format!(
            r#"
            SELECT {}, r.rating, r.created_at AS rated_at, r.updated_at
            FROM ratings r
            JOIN movies m ON m.id = r.movie_id
            WHERE r.user_id = $1 AND m.tmdb_id = $2
            "#,
            MOVIE_COLUMNS
        ))
        .bind(user_id)
        .bind(tmdb_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rating)
    }

    async fn ratings(&self, user_id: i64) -> AppResult<Vec<Rating>> {
        let ratings: Vec<Rating> = sqlx::query_as(&format!(
            r#"
            SELECT {}, r.rating, r.created_at AS rated_at, r.updated_at
            FROM ratings r
            JOIN movies m ON m.id = r.movie_id
            WHERE r.user_id = $1
            ORDER BY r.updated_at DESC, m.id
            "#,
            MOVIE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ratings)
    }
}

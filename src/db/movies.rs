use super::postgres::{PgStore, MOVIE_COLUMNS};
use super::store::MovieStore;
use crate::{
    error::{AppError, AppResult},
    models::{Genre, Movie, NewMovie},
};

#[async_trait::async_trait]
impl MovieStore for PgStore {
    async fn find_by_external_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>> {
        let movie: Option<Movie> = sqlx::query_as(&format!(
            "SELECT {} FROM movies m WHERE m.tmdb_id = $1",
            MOVIE_COLUMNS
        ))
        .bind(tmdb_id)
        .fetch_optional(&self.pool)
        .await?;

        match movie {
            Some(movie) => {
                let mut found = [movie];
                self.attach_genres(&mut found).await?;
                let [movie] = found;
                Ok(Some(movie))
            }
            None => Ok(None),
        }
    }

    async fn insert_movie(&self, new_movie: &NewMovie) -> AppResult<Movie> {
        // ON CONFLICT resolves concurrent inserts of the same TMDB id;
        // the loser gets no row back and re-reads the winner's.
        let inserted: Option<Movie> = sqlx::query_as(&format!(
            r#"
            INSERT INTO movies AS m (tmdb_id, title, overview, poster_path, backdrop_path,
                                     release_date, vote_average, vote_count, popularity, adult)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (tmdb_id) DO NOTHING
            RETURNING {}
            "#,
            MOVIE_COLUMNS
        ))
        .bind(new_movie.tmdb_id)
        .bind(&new_movie.title)
        .bind(&new_movie.overview)
        .bind(&new_movie.poster_path)
        .bind(&new_movie.backdrop_path)
        .bind(new_movie.release_date)
        .bind(new_movie.vote_average)
        .bind(new_movie.vote_count)
        .bind(new_movie.popularity)
        .bind(new_movie.adult)
        .fetch_optional(&self.pool)
        .await?;

        let Some(movie) = inserted else {
            tracing::debug!(tmdb_id = new_movie.tmdb_id, "Movie already cached, re-reading");
            return self
                .find_by_external_id(new_movie.tmdb_id)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Movie {} vanished after insert conflict",
                        new_movie.tmdb_id
                    ))
                });
        };

        if !new_movie.genres.is_empty() {
            self.upsert_genres(&new_movie.genres).await?;
        }

        let genre_ids = new_movie.all_genre_ids();
        if !genre_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO movie_genres (movie_id, genre_id)
                SELECT $1, g.id FROM genres g WHERE g.id = ANY($2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(movie.id)
            .bind(&genre_ids[..])
            .execute(&self.pool)
            .await?;
        }

        let mut stored = [movie];
        self.attach_genres(&mut stored).await?;
        let [movie] = stored;

        tracing::debug!(tmdb_id = movie.tmdb_id, id = movie.id, "Movie cached");
        Ok(movie)
    }

    async fn popular_cached(&self, limit: usize) -> AppResult<Vec<Movie>> {
        let mut movies: Vec<Movie> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM movies m
            WHERE NOT m.adult
            ORDER BY m.popularity DESC NULLS LAST, m.vote_average DESC NULLS LAST, m.id
            LIMIT $1
            "#,
            MOVIE_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        self.attach_genres(&mut movies).await?;
        Ok(movies)
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    async fn upsert_genres(&self, genres: &[Genre]) -> AppResult<()> {
        for genre in genres {
            sqlx::query(
                "INSERT INTO genres (id, name) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
            )
            .bind(genre.id)
            .bind(&genre.name)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

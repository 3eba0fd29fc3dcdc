use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{error::AppResult, models::Movie};

/// Column list matching `Movie`'s `FromRow` fields, qualified with `m.`
pub(crate) const MOVIE_COLUMNS: &str = "m.id, m.tmdb_id, m.title, m.overview, m.poster_path, \
     m.backdrop_path, m.release_date, m.vote_average, m.vote_count, m.popularity, m.adult, \
     m.created_at";

/// Creates a PostgreSQL connection pool and applies pending migrations
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!(max_connections, "Database pool ready, migrations applied");

    Ok(pool)
}

/// Postgres-backed implementation of every store trait
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads genres for the given movies in a single query
    pub(crate) async fn attach_genres(&self, movies: &mut [Movie]) -> AppResult<()> {
        if movies.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();

        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            r#"
            SELECT mg.movie_id, g.id, g.name
            FROM movie_genres mg
            JOIN genres g ON g.id = mg.genre_id
            WHERE mg.movie_id = ANY($1)
            ORDER BY g.name
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        for movie in movies.iter_mut() {
            movie.genres = rows
                .iter()
                .filter(|(movie_id, _, _)| *movie_id == movie.id)
                .map(|(_, id, name)| crate::models::Genre {
                    id: *id,
                    name: name.clone(),
                })
                .collect();
        }
        Ok(())
    }
}

use super::postgres::PgStore;
use super::store::UserStore;
use crate::{
    error::{AppError, AppResult},
    models::{NewUser, ProfileUpdate, User},
};

const USER_COLUMNS: &str = "id, username, email, full_name, hashed_password, avatar_url, \
     location, is_active, created_at, updated_at";

/// Maps a unique-constraint violation on users to a client-facing conflict
fn conflict_or(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            let reason = match db_err.constraint() {
                Some(name) if name.contains("email") => "Email already taken",
                _ => "Username already taken",
            };
            AppError::Conflict(reason.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let created: User = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (username, email, full_name, location, hashed_password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.location)
        .bind(&user.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or)?;

        tracing::info!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }

    async fn find_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, user_id: i64, update: &ProfileUpdate) -> AppResult<User> {
        let updated: Option<User> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = CASE WHEN $5 THEN updated_at ELSE now() END
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.avatar_url)
        .bind(update.is_empty())
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_or)?;

        updated.ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }
}

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{NewUser, ProfileUpdate, User},
};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;

fn validate_username(username: &str) -> AppResult<()> {
    if USERNAME_LEN.contains(&username.chars().count()) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Username must be between 3 and 50 characters".to_string(),
        ))
    }
}

fn validate_email(email: &str) -> AppResult<()> {
    if email.contains('@') {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid email address".to_string()))
    }
}

pub async fn register(users: &dyn UserStore, mut new_user: NewUser) -> AppResult<User> {
    new_user.username = new_user.username.trim().to_string();
    new_user.email = new_user.email.trim().to_lowercase();
    validate_username(&new_user.username)?;
    validate_email(&new_user.email)?;

    users.create_user(&new_user).await
}

pub async fn profile(users: &dyn UserStore, user_id: i64) -> AppResult<User> {
    users
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

pub async fn update_profile(
    users: &dyn UserStore,
    user_id: i64,
    mut update: ProfileUpdate,
) -> AppResult<User> {
    if let Some(username) = update.username.as_mut() {
        *username = username.trim().to_string();
        validate_username(username)?;
    }
    if let Some(email) = update.email.as_mut() {
        *email = email.trim().to_lowercase();
        validate_email(email)?;
    }

    let user = users.update_profile(user_id, &update).await?;
    tracing::info!(user_id, "Profile updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            full_name: Some("Thomas Anderson".to_string()),
            location: None,
            hashed_password: "opaque".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_validates_username_length() {
        let store = InMemoryStore::new();
        let long = "x".repeat(51);
        for name in ["ab", long.as_str()] {
            let err = register(&store, new_user(name, "a@b.c")).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_register_rejects_email_without_at() {
        let store = InMemoryStore::new();
        let err = register(&store, new_user("neo", "neo.example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let store = InMemoryStore::new();
        register(&store, new_user("neo", "neo@example.com"))
            .await
            .unwrap();

        let err = register(&store, new_user("neo", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_profile_and_fetch() {
        let store = InMemoryStore::new();
        let user = register(&store, new_user("neo", "neo@example.com"))
            .await
            .unwrap();

        let update = ProfileUpdate {
            avatar_url: Some("/avatars/neo.png".to_string()),
            ..Default::default()
        };
        tokio_test::assert_ok!(update_profile(&store, user.id, update).await);

        let fetched = profile(&store, user.id).await.unwrap();
        assert_eq!(fetched.avatar_url.as_deref(), Some("/avatars/neo.png"));
        assert_eq!(fetched.username, "neo");
    }

    #[tokio::test]
    async fn test_profile_of_missing_user_is_not_found() {
        let store = InMemoryStore::new();
        let err = profile(&store, 42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

//! Authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate user by username and return a signed JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user.password_hash, password)? {
            tracing::warn!(username, "rejected login attempt");
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let claims = UserClaims::for_user(&user, Utc::now().timestamp(), self.config.jwt_expiration_hours);
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok((token, user))
    }

    /// Token lifetime in seconds
    pub fn token_lifetime_secs(&self) -> i64 {
        self.config.jwt_expiration_hours as i64 * 3600
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::{books::MockBookStore, loans::MockLoanStore, users::MockUserStore};

    fn service_with(users: MockUserStore) -> AuthService {
        let repository = Repository::with_stores(
            Arc::new(MockBookStore::new()),
            Arc::new(users),
            Arc::new(MockLoanStore::new()),
        );
        AuthService::new(repository, AuthConfig::default())
    }

    fn stored_user(password: &str) -> User {
        User {
            id: 5,
            username: "carol".into(),
            password_hash: hash_password(password).unwrap(),
            is_staff: true,
            date_joined: Utc::now(),
        }
    }

    #[tokio::test]
    async fn valid_credentials_issue_a_verifiable_token() {
        let user = stored_user("hunter22");
        let mut users = MockUserStore::new();
        users
            .expect_get_by_username()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        let service = service_with(users);

        let (token, user) = service.authenticate("carol", "hunter22").await.unwrap();
        let claims = UserClaims::from_token(&token, &AuthConfig::default().jwt_secret).unwrap();

        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.sub, "carol");
        assert!(claims.is_staff);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let user = stored_user("hunter22");
        let mut users = MockUserStore::new();
        users
            .expect_get_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        let service = service_with(users);

        let err = service.authenticate("carol", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let mut users = MockUserStore::new();
        users.expect_get_by_username().returning(|_| Ok(None));
        let service = service_with(users);

        let err = service.authenticate("nobody", "x").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }
}

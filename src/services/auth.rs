//! Authentication service: login, registration, own profile

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};

use crate::{
    config::{AuthConfig, BootstrapConfig},
    error::{AppError, AppResult},
    models::{
        user::{RegisterUser, Role, UpdateProfile, User, UserClaims},
        ActivityAction, NewActivity,
    },
    repository::{users::NewUser, Repository},
};

/// Outcome of checking a password against a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Valid,
    /// Matched an unsalted SHA-256 digest; the caller should rehash
    ValidLegacy,
    Invalid,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == 64 && stored.chars().all(|c| c.is_ascii_hexdigit())
}

/// Verify a password against an Argon2 PHC string or a legacy hex SHA-256 digest
pub fn verify_password(stored: &str, password: &str) -> AppResult<PasswordCheck> {
    if is_legacy_digest(stored) {
        let digest = hex::encode(Sha256::digest(password.as_bytes()));
        return Ok(if digest.eq_ignore_ascii_case(stored) {
            PasswordCheck::ValidLegacy
        } else {
            PasswordCheck::Invalid
        });
    }

    let parsed_hash = PasswordHash::new(stored)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
        {
            PasswordCheck::Valid
        } else {
            PasswordCheck::Invalid
        },
    )
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    fn create_token(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Authenticate user by username and return a JWT token
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        let check = verify_password(&user.password_hash, password)?;
        if check == PasswordCheck::Invalid {
            tracing::warn!("Failed login attempt for user {}", user.username);
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let mut uow = self.repository.begin().await?;
        if check == PasswordCheck::ValidLegacy {
            tracing::info!("Upgrading legacy password hash for user {}", user.id);
            let hash = hash_password(password)?;
            self.repository
                .users
                .update_password_hash(uow.conn(), user.id, &hash)
                .await?;
        }
        uow.log(NewActivity::new(
            user.id,
            ActivityAction::Login,
            "user",
            user.id,
            format!("{} logged in", user.username),
        ))
        .await?;
        uow.commit().await?;

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Register a new normal user and sign them in
    pub async fn register(&self, request: RegisterUser) -> AppResult<(String, User)> {
        if self
            .repository
            .users
            .username_exists(request.username.trim(), None)
            .await?
        {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let hash = hash_password(&request.password)?;

        let mut uow = self.repository.begin().await?;
        let user = self
            .repository
            .users
            .create(
                uow.conn(),
                &NewUser {
                    username: request.username.trim(),
                    password_hash: &hash,
                    first_name: request.first_name.as_deref(),
                    last_name: request.last_name.as_deref(),
                    email: request.email.as_deref(),
                    role: Role::NormalUser,
                },
            )
            .await?;
        uow.log(NewActivity::new(
            user.id,
            ActivityAction::Register,
            "user",
            user.id,
            format!("{} registered", user.username),
        ))
        .await?;
        uow.commit().await?;

        tracing::info!("Registered user {} ({})", user.username, user.id);
        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Get the current user
    pub async fn me(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Update own profile; a password change requires the current password
    pub async fn update_profile(&self, user_id: i32, profile: UpdateProfile) -> AppResult<User> {
        let user = self.repository.users.get_by_id(user_id).await?;

        let password_hash = match profile.new_password {
            Some(ref new_password) => {
                let current = profile.current_password.as_ref().ok_or_else(|| {
                    AppError::Validation(
                        "Current password required to change password".to_string(),
                    )
                })?;
                if verify_password(&user.password_hash, current)? == PasswordCheck::Invalid {
                    return Err(AppError::Authentication(
                        "Current password is incorrect".to_string(),
                    ));
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let mut uow = self.repository.begin().await?;
        let updated = self
            .repository
            .users
            .update_profile(uow.conn(), user_id, &profile, password_hash)
            .await?;
        uow.log(NewActivity::new(
            user_id,
            ActivityAction::UpdateProfile,
            "user",
            user_id,
            format!("{} updated their profile", updated.username),
        ))
        .await?;
        uow.commit().await?;

        Ok(updated)
    }

    /// Create the configured super user when the users table is empty
    pub async fn ensure_bootstrap_user(&self, bootstrap: &BootstrapConfig) -> AppResult<()> {
        if self.repository.users.count().await? > 0 {
            return Ok(());
        }

        let hash = hash_password(&bootstrap.password)?;
        let mut uow = self.repository.begin().await?;
        let user = self
            .repository
            .users
            .create(
                uow.conn(),
                &NewUser {
                    username: &bootstrap.username,
                    password_hash: &hash,
                    first_name: None,
                    last_name: None,
                    email: None,
                    role: Role::SuperUser,
                },
            )
            .await?;
        uow.log(NewActivity::new(
            user.id,
            ActivityAction::CreateUser,
            "user",
            user.id,
            format!("Bootstrap super user {} created", user.username),
        ))
        .await?;
        uow.commit().await?;

        tracing::info!("Created bootstrap super user {}", user.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret-password").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert_eq!(verify_password(&hash, "secret-password").unwrap(), PasswordCheck::Valid);
        assert_eq!(verify_password(&hash, "wrong").unwrap(), PasswordCheck::Invalid);
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_legacy_sha256_digest() {
        // sha256("password")
        let legacy = "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";
        assert_eq!(verify_password(legacy, "password").unwrap(), PasswordCheck::ValidLegacy);
        assert_eq!(
            verify_password(&legacy.to_uppercase(), "password").unwrap(),
            PasswordCheck::ValidLegacy
        );
        assert_eq!(verify_password(legacy, "Password").unwrap(), PasswordCheck::Invalid);
    }

    #[test]
    fn test_garbage_hash_is_internal_error() {
        assert!(matches!(
            verify_password("not-a-hash", "x"),
            Err(AppError::Internal(_))
        ));
    }
}

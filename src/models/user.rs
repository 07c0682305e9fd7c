//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::not_blank;
use crate::error::AppError;

text_enum! {
    /// Account role
    Role {
        SuperUser => "super_user",
        NormalUser => "normal_user",
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Argon2 PHC string, or a legacy hex SHA-256 digest
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Search in username, first name and last name
    pub search: Option<String>,
    pub role: Option<Role>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create user request (super user)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(
        length(min = 3, max = 50, message = "Username must be 3 to 50 characters"),
        custom(function = "not_blank")
    )]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// Self-service registration; always creates a normal user
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(
        length(min = 3, max = 50, message = "Username must be 3 to 50 characters"),
        custom(function = "not_blank")
    )]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Update user request (super user)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(
        length(min = 3, max = 50, message = "Username must be 3 to 50 characters"),
        custom(function = "not_blank")
    )]
    pub username: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// Update own profile request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// Current password (required to change password)
    pub current_password: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: Option<String>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user: &User, expiration_hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp: now + (expiration_hours as i64 * 3600),
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_super_user(&self) -> bool {
        self.role == Role::SuperUser
    }

    pub fn require_super_user(&self) -> Result<(), AppError> {
        if self.is_super_user() {
            Ok(())
        } else {
            Err(AppError::Authorization("Super user privileges required".to_string()))
        }
    }

    /// Super users act on anyone's behalf, normal users only on their own
    pub fn require_owner_or_super_user(&self, owner_id: i32) -> Result<(), AppError> {
        if self.is_super_user() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You can only access your own borrowing requests".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: Role) -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            password_hash: String::new(),
            first_name: Some("Alice".to_string()),
            last_name: None,
            email: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let claims = UserClaims::new(&sample_user(Role::NormalUser), 1);
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.sub, "alice");
        assert_eq!(parsed.role, Role::NormalUser);
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = UserClaims::new(&sample_user(Role::SuperUser), 1)
            .create_token("secret")
            .unwrap();
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_token_expired() {
        let mut claims = UserClaims::new(&sample_user(Role::SuperUser), 1);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = claims.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_role_checks() {
        let normal = UserClaims::new(&sample_user(Role::NormalUser), 1);
        assert!(normal.require_super_user().is_err());
        assert!(normal.require_owner_or_super_user(7).is_ok());
        assert!(normal.require_owner_or_super_user(8).is_err());

        let admin = UserClaims::new(&sample_user(Role::SuperUser), 1);
        assert!(admin.require_super_user().is_ok());
        assert!(admin.require_owner_or_super_user(8).is_ok());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let mut user = sample_user(Role::NormalUser);
        user.password_hash = "hash".to_string();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "normal_user");
    }
}

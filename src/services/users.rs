//! User management service (super users)

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{CreateUser, Role, UpdateUser, User, UserClaims, UserQuery},
        ActivityAction, NewActivity,
    },
    repository::{users::NewUser, Repository},
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query).await
    }

    /// Create a new user with any role
    pub async fn create_user(&self, actor: &UserClaims, user: CreateUser) -> AppResult<User> {
        if self
            .repository
            .users
            .username_exists(user.username.trim(), None)
            .await?
        {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let hash = hash_password(&user.password)?;

        let mut uow = self.repository.begin().await?;
        let created = self
            .repository
            .users
            .create(
                uow.conn(),
                &NewUser {
                    username: user.username.trim(),
                    password_hash: &hash,
                    first_name: user.first_name.as_deref(),
                    last_name: user.last_name.as_deref(),
                    email: user.email.as_deref(),
                    role: user.role.unwrap_or(Role::NormalUser),
                },
            )
            .await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::CreateUser,
            "user",
            created.id,
            format!("Created user {} as {}", created.username, created.role),
        ))
        .await?;
        uow.commit().await?;

        Ok(created)
    }

    /// Update an existing user
    pub async fn update_user(&self, actor: &UserClaims, id: i32, user: UpdateUser) -> AppResult<User> {
        self.repository.users.get_by_id(id).await?;

        if actor.user_id == id && user.role == Some(Role::NormalUser) {
            return Err(AppError::BusinessRule(
                "You cannot remove your own super user role".to_string(),
            ));
        }

        if let Some(ref username) = user.username {
            if self
                .repository
                .users
                .username_exists(username.trim(), Some(id))
                .await?
            {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
        }

        let password_hash = match user.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        let mut uow = self.repository.begin().await?;
        let updated = self
            .repository
            .users
            .update(uow.conn(), id, &user, password_hash)
            .await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::UpdateUser,
            "user",
            id,
            format!("Updated user {}", updated.username),
        ))
        .await?;
        uow.commit().await?;

        Ok(updated)
    }

    /// Delete a user who holds no books and has no waiting request
    pub async fn delete_user(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        if actor.user_id == id {
            return Err(AppError::BusinessRule("You cannot delete your own account".to_string()));
        }

        let user = self.repository.users.get_by_id(id).await?;

        // Same row lock as request creation, so no request slips in before the delete
        let mut uow = self.repository.begin().await?;
        self.repository
            .borrowings
            .lock_requester(uow.conn(), id)
            .await?;

        let open = self
            .repository
            .users
            .count_open_borrowings(uow.conn(), id)
            .await?;
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "User still has {} open borrowing(s)",
                open
            )));
        }

        self.repository.users.delete(uow.conn(), id).await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::DeleteUser,
            "user",
            id,
            format!("Deleted user {}", user.username),
        ))
        .await?;
        uow.commit().await?;

        Ok(())
    }
}

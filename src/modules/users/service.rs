//! 用户注册与查询
//! User registration and lookup

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::models::User;
use super::repo::{RolesRepo, UsersRepo, USERS_EMAIL_KEY};
use crate::comm::Hasher;
use crate::error::{AppError, AppResult};
use crate::repository::StoreError;

/// 注册用户的输入
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

pub struct UsersService {
    users: Arc<dyn UsersRepo>,
    roles: Arc<dyn RolesRepo>,
    hasher: Arc<dyn Hasher>,
}

impl UsersService {
    pub fn new(users: Arc<dyn UsersRepo>, roles: Arc<dyn RolesRepo>, hasher: Arc<dyn Hasher>) -> Self {
        Self { users, roles, hasher }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", id)))
    }

    /// 注册新用户
    ///
    /// Every requested role must exist and the email must be unused. The password is
    /// stored only as a hash.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: CreateUser) -> AppResult<User> {
        input.validate().map_err(validation_error)?;

        let names: Vec<String> = input
            .roles
            .iter()
            .map(|r| r.trim().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let roles = self.roles.by_names(&names).await?;
        if roles.len() != names.len() {
            let found: BTreeSet<&str> = roles.iter().map(|r| r.name.as_str()).collect();
            let missing: Vec<&str> = names
                .iter()
                .map(String::as_str)
                .filter(|n| !found.contains(n))
                .collect();
            return Err(AppError::validation(
                "roles",
                format!("unknown roles: {}", missing.join(", ")),
            ));
        }

        if self.users.by_email(&input.email).await?.is_some() {
            return Err(email_in_use());
        }

        let hasher = self.hasher.clone();
        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hashing task failed: {}", e)))??;

        let user = User {
            id: Uuid::new_v4(),
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            password_hash,
            roles,
        };
        // 并发注册同一邮箱时由存储的唯一约束兜底
        match self.users.create(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate { constraint }) if constraint == USERS_EMAIL_KEY => {
                return Err(email_in_use());
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "user created");
        Ok(user)
    }
}

fn email_in_use() -> AppError {
    AppError::validation("email", "email already in use")
}

fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|k| k.to_string())
        .collect();
    fields.sort();
    AppError::validation(fields.join(","), errors.to_string())
}

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{fold_user, UserGraphRow, USER_GRAPH_COLUMNS, USER_GRAPH_JOINS};
use crate::modules::users::models::User;
use crate::modules::users::repo::UsersRepo;
use crate::repository::error::{Result, StoreError};

pub struct PgUsersRepository {
    pool: PgPool,
}

impl PgUsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 按 ID 读取用户及其角色、权限
pub(crate) async fn fetch_user(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let sql = format!(
        "SELECT {} FROM users u {} WHERE u.id = $1",
        USER_GRAPH_COLUMNS, USER_GRAPH_JOINS
    );
    let rows: Vec<UserGraphRow> = sqlx::query_as(&sql).bind(id).fetch_all(pool).await?;
    Ok(fold_user(&rows))
}

#[async_trait]
impl UsersRepo for PgUsersRepository {
    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        fetch_user(&self.pool, id).await
    }

    async fn by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users u {} WHERE u.email = $1",
            USER_GRAPH_COLUMNS, USER_GRAPH_JOINS
        );
        let rows: Vec<UserGraphRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        Ok(fold_user(&rows))
    }

    async fn create(&self, user: &User) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, password) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::from_insert(e, &user.id.to_string()))?;

        for role in &user.roles {
            sqlx::query("INSERT INTO user_roles (id, user_id, role_id) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(user.id)
                .bind(role.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

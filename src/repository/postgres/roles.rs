use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::modules::users::models::{Permission, Role};
use crate::modules::users::repo::RolesRepo;
use crate::repository::error::Result;

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    role_id: Uuid,
    role_name: String,
    permission_id: Option<Uuid>,
    permission_name: Option<String>,
}

pub struct PgRolesRepository {
    pool: PgPool,
}

impl PgRolesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RolesRepo for PgRolesRepository {
    async fn by_names(&self, names: &[String]) -> Result<Vec<Role>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<RoleRow> = sqlx::query_as(
            "SELECT r.id AS role_id, r.name AS role_name, p.id AS permission_id, p.name AS permission_name \
             FROM roles r \
             LEFT JOIN roles_permissions rp ON rp.role_id = r.id \
             LEFT JOIN permissions p ON p.id = rp.permission_id \
             WHERE r.name = ANY($1) \
             ORDER BY r.name",
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await?;

        let mut roles: Vec<Role> = Vec::new();
        for row in rows {
            if roles.last().map(|r| r.id) != Some(row.role_id) {
                roles.push(Role {
                    id: row.role_id,
                    name: row.role_name,
                    permissions: Vec::new(),
                });
            }
            if let (Some(id), Some(name), Some(role)) =
                (row.permission_id, row.permission_name, roles.last_mut())
            {
                role.permissions.push(Permission { id, name });
            }
        }

        Ok(roles)
    }
}

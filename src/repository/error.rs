use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

const PRIMARY_KEY_SUFFIX: &str = "_pkey";

#[derive(Debug, Error)]
pub enum StoreError {
    /// 主键冲突，调用方可以换一个 ID 重试
    /// Primary key already taken; the caller may retry with a fresh ID
    #[error("record with id '{id}' already exists")]
    Collision { id: String },
    /// 主键以外的唯一约束冲突
    /// A unique constraint other than the primary key was violated
    #[error("unique constraint '{constraint}' violated")]
    Duplicate { constraint: String },
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_collision(&self) -> bool {
        matches!(self, StoreError::Collision { .. })
    }

    /// 将唯一约束冲突转换为 Collision 或 Duplicate，其余保持原样
    ///
    /// A violation of the primary key (Postgres names it `<table>_pkey`) becomes
    /// `Collision`; any other named unique constraint becomes `Duplicate`.
    pub fn from_insert(err: sqlx::Error, id: &str) -> Self {
        let duplicate = match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                db.constraint().map(str::to_string)
            }
            _ => return StoreError::Sqlx(err),
        };

        match duplicate {
            Some(constraint) if !constraint.ends_with(PRIMARY_KEY_SUFFIX) => {
                StoreError::Duplicate { constraint }
            }
            _ => StoreError::Collision { id: id.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;

    /// Stand-in for a Postgres unique violation (SQLSTATE 23505).
    #[derive(Debug, Error)]
    #[error("duplicate key value violates unique constraint")]
    struct UniqueViolation {
        constraint: Option<&'static str>,
    }

    impl DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    fn unique_violation(constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(UniqueViolation { constraint }))
    }

    #[test]
    fn test_primary_key_violation_is_collision() {
        let err = StoreError::from_insert(
            unique_violation(Some("user_access_tokens_pkey")),
            "PAT_abc",
        );
        assert!(err.is_collision());
        assert!(matches!(err, StoreError::Collision { ref id } if id == "PAT_abc"));

        let err = StoreError::from_insert(unique_violation(None), "PAT_abc");
        assert!(err.is_collision());
    }

    #[test]
    fn test_other_unique_constraint_is_duplicate() {
        let err = StoreError::from_insert(
            unique_violation(Some("users_email_key")),
            "6f1c2a4e-0000-4000-8000-000000000000",
        );
        assert!(!err.is_collision());
        assert!(matches!(err, StoreError::Duplicate { ref constraint } if constraint == "users_email_key"));
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = StoreError::from_insert(sqlx::Error::RowNotFound, "PAT_abc");
        assert!(!err.is_collision());
        assert!(matches!(err, StoreError::Sqlx(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_collision_display() {
        let err = StoreError::Collision {
            id: "PAT_abc".to_string(),
        };
        assert!(err.is_collision());
        assert_eq!(err.to_string(), "record with id 'PAT_abc' already exists");
    }
}

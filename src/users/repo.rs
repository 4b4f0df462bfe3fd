use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use uuid::Uuid;

use super::repo_types::{PageRequest, User, UserFilter};

const USER_COLUMNS: &str = "id, email, fullname, password_hash";

#[derive(Debug, Error)]
pub enum StoreError {
    /// An active user already owns this email.
    #[error("email already in use")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence over the `users` table. Every lookup ignores soft-deleted rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, email: &str, full_name: &str, password_hash: &str)
        -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Vec<User>, StoreError>;
    /// Number of active users, regardless of any listing filter.
    async fn count_active(&self) -> Result<i64, StoreError>;
    /// Returns false when no active row has this id.
    async fn update(&self, id: Uuid, full_name: &str, password_hash: &str)
        -> Result<bool, StoreError>;
    /// Returns false when no active row has this id.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Builds the paginated listing query. Placeholders are numbered in push
/// order: email, fullname, limit, offset.
pub fn list_query<'a>(filter: &'a UserFilter, page: PageRequest) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL"
    ));
    if let Some(email) = &filter.email {
        qb.push(" AND email = ").push_bind(email.as_str());
    }
    if let Some(full_name) = &filter.full_name {
        qb.push(" AND fullname = ").push_bind(full_name.as_str());
    }
    qb.push(" ORDER BY id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    qb
}

#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn insert_error(e: sqlx::Error) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(
        &self,
        email: &str,
        full_name: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, fullname, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(full_name)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(insert_error)?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Vec<User>, StoreError> {
        let rows = list_query(filter, page)
            .build_query_as::<User>()
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn count_active(&self) -> Result<i64, StoreError> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE deleted_at IS NULL"#)
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    async fn update(
        &self,
        id: Uuid,
        full_name: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET fullname = $2, password_hash = $3
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET deleted_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

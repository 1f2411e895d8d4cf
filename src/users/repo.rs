use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate key")]
    DuplicateKey,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::DuplicateKey,
            other => RepoError::Database(other),
        }
    }
}

/// Persistence contract for users. Soft-deleted rows are invisible to every
/// method.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_by_id(&self, id: i64) -> Result<User, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<User, RepoError>;
    /// One page ordered by id, plus the count of all live users.
    async fn find_all(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), RepoError>;
    /// Persists `name` and `email`; `updated_at` is refreshed by the store.
    async fn update(&self, user: &User) -> Result<User, RepoError>;
    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

/// Saturates at `i64::MAX` so huge page numbers yield an empty page.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(limit.max(0))
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at, updated_at, deleted_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn find_all(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), RepoError> {
        let total: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE deleted_at IS NULL"#)
                .fetch_one(&self.db)
                .await?;

        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at, deleted_at
            FROM users
            WHERE deleted_at IS NULL
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(page_offset(page, limit))
        .fetch_all(&self.db)
        .await?;

        Ok((rows, total))
    }

    async fn update(&self, user: &User) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET name = $2, email = $3, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, email, password_hash, created_at, updated_at, deleted_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET deleted_at = now(), updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

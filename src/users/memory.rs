use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo::{page_offset, RepoError, UserRepository};
use super::repo_types::{NewUser, User};

/// In-process stand-in for `PgUserRepository` with the same soft-delete and
/// uniqueness rules.
#[derive(Default)]
pub struct InMemoryUserRepository {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: Vec<User>,
}

impl Inner {
    fn live(&self) -> impl Iterator<Item = &User> {
        self.rows.iter().filter(|u| u.deleted_at.is_none())
    }

    fn email_taken(&self, email: &str, except_id: Option<i64>) -> bool {
        self.live()
            .any(|u| u.email == email && Some(u.id) != except_id)
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows including soft-deleted ones.
    pub fn stored_rows(&self) -> usize {
        self.inner.lock().expect("repo mutex").rows.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut inner = self.inner.lock().expect("repo mutex");
        if inner.email_taken(&user.email, None) {
            return Err(RepoError::DuplicateKey);
        }
        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: inner.next_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, RepoError> {
        let inner = self.inner.lock().expect("repo mutex");
        let found = inner.live().find(|u| u.id == id).cloned();
        found.ok_or(RepoError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepoError> {
        let inner = self.inner.lock().expect("repo mutex");
        let found = inner.live().find(|u| u.email == email).cloned();
        found.ok_or(RepoError::NotFound)
    }

    async fn find_all(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), RepoError> {
        let inner = self.inner.lock().expect("repo mutex");
        let total = inner.live().count() as i64;
        let rows: Vec<User> = inner
            .live()
            .skip(usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect();
        Ok((rows, total))
    }

    async fn update(&self, user: &User) -> Result<User, RepoError> {
        let mut inner = self.inner.lock().expect("repo mutex");
        if inner.email_taken(&user.email, Some(user.id)) {
            return Err(RepoError::DuplicateKey);
        }
        let row = inner
            .rows
            .iter_mut()
            .find(|u| u.id == user.id && u.deleted_at.is_none())
            .ok_or(RepoError::NotFound)?;
        row.name = user.name.clone();
        row.email = user.email.clone();
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut inner = self.inner.lock().expect("repo mutex");
        let row = inner
            .rows
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .ok_or(RepoError::NotFound)?;
        let now = OffsetDateTime::now_utc();
        row.deleted_at = Some(now);
        row.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test User".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn soft_delete_keeps_row_and_frees_email() {
        let repo = InMemoryUserRepository::new();
        let first = repo.create(new_user("a@x.com")).await.unwrap();
        repo.delete(first.id).await.unwrap();

        assert!(matches!(repo.find_by_id(first.id).await, Err(RepoError::NotFound)));
        assert!(matches!(repo.delete(first.id).await, Err(RepoError::NotFound)));

        let second = repo.create(new_user("a@x.com")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(repo.stored_rows(), 2);
    }

    #[tokio::test]
    async fn huge_page_is_empty() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("a@x.com")).await.unwrap();
        let (rows, total) = repo.find_all(i64::MAX, 10).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_live_email() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("dup@x.com")).await.unwrap();
        assert!(matches!(
            repo.create(new_user("dup@x.com")).await,
            Err(RepoError::DuplicateKey)
        ));
    }
}

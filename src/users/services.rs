use std::sync::Arc;

use tracing::{info, warn};

use super::{
    dto::{CreateUserRequest, LoginRequest, UpdateUserRequest, UserResponse},
    repo::{RepoError, UserRepository},
    repo_types::{NewUser, User},
};
use crate::auth::{PasswordError, PasswordHasher};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user not found")]
    UserNotFound,
    #[error("email already exists")]
    EmailAlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Repository(#[from] RepoError),
}

/// Business rules over a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: PasswordHasher) -> Self {
        Self { repo, hasher }
    }

    pub async fn register(&self, req: CreateUserRequest) -> Result<UserResponse, UserError> {
        match self.repo.find_by_email(&req.email).await {
            Ok(_) => return Err(UserError::EmailAlreadyExists),
            Err(RepoError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = self.hasher.hash_async(&req.password).await?;
        let user = self
            .repo
            .create(NewUser {
                name: req.name,
                email: req.email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent registration
                RepoError::DuplicateKey => UserError::EmailAlreadyExists,
                other => other.into(),
            })?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user.into())
    }

    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn login(&self, req: LoginRequest) -> Result<User, UserError> {
        let user = match self.repo.find_by_email(&req.email).await {
            Ok(u) => u,
            Err(RepoError::NotFound) => {
                self.hasher.verify_decoy_async(&req.password).await;
                warn!("login unknown email");
                return Err(UserError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !self
            .hasher
            .verify_async(&req.password, &user.password_hash)
            .await?
        {
            warn!(user_id = user.id, "login invalid password");
            return Err(UserError::InvalidCredentials);
        }

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<UserResponse, UserError> {
        let user = self.find(id).await?;
        Ok(user.into())
    }

    /// Inputs are trusted; clamping happens at the HTTP boundary.
    pub async fn get_all(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<UserResponse>, i64), UserError> {
        let (users, total) = self.repo.find_all(page, limit).await?;
        Ok((users.into_iter().map(UserResponse::from).collect(), total))
    }

    pub async fn update(
        &self,
        id: i64,
        req: UpdateUserRequest,
    ) -> Result<UserResponse, UserError> {
        let mut user = self.find(id).await?;

        if let Some(email) = req.new_email().filter(|e| *e != user.email) {
            match self.repo.find_by_email(email).await {
                Ok(_) => return Err(UserError::EmailAlreadyExists),
                Err(RepoError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
            user.email = email.to_owned();
        }
        if let Some(name) = req.new_name() {
            user.name = name.to_owned();
        }

        let user = self.repo.update(&user).await.map_err(|e| match e {
            RepoError::DuplicateKey => UserError::EmailAlreadyExists,
            RepoError::NotFound => UserError::UserNotFound,
            other => other.into(),
        })?;

        info!(user_id = user.id, "user updated");
        Ok(user.into())
    }

    pub async fn delete(&self, id: i64) -> Result<(), UserError> {
        self.find(id).await?;
        self.repo.delete(id).await.map_err(|e| match e {
            RepoError::NotFound => UserError::UserNotFound,
            other => other.into(),
        })?;
        info!(user_id = id, "user deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<User, UserError> {
        self.repo.find_by_id(id).await.map_err(|e| match e {
            RepoError::NotFound => UserError::UserNotFound,
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::cheap_hashing;
    use crate::users::memory::InMemoryUserRepository;

    fn service() -> (UserService, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let hasher = PasswordHasher::new(&cheap_hashing()).unwrap();
        (UserService::new(repo.clone(), hasher), repo)
    }

    fn register_req(name: &str, email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (svc, _) = service();
        let created = svc
            .register(register_req("Jo Doe", "jo@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(created.email, "jo@x.com");

        let user = svc.login(login_req("jo@x.com", "secret1")).await.unwrap();
        assert_eq!(user.id, created.id);
        assert_ne!(user.password_hash, "secret1");
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let (svc, _) = service();
        svc.register(register_req("Jo", "jo@x.com", "secret1"))
            .await
            .unwrap();
        let err = svc
            .register(register_req("Other", "jo@x.com", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailAlreadyExists));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (svc, _) = service();
        svc.register(register_req("Jo", "jo@x.com", "secret1"))
            .await
            .unwrap();

        let wrong_password = svc.login(login_req("jo@x.com", "nope123")).await.unwrap_err();
        let unknown_email = svc.login(login_req("ghost@x.com", "secret1")).await.unwrap_err();

        assert!(matches!(wrong_password, UserError::InvalidCredentials));
        assert!(matches!(unknown_email, UserError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn soft_delete_hides_user_everywhere() {
        let (svc, repo) = service();
        let user = svc
            .register(register_req("Jo", "jo@x.com", "secret1"))
            .await
            .unwrap();

        svc.delete(user.id).await.unwrap();

        assert!(matches!(svc.get_by_id(user.id).await, Err(UserError::UserNotFound)));
        assert!(matches!(
            svc.login(login_req("jo@x.com", "secret1")).await,
            Err(UserError::InvalidCredentials)
        ));
        let (page, total) = svc.get_all(1, 10).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
        assert!(matches!(svc.delete(user.id).await, Err(UserError::UserNotFound)));
        assert_eq!(repo.stored_rows(), 1);

        // the email is free again
        svc.register(register_req("Jo Again", "jo@x.com", "secret1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn pagination_windows_and_total() {
        let (svc, repo) = service();
        for i in 0..25 {
            repo.create(NewUser {
                name: format!("User {i}"),
                email: format!("user{i}@x.com"),
                password_hash: "$argon2id$fake".into(),
            })
            .await
            .unwrap();
        }

        let (page2, total) = svc.get_all(2, 10).await.unwrap();
        assert_eq!(page2.len(), 10);
        assert_eq!(total, 25);
        assert_eq!(page2[0].email, "user10@x.com");

        let (page3, total) = svc.get_all(3, 10).await.unwrap();
        assert_eq!(page3.len(), 5);
        assert_eq!(total, 25);

        let (page4, _) = svc.get_all(4, 10).await.unwrap();
        assert!(page4.is_empty());
    }

    #[tokio::test]
    async fn update_with_empty_email_keeps_it() {
        let (svc, _) = service();
        let user = svc
            .register(register_req("Jo", "jo@x.com", "secret1"))
            .await
            .unwrap();

        let updated = svc
            .update(
                user.id,
                UpdateUserRequest {
                    name: Some("Joanna".into()),
                    email: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Joanna");
        assert_eq!(updated.email, "jo@x.com");
    }

    #[tokio::test]
    async fn update_to_taken_email_leaves_record_untouched() {
        let (svc, _) = service();
        let jo = svc
            .register(register_req("Jo", "jo@x.com", "secret1"))
            .await
            .unwrap();
        svc.register(register_req("Al", "al@x.com", "secret1"))
            .await
            .unwrap();

        let err = svc
            .update(
                jo.id,
                UpdateUserRequest {
                    name: Some("Changed".into()),
                    email: Some("al@x.com".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailAlreadyExists));

        let unchanged = svc.get_by_id(jo.id).await.unwrap();
        assert_eq!(unchanged.name, "Jo");
        assert_eq!(unchanged.email, "jo@x.com");
    }

    #[tokio::test]
    async fn update_missing_user() {
        let (svc, _) = service();
        let err = svc
            .update(99, UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::UserNotFound));
    }

    /// Email lookups always miss, as when another writer inserts the same
    /// email between the service's check and its write.
    struct RacingEmailLookups(Arc<InMemoryUserRepository>);

    #[async_trait::async_trait]
    impl UserRepository for RacingEmailLookups {
        async fn create(&self, user: NewUser) -> Result<User, RepoError> {
            self.0.create(user).await
        }
        async fn find_by_id(&self, id: i64) -> Result<User, RepoError> {
            self.0.find_by_id(id).await
        }
        async fn find_by_email(&self, _email: &str) -> Result<User, RepoError> {
            Err(RepoError::NotFound)
        }
        async fn find_all(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), RepoError> {
            self.0.find_all(page, limit).await
        }
        async fn update(&self, user: &User) -> Result<User, RepoError> {
            self.0.update(user).await
        }
        async fn delete(&self, id: i64) -> Result<(), RepoError> {
            self.0.delete(id).await
        }
    }

    #[tokio::test]
    async fn store_level_duplicate_maps_to_email_exists() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let hasher = PasswordHasher::new(&cheap_hashing()).unwrap();
        let svc = UserService::new(Arc::new(RacingEmailLookups(repo.clone())), hasher);

        svc.register(register_req("Jo", "jo@x.com", "secret1"))
            .await
            .unwrap();
        let err = svc
            .register(register_req("Late", "jo@x.com", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailAlreadyExists));
        assert_eq!(repo.stored_rows(), 1);

        let al = svc
            .register(register_req("Al", "al@x.com", "secret1"))
            .await
            .unwrap();
        let err = svc
            .update(
                al.id,
                UpdateUserRequest {
                    name: Some("Changed".into()),
                    email: Some("jo@x.com".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailAlreadyExists));

        let unchanged = svc.get_by_id(al.id).await.unwrap();
        assert_eq!(unchanged.name, "Al");
        assert_eq!(unchanged.email, "al@x.com");
        assert_eq!(repo.stored_rows(), 2);
    }
}

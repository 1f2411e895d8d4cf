use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::User;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(format!(
            "name must be between {} and {} characters",
            NAME_MIN_CHARS, NAME_MAX_CHARS
        ));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), String> {
    if !is_valid_email(email) {
        return Err("email must be a valid email address".into());
    }
    Ok(())
}

/// Request body for user registration.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl CreateUserRequest {
    /// Canonicalizes the email and checks field constraints.
    pub fn validate(&mut self) -> Result<(), String> {
        self.email = normalize_email(&self.email);
        check_name(&self.name)?;
        check_email(&self.email)?;
        if self.password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(format!(
                "password must be at least {} characters",
                PASSWORD_MIN_CHARS
            ));
        }
        Ok(())
    }
}

/// Partial update; a missing, null or empty field leaves the stored value as
/// is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&mut self) -> Result<(), String> {
        if let Some(email) = self.email.as_mut() {
            *email = normalize_email(email);
        }
        if let Some(name) = self.new_name() {
            check_name(name)?;
        }
        if let Some(email) = self.new_email() {
            check_email(email)?;
        }
        Ok(())
    }

    /// New name, if one was actually supplied.
    pub fn new_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// New (normalized) email, if one was actually supplied.
    pub fn new_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

/// Request body for login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&mut self) -> Result<(), String> {
        self.email = normalize_email(&self.email);
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err("password is required".into());
        }
        Ok(())
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        Self {
            data,
            total,
            page,
            limit,
            total_pages: total_pages(total, limit),
        }
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw query string; values are parsed leniently by [`ListQuery::resolve`].
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    /// Page falls back to 1 when missing, unparsable or below 1. Limit falls
    /// back to the default (not the nearest bound) outside `1..=100`.
    pub fn resolve(&self) -> (i64, i64) {
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PAGE);
        let limit = self
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| (1..=MAX_LIMIT).contains(l))
            .unwrap_or(DEFAULT_LIMIT);
        (page, limit)
    }
}

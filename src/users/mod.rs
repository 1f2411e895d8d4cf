use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo::{PgUserRepository, UserRepository};
pub use services::UserService;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}

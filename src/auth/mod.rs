pub mod claims;
pub mod jwt;
pub mod password;

pub use jwt::JwtKeys;
pub use password::{PasswordError, PasswordHasher};

pub mod jwt;
pub mod middleware;
pub mod models;

#[cfg(test)]
mod tests;

pub use jwt::JwtManager;
pub use middleware::{extract_bearer_token, require_admin, require_auth};
pub use models::{AuthUser, Claims};

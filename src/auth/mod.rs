//! Authentication and authorization module

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod secret;

pub use jwt::{Claims, IssuedToken, TokenError, TokenService};
pub use middleware::{authenticate, extract_token, jwt_auth_middleware, AuthContext};
pub use password::PasswordHasher;
pub use secret::SecretGenerator;

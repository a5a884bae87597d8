//! Authentication: argon2 password hashing, stateless JWT sessions and the
//! request middleware that resolves a Bearer token into an
//! [`AuthenticatedUser`].

pub mod middleware;
pub mod service;

pub use middleware::auth_middleware;
pub use service::{AuthError, AuthService, AuthenticatedUser, Claims, NewUser};

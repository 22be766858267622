//! Auth: token claims, roles, JWT validation.

pub mod claims;
pub mod jwt;
pub mod roles;

pub use claims::JwtClaims;
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError};
pub use roles::Role;

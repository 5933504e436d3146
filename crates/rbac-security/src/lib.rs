//! # RBAC Security
//! 
//! Security utilities: password hashing, bearer token validation, and the
//! casbin-backed authorization engine.

pub mod jwt;
pub mod password;
pub mod enforcer;

pub use jwt::{Claims, JwtError, JwtService};
pub use password::PasswordService;
pub use enforcer::{CasbinEnforcer, EnforcerError, PolicyEnforcer};

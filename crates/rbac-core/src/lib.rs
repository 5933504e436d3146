//! # RBAC Core
//! 
//! Domain entities, the level-code allocator, repository traits (ports), and
//! the services that keep the menu tree and the authorization engine consistent.

pub mod domain;
pub mod level_code;
pub mod services;
pub mod repositories;
pub mod error;

// Re-export domain entities
pub use domain::*;
pub use error::{DomainError, ErrorKind};

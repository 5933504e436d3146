//! # RBAC Infrastructure
//! 
//! Repository implementations (adapters): PostgreSQL for production and an
//! in-memory set for tests and the `memory` driver.

pub mod database;
pub mod memory;

pub use database::{create_pool, run_migrations, PgMenuRepository, PgRoleRepository, PgUserRepository};
pub use memory::{InMemoryMenuRepository, InMemoryRoleRepository, InMemoryUserRepository, MemoryStore};

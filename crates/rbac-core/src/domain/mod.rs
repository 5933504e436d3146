//! # RBAC Core - Domain Module
//! 
//! Domain entities for the RBAC admin backend.

pub mod status;
pub mod menu;
pub mod user;
pub mod role;

// Re-export all entities and enums
pub use status::RecordStatus;
pub use menu::{build_tree, Menu, MenuInput, MenuQuery, MenuSelectQuery, MenuTreeNode, MenuType};
pub use user::{User, UserInput, UserQuery, UserRole, UserRoleQuery, UserSummary};
pub use role::{Role, RoleInput, RoleQuery};

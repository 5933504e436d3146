//! Application services

pub mod policy_service;
pub mod menu_service;
pub mod user_service;
pub mod role_service;

pub use policy_service::PolicySynchronizer;
pub use menu_service::MenuService;
pub use user_service::UserService;
pub use role_service::RoleService;

//! Repository traits (ports)

pub mod menu_repository;
pub mod user_repository;
pub mod role_repository;

pub use menu_repository::MenuRepository;
pub use user_repository::UserRepository;
pub use role_repository::RoleRepository;

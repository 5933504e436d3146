//! # RBAC API
//! 
//! HTTP handlers, the authorization middleware, and the router that exposes
//! the menu, user and role services under `/api/v1`.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;

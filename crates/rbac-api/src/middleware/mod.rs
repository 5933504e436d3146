pub mod authz;

pub use authz::authorize;

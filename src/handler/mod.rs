//! Request handler module
//!
//! The [`Router`] dispatches each request either to the validation
//! endpoint or to the static file service.

pub mod router;
pub mod static_files;
pub mod validate;

// Re-export main entry point
pub use router::{handle_request, Endpoint, RequestContext, Router};
pub use static_files::StaticRoot;

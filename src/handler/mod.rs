//! Request handler module
//!
//! Responsible for request routing dispatch and the employee and upload
//! endpoints behind it.

pub mod employees;
pub mod router;
pub mod upload;

// Re-export main entry point
pub use router::handle_request;

//! HTTP protocol layer module
//!
//! Response construction decoupled from the query handlers.

pub mod response;

// Re-export commonly used types
pub use response::{
    apply_common_headers, build_error_response, build_json_response, build_options_response,
    build_text_response,
};

//! Routing module
//!
//! Maps a request method and path to an endpoint:
//! - Exact and prefix path matching against a static route table
//! - Segment-count validation and typed conversion of path parameters

mod params;
mod table;

pub use params::PathParams;
pub use table::{resolve, Endpoint};

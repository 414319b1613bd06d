//! HTTP protocol layer module
//!
//! Body buffering and decoding, CORS policy, and response builders shared by
//! the router and the CMS handlers.

pub mod body;
pub mod cors;
pub mod response;

// Re-export commonly used types
pub use body::{GatewayBody, ParsedBody};
pub use cors::build_cors_layer;
pub use response::{build_404_response, build_503_response, error_response, json_response};

//! HTTP gateway in front of a Keystatic CMS API.
//!
//! Serves `/health` and `/`, applies the CORS policy, parses request bodies
//! and hands everything under the CMS mount (`/api/keystatic` by default)
//! to a [`cms::CmsHandler`].

pub mod cms;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use error::{GatewayError, GatewayResult};

//! Upstream collaborator implementations.

pub mod http;

pub use http::{HttpUpstream, HttpUpstreamConfig};

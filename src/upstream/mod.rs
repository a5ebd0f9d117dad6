//! Upstream access: HTTP client seam and payload validation

pub mod client;
pub mod validator;

pub use client::{HttpUpstreamClient, UpstreamClient};

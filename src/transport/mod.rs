//! Outbound HTTP to provider backends.

pub mod http;

pub use http::{HttpReply, HttpTransport};

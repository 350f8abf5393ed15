//! HTTP 미들웨어.

pub mod ip_filter;

pub use ip_filter::{ip_allowlist_middleware, IpAllowlist};

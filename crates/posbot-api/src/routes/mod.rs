//! HTTP 라우트.

pub mod webhook;

pub use webhook::webhook_router;

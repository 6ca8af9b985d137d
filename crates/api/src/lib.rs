//! HTTP API: configuration, authentication gate, role guards and routes.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;

//! HTTP server hosting a hookql schema.
//!
//! Loads `hookql.toml`, sets up tracing, optionally registers the demo
//! content model and serves `POST/GET /graphql` plus health endpoints.

pub mod config;
pub mod content;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use server::{HookqlServer, ServerBuilder, build_app};

//! HTTP adapter for the recap engine.
//!
//! Thin plumbing only: routing, request validation, webhook signature
//! verification, health reporting, and static serving of generated media.
//! All recap semantics live in [`recap_engine`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod webhook;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

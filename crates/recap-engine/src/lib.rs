//! Recap generation engine.
//!
//! The core of the recap service:
//! - [`store`]: process-scoped session/clip registry
//! - [`selector`]: which clips enter a recap
//! - [`manifest`]: time-budget split and manifest construction
//! - [`coordinator`]: cache + single-flight generation lifecycle
//! - [`sweeper`]: background retention of generated artifacts
//!
//! The engine consumes the [`recap_media`] seams ([`RecapEncoder`],
//! [`ClipMediaSource`]) and never talks to ffmpeg directly.
//!
//! [`RecapEncoder`]: recap_media::RecapEncoder
//! [`ClipMediaSource`]: recap_media::ClipMediaSource

pub mod config;
pub mod coordinator;
pub mod error;
pub mod manifest;
pub mod selector;
pub mod store;
pub mod sweeper;

pub use config::EngineConfig;
pub use coordinator::{GenerationCoordinator, RecapResponse};
pub use error::{EngineError, EngineResult};
pub use store::RecapStore;
pub use sweeper::RetentionSweeper;

//! FFmpeg process layer for the recap service.
//!
//! This crate wraps the external `ffmpeg` binary behind three seams:
//! - [`command`]: a builder/runner for ffmpeg invocations
//! - [`source`]: the pluggable [`ClipMediaSource`] contract plus the
//!   shipped placeholder synthesizer
//! - [`encoder`]: the concat-demuxer recap encoder

pub mod command;
pub mod encoder;
pub mod error;
pub mod manifest;
pub mod source;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use encoder::{EncodedOutput, FfmpegRecapEncoder, RecapEncoder};
pub use error::{MediaError, MediaResult};
pub use source::{ClipMediaSource, PlaceholderMediaSource};

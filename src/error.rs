//! Crate-wide error type.

use std::io;

/// Errors surfaced by `touchlink`.
///
/// Device loss is *not* an error here: the poller recognizes it and falls back
/// to rescanning. Everything that reaches the caller is either fatal for the
/// polling thread or a configuration/persistence problem.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization failed: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("invalid settings json: {0}")]
    Json(#[from] serde_json::Error),

    /// The receiving side of the sample channel has gone away.
    #[error("sample channel closed")]
    ChannelClosed,

    /// A wire frame (sample or CRSF) failed validation.
    #[error("malformed frame: {0}")]
    Frame(&'static str),

    #[error("no touch device available")]
    NoDevice,

    /// The polling thread panicked instead of returning.
    #[error("touch poller thread panicked")]
    PollerPanicked,
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the road-index core engine.

use thiserror::Error;

/// Errors surfaced by the chunk codec, cache, and controller.
///
/// Matcher and predictor are pure functions that express "no result"
/// instead of erroring; only codec and I/O failures propagate.
#[derive(Debug, Error)]
pub enum Error {
    /// Container or payload framing is truncated, carries the wrong magic,
    /// or references an out-of-range internal index.
    #[error("invalid chunk header: {0}")]
    InvalidHeader(String),

    /// Unknown container/payload version or unrecognized compression code.
    #[error("unsupported chunk version or compression: {0}")]
    UnsupportedVersion(String),

    /// The decompressor reported 0 bytes, or the output length disagreed
    /// with the container's declared `uncompSize`.
    #[error("chunk decompression failed: {0}")]
    DecompressionFailed(String),

    /// The external fetcher returned a transport or status error.
    #[error("chunk fetch failed: {0}")]
    FetchFailed(String),

    /// A filesystem error from the chunk cache.
    #[error("cache I/O failed: {0}")]
    IOFailed(#[from] std::io::Error),

    /// The cache manifest could not be parsed or serialized.
    #[error("cache manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

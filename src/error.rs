use std::fmt;

/// Errors surfaced by the playback engine.
///
/// Only resource initialization can fail: bad note names and chord types
/// degrade to documented defaults with a diagnostic instead of constructing
/// an error value, and runtime stop races are absorbed internally.
#[derive(Debug)]
pub enum EngineError {
    /// The audio output context could not be established.
    ContextUnavailable { detail: String },
    /// The sample asset could not be read.
    AssetIo { asset: String, detail: String },
    /// The sample asset was read but could not be decoded to PCM.
    AssetDecode { asset: String, detail: String },
    /// The asset source needs the `assets` feature to be decoded.
    UnsupportedSource { asset: String, detail: String },
    /// The engine previously failed to initialize; the failure is terminal.
    Unavailable,
    /// A playback operation was attempted with no sample loaded.
    SampleMissing,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ContextUnavailable { detail } => {
                write!(f, "Audio context unavailable: {detail}")
            }
            EngineError::AssetIo { asset, detail } => {
                write!(f, "Failed to read sample asset '{asset}': {detail}")
            }
            EngineError::AssetDecode { asset, detail } => {
                write!(f, "Failed to decode sample asset '{asset}': {detail}")
            }
            EngineError::UnsupportedSource { asset, detail } => {
                write!(f, "Unsupported source for sample asset '{asset}': {detail}")
            }
            EngineError::Unavailable => write!(f, "Instrument unavailable"),
            EngineError::SampleMissing => write!(f, "No sample loaded"),
        }
    }
}

impl std::error::Error for EngineError {}

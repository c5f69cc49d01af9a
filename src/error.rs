//! Error types for the bridge
//!
//! `BridgeError` is only used for failures on the host side of the boundary:
//! precondition violations, malformed script output and runtime lifecycle
//! problems. Failures reported by the embedded script travel inside an
//! [`Outcome`](crate::Outcome) instead.

use thiserror::Error;

/// Errors raised by a concrete script engine implementation
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised by the session facade and the runtime adapter
#[derive(Debug, Error)]
pub enum BridgeError {
    /// An operation was attempted before the session received its ready signal
    #[error(
        "Blockstack session hasn't finished loading. Please wait until the ready callback has fired before performing operations"
    )]
    NotInitialized,

    /// The runtime adapter was asked to evaluate before the bootstrap page loaded
    #[error("script runtime is not ready")]
    NotReady,

    /// Content handed over from dynamic data was neither text nor bytes
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The script returned text that is not the JSON we expected
    #[error("malformed script result: {0}")]
    Parse(#[from] serde_json::Error),

    /// A binary payload was not valid base64
    #[error("invalid base64 payload: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// A cipher object is missing the metadata needed to decrypt it
    #[error("invalid cipher object: {0}")]
    InvalidCipher(String),

    /// The runtime thread has stopped and accepts no more work
    #[error("script runtime has shut down")]
    RuntimeClosed,

    /// The engine failed to start, load or evaluate
    #[error("script engine error: {0}")]
    Engine(#[from] EngineError),

    /// A host function name was registered twice
    #[error("host function `{0}` is already registered")]
    DuplicateHostFunction(String),

    /// Invalid configuration values
    #[error("configuration error: {0}")]
    Configuration(String),
}

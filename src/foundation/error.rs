/// Convenience result type used across framecast.
pub type FramecastResult<T> = Result<T, FramecastError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum FramecastError {
    /// Invalid user-provided timeline, canvas or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A source file is missing or could not be opened.
    #[error("not found: {0}")]
    NotFound(String),

    /// A source opened fine but a frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Failure while serializing a canvas into compressed bytes.
    #[error("encode error: {0}")]
    Encode(String),

    /// Malformed or unknown viewer command.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramecastError {
    /// Build a [`FramecastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FramecastError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`FramecastError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`FramecastError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`FramecastError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

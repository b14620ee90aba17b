/// Convenience result type used across pixelwall.
pub type PixelwallResult<T> = Result<T, PixelwallError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum PixelwallError {
    /// Invalid command arguments, palette or map size.
    #[error("validation error: {0}")]
    Validation(String),

    /// The consumer broke the command protocol (bad pixel index, mismatched rewind).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The command is not legal in the current engine state.
    #[error("state error: {0}")]
    State(String),

    /// Snapshot image could not be loaded or decoded.
    #[error("asset error: {0}")]
    Asset(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PixelwallError {
    /// Build a [`PixelwallError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PixelwallError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`PixelwallError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Build a [`PixelwallError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

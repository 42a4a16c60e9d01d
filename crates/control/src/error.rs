//! Error types for the control channel.

use thiserror::Error;

/// Errors raised while decoding or applying control events.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A frame could not be encoded or decoded.
    #[error("control frame codec error: {0}")]
    Codec(#[from] bincode::Error),
    /// The locator rejected an update.
    #[error(transparent)]
    Locator(#[from] corelib::Error),
}

impl ControlError {
    /// True when the locator can no longer be trusted and the loop must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            ControlError::Codec(_) => false,
            ControlError::Locator(e) => e.is_fatal(),
        }
    }
}

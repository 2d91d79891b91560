use thiserror::Error;

/// Opaque failure reported by a playback engine (network, decoder, permission).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        EngineError(message.into())
    }
}

#[derive(Error, Debug)]
pub enum PlayerError {
    // Rejeté avant tout appel au moteur
    #[error("No usable transport URL: {0}")]
    InvalidSource(String),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("No playback engine attached")]
    Detached,
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
}

impl PlayerError {
    pub fn is_invalid_source(&self) -> bool {
        matches!(self, PlayerError::InvalidSource(_))
    }
}

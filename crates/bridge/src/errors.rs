use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Model information is required")]
    MissingModel,

    #[error("Either prompt or messages is required")]
    MissingPrompt,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Event loop reached maximum iteration count ({0}).")]
    IterationLimitExceeded(usize),

    #[error("Agent engine failed: {0}")]
    Engine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Whether this error should be reported synchronously instead of inside the event stream
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BridgeError::MissingModel | BridgeError::MissingPrompt | BridgeError::InvalidRequest(_)
        )
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

use duosweep_core::BoardError;
use thiserror::Error;

/// Everything a client request can fail with. `Display` is the text sent back in
/// `error { message }`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{0}")]
    Validation(BoardError),
    #[error("Game not found")]
    NotFound,
    #[error("Game is full")]
    GameFull,
    #[error("Not in a game")]
    NotBound,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Invalid cell coordinates")]
    InvalidCell,
    #[error("{0}")]
    CellUnavailable(&'static str),
    #[error("Game is not in play")]
    GameOver,
    #[error("Invalid message: {0}")]
    BadMessage(String),
    /// The board could not keep the first move safe. Creation-time validation should make
    /// this unreachable.
    #[error("Internal error: {0}")]
    InvariantViolation(BoardError),
}

pub type Result<T> = core::result::Result<T, SessionError>;

use thiserror::Error;

use crate::{CellCount, Coord};

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Invalid cell coordinates")]
    InvalidCoords,
    #[error("Custom difficulty requires rows, cols, and mines parameters")]
    MissingDimensions,
    #[error("Rows must be between 5 and 50")]
    InvalidRows,
    #[error("Columns must be between 5 and 50")]
    InvalidCols,
    #[error("Mines must be at least 1")]
    TooFewMines,
    #[error("Too many mines! Maximum is {max} for a {rows}x{cols} board")]
    TooManyMines {
        max: CellCount,
        rows: Coord,
        cols: Coord,
    },
    #[error("Not enough free cells to keep the first move safe")]
    InvariantViolation,
}

pub type Result<T> = core::result::Result<T, BoardError>;

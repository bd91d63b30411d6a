#![no_std]

extern crate alloc;

use core::ops::RangeInclusive;
use serde::{Deserialize, Serialize};

pub use board::*;
pub use cell::*;
pub use error::*;
pub use generator::*;
pub use types::*;

mod board;
mod cell;
mod error;
mod generator;
mod types;

/// Allowed board height and width for every difficulty.
pub const SIDE_RANGE: RangeInclusive<Coord> = 5..=50;

/// Cells kept mine-free around the first move: the clicked cell and its 8 neighbours.
pub const SAFE_ZONE: CellCount = 9;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Custom,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
}

impl BoardConfig {
    pub const fn new_unchecked(rows: Coord, cols: Coord, mines: CellCount) -> Self {
        Self { rows, cols, mines }
    }

    pub const fn easy() -> Self {
        Self::new_unchecked(9, 9, 10)
    }

    pub const fn medium() -> Self {
        Self::new_unchecked(16, 16, 40)
    }

    pub const fn hard() -> Self {
        Self::new_unchecked(16, 30, 99)
    }

    /// Builds a validated custom configuration from untrusted input.
    pub fn custom(rows: u32, cols: u32, mines: u32) -> Result<Self> {
        let rows = Coord::try_from(rows)
            .ok()
            .filter(|rows| SIDE_RANGE.contains(rows))
            .ok_or(BoardError::InvalidRows)?;
        let cols = Coord::try_from(cols)
            .ok()
            .filter(|cols| SIDE_RANGE.contains(cols))
            .ok_or(BoardError::InvalidCols)?;
        let max = Self::max_mines(rows, cols);
        let mines = CellCount::try_from(mines).unwrap_or(CellCount::MAX);
        if mines < 1 {
            return Err(BoardError::TooFewMines);
        }
        if mines > max {
            return Err(BoardError::TooManyMines { max, rows, cols });
        }
        Ok(Self::new_unchecked(rows, cols, mines))
    }

    /// Resolves a difficulty to a configuration. Only `Custom` reads the explicit dimensions.
    pub fn for_difficulty(
        difficulty: Difficulty,
        rows: Option<u32>,
        cols: Option<u32>,
        mines: Option<u32>,
    ) -> Result<Self> {
        match difficulty {
            Difficulty::Easy => Ok(Self::easy()),
            Difficulty::Medium => Ok(Self::medium()),
            Difficulty::Hard => Ok(Self::hard()),
            Difficulty::Custom => match (rows, cols, mines) {
                (Some(rows), Some(cols), Some(mines)) => Self::custom(rows, cols, mines),
                _ => Err(BoardError::MissingDimensions),
            },
        }
    }

    pub const fn max_mines(rows: Coord, cols: Coord) -> CellCount {
        mult(rows, cols).saturating_sub(SAFE_ZONE)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.rows, self.cols)
    }

    pub const fn size(&self) -> Coord2 {
        (self.rows, self.cols)
    }

    pub fn validate(&self) -> Result<()> {
        Self::custom(self.rows.into(), self.cols.into(), self.mines.into()).map(|_| ())
    }
}

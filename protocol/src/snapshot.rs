use std::collections::BTreeMap;

use duosweep_core::{Cell, CellContent, CellState, Coord, Difficulty, OpenedCell};
use serde::{Deserialize, Serialize};

use crate::*;

/// What a client may see of a single cell. Hidden cells carry no value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CellView {
    Hidden,
    Flagged,
    Revealed { value: u8 },
    Mine,
}

impl From<Cell> for CellView {
    fn from(cell: Cell) -> Self {
        match (cell.state, cell.content()) {
            (CellState::Hidden, _) => Self::Hidden,
            (CellState::Flagged, _) => Self::Flagged,
            (CellState::Revealed, CellContent::Number(value)) => Self::Revealed { value },
            (CellState::Revealed, CellContent::Mine) => Self::Mine,
        }
    }
}

/// A cell opened by one action, sent so clients can animate the click or explosion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchedCell {
    pub row: Coord,
    pub col: Coord,
    pub value: u8,
    pub mine: bool,
}

impl From<OpenedCell> for TouchedCell {
    fn from(cell: OpenedCell) -> Self {
        let (row, col) = cell.coords;
        let (value, mine) = match cell.content {
            CellContent::Number(value) => (value, false),
            CellContent::Mine => (0, true),
        };
        Self {
            row,
            col,
            value,
            mine,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub name: String,
    pub connected: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub cells_revealed: u32,
    pub mines_hit: u32,
    pub mines_flagged: u32,
    /// Accumulated seconds spent holding the turn while connected.
    pub time_played: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineHit {
    pub row: Coord,
    pub col: Coord,
    pub player_id: Slot,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: Coord,
    pub col: Coord,
}

/// Complete client-visible state of one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: String,
    pub rows: Coord,
    pub cols: Coord,
    pub difficulty: Difficulty,
    pub mode: GameMode,
    pub board: Vec<Vec<CellView>>,
    pub status: GameStatus,
    pub current_player: Option<Slot>,
    pub players: BTreeMap<Slot, PlayerInfo>,
    pub flagged_count: u16,
    pub mine_count: u16,
    pub revealed_count: u16,
    pub player_stats: BTreeMap<Slot, PlayerStats>,
    pub mines_hit: Vec<MineHit>,
    /// Full mine layout, only filled once the game is over.
    pub mine_positions: Vec<Position>,
}

impl GameSnapshot {
    pub fn cell(&self, row: Coord, col: Coord) -> Option<CellView> {
        self.board.get(usize::from(row))?.get(usize::from(col)).copied()
    }

    pub fn player_names(&self) -> BTreeMap<Slot, String> {
        self.players
            .iter()
            .map(|(&slot, info)| (slot, info.name.clone()))
            .collect()
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::*;

/// Client to server messages on the live channel.
///
/// `gameId` on actions is informational, the connection's binding decides the game.
/// Coordinates are signed so that out-of-range input is reported as an invalid cell
/// rather than a decoding failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        game_id: String,
        #[serde(default)]
        player_name: Option<String>,
        /// Slot held before a reconnect.
        #[serde(default)]
        player_id: Option<Slot>,
    },
    Reveal {
        #[serde(default)]
        game_id: Option<String>,
        row: i64,
        col: i64,
    },
    Flag {
        #[serde(default)]
        game_id: Option<String>,
        row: i64,
        col: i64,
    },
    GetState {
        #[serde(default)]
        game_id: Option<String>,
    },
}

impl ClientMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// How an accepted action turned out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionOutcome {
    /// Safe reveal. `value` is the clicked cell's count, `cells` everything opened.
    Number {
        value: u8,
        cells_revealed: u32,
        cells: Vec<TouchedCell>,
    },
    Mine {
        game_over: bool,
        cells: Vec<TouchedCell>,
    },
    Win {
        cells_revealed: u32,
        cells: Vec<TouchedCell>,
    },
    Flagged,
    Unflagged,
}

impl ActionOutcome {
    pub fn cells(&self) -> &[TouchedCell] {
        match self {
            Self::Number { cells, .. } | Self::Mine { cells, .. } | Self::Win { cells, .. } => {
                cells
            }
            Self::Flagged | Self::Unflagged => &[],
        }
    }
}

/// Server to client messages on the live channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Joined {
        player_id: Slot,
        game_id: String,
        players: BTreeMap<Slot, String>,
        game_state: GameSnapshot,
    },
    PlayerJoined {
        player_id: Slot,
        player_name: String,
        players: BTreeMap<Slot, String>,
        game_state: GameSnapshot,
    },
    ActionResult {
        action: ActionKind,
        row: u8,
        col: u8,
        result: ActionOutcome,
        current_player: Option<Slot>,
        player_id: Slot,
        player_stats: BTreeMap<Slot, PlayerStats>,
        game_state: GameSnapshot,
    },
    GameOver {
        won: bool,
        reason: String,
    },
    GameState {
        game_state: GameSnapshot,
    },
    PlayerDisconnected {
        player_id: Slot,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl ToString) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "joined",
            Self::PlayerJoined { .. } => "playerJoined",
            Self::ActionResult { .. } => "actionResult",
            Self::GameOver { .. } => "gameOver",
            Self::GameState { .. } => "gameState",
            Self::PlayerDisconnected { .. } => "playerDisconnected",
            Self::Error { .. } => "error",
        }
    }
}

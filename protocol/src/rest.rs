use std::collections::BTreeMap;

use duosweep_core::{BoardConfig, Difficulty};
use serde::{Deserialize, Serialize};

use crate::*;

/// Query parameters of `POST /api/create-game`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameParams {
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, alias = "game_mode")]
    pub mode: GameMode,
    pub rows: Option<u32>,
    pub cols: Option<u32>,
    pub mines: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGame {
    pub game_id: String,
    pub difficulty: Difficulty,
    pub mode: GameMode,
    pub config: BoardConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub game_id: String,
    pub players: BTreeMap<Slot, String>,
    pub status: GameStatus,
    pub current_player: Option<Slot>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatusInfo {
    pub exists: bool,
    #[serde(default)]
    pub players_count: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
}

impl GameStatusInfo {
    pub const fn missing() -> Self {
        Self {
            exists: false,
            players_count: 0,
            status: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_params_default_to_medium_classic() {
        let params: CreateGameParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.difficulty, Difficulty::Medium);
        assert_eq!(params.mode, GameMode::Classic);
    }

    #[test]
    fn missing_game_status_omits_status() {
        let value = serde_json::to_value(GameStatusInfo::missing()).unwrap();
        assert_eq!(value, json!({"exists": false, "playersCount": 0}));
    }
}

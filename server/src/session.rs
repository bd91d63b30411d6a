use std::collections::BTreeMap;
use std::time::Duration;

use duosweep_core::{Board, CellState, Coord2, Difficulty, FlagOutcome, RevealResult};
use duosweep_protocol::{
    ActionKind, ActionOutcome, CellView, GameMode, GameSnapshot, GameStatus, MineHit, PlayerInfo,
    PlayerStats, Position, Slot, TouchedCell,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use time::OffsetDateTime;
use web_time::Instant;

use crate::error::{Result, SessionError};

pub type GameId = String;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Seat {
    name: String,
    connected: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct SeatStats {
    cells_revealed: u32,
    mines_hit: u32,
    mines_flagged: u32,
    time_played: Duration,
}

impl SeatStats {
    fn to_wire(self) -> PlayerStats {
        PlayerStats {
            cells_revealed: self.cells_revealed,
            mines_hit: self.mines_hit,
            mines_flagged: self.mines_flagged,
            time_played: self.time_played.as_secs_f64(),
        }
    }
}

/// Why a game ended, as reported in `gameOver`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameOver {
    pub won: bool,
    pub reason: &'static str,
}

/// Result of one accepted action.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionResult {
    pub action: ActionKind,
    pub coords: Coord2,
    pub slot: Slot,
    pub outcome: ActionOutcome,
    pub game_over: Option<GameOver>,
}

/// How a connection came to hold a slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Seating {
    Joined(Slot),
    Reattached(Slot),
    /// The slot was still live and now belongs to the new connection.
    TakenOver(Slot),
}

impl Seating {
    pub const fn slot(self) -> Slot {
        match self {
            Self::Joined(slot) | Self::Reattached(slot) | Self::TakenOver(slot) => slot,
        }
    }
}

/// One two-player game: the board plus players, turn order and statistics.
///
/// All mutation goes through [`GameSession::act`] and the seat bookkeeping methods.
/// Nothing here knows about connections, the coordinator only reports connectedness.
#[derive(Debug)]
pub struct GameSession {
    id: GameId,
    board: Board,
    difficulty: Difficulty,
    mode: GameMode,
    status: GameStatus,
    seats: [Option<Seat>; 2],
    stats: [SeatStats; 2],
    current_turn: Option<Slot>,
    /// Set while the turn holder is connected and the game is being played.
    turn_started_at: Option<Instant>,
    mines_hit: BTreeMap<Coord2, Slot>,
    /// Who placed each standing flag.
    flagged_by: BTreeMap<Coord2, Slot>,
    first_move_made: bool,
    rng: SmallRng,
    created_at: OffsetDateTime,
    last_activity: Instant,
}

impl GameSession {
    pub fn new(
        id: GameId,
        board: Board,
        difficulty: Difficulty,
        mode: GameMode,
        seed: u64,
        now: Instant,
    ) -> Self {
        Self {
            id,
            board,
            difficulty,
            mode,
            status: GameStatus::Waiting,
            seats: [None, None],
            stats: Default::default(),
            current_turn: None,
            turn_started_at: None,
            mines_hit: BTreeMap::new(),
            flagged_by: BTreeMap::new(),
            first_move_made: false,
            rng: SmallRng::seed_from_u64(seed),
            created_at: OffsetDateTime::now_utc(),
            last_activity: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn current_turn(&self) -> Option<Slot> {
        self.current_turn
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn first_move_made(&self) -> bool {
        self.first_move_made
    }

    pub fn players_count(&self) -> u8 {
        self.seats.iter().flatten().count() as u8
    }

    pub fn has_connected_players(&self) -> bool {
        self.seats.iter().flatten().any(|seat| seat.connected)
    }

    pub fn is_connected(&self, slot: Slot) -> bool {
        self.seat(slot).is_some_and(|seat| seat.connected)
    }

    pub fn player_name(&self, slot: Slot) -> Option<&str> {
        self.seat(slot).map(|seat| seat.name.as_str())
    }

    pub fn mines_hit(&self) -> &BTreeMap<Coord2, Slot> {
        &self.mines_hit
    }

    pub fn time_played(&self, slot: Slot) -> Duration {
        self.stats[slot.index()].time_played
    }

    fn seat(&self, slot: Slot) -> Option<&Seat> {
        self.seats[slot.index()].as_ref()
    }

    fn both_joined(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    /// Takes the next free slot, `player1` first.
    pub fn join(&mut self, name: Option<String>, now: Instant) -> Result<Slot> {
        let slot = Slot::ALL
            .into_iter()
            .find(|slot| self.seat(*slot).is_none())
            .ok_or(SessionError::GameFull)?;

        let name = name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| slot.default_name());
        self.seats[slot.index()] = Some(Seat {
            name,
            connected: true,
        });

        if self.current_turn.is_none() {
            self.current_turn = Some(Slot::Player1);
        }
        if self.both_joined() && self.status == GameStatus::Waiting {
            self.status = GameStatus::Playing;
            self.start_clock(now);
        }
        self.last_activity = now;
        Ok(slot)
    }

    /// Finds a held slot whose seat is `connected`, preferring the slot the client claims
    /// and falling back to a name match.
    fn claimed_slot(
        &self,
        hint: Option<Slot>,
        name: Option<&str>,
        connected: bool,
    ) -> Option<Slot> {
        let matches =
            |slot: Slot| self.seat(slot).is_some_and(|seat| seat.connected == connected);

        if let Some(slot) = hint.filter(|&slot| matches(slot)) {
            return Some(slot);
        }
        let name = name.map(str::trim).filter(|name| !name.is_empty())?;
        Slot::ALL
            .into_iter()
            .find(|&slot| matches(slot) && self.player_name(slot) == Some(name))
    }

    /// Finds a held slot that has lost its connection.
    pub fn detached_slot(&self, hint: Option<Slot>, name: Option<&str>) -> Option<Slot> {
        self.claimed_slot(hint, name, false)
    }

    /// Joins as a new player, or resumes a held slot when the hint or name matches one.
    ///
    /// Detached slots are preferred. A matching slot that still looks live is handed to
    /// the caller as [`Seating::TakenOver`], since its old connection may not have been
    /// noticed as gone yet.
    pub fn seat_player(
        &mut self,
        hint: Option<Slot>,
        name: Option<String>,
        now: Instant,
    ) -> Result<Seating> {
        if let Some(slot) = self.detached_slot(hint, name.as_deref()) {
            self.reattach(slot, now)?;
            return Ok(Seating::Reattached(slot));
        }
        if let Some(slot) = self.claimed_slot(hint, name.as_deref(), true) {
            self.last_activity = now;
            return Ok(Seating::TakenOver(slot));
        }
        self.join(name, now).map(Seating::Joined)
    }

    pub fn reattach(&mut self, slot: Slot, now: Instant) -> Result<()> {
        let seat = self.seats[slot.index()]
            .as_mut()
            .ok_or(SessionError::NotFound)?;
        seat.connected = true;
        if self.current_turn == Some(slot) && self.turn_started_at.is_none() {
            self.start_clock(now);
        }
        self.last_activity = now;
        Ok(())
    }

    /// Marks `slot` as not live. Its identity and statistics stay, and its turn clock
    /// pauses until it reattaches.
    pub fn disconnect(&mut self, slot: Slot, now: Instant) {
        if !self.is_connected(slot) {
            return;
        }
        if self.current_turn == Some(slot) {
            self.settle_clock(now);
        }
        if let Some(seat) = self.seats[slot.index()].as_mut() {
            seat.connected = false;
        }
        self.last_activity = now;
    }

    /// Banks the running turn time into the turn holder's statistics and stops the clock.
    fn settle_clock(&mut self, now: Instant) {
        if let (Some(slot), Some(started)) = (self.current_turn, self.turn_started_at.take()) {
            self.stats[slot.index()].time_played += now.saturating_duration_since(started);
        }
    }

    fn start_clock(&mut self, now: Instant) {
        let running = self.status == GameStatus::Playing
            && self.current_turn.is_some_and(|slot| self.is_connected(slot));
        self.turn_started_at = running.then_some(now);
    }

    /// The single entry point for board mutations.
    pub fn act(
        &mut self,
        slot: Slot,
        action: ActionKind,
        coords: Coord2,
        now: Instant,
    ) -> Result<ActionResult> {
        if self.status.is_finished() {
            return Err(SessionError::GameOver);
        }
        if self.current_turn != Some(slot) {
            return Err(SessionError::NotYourTurn);
        }
        let cell = self
            .board
            .cell_at(coords)
            .ok_or(SessionError::InvalidCell)?;
        match (action, cell.state) {
            (ActionKind::Reveal, CellState::Revealed) => {
                return Err(SessionError::CellUnavailable("Cell already revealed"));
            }
            (ActionKind::Reveal, CellState::Flagged) => {
                return Err(SessionError::CellUnavailable("Cannot reveal flagged cell"));
            }
            (ActionKind::Flag, CellState::Revealed) => {
                return Err(SessionError::CellUnavailable("Cannot flag revealed cell"));
            }
            _ => {}
        }

        if action == ActionKind::Reveal && !self.first_move_made {
            let relocated = self
                .board
                .ensure_first_move_safe(coords, &mut self.rng)
                .map_err(SessionError::InvariantViolation)?;
            if relocated > 0 {
                self.recount_mines_flagged();
            }
            self.first_move_made = true;
        }

        self.settle_clock(now);
        let (outcome, game_over) = match action {
            ActionKind::Reveal => {
                let revealed = self.board.reveal(coords);
                self.record_reveal(slot, coords, revealed)
            }
            ActionKind::Flag => (self.record_flag(slot, coords), None),
        };

        if game_over.is_some() {
            log::info!(
                "Game {} finished with {:?} after {} {} at {:?}",
                self.id,
                self.status,
                slot,
                action,
                coords
            );
        } else if self.both_joined() {
            self.current_turn = Some(slot.other());
        }
        self.start_clock(now);
        self.last_activity = now;

        Ok(ActionResult {
            action,
            coords,
            slot,
            outcome,
            game_over,
        })
    }

    fn record_reveal(
        &mut self,
        slot: Slot,
        coords: Coord2,
        revealed: RevealResult,
    ) -> (ActionOutcome, Option<GameOver>) {
        let stats = &mut self.stats[slot.index()];
        let cells_revealed = revealed.safe_count() as u32;
        stats.cells_revealed += cells_revealed;
        let cells: Vec<TouchedCell> = revealed
            .cells_opened
            .iter()
            .copied()
            .map(TouchedCell::from)
            .collect();

        if revealed.mine_hit {
            stats.mines_hit += 1;
            self.mines_hit.insert(coords, slot);
            return match self.mode {
                GameMode::Classic => {
                    self.status = GameStatus::Lost;
                    let game_over = GameOver {
                        won: false,
                        reason: "mine",
                    };
                    (
                        ActionOutcome::Mine {
                            game_over: true,
                            cells,
                        },
                        Some(game_over),
                    )
                }
                GameMode::Survival => (
                    ActionOutcome::Mine {
                        game_over: false,
                        cells,
                    },
                    None,
                ),
            };
        }

        if self.board.is_won() {
            self.status = GameStatus::Won;
            let game_over = GameOver {
                won: true,
                reason: "win",
            };
            return (
                ActionOutcome::Win {
                    cells_revealed,
                    cells,
                },
                Some(game_over),
            );
        }

        let value = cells.first().map_or(0, |cell| cell.value);
        (
            ActionOutcome::Number {
                value,
                cells_revealed,
                cells,
            },
            None,
        )
    }

    fn record_flag(&mut self, slot: Slot, coords: Coord2) -> ActionOutcome {
        let outcome = self.board.toggle_flag(coords);
        let on_mine = self.board.contains_mine(coords);
        let stats = &mut self.stats[slot.index()];

        match outcome {
            FlagOutcome::Flagged => {
                if on_mine {
                    stats.mines_flagged += 1;
                }
                self.flagged_by.insert(coords, slot);
                ActionOutcome::Flagged
            }
            FlagOutcome::Unflagged | FlagOutcome::NoChange => {
                if on_mine {
                    stats.mines_flagged = stats.mines_flagged.saturating_sub(1);
                }
                self.flagged_by.remove(&coords);
                ActionOutcome::Unflagged
            }
        }
    }

    /// Rebuilds `mines_flagged` from the standing flags after mines have moved.
    fn recount_mines_flagged(&mut self) {
        for stats in &mut self.stats {
            stats.mines_flagged = 0;
        }
        for (&coords, &slot) in &self.flagged_by {
            if self.board.contains_mine(coords) {
                self.stats[slot.index()].mines_flagged += 1;
            }
        }
    }

    pub fn players(&self) -> BTreeMap<Slot, PlayerInfo> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| {
                self.seat(slot).map(|seat| {
                    let info = PlayerInfo {
                        name: seat.name.clone(),
                        connected: seat.connected,
                    };
                    (slot, info)
                })
            })
            .collect()
    }

    pub fn player_names(&self) -> BTreeMap<Slot, String> {
        self.players()
            .into_iter()
            .map(|(slot, info)| (slot, info.name))
            .collect()
    }

    pub fn player_stats(&self) -> BTreeMap<Slot, PlayerStats> {
        Slot::ALL
            .into_iter()
            .map(|slot| (slot, self.stats[slot.index()].to_wire()))
            .collect()
    }

    /// Client-visible state. The mine layout is only included once the game is over.
    pub fn snapshot(&self) -> GameSnapshot {
        let board: Vec<Vec<CellView>> = self
            .board
            .rows_iter()
            .map(|row| row.map(CellView::from).collect())
            .collect();
        let mines_hit: Vec<MineHit> = self
            .mines_hit
            .iter()
            .map(|(&(row, col), &player_id)| MineHit {
                row,
                col,
                player_id,
            })
            .collect();
        let mine_positions = if self.status.is_finished() {
            self.board
                .mine_positions()
                .into_iter()
                .map(|(row, col)| Position { row, col })
                .collect()
        } else {
            Vec::new()
        };

        GameSnapshot {
            game_id: self.id.clone(),
            rows: self.board.rows(),
            cols: self.board.cols(),
            difficulty: self.difficulty,
            mode: self.mode,
            board,
            status: self.status,
            current_player: self.current_turn,
            players: self.players(),
            flagged_count: self.board.flagged_count(),
            mine_count: self.board.mine_count(),
            revealed_count: self.board.revealed_count(),
            player_stats: self.player_stats(),
            mines_hit,
            mine_positions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(size: Coord2, mines: &[Coord2], mode: GameMode) -> (GameSession, Instant) {
        let now = Instant::now();
        let board = Board::from_mine_coords(size, mines).unwrap();
        let session = GameSession::new("g1".into(), board, Difficulty::Custom, mode, 9, now);
        (session, now)
    }

    fn two_players(size: Coord2, mines: &[Coord2]) -> (GameSession, Instant) {
        let (mut session, now) = session(size, mines, GameMode::Classic);
        assert_eq!(session.join(Some("Ada".into()), now), Ok(Slot::Player1));
        assert_eq!(session.join(Some("Bob".into()), now), Ok(Slot::Player2));
        (session, now)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn join_fills_slots_in_order_then_plays() {
        let (mut session, now) = session((5, 5), &[(4, 4)], GameMode::Classic);

        assert_eq!(session.join(None, now), Ok(Slot::Player1));
        assert_eq!(session.status(), GameStatus::Waiting);
        assert_eq!(session.current_turn(), Some(Slot::Player1));
        assert_eq!(session.player_name(Slot::Player1), Some("Player 1"));

        assert_eq!(session.join(Some("  ".into()), now), Ok(Slot::Player2));
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.player_name(Slot::Player2), Some("Player 2"));

        assert_eq!(session.join(Some("Eve".into()), now), Err(SessionError::GameFull));
        assert_eq!(session.players_count(), 2);
    }

    #[test]
    fn reveal_flood_fills_and_passes_turn() {
        let (mut session, now) = two_players((5, 5), &[(4, 4)]);
        // keep the game open past the first reveal
        session.board.toggle_flag((3, 4));

        let result = session
            .act(Slot::Player1, ActionKind::Reveal, (0, 0), now)
            .unwrap();

        let ActionOutcome::Number {
            value,
            cells_revealed,
            cells,
        } = &result.outcome
        else {
            panic!("expected a numbered reveal, got {:?}", result.outcome);
        };
        assert_eq!(*value, 0);
        assert!(*cells_revealed > 1);
        assert_eq!(cells.len() as u32, *cells_revealed);
        assert_eq!(result.game_over, None);
        assert_eq!(session.current_turn(), Some(Slot::Player2));
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(
            session.player_stats()[&Slot::Player1].cells_revealed,
            *cells_revealed
        );
    }

    #[test]
    fn mine_hit_loses_for_everyone() {
        let (mut session, now) = two_players((5, 5), &[(4, 4)]);
        session.board.toggle_flag((3, 4));
        session
            .act(Slot::Player1, ActionKind::Reveal, (0, 0), now)
            .unwrap();

        let result = session
            .act(Slot::Player2, ActionKind::Reveal, (4, 4), now)
            .unwrap();

        assert_eq!(
            result.game_over,
            Some(GameOver {
                won: false,
                reason: "mine"
            })
        );
        assert_eq!(session.status(), GameStatus::Lost);
        assert_eq!(session.mines_hit().get(&(4, 4)), Some(&Slot::Player2));
        assert_eq!(session.player_stats()[&Slot::Player2].mines_hit, 1);
        assert_eq!(
            session.act(Slot::Player1, ActionKind::Reveal, (3, 4), now),
            Err(SessionError::GameOver)
        );
        assert_eq!(
            session.act(Slot::Player2, ActionKind::Flag, (3, 4), now),
            Err(SessionError::GameOver)
        );

        let snapshot = session.snapshot();
        assert_eq!(snapshot.mine_positions, [Position { row: 4, col: 4 }]);
        assert_eq!(
            snapshot.mines_hit,
            [MineHit {
                row: 4,
                col: 4,
                player_id: Slot::Player2
            }]
        );
    }

    #[test]
    fn clearing_the_board_wins() {
        let (mut session, now) = two_players((5, 5), &[(4, 4)]);

        let result = session
            .act(Slot::Player1, ActionKind::Reveal, (0, 0), now)
            .unwrap();

        assert!(matches!(result.outcome, ActionOutcome::Win { cells_revealed: 24, .. }));
        assert_eq!(
            result.game_over,
            Some(GameOver {
                won: true,
                reason: "win"
            })
        );
        assert_eq!(session.status(), GameStatus::Won);
        assert_eq!(session.current_turn(), Some(Slot::Player1));
    }

    #[test]
    fn first_reveal_is_always_safe() {
        let (mut session, now) = two_players((5, 5), &[(0, 0)]);

        let result = session
            .act(Slot::Player1, ActionKind::Reveal, (0, 0), now)
            .unwrap();

        assert!(!matches!(result.outcome, ActionOutcome::Mine { .. }));
        assert!(session.first_move_made());
        assert_eq!(session.board().mine_count(), 1);
        for pos in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            assert!(!session.board().contains_mine(pos));
        }
    }

    #[test]
    fn turns_strictly_alternate() {
        let (mut session, now) = two_players((10, 10), &[(9, 9), (9, 8), (8, 9), (8, 8)]);
        let mut expected = Slot::Player1;

        for col in 0..6 {
            assert_eq!(session.current_turn(), Some(expected));
            session
                .act(expected, ActionKind::Flag, (9, col), now)
                .unwrap();
            expected = expected.other();
        }
        assert_eq!(session.current_turn(), Some(Slot::Player1));
    }

    #[test]
    fn wrong_player_and_bad_cells_are_rejected_without_mutation() {
        let (mut session, now) = two_players((5, 5), &[(4, 4)]);
        let before = session.snapshot();

        assert_eq!(
            session.act(Slot::Player2, ActionKind::Reveal, (0, 0), now),
            Err(SessionError::NotYourTurn)
        );
        assert_eq!(
            session.act(Slot::Player1, ActionKind::Reveal, (5, 0), now),
            Err(SessionError::InvalidCell)
        );
        assert_eq!(session.snapshot(), before);
        assert!(!session.first_move_made());
    }

    #[test]
    fn unavailable_cells_do_not_consume_the_turn() {
        let (mut session, now) = two_players((5, 5), &[(0, 4)]);
        session
            .act(Slot::Player1, ActionKind::Flag, (2, 2), now)
            .unwrap();
        session
            .act(Slot::Player2, ActionKind::Reveal, (4, 0), now)
            .unwrap();

        assert_eq!(
            session.act(Slot::Player1, ActionKind::Reveal, (2, 2), now),
            Err(SessionError::CellUnavailable("Cannot reveal flagged cell"))
        );
        assert_eq!(
            session.act(Slot::Player1, ActionKind::Reveal, (4, 0), now),
            Err(SessionError::CellUnavailable("Cell already revealed"))
        );
        assert_eq!(
            session.act(Slot::Player1, ActionKind::Flag, (4, 0), now),
            Err(SessionError::CellUnavailable("Cannot flag revealed cell"))
        );
        assert_eq!(session.current_turn(), Some(Slot::Player1));
    }

    #[test]
    fn flags_count_only_mines_for_stats() {
        let (mut session, now) = two_players((5, 5), &[(4, 4)]);

        assert_eq!(
            session
                .act(Slot::Player1, ActionKind::Flag, (4, 4), now)
                .unwrap()
                .outcome,
            ActionOutcome::Flagged
        );
        session
            .act(Slot::Player2, ActionKind::Flag, (0, 0), now)
            .unwrap();
        assert_eq!(session.snapshot().flagged_count, 2);
        assert_eq!(session.player_stats()[&Slot::Player1].mines_flagged, 1);
        assert_eq!(session.player_stats()[&Slot::Player2].mines_flagged, 0);

        assert_eq!(
            session
                .act(Slot::Player1, ActionKind::Flag, (4, 4), now)
                .unwrap()
                .outcome,
            ActionOutcome::Unflagged
        );
        assert_eq!(session.player_stats()[&Slot::Player1].mines_flagged, 0);
        assert_eq!(session.snapshot().flagged_count, 1);
    }

    #[test]
    fn relocated_mine_drops_its_flag_credit() {
        let (mut session, now) = two_players((5, 5), &[(1, 1)]);
        session
            .act(Slot::Player1, ActionKind::Flag, (1, 1), now)
            .unwrap();
        assert_eq!(session.player_stats()[&Slot::Player1].mines_flagged, 1);

        session
            .act(Slot::Player2, ActionKind::Reveal, (2, 2), now)
            .unwrap();
        assert!(!session.board().contains_mine((1, 1)));
        assert_eq!(session.player_stats()[&Slot::Player1].mines_flagged, 0);

        assert_eq!(
            session
                .act(Slot::Player1, ActionKind::Flag, (1, 1), now)
                .unwrap()
                .outcome,
            ActionOutcome::Unflagged
        );
        assert_eq!(session.player_stats()[&Slot::Player1].mines_flagged, 0);
        assert_eq!(session.snapshot().flagged_count, 0);
    }

    #[test]
    fn lone_player_may_act_and_keeps_the_turn() {
        let (mut session, now) = session((5, 5), &[(4, 4), (4, 3)], GameMode::Classic);
        session.join(Some("Ada".into()), now).unwrap();

        session
            .act(Slot::Player1, ActionKind::Flag, (0, 0), now)
            .unwrap();

        assert_eq!(session.status(), GameStatus::Waiting);
        assert_eq!(session.current_turn(), Some(Slot::Player1));
    }

    #[test]
    fn survival_mode_continues_after_mine() {
        let (mut session, now) =
            session((5, 5), &[(0, 4), (2, 4), (4, 4)], GameMode::Survival);
        session.join(None, now).unwrap();
        session.join(None, now).unwrap();
        session
            .act(Slot::Player1, ActionKind::Reveal, (4, 0), now)
            .unwrap();
        assert_eq!(session.current_turn(), Some(Slot::Player2));

        let result = session
            .act(Slot::Player2, ActionKind::Reveal, (0, 4), now)
            .unwrap();

        assert_eq!(
            result.outcome,
            ActionOutcome::Mine {
                game_over: false,
                cells: vec![TouchedCell {
                    row: 0,
                    col: 4,
                    value: 0,
                    mine: true
                }],
            }
        );
        assert_eq!(result.game_over, None);
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.current_turn(), Some(Slot::Player1));
        assert_eq!(session.snapshot().cell(0, 4), Some(CellView::Mine));
        assert!(session.snapshot().mine_positions.is_empty());
    }

    #[test]
    fn snapshot_hides_unrevealed_cells() {
        let (session, _) = two_players((5, 5), &[(4, 4)]);

        let snapshot = session.snapshot();

        assert!(snapshot.board.iter().flatten().all(|cell| *cell == CellView::Hidden));
        assert!(snapshot.mine_positions.is_empty());
        assert_eq!(snapshot.mine_count, 1);
        assert_eq!(snapshot.players[&Slot::Player2].name, "Bob");
    }

    #[test]
    fn time_accrues_only_while_holding_the_turn() {
        let (mut session, start) = two_players((5, 5), &[(4, 4), (4, 3)]);

        session
            .act(Slot::Player1, ActionKind::Flag, (0, 0), start + secs(3))
            .unwrap();
        session
            .act(Slot::Player2, ActionKind::Flag, (0, 1), start + secs(10))
            .unwrap();

        assert_eq!(session.time_played(Slot::Player1), secs(3));
        assert_eq!(session.time_played(Slot::Player2), secs(7));
    }

    #[test]
    fn disconnected_interval_is_not_counted() {
        let (mut session, start) = two_players((5, 5), &[(4, 4), (4, 3)]);
        session
            .act(Slot::Player1, ActionKind::Flag, (0, 0), start + secs(2))
            .unwrap();

        session.disconnect(Slot::Player2, start + secs(5));
        assert!(!session.is_connected(Slot::Player2));
        assert!(session.has_connected_players());
        assert_eq!(
            session.seat_player(None, Some("Bob".into()), start + secs(60)),
            Ok(Seating::Reattached(Slot::Player2))
        );
        session
            .act(Slot::Player2, ActionKind::Flag, (0, 1), start + secs(64))
            .unwrap();

        assert_eq!(session.time_played(Slot::Player2), secs(3 + 4));
        assert_eq!(session.player_stats()[&Slot::Player2].time_played, 7.0);
    }

    #[test]
    fn reattach_prefers_claimed_slot() {
        let (mut session, now) = two_players((5, 5), &[(4, 4)]);
        session.disconnect(Slot::Player1, now);
        session.disconnect(Slot::Player2, now);
        assert!(!session.has_connected_players());

        assert_eq!(
            session.seat_player(Some(Slot::Player2), Some("Ada".into()), now),
            Ok(Seating::Reattached(Slot::Player2))
        );
        assert_eq!(
            session.seat_player(None, Some("Mallory".into()), now),
            Err(SessionError::GameFull)
        );
        assert_eq!(
            session.seat_player(None, Some("Ada".into()), now),
            Ok(Seating::Reattached(Slot::Player1))
        );
    }

    #[test]
    fn live_slot_can_be_taken_over() {
        let (mut session, now) = two_players((5, 5), &[(4, 4)]);

        assert_eq!(
            session.seat_player(Some(Slot::Player2), None, now),
            Ok(Seating::TakenOver(Slot::Player2))
        );
        assert_eq!(
            session.seat_player(None, Some("Ada".into()), now),
            Ok(Seating::TakenOver(Slot::Player1))
        );
        assert!(session.is_connected(Slot::Player1));
        assert!(session.is_connected(Slot::Player2));
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(
            session.seat_player(None, Some("Eve".into()), now),
            Err(SessionError::GameFull)
        );
    }
}

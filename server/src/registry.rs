use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::time::Duration;

use duosweep_core::{Board, BoardConfig, RandomMineGenerator};
use duosweep_protocol::{CreateGameParams, CreatedGame, GameInfo, GameStatusInfo};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use time::format_description::well_known::Rfc3339;
use web_time::Instant;

use crate::error::{Result, SessionError};
use crate::session::{GameId, GameSession};

/// Shared handle to one live game.
#[derive(Debug)]
pub struct GameHandle {
    id: GameId,
    session: Mutex<GameSession>,
    retired: AtomicBool,
}

impl GameHandle {
    fn new(session: GameSession) -> Self {
        Self {
            id: session.id().to_owned(),
            session: Mutex::new(session),
            retired: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Locks the session. A panic while holding the lock leaves the session in its last
    /// consistent state, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, GameSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the session unless the game was removed from the registry after this
    /// handle was obtained.
    pub fn lock_live(&self) -> Result<MutexGuard<'_, GameSession>> {
        let guard = self.lock();
        if self.retired.load(Ordering::Acquire) {
            return Err(SessionError::NotFound);
        }
        Ok(guard)
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

/// When a game with nobody connected may be dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdlePolicy {
    pub idle_timeout: Duration,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60 * 60),
        }
    }
}

impl IdlePolicy {
    fn is_expired(&self, session: &GameSession, now: Instant) -> bool {
        !session.has_connected_players()
            && now.saturating_duration_since(session.last_activity()) >= self.idle_timeout
    }
}

/// All live games keyed by id.
#[derive(Debug)]
pub struct Registry {
    games: RwLock<HashMap<GameId, Arc<GameHandle>>>,
    policy: IdlePolicy,
    seeds: Mutex<SmallRng>,
}

impl Registry {
    /// Creates an empty registry. A fixed `seed` makes game ids and mine layouts
    /// reproducible.
    pub fn new(policy: IdlePolicy, seed: Option<u64>) -> Self {
        let seeds = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self {
            games: RwLock::new(HashMap::new()),
            policy,
            seeds: Mutex::new(seeds),
        }
    }

    pub fn policy(&self) -> IdlePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<GameId, Arc<GameHandle>>> {
        self.games.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<GameId, Arc<GameHandle>>> {
        self.games.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates `params`, lays out a fresh board and stores a waiting game.
    pub fn create(&self, params: &CreateGameParams, now: Instant) -> Result<CreatedGame> {
        let config = BoardConfig::for_difficulty(
            params.difficulty,
            params.rows,
            params.cols,
            params.mines,
        )
        .map_err(SessionError::Validation)?;

        let (board_seed, session_seed) = {
            let mut seeds = self.seeds.lock().unwrap_or_else(PoisonError::into_inner);
            (seeds.random::<u64>(), seeds.random::<u64>())
        };
        let board = Board::generate(config, RandomMineGenerator::new(board_seed));

        let mut games = self.write();
        let id = loop {
            let candidate = {
                let mut seeds = self.seeds.lock().unwrap_or_else(PoisonError::into_inner);
                format!("{:08x}", seeds.random::<u32>())
            };
            if !games.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = GameSession::new(
            id.clone(),
            board,
            params.difficulty,
            params.mode,
            session_seed,
            now,
        );
        games.insert(id.clone(), Arc::new(GameHandle::new(session)));
        drop(games);

        log::info!(
            "Created {:?} game {} ({}x{}, {} mines, {:?})",
            params.difficulty,
            id,
            config.rows,
            config.cols,
            config.mines,
            params.mode
        );
        Ok(CreatedGame {
            game_id: id,
            difficulty: params.difficulty,
            mode: params.mode,
            config,
        })
    }

    #[cfg(test)]
    pub(crate) fn insert(&self, session: GameSession) -> Arc<GameHandle> {
        let handle = Arc::new(GameHandle::new(session));
        self.write().insert(handle.id().to_owned(), Arc::clone(&handle));
        handle
    }

    pub fn ids(&self) -> Vec<GameId> {
        self.read().keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Result<Arc<GameHandle>> {
        self.read().get(id).cloned().ok_or(SessionError::NotFound)
    }

    pub fn status(&self, id: &str) -> GameStatusInfo {
        let Ok(handle) = self.get(id) else {
            return GameStatusInfo::missing();
        };
        let session = handle.lock();
        GameStatusInfo {
            exists: true,
            players_count: session.players_count(),
            status: Some(session.status()),
        }
    }

    pub fn info(&self, id: &str) -> Result<GameInfo> {
        let handle = self.get(id)?;
        let session = handle.lock();
        let created_at = session
            .created_at()
            .format(&Rfc3339)
            .unwrap_or_else(|_| session.created_at().to_string());
        Ok(GameInfo {
            game_id: session.id().to_owned(),
            players: session.player_names(),
            status: session.status(),
            current_player: session.current_turn(),
            created_at,
        })
    }

    /// Removes a game regardless of who is connected.
    pub fn evict(&self, id: &str) -> bool {
        let removed = self.write().remove(id);
        if let Some(handle) = &removed {
            let _session = handle.lock();
            handle.retire();
            log::info!("Evicted game {id}");
        }
        removed.is_some()
    }

    /// Drops every game that has had no connected player and no activity for the idle
    /// window. Games whose lock is currently held are busy and left alone.
    pub fn evict_idle(&self, now: Instant) -> Vec<GameId> {
        let mut games = self.write();
        let mut evicted = Vec::new();

        games.retain(|id, handle| {
            let session = match handle.session.try_lock() {
                Ok(session) => session,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return true,
            };
            if !self.policy.is_expired(&session, now) {
                return true;
            }
            handle.retire();
            evicted.push(id.clone());
            false
        });

        if !evicted.is_empty() {
            log::info!(
                "Evicted {} idle game(s), {} remaining",
                evicted.len(),
                games.len()
            );
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duosweep_core::{BoardError, Difficulty};
    use duosweep_protocol::{GameMode, GameStatus, Slot};

    fn registry() -> Registry {
        Registry::new(
            IdlePolicy {
                idle_timeout: Duration::from_secs(30),
            },
            Some(7),
        )
    }

    fn custom(rows: u32, cols: u32, mines: u32) -> CreateGameParams {
        CreateGameParams {
            difficulty: Difficulty::Custom,
            rows: Some(rows),
            cols: Some(cols),
            mines: Some(mines),
            ..Default::default()
        }
    }

    #[test]
    fn create_uses_preset_and_hex_id() {
        let registry = registry();
        let params = CreateGameParams {
            difficulty: Difficulty::Easy,
            ..Default::default()
        };

        let created = registry.create(&params, Instant::now()).unwrap();

        assert_eq!(created.game_id.len(), 8);
        assert!(created.game_id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(created.config, BoardConfig::easy());
        assert_eq!(created.mode, GameMode::Classic);

        let handle = registry.get(&created.game_id).unwrap();
        let session = handle.lock();
        assert_eq!(session.status(), GameStatus::Waiting);
        assert_eq!(session.board().mine_count(), 10);
    }

    #[test]
    fn create_rejects_invalid_custom_boards() {
        let registry = registry();
        let now = Instant::now();

        assert_eq!(
            registry.create(&custom(4, 10, 5), now),
            Err(SessionError::Validation(BoardError::InvalidRows))
        );
        let too_many = registry.create(&custom(5, 5, 17), now).unwrap_err();
        assert_eq!(
            too_many.to_string(),
            "Too many mines! Maximum is 16 for a 5x5 board"
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let registry = registry();
        let now = Instant::now();
        for _ in 0..64 {
            registry.create(&custom(5, 5, 3), now).unwrap();
        }
        assert_eq!(registry.len(), 64);
    }

    #[test]
    fn status_and_info_reflect_players() {
        let registry = registry();
        let now = Instant::now();
        let id = registry.create(&custom(5, 5, 3), now).unwrap().game_id;

        assert_eq!(registry.status("nope"), GameStatusInfo::missing());
        assert_eq!(registry.info("nope"), Err(SessionError::NotFound));

        registry
            .get(&id)
            .unwrap()
            .lock()
            .join(Some("Ada".into()), now)
            .unwrap();

        let status = registry.status(&id);
        assert!(status.exists);
        assert_eq!(status.players_count, 1);
        assert_eq!(status.status, Some(GameStatus::Waiting));

        let info = registry.info(&id).unwrap();
        assert_eq!(info.players[&Slot::Player1], "Ada");
        assert_eq!(info.current_player, Some(Slot::Player1));
        assert!(time::OffsetDateTime::parse(&info.created_at, &Rfc3339).is_ok());
    }

    #[test]
    fn idle_eviction_spares_connected_games() {
        let registry = registry();
        let start = Instant::now();
        let empty = registry.create(&custom(5, 5, 3), start).unwrap().game_id;
        let occupied = registry.create(&custom(5, 5, 3), start).unwrap().game_id;
        let left = registry.create(&custom(5, 5, 3), start).unwrap().game_id;
        registry.get(&occupied).unwrap().lock().join(None, start).unwrap();
        {
            let handle = registry.get(&left).unwrap();
            let mut session = handle.lock();
            session.join(None, start).unwrap();
            session.disconnect(Slot::Player1, start + Duration::from_secs(10));
        }

        assert!(registry.evict_idle(start + Duration::from_secs(29)).is_empty());

        let evicted = registry.evict_idle(start + Duration::from_secs(35));
        assert_eq!(evicted, [empty.clone()]);
        assert_eq!(registry.get(&empty).unwrap_err(), SessionError::NotFound);

        let evicted = registry.evict_idle(start + Duration::from_secs(40));
        assert_eq!(evicted, [left]);
        assert!(registry.get(&occupied).is_ok());
    }

    #[test]
    fn retired_handles_refuse_new_work() {
        let registry = registry();
        let id = registry.create(&custom(5, 5, 3), Instant::now()).unwrap().game_id;
        let handle = registry.get(&id).unwrap();

        assert!(registry.evict(&id));
        assert!(!registry.evict(&id));
        assert_eq!(handle.lock_live().unwrap_err(), SessionError::NotFound);
    }
}

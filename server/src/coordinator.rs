use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use duosweep_core::Coord;
use duosweep_protocol::{ActionKind, ClientMessage, ServerMessage, Slot};
use web_time::Instant;

use crate::connection::{Clock, Connection, ConnectionId};
use crate::error::{Result, SessionError};
use crate::registry::Registry;
use crate::session::{GameId, GameSession, Seating};

/// Which game and seat a connection plays.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Binding {
    game_id: GameId,
    slot: Slot,
}

type SeatTable = [Option<Arc<dyn Connection>>; 2];

/// Routes client messages to game sessions and fans results back out.
///
/// Locks are always taken in the order registry, session, seats, bindings. The bindings
/// lock is never held while waiting on a session.
pub struct Coordinator {
    registry: Arc<Registry>,
    bindings: RwLock<HashMap<ConnectionId, Binding>>,
    seats: Mutex<HashMap<GameId, SeatTable>>,
    clock: Arc<dyn Clock>,
}

impl Coordinator {
    pub fn new(registry: Arc<Registry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            bindings: RwLock::new(HashMap::new()),
            seats: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    fn binding(&self, conn_id: ConnectionId) -> Option<Binding> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&conn_id)
            .cloned()
    }

    fn bind(&self, conn_id: ConnectionId, binding: Binding) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(conn_id, binding);
    }

    fn unbind(&self, conn_id: ConnectionId) -> Option<Binding> {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&conn_id)
    }

    fn seats(&self) -> MutexGuard<'_, HashMap<GameId, SeatTable>> {
        self.seats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_seats(&self, game_id: &str) -> Vec<(Slot, Arc<dyn Connection>)> {
        let seats = self.seats();
        let Some(table) = seats.get(game_id) else {
            return Vec::new();
        };
        Slot::ALL
            .into_iter()
            .filter_map(|slot| table[slot.index()].clone().map(|conn| (slot, conn)))
            .collect()
    }

    /// Sends a failure back to the originator only.
    fn reply_error(&self, conn: &dyn Connection, error: SessionError) {
        log::debug!("Rejecting request from connection {}: {}", conn.id(), error);
        if let Err(err) = conn.send(ServerMessage::error(&error)) {
            log::warn!("Could not deliver error reply: {err}");
        }
    }

    /// Frees `slot` if `conn_id` still holds it. Returns whether anything changed.
    fn release_seat(
        &self,
        session: &mut GameSession,
        slot: Slot,
        conn_id: ConnectionId,
        now: Instant,
    ) -> bool {
        let released = {
            let mut seats = self.seats();
            match seats.get_mut(session.id()) {
                Some(table)
                    if table[slot.index()]
                        .as_ref()
                        .is_some_and(|conn| conn.id() == conn_id) =>
                {
                    table[slot.index()] = None;
                    true
                }
                _ => false,
            }
        };
        self.unbind(conn_id);
        if released {
            session.disconnect(slot, now);
        }
        released
    }

    /// Delivers `message` to every live seat except `skip`, in seat order.
    ///
    /// Must be called with the session locked so that each game's messages go out in the
    /// order its actions were applied. A failed send frees the seat and tells the
    /// remaining players.
    fn fan_out(
        &self,
        session: &mut GameSession,
        message: ServerMessage,
        skip: Option<ConnectionId>,
        now: Instant,
    ) {
        let mut pending = vec![(message, skip)];
        while let Some((message, skip)) = pending.pop() {
            for (slot, conn) in self.live_seats(session.id()) {
                if Some(conn.id()) == skip {
                    continue;
                }
                if let Err(err) = conn.send(message.clone()) {
                    log::warn!(
                        "Dropping {} in game {} after failed {}: {}",
                        slot,
                        session.id(),
                        message.kind(),
                        err
                    );
                    if self.release_seat(session, slot, conn.id(), now) {
                        pending.push((ServerMessage::PlayerDisconnected { player_id: slot }, None));
                    }
                }
            }
        }
    }

    fn send_to(
        &self,
        session: &mut GameSession,
        slot: Slot,
        conn: &dyn Connection,
        message: ServerMessage,
        now: Instant,
    ) {
        if let Err(err) = conn.send(message) {
            log::warn!("Dropping {} in game {}: {}", slot, session.id(), err);
            if self.release_seat(session, slot, conn.id(), now) {
                let message = ServerMessage::PlayerDisconnected { player_id: slot };
                self.fan_out(session, message, None, now);
            }
        }
    }

    fn joined(session: &GameSession, slot: Slot) -> ServerMessage {
        ServerMessage::Joined {
            player_id: slot,
            game_id: session.id().to_owned(),
            players: session.player_names(),
            game_state: session.snapshot(),
        }
    }

    pub fn on_join(
        &self,
        conn: &Arc<dyn Connection>,
        game_id: &str,
        name: Option<String>,
        slot_hint: Option<Slot>,
    ) {
        if let Err(err) = self.join(conn, game_id, name, slot_hint) {
            self.reply_error(conn.as_ref(), err);
        }
    }

    fn join(
        &self,
        conn: &Arc<dyn Connection>,
        game_id: &str,
        name: Option<String>,
        slot_hint: Option<Slot>,
    ) -> Result<()> {
        let now = self.clock.now();

        if let Some(binding) = self.binding(conn.id()) {
            if binding.game_id == game_id {
                let handle = self.registry.get(game_id)?;
                let mut session = handle.lock_live()?;
                let message = Self::joined(&session, binding.slot);
                self.send_to(&mut session, binding.slot, conn.as_ref(), message, now);
                return Ok(());
            }
            self.on_disconnect(conn.id());
        }

        let handle = self.registry.get(game_id)?;
        let mut session = handle.lock_live()?;
        let seating = session.seat_player(slot_hint, name, now)?;
        let slot = seating.slot();

        let previous = std::mem::replace(
            &mut self.seats().entry(session.id().to_owned()).or_default()[slot.index()],
            Some(Arc::clone(conn)),
        );
        if let Some(previous) = previous.filter(|previous| previous.id() != conn.id()) {
            self.unbind(previous.id());
        }
        self.bind(
            conn.id(),
            Binding {
                game_id: session.id().to_owned(),
                slot,
            },
        );

        let player_name = session.player_name(slot).unwrap_or_default().to_owned();
        match seating {
            Seating::Joined(_) => {
                log::info!("{player_name:?} joined game {} as {slot}", session.id())
            }
            Seating::Reattached(_) => {
                log::info!("{player_name:?} reconnected to game {} as {slot}", session.id())
            }
            Seating::TakenOver(_) => log::info!(
                "{player_name:?} moved to a new connection in game {} as {slot}",
                session.id()
            ),
        }

        let message = Self::joined(&session, slot);
        self.send_to(&mut session, slot, conn.as_ref(), message, now);
        let message = ServerMessage::PlayerJoined {
            player_id: slot,
            player_name,
            players: session.player_names(),
            game_state: session.snapshot(),
        };
        self.fan_out(&mut session, message, Some(conn.id()), now);
        Ok(())
    }

    pub fn on_action(&self, conn: &Arc<dyn Connection>, action: ActionKind, row: i64, col: i64) {
        if let Err(err) = self.act(conn, action, row, col) {
            self.reply_error(conn.as_ref(), err);
        }
    }

    fn act(&self, conn: &Arc<dyn Connection>, action: ActionKind, row: i64, col: i64) -> Result<()> {
        let binding = self.binding(conn.id()).ok_or(SessionError::NotBound)?;
        let coords = Coord::try_from(row)
            .ok()
            .zip(Coord::try_from(col).ok())
            .ok_or(SessionError::InvalidCell)?;

        let handle = self.registry.get(&binding.game_id)?;
        let mut session = handle.lock_live()?;
        let now = self.clock.now();
        let result = session.act(binding.slot, action, coords, now)?;

        log::debug!(
            "Game {}: {} {} at {:?}",
            session.id(),
            binding.slot,
            action,
            coords
        );
        let (row, col) = result.coords;
        let message = ServerMessage::ActionResult {
            action: result.action,
            row,
            col,
            result: result.outcome,
            current_player: session.current_turn(),
            player_id: result.slot,
            player_stats: session.player_stats(),
            game_state: session.snapshot(),
        };
        self.fan_out(&mut session, message, None, now);

        if let Some(game_over) = result.game_over {
            let message = ServerMessage::GameOver {
                won: game_over.won,
                reason: game_over.reason.to_owned(),
            };
            self.fan_out(&mut session, message, None, now);
        }
        Ok(())
    }

    /// Frees whatever seat the connection held and tells the other player.
    pub fn on_disconnect(&self, conn_id: ConnectionId) {
        let Some(binding) = self.binding(conn_id) else {
            return;
        };
        let Ok(handle) = self.registry.get(&binding.game_id) else {
            self.unbind(conn_id);
            return;
        };

        let mut session = handle.lock();
        let now = self.clock.now();
        if self.release_seat(&mut session, binding.slot, conn_id, now) {
            log::info!("{} left game {}", binding.slot, binding.game_id);
            let message = ServerMessage::PlayerDisconnected {
                player_id: binding.slot,
            };
            self.fan_out(&mut session, message, None, now);
        }
    }

    pub fn on_get_state(&self, conn: &Arc<dyn Connection>, game_id: Option<&str>) {
        let snapshot = game_id
            .map(str::to_owned)
            .or_else(|| self.binding(conn.id()).map(|binding| binding.game_id))
            .ok_or(SessionError::NotBound)
            .and_then(|game_id| self.registry.get(&game_id))
            .map(|handle| handle.lock().snapshot());

        match snapshot {
            Ok(game_state) => {
                if let Err(err) = conn.send(ServerMessage::GameState { game_state }) {
                    log::warn!("Could not deliver game state: {err}");
                }
            }
            Err(err) => self.reply_error(conn.as_ref(), err),
        }
    }

    /// Decodes one text frame and dispatches it.
    pub fn handle_text(&self, conn: &Arc<dyn Connection>, text: &str) {
        let message = match ClientMessage::from_json(text) {
            Ok(message) => message,
            Err(err) => {
                self.reply_error(conn.as_ref(), SessionError::BadMessage(err.to_string()));
                return;
            }
        };

        match message {
            ClientMessage::Join {
                game_id,
                player_name,
                player_id,
            } => self.on_join(conn, &game_id, player_name, player_id),
            ClientMessage::Reveal { row, col, .. } => {
                self.on_action(conn, ActionKind::Reveal, row, col)
            }
            ClientMessage::Flag { row, col, .. } => self.on_action(conn, ActionKind::Flag, row, col),
            ClientMessage::GetState { game_id } => self.on_get_state(conn, game_id.as_deref()),
        }
    }

    /// Evicts idle games and forgets their seats.
    pub fn sweep(&self) -> Vec<GameId> {
        let evicted = self.registry.evict_idle(self.clock.now());
        if !evicted.is_empty() {
            let mut seats = self.seats();
            for id in &evicted {
                seats.remove(id);
            }
            drop(seats);
            self.bindings
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|_, binding| !evicted.contains(&binding.game_id));
        }
        evicted
    }

    /// Drops every game. Used when the server stops.
    pub fn shutdown(&self) {
        let ids = self.registry.ids();
        for id in &ids {
            self.registry.evict(id);
        }
        self.seats().clear();
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        log::info!("Closed {} game(s)", ids.len());
    }
}

//! Session state: roster, lifecycle phase, and action dispatch.
//!
//! The session owns the board and serializes every mutation behind a single
//! lock. Win evaluation runs inside the same critical section as the claim
//! that triggered it, so the verdict always matches the board the claim
//! produced; per-cell locking cannot give that cross-cell consistency.
//! Broadcasts are enqueued to each player's outbound mailbox while the lock
//! is held, which gives every connection the same event order without
//! letting a stalled socket block the critical section.

use crate::board::Board;
use crate::win::{self, Verdict};
use log::{debug, info, warn};
use shared::{Action, PlayerId, ServerEvent, Verb};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Configuration consumed by the session; sourcing (CLI, tests) is the
/// caller's concern.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub board_size: usize,
    pub min_players: usize,
    pub max_players: usize,
    /// How long clients hold a cell before claiming. Carried as plain
    /// configuration; the session itself runs no timers.
    pub hold_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: shared::DEFAULT_BOARD_SIZE,
            min_players: shared::DEFAULT_MIN_PLAYERS,
            max_players: shared::DEFAULT_MAX_PLAYERS,
            hold_timeout: Duration::from_millis(shared::DEFAULT_HOLD_MS),
        }
    }
}

/// Coarse lifecycle stage; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    InProgress,
    Finished,
}

/// Roster entry: stable id plus the outbound mailbox drained by the
/// connection's writer task.
#[derive(Debug)]
struct Player {
    id: PlayerId,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Debug)]
struct State {
    board: Board,
    players: Vec<Player>,
    next_player_id: PlayerId,
    phase: Phase,
    /// Roster size captured when the game starts; the win threshold is
    /// computed against this so mid-game disconnects cannot shift it.
    roster_at_start: usize,
}

impl State {
    fn fresh(board_size: usize) -> Self {
        Self {
            board: Board::new(board_size),
            players: Vec::new(),
            next_player_id: 0,
            phase: Phase::NotStarted,
            roster_at_start: 0,
        }
    }
}

/// Authoritative state for one match, shared by every connection task.
pub struct Session {
    config: GameConfig,
    state: Mutex<State>,
}

impl Session {
    pub fn new(config: GameConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if config.board_size == 0 {
            return Err("board size must be positive".into());
        }
        if config.min_players == 0 {
            return Err("minimum player count must be positive".into());
        }
        if config.max_players < config.min_players {
            return Err("maximum player count below minimum".into());
        }

        Ok(Self {
            state: Mutex::new(State::fresh(config.board_size)),
            config,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn hold_timeout(&self) -> Duration {
        self.config.hold_timeout
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    pub async fn player_count(&self) -> usize {
        self.state.lock().await.players.len()
    }

    /// Admits a connection if there is room and the game has not started.
    /// Returns the assigned 0-based player id, or `None` to reject.
    pub async fn try_admit(&self, sender: mpsc::UnboundedSender<ServerEvent>) -> Option<PlayerId> {
        let mut state = self.state.lock().await;

        if state.players.len() >= self.config.max_players {
            info!("admission rejected: table full ({})", state.players.len());
            return None;
        }
        if state.phase != Phase::NotStarted {
            info!("admission rejected: game already started");
            return None;
        }

        let id = state.next_player_id;
        state.next_player_id += 1;
        state.players.push(Player { id, sender });
        info!(
            "player {} joined ({}/{})",
            id,
            state.players.len(),
            self.config.max_players
        );
        Some(id)
    }

    /// Validates and applies one action, then broadcasts the result.
    ///
    /// Failed transitions are silent no-ops: the loser of a race for a cell
    /// (or a client replaying a stale message) gets no signal and the board
    /// stays untouched.
    pub async fn handle_action(&self, player_id: PlayerId, action: Action) {
        let mut state = self.state.lock().await;

        if state.phase == Phase::Finished {
            debug!("player {}: action after game end, dropped", player_id);
            return;
        }
        if state.players.len() < self.config.min_players {
            debug!(
                "player {}: only {} players connected, action dropped",
                player_id,
                state.players.len()
            );
            return;
        }
        if !state.board.in_bounds(action.row, action.col) {
            warn!(
                "player {}: coordinates ({}, {}) out of range, dropped",
                player_id, action.row, action.col
            );
            return;
        }
        if !state
            .board
            .apply(action.verb, action.row, action.col, player_id)
        {
            debug!("player {}: {} was a no-op", player_id, action);
            return;
        }

        if state.phase == Phase::NotStarted {
            state.phase = Phase::InProgress;
            state.roster_at_start = state.players.len();
            info!("game started with {} players", state.roster_at_start);
        }

        let mut events = vec![ServerEvent::Update {
            verb: action.verb,
            row: action.row,
            col: action.col,
            player_id,
        }];

        if action.verb == Verb::Claim {
            if let Some(verdict) = win::evaluate(&state.board, state.roster_at_start) {
                state.phase = Phase::Finished;
                let winner = match verdict {
                    Verdict::Winner(id) => {
                        info!("game over: player {} wins", id);
                        Some(id)
                    }
                    Verdict::Tie => {
                        info!("game over: tie");
                        None
                    }
                };
                events.push(ServerEvent::Win { winner });
            }
        }

        broadcast(&mut state, events);
    }

    /// Removes a player after their connection failed or closed.
    ///
    /// Cells the player merely held are released and the releases broadcast
    /// (claimed cells stand); after a finished game the board is frozen and
    /// nothing is released. When the last player leaves a finished game the
    /// session resets for a fresh match.
    pub async fn remove_player(&self, player_id: PlayerId) {
        let mut state = self.state.lock().await;

        let events = detach_player(&mut state, player_id);
        broadcast(&mut state, events);

        if state.players.is_empty() && state.phase == Phase::Finished {
            info!("roster drained after game end, resetting session");
            *state = State::fresh(self.config.board_size);
        }
    }
}

/// Drops a player from the roster and returns the release events for any
/// cells they still held. No-op if the player is already gone.
fn detach_player(state: &mut State, player_id: PlayerId) -> Vec<ServerEvent> {
    let before = state.players.len();
    state.players.retain(|player| player.id != player_id);
    if state.players.len() == before {
        return Vec::new();
    }
    info!("player {} left the game", player_id);

    if state.phase == Phase::Finished {
        return Vec::new();
    }

    state
        .board
        .release_all_held_by(player_id)
        .into_iter()
        .map(|(row, col)| ServerEvent::Update {
            verb: Verb::Release,
            row,
            col,
            player_id,
        })
        .collect()
}

/// Fans events out to every roster member's mailbox, in order, under the
/// caller's lock. A player whose mailbox is closed is detached on the spot
/// and the releases that frees are broadcast in the same critical section.
fn broadcast(state: &mut State, mut pending: Vec<ServerEvent>) {
    while !pending.is_empty() {
        let mut dead = Vec::new();
        for player in &state.players {
            if pending
                .iter()
                .any(|event| player.sender.send(*event).is_err())
            {
                dead.push(player.id);
            }
        }

        pending.clear();
        for id in dead {
            warn!("player {}: outbound channel closed, detaching", id);
            pending.extend(detach_player(state, id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn config(board_size: usize, min: usize, max: usize) -> GameConfig {
        GameConfig {
            board_size,
            min_players: min,
            max_players: max,
            ..GameConfig::default()
        }
    }

    async fn join(session: &Session) -> (PlayerId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = session.try_admit(tx).await.expect("admission failed");
        (id, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn update(verb: Verb, row: usize, col: usize, player_id: PlayerId) -> ServerEvent {
        ServerEvent::Update {
            verb,
            row,
            col,
            player_id,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(Session::new(config(0, 2, 4)).is_err());
        assert!(Session::new(config(8, 0, 4)).is_err());
        assert!(Session::new(config(8, 4, 2)).is_err());
        assert!(Session::new(config(8, 2, 4)).is_ok());
    }

    #[tokio::test]
    async fn test_admission_ids_and_capacity() {
        let session = Session::new(config(4, 2, 2)).unwrap();

        let (id0, _rx0) = join(&session).await;
        let (id1, _rx1) = join(&session).await;
        assert_eq!(id0, 0);
        assert_eq!(id1, 1);

        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(session.try_admit(tx).await, None);
        assert_eq!(session.player_count().await, 2);
    }

    #[tokio::test]
    async fn test_ids_not_reused_within_session() {
        let session = Session::new(config(4, 2, 4)).unwrap();

        let (id0, _rx0) = join(&session).await;
        let (_id1, _rx1) = join(&session).await;
        session.remove_player(id0).await;

        let (id2, _rx2) = join(&session).await;
        assert_eq!(id2, 2);
    }

    #[tokio::test]
    async fn test_actions_dropped_below_min_players() {
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, mut rx0) = join(&session).await;

        session
            .handle_action(id0, Action::new(Verb::Hold, 0, 0))
            .await;
        assert!(drain(&mut rx0).is_empty());
        assert_eq!(session.phase().await, Phase::NotStarted);

        // The lone-player hold must not have touched the cell: once a second
        // player arrives they can hold it themselves.
        let (id1, mut rx1) = join(&session).await;
        session
            .handle_action(id1, Action::new(Verb::Hold, 0, 0))
            .await;
        assert_eq!(drain(&mut rx1), vec![update(Verb::Hold, 0, 0, id1)]);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_players() {
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, mut rx0) = join(&session).await;
        let (_id1, mut rx1) = join(&session).await;

        session
            .handle_action(id0, Action::new(Verb::Hold, 1, 2))
            .await;
        session
            .handle_action(id0, Action::new(Verb::Claim, 1, 2))
            .await;

        let expected = vec![update(Verb::Hold, 1, 2, id0), update(Verb::Claim, 1, 2, id0)];
        assert_eq!(drain(&mut rx0), expected);
        assert_eq!(drain(&mut rx1), expected);
        assert_eq!(session.phase().await, Phase::InProgress);
    }

    #[tokio::test]
    async fn test_contested_hold_single_winner() {
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, mut rx0) = join(&session).await;
        let (id1, mut rx1) = join(&session).await;

        session
            .handle_action(id0, Action::new(Verb::Hold, 0, 0))
            .await;
        session
            .handle_action(id1, Action::new(Verb::Hold, 0, 0))
            .await;

        // Exactly one hold broadcast for the contested cell, on both wires
        let expected = vec![update(Verb::Hold, 0, 0, id0)];
        assert_eq!(drain(&mut rx0), expected);
        assert_eq!(drain(&mut rx1), expected);
    }

    #[tokio::test]
    async fn test_reclaim_is_idempotent() {
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, mut rx0) = join(&session).await;
        let (_id1, _rx1) = join(&session).await;

        session
            .handle_action(id0, Action::new(Verb::Hold, 2, 2))
            .await;
        session
            .handle_action(id0, Action::new(Verb::Claim, 2, 2))
            .await;
        drain(&mut rx0);

        session
            .handle_action(id0, Action::new(Verb::Claim, 2, 2))
            .await;
        assert!(drain(&mut rx0).is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_discarded() {
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, mut rx0) = join(&session).await;
        let (_id1, _rx1) = join(&session).await;

        session
            .handle_action(id0, Action::new(Verb::Hold, 4, 0))
            .await;
        session
            .handle_action(id0, Action::new(Verb::Hold, 0, 99))
            .await;
        assert!(drain(&mut rx0).is_empty());
        assert_eq!(session.phase().await, Phase::NotStarted);
    }

    #[tokio::test]
    async fn test_no_late_joiners_once_started() {
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, _rx0) = join(&session).await;
        let (_id1, _rx1) = join(&session).await;

        session
            .handle_action(id0, Action::new(Verb::Hold, 0, 0))
            .await;
        assert_eq!(session.phase().await, Phase::InProgress);

        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(session.try_admit(tx).await, None);
    }

    #[tokio::test]
    async fn test_threshold_scenario_4x4() {
        // 4x4, 2 players, threshold = 9: the ninth claim carries the win
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, mut rx0) = join(&session).await;
        let (id1, mut rx1) = join(&session).await;

        for i in 0..9 {
            let (row, col) = (i / 4, i % 4);
            session
                .handle_action(id0, Action::new(Verb::Hold, row, col))
                .await;
            session
                .handle_action(id0, Action::new(Verb::Claim, row, col))
                .await;
        }

        let events = drain(&mut rx0);
        assert_eq!(events.len(), 19); // 9 holds + 9 claims + win
        assert_eq!(events.last(), Some(&ServerEvent::Win { winner: Some(id0) }));
        assert_eq!(drain(&mut rx1).last(), Some(&ServerEvent::Win { winner: Some(id0) }));
        assert_eq!(session.phase().await, Phase::Finished);

        // The board is frozen: further actions from anyone are no-ops
        session
            .handle_action(id1, Action::new(Verb::Hold, 3, 3))
            .await;
        session
            .handle_action(id0, Action::new(Verb::Release, 3, 3))
            .await;
        assert!(drain(&mut rx0).is_empty());
        assert!(drain(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn test_tie_broadcast() {
        // 2x2, 2 players, threshold = 3: a 2-2 split fills the board
        let session = Session::new(config(2, 2, 2)).unwrap();
        let (id0, mut rx0) = join(&session).await;
        let (id1, _rx1) = join(&session).await;

        for (row, col, player) in [(0, 0, id0), (0, 1, id0), (1, 0, id1), (1, 1, id1)] {
            session
                .handle_action(player, Action::new(Verb::Hold, row, col))
                .await;
            session
                .handle_action(player, Action::new(Verb::Claim, row, col))
                .await;
        }

        assert_eq!(
            drain(&mut rx0).last(),
            Some(&ServerEvent::Win { winner: None })
        );
        assert_eq!(session.phase().await, Phase::Finished);
    }

    #[tokio::test]
    async fn test_disconnect_releases_held_cells() {
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, _rx0) = join(&session).await;
        let (id1, mut rx1) = join(&session).await;

        session
            .handle_action(id0, Action::new(Verb::Hold, 0, 0))
            .await;
        session
            .handle_action(id0, Action::new(Verb::Hold, 1, 1))
            .await;
        session
            .handle_action(id0, Action::new(Verb::Hold, 2, 2))
            .await;
        session
            .handle_action(id0, Action::new(Verb::Claim, 2, 2))
            .await;
        drain(&mut rx1);

        session.remove_player(id0).await;

        let mut releases = drain(&mut rx1);
        releases.sort_by_key(|event| match event {
            ServerEvent::Update { row, col, .. } => (*row, *col),
            _ => (usize::MAX, usize::MAX),
        });
        // Held cells are freed, the claimed cell stands
        assert_eq!(
            releases,
            vec![
                update(Verb::Release, 0, 0, id0),
                update(Verb::Release, 1, 1, id0),
            ]
        );
    }

    #[tokio::test]
    async fn test_roster_pruned_when_mailbox_closes() {
        let session = Session::new(config(4, 2, 4)).unwrap();
        let (id0, mut rx0) = join(&session).await;
        let (id1, rx1) = join(&session).await;

        // Simulate a dead writer task
        drop(rx1);

        session
            .handle_action(id0, Action::new(Verb::Hold, 0, 0))
            .await;
        assert_eq!(drain(&mut rx0), vec![update(Verb::Hold, 0, 0, id0)]);
        assert_eq!(session.player_count().await, 1);

        // Removal via the reader path is then a no-op
        session.remove_player(id1).await;
        assert_eq!(session.player_count().await, 1);
    }

    #[tokio::test]
    async fn test_session_resets_after_drain() {
        let session = Session::new(config(2, 1, 2)).unwrap();
        let (id0, mut rx0) = join(&session).await;

        // threshold = 4/1 + 1 = 5, unreachable; fill the board for the
        // full-board ending instead
        for i in 0..4 {
            let (row, col) = (i / 2, i % 2);
            session
                .handle_action(id0, Action::new(Verb::Hold, row, col))
                .await;
            session
                .handle_action(id0, Action::new(Verb::Claim, row, col))
                .await;
        }
        assert_eq!(
            drain(&mut rx0).last(),
            Some(&ServerEvent::Win { winner: Some(id0) })
        );
        assert_eq!(session.phase().await, Phase::Finished);

        session.remove_player(id0).await;

        // Fresh game: admission open again, ids restart, board empty
        let (new_id, mut new_rx) = join(&session).await;
        assert_eq!(new_id, 0);
        assert_eq!(session.phase().await, Phase::NotStarted);
        session
            .handle_action(new_id, Action::new(Verb::Hold, 0, 0))
            .await;
        assert_eq!(drain(&mut new_rx), vec![update(Verb::Hold, 0, 0, new_id)]);
    }
}

use std::fmt;

use super::events::LoggedEvent;
use super::joust::PendingJoust;
use super::power_chain::PowerChain;
use super::state::{GameConfig, GameState, Outcome};
use crate::cards::Card;
use crate::chess::{Board, ChessAdapter, Color};

/// Callback receiving every event appended to the log.
pub type Observer = Box<dyn FnMut(&LoggedEvent)>;

/// A running game: card state plus the chess adapter that owns the board.
///
/// All mutation goes through [`Game::make_move`], [`Game::play_card`] and
/// [`Game::resolve_joust`]. Each either applies fully or fails without
/// touching anything. A game is single-writer; hosts serving several clients
/// must serialize calls per game.
pub struct Game<A: ChessAdapter = Board> {
    pub(crate) state: GameState,
    pub(crate) board: A,
    observers: Vec<Observer>,
}

impl Game<Board> {
    /// Standard starting position with a freshly shuffled deck.
    pub fn new(config: GameConfig) -> Self {
        Self::with_board(config, Board::standard())
    }
}

impl<A: ChessAdapter> Game<A> {
    pub fn with_board(config: GameConfig, board: A) -> Self {
        let mut state = GameState::new(config);
        state.current_player = board.turn();
        Self::from_parts(state, board)
    }

    /// Resumes a game from a saved state and the matching board.
    pub fn from_parts(state: GameState, board: A) -> Self {
        Self {
            state,
            board,
            observers: Vec::new(),
        }
    }

    pub fn into_parts(self) -> (GameState, A) {
        (self.state, self.board)
    }

    /// Registers an observer for future log entries. Observers see events
    /// only after the action producing them has fully committed.
    pub fn subscribe(&mut self, observer: impl FnMut(&LoggedEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub(crate) fn notify_since(&mut self, mark: usize) {
        for entry in self.state.event_log.since(mark) {
            for observer in self.observers.iter_mut() {
                observer(entry);
            }
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Detached copy of the card state.
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    pub fn board(&self) -> &A {
        &self.board
    }

    pub fn current_player(&self) -> Color {
        self.state.current_player
    }

    pub fn hand(&self, player: Color) -> &[Card] {
        &self.state.player(player).hand
    }

    pub fn court(&self, player: Color) -> &[Card] {
        &self.state.player(player).court
    }

    pub fn power_chain(&self, player: Color) -> PowerChain {
        self.state.power_chain(player)
    }

    pub fn event_log(&self) -> &[LoggedEvent] {
        self.state.event_log.entries()
    }

    pub fn pending_joust(&self) -> Option<&PendingJoust> {
        self.state.pending_joust.as_ref()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.state.outcome
    }
}

impl<A: ChessAdapter + fmt::Debug> fmt::Debug for Game<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("state", &self.state)
            .field("board", &self.board)
            .field("observers", &self.observers.len())
            .finish()
    }
}

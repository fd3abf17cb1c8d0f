use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::{EventLog, GameEvent, LoggedEvent};
use super::joust::PendingJoust;
use super::power_chain::{PowerChain, PowerChains};
use crate::cards::{Card, CardSupply, DECK_SIZE};
use crate::chess::Color;

pub const DEFAULT_HAND_SIZE: usize = 5;
pub const DEFAULT_COURT_SIZE: usize = 3;

/// 游戏配置，各宿主可调整的牌桌规则。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    pub hand_size: usize,
    pub court_size: usize,
    /// Top the mover's hand up after a chess move as well as after a card play.
    pub draw_after_move: bool,
    /// Seed for the opening shuffle. Fresh entropy when absent.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            hand_size: DEFAULT_HAND_SIZE,
            court_size: DEFAULT_COURT_SIZE,
            draw_after_move: false,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_draw_after_move(mut self, enabled: bool) -> Self {
        self.draw_after_move = enabled;
        self
    }
}

/// 出牌来源。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardSource {
    Hand,
    Court,
}

impl fmt::Display for CardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CardSource::Hand => "hand",
            CardSource::Court => "court",
        })
    }
}

/// 玩家状态，包括私有手牌与公开的 Court。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
    pub color: Color,
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub court: Vec<Card>,
}

impl PlayerState {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            hand: Vec::new(),
            court: Vec::new(),
        }
    }

    pub fn cards(&self, source: CardSource) -> &[Card] {
        match source {
            CardSource::Hand => &self.hand,
            CardSource::Court => &self.court,
        }
    }

    fn cards_mut(&mut self, source: CardSource) -> &mut Vec<Card> {
        match source {
            CardSource::Hand => &mut self.hand,
            CardSource::Court => &mut self.court,
        }
    }

    pub fn find_card(&self, source: CardSource, card_id: &str) -> Option<Card> {
        self.cards(source)
            .iter()
            .find(|card| card.has_id(card_id))
            .copied()
    }

    pub fn take_card(&mut self, source: CardSource, card_id: &str) -> Option<Card> {
        let cards = self.cards_mut(source);
        let idx = cards.iter().position(|card| card.has_id(card_id))?;
        Some(cards.remove(idx))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeReason {
    KingCaptured,
    Checkmate,
    Stalemate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    /// `None` for a draw.
    pub winner: Option<Color>,
    pub reason: OutcomeReason,
}

/// Broken game invariants. These indicate an engine defect, not bad input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("{actual} cards are in play, expected {expected}")]
    CardCount { expected: usize, actual: usize },
    #[error("card {card} appears more than once")]
    DuplicateCard { card: Card },
    #[error("{player} holds {size} cards, limit is {limit}")]
    HandOverflow {
        player: Color,
        size: usize,
        limit: usize,
    },
    #[error("{player} has {size} Court cards, limit is {limit}")]
    CourtOverflow {
        player: Color,
        size: usize,
        limit: usize,
    },
}

/// 游戏整体状态（卡牌侧）。棋盘由象棋适配器持有。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameState {
    #[serde(default)]
    pub config: GameConfig,
    pub supply: CardSupply,
    pub white: PlayerState,
    pub black: PlayerState,
    #[serde(default)]
    pub power_chains: PowerChains,
    pub current_player: Color,
    pub turn: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_joust: Option<PendingJoust>,
    #[serde(default)]
    pub event_log: EventLog,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl GameState {
    /// Shuffles a fresh supply and deals both players, white first.
    pub fn new(config: GameConfig) -> Self {
        let supply = match config.seed {
            Some(seed) => CardSupply::with_seed(seed),
            None => CardSupply::new(),
        };
        Self::with_supply(config, supply)
    }

    /// Deals from a prepared supply. Useful for staged games.
    pub fn with_supply(config: GameConfig, supply: CardSupply) -> Self {
        let mut state = Self::from_seats(
            config,
            supply,
            PlayerState::new(Color::White),
            PlayerState::new(Color::Black),
        );
        for color in [Color::White, Color::Black] {
            let hand = state.supply.deal_cards(state.config.hand_size);
            let court = state.supply.deal_cards(state.config.court_size);
            let player = state.player_mut(color);
            player.hand = hand.clone();
            player.court = court.clone();
            state.record_event(GameEvent::CardsDealt {
                player: color,
                hand,
                court,
            });
        }
        state
    }

    /// Assembles a state from explicit seats without dealing, e.g. to stage
    /// a position. White moves first.
    pub fn from_seats(
        config: GameConfig,
        supply: CardSupply,
        white: PlayerState,
        black: PlayerState,
    ) -> Self {
        Self {
            config,
            supply,
            white,
            black,
            power_chains: PowerChains::default(),
            current_player: Color::White,
            turn: 1,
            pending_joust: None,
            event_log: EventLog::default(),
            outcome: None,
        }
    }

    pub fn player(&self, color: Color) -> &PlayerState {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn player_mut(&mut self, color: Color) -> &mut PlayerState {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    pub fn power_chain(&self, color: Color) -> PowerChain {
        self.power_chains.get(color)
    }

    pub fn record_event(&mut self, event: GameEvent) -> &LoggedEvent {
        self.event_log.record(event)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Draws one card into `player`'s hand or Court. `None` once the supply is dry.
    pub fn draw_into(&mut self, player: Color, into: CardSource) -> Option<GameEvent> {
        let card = self.supply.draw_card()?;
        self.player_mut(player).cards_mut(into).push(card);
        let event = GameEvent::CardDrawn { player, card, into };
        self.record_event(event.clone());
        Some(event)
    }

    /// Draws until the hand is full or the supply runs out.
    pub fn top_up_hand(&mut self, player: Color) -> Vec<GameEvent> {
        let limit = self.config.hand_size;
        let mut events = Vec::new();
        while self.player(player).hand.len() < limit {
            match self.draw_into(player, CardSource::Hand) {
                Some(event) => events.push(event),
                None => {
                    tracing::debug!(%player, "supply exhausted, hand stays short");
                    break;
                }
            }
        }
        events
    }

    pub fn replenish_court(&mut self, player: Color) -> Vec<GameEvent> {
        let limit = self.config.court_size;
        let mut events = Vec::new();
        while self.player(player).court.len() < limit {
            match self.draw_into(player, CardSource::Court) {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }

    pub fn discard(&mut self, player: Color, card: Card) -> GameEvent {
        self.supply.discard_card(card);
        let event = GameEvent::CardDiscarded { player, card };
        self.record_event(event.clone());
        event
    }

    pub fn pass_turn(&mut self) -> GameEvent {
        let from = self.current_player;
        self.current_player = from.opponent();
        self.turn += 1;
        let event = GameEvent::TurnPassed {
            from,
            to: self.current_player,
        };
        self.record_event(event.clone());
        event
    }

    pub fn declare_outcome(&mut self, outcome: Outcome) -> Option<GameEvent> {
        if self.outcome.is_some() {
            return None;
        }
        self.outcome = Some(outcome);
        tracing::info!(winner = ?outcome.winner, reason = ?outcome.reason, "game over");
        let event = GameEvent::GameOver { outcome };
        self.record_event(event.clone());
        Some(event)
    }

    /// Checks card conservation and hand/Court bounds.
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let mut seen = HashSet::new();
        let held = [&self.white, &self.black]
            .into_iter()
            .flat_map(|player| player.hand.iter().chain(player.court.iter()));
        let pending = self.pending_joust.iter().map(|joust| &joust.card);
        for card in self.supply.cards().chain(held).chain(pending) {
            if !seen.insert(*card) {
                return Err(IntegrityError::DuplicateCard { card: *card });
            }
        }
        if seen.len() != DECK_SIZE {
            return Err(IntegrityError::CardCount {
                expected: DECK_SIZE,
                actual: seen.len(),
            });
        }

        for player in [&self.white, &self.black] {
            if player.hand.len() > self.config.hand_size {
                return Err(IntegrityError::HandOverflow {
                    player: player.color,
                    size: player.hand.len(),
                    limit: self.config.hand_size,
                });
            }
            if player.court.len() > self.config.court_size {
                return Err(IntegrityError::CourtOverflow {
                    player: player.color,
                    size: player.court.len(),
                    limit: self.config.court_size,
                });
            }
        }
        Ok(())
    }
}

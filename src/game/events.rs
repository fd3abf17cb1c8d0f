use serde::{Deserialize, Serialize};

use super::effects::{BoardMutation, EffectKind};
use super::joust::JoustOutcome;
use super::state::{CardSource, Outcome};
use crate::cards::Card;
use crate::chess::{ChessMove, Color, Piece};

/// 游戏事件流，按发生顺序记录。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    CardsDealt {
        player: Color,
        hand: Vec<Card>,
        court: Vec<Card>,
    },
    MoveMade {
        player: Color,
        #[serde(rename = "move")]
        mv: ChessMove,
        #[serde(skip_serializing_if = "Option::is_none")]
        captured: Option<Piece>,
    },
    CardPlayed {
        player: Color,
        card: Card,
        source: CardSource,
        boosted: bool,
    },
    EffectApplied {
        player: Color,
        card: Card,
        effect: EffectKind,
        mutations: Vec<BoardMutation>,
    },
    EffectFizzled {
        player: Color,
        card: Card,
        effect: EffectKind,
    },
    JoustOffered {
        attacker: Color,
        defender: Color,
        card: Card,
        royal_assassin: bool,
    },
    KingWarded {
        defender: Color,
        spade: Card,
    },
    JoustResolved {
        attacker_card: Card,
        #[serde(skip_serializing_if = "Option::is_none")]
        defender_card: Option<Card>,
        outcome: JoustOutcome,
    },
    CardDrawn {
        player: Color,
        card: Card,
        into: CardSource,
    },
    CardDiscarded {
        player: Color,
        card: Card,
    },
    TurnPassed {
        from: Color,
        to: Color,
    },
    GameOver {
        outcome: Outcome,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Move,
    Card,
    Turn,
}

impl GameEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            GameEvent::MoveMade { .. } => EventCategory::Move,
            GameEvent::TurnPassed { .. } | GameEvent::GameOver { .. } => EventCategory::Turn,
            _ => EventCategory::Card,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggedEvent {
    pub sequence: u64,
    pub event: GameEvent,
}

/// Append-only event record. Sequence numbers start at 1 and strictly increase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventLog {
    #[serde(default)]
    entries: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn record(&mut self, event: GameEvent) -> &LoggedEvent {
        let sequence = self.entries.last().map_or(1, |last| last.sequence + 1);
        self.entries.push(LoggedEvent { sequence, event });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    /// Entries recorded after the first `count` entries.
    pub fn since(&self, count: usize) -> &[LoggedEvent] {
        self.entries.get(count..).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LoggedEvent> {
        self.entries.last()
    }
}

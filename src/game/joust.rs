use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::effects::EffectPlan;
use crate::cards::{Card, CardId};
use crate::chess::Color;

/// 防守方对待决对决的回应。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum JoustDecision {
    /// Let the attack through.
    Decline,
    /// Commit a hand card face-down against the attacking card.
    Wager { card_id: CardId },
    /// Discard a Spade to block a Royal Assassin king removal. The strike
    /// then falls back to its named fallback piece, which `wager_id` may
    /// still contest.
    Ward {
        spade_id: CardId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wager_id: Option<CardId>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoustOutcome {
    Declined,
    AttackerWon,
    DefenderWon,
    Tied,
    /// King saved; the fallback piece was removed instead.
    Warded,
    /// King saved and no fallback was named; the card is spent for nothing.
    Fizzled,
}

impl JoustOutcome {
    pub fn attack_proceeds(self) -> bool {
        matches!(
            self,
            JoustOutcome::Declined | JoustOutcome::AttackerWon | JoustOutcome::Warded
        )
    }
}

/// Compares revealed cards by rank, Ace high. Suits never matter and a tie
/// goes to the defender.
pub fn duel(attacker: &Card, defender: &Card) -> JoustOutcome {
    match attacker.rank.cmp(&defender.rank) {
        Ordering::Greater => JoustOutcome::AttackerWon,
        Ordering::Less => JoustOutcome::DefenderWon,
        Ordering::Equal => JoustOutcome::Tied,
    }
}

/// A card play waiting on the defender. The played card is its wager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingJoust {
    pub attacker: Color,
    pub card: Card,
    pub plan: EffectPlan,
}

impl PendingJoust {
    pub fn defender(&self) -> Color {
        self.attacker.opponent()
    }

    pub fn is_royal_assassin(&self) -> bool {
        self.plan.royal.is_some()
    }
}

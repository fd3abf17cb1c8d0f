use serde::{Deserialize, Serialize};

use crate::cards::Suit;
use crate::chess::Color;

/// One player's run of consecutive same-suit card plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerChain {
    #[serde(default)]
    pub active_suit: Option<Suit>,
    #[serde(default)]
    pub count: u32,
}

impl PowerChain {
    /// Whether a play of `suit` continues the chain, evaluated before the play.
    pub fn is_boosted(&self, suit: Suit) -> bool {
        self.active_suit == Some(suit) && self.count >= 1
    }

    pub fn record(&mut self, suit: Suit) {
        if self.active_suit == Some(suit) {
            self.count += 1;
        } else {
            self.active_suit = Some(suit);
            self.count = 1;
        }
    }
}

/// Power chains of both players. Only card plays touch a chain, and only the
/// acting player's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerChains {
    white: PowerChain,
    black: PowerChain,
}

impl PowerChains {
    pub fn get(&self, player: Color) -> PowerChain {
        match player {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    fn get_mut(&mut self, player: Color) -> &mut PowerChain {
        match player {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    pub fn is_boosted(&self, player: Color, suit: Suit) -> bool {
        self.get(player).is_boosted(suit)
    }

    pub fn record(&mut self, player: Color, suit: Suit) {
        self.get_mut(player).record(suit);
    }
}

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::card::{standard_deck, Card};

fn entropy_rng() -> SmallRng {
    SmallRng::from_entropy()
}

/// Face-down draw pile plus discard pile shared by both players.
///
/// The top of the draw pile is the end of `draw_pile`. Cards held by players
/// live outside the supply; the supply never tracks them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSupply {
    draw_pile: Vec<Card>,
    #[serde(default)]
    discard_pile: Vec<Card>,
    #[serde(skip, default = "entropy_rng")]
    rng: SmallRng,
}

impl CardSupply {
    /// A full 52-card pile shuffled from fresh entropy.
    pub fn new() -> Self {
        Self::with_rng(entropy_rng())
    }

    /// A full pile whose shuffles are reproducible from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    /// A supply with a fixed draw order; the last card is drawn first.
    /// Used to stage deterministic games.
    pub fn from_piles(draw_pile: Vec<Card>, discard_pile: Vec<Card>) -> Self {
        Self {
            draw_pile,
            discard_pile,
            rng: entropy_rng(),
        }
    }

    fn with_rng(rng: SmallRng) -> Self {
        let mut supply = Self {
            draw_pile: standard_deck().to_vec(),
            discard_pile: Vec::new(),
            rng,
        };
        supply.draw_pile.shuffle(&mut supply.rng);
        supply
    }

    /// Rebuilds the full deck, reseeds and shuffles, and clears the discard pile.
    pub fn reset(&mut self) {
        let seed: u64 = entropy_rng().gen();
        self.reset_with_seed(seed);
    }

    pub fn reset_with_seed(&mut self, seed: u64) {
        *self = Self::with_seed(seed);
    }

    /// Draws one card, reshuffling the discard pile into the draw pile once
    /// if the draw pile is empty. `None` when both piles are exhausted.
    pub fn draw_card(&mut self) -> Option<Card> {
        if self.draw_pile.is_empty() {
            self.reshuffle_discards();
        }
        self.draw_pile.pop()
    }

    /// Draws up to `count` cards. Returns fewer when the supply runs dry.
    pub fn deal_cards(&mut self, count: usize) -> Vec<Card> {
        let mut dealt = Vec::with_capacity(count);
        for _ in 0..count {
            match self.draw_card() {
                Some(card) => dealt.push(card),
                None => break,
            }
        }
        dealt
    }

    /// Puts a card on the discard pile. Callers must not discard a card twice.
    pub fn discard_card(&mut self, card: Card) {
        self.discard_pile.push(card);
    }

    fn reshuffle_discards(&mut self) {
        if self.discard_pile.is_empty() {
            return;
        }
        tracing::debug!(cards = self.discard_pile.len(), "reshuffling discard pile into draw pile");
        self.draw_pile.append(&mut self.discard_pile);
        self.draw_pile.shuffle(&mut self.rng);
    }

    pub fn draw_pile(&self) -> &[Card] {
        &self.draw_pile
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn discard_pile_len(&self) -> usize {
        self.discard_pile.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.draw_pile.is_empty() && self.discard_pile.is_empty()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.draw_pile.iter().chain(self.discard_pile.iter())
    }
}

impl Default for CardSupply {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CardSupply {
    fn eq(&self, other: &Self) -> bool {
        self.draw_pile == other.draw_pile && self.discard_pile == other.discard_pile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card::DECK_SIZE;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn assert_conserved(supply: &CardSupply, held: &[Card]) {
        let mut seen = HashSet::new();
        for card in supply.cards().chain(held.iter()) {
            assert!(seen.insert(card.id()), "duplicate card {card}");
        }
        assert_eq!(seen.len(), DECK_SIZE);
    }

    #[test]
    fn new_supply_is_full_and_shuffled_independently() {
        let a = CardSupply::with_seed(1);
        let b = CardSupply::with_seed(2);
        assert_eq!(a.draw_pile_len(), DECK_SIZE);
        assert_eq!(a.discard_pile_len(), 0);
        assert_ne!(a.draw_pile(), b.draw_pile());
        assert_conserved(&a, &[]);
    }

    #[test]
    fn deal_returns_requested_cards_from_the_top() {
        let mut supply = CardSupply::with_seed(7);
        let top = *supply.draw_pile().last().expect("full pile");
        let hand = supply.deal_cards(5);
        assert_eq!(hand.len(), 5);
        assert_eq!(hand[0], top);
        assert_eq!(supply.draw_pile_len(), DECK_SIZE - 5);
        assert_conserved(&supply, &hand);
    }

    #[test]
    fn empty_draw_pile_reshuffles_discards() {
        let mut supply = CardSupply::with_seed(3);
        let mut held = supply.deal_cards(DECK_SIZE);
        assert_eq!(supply.draw_pile_len(), 0);
        for card in held.drain(..10) {
            supply.discard_card(card);
        }
        let drawn = supply.draw_card().expect("discards are reshuffled");
        held.push(drawn);
        assert_eq!(supply.discard_pile_len(), 0);
        assert_eq!(supply.draw_pile_len(), 9);
        assert_conserved(&supply, &held);
    }

    #[test]
    fn exhausted_supply_yields_nothing() {
        let mut supply = CardSupply::with_seed(4);
        let held = supply.deal_cards(60);
        assert_eq!(held.len(), DECK_SIZE);
        assert!(supply.is_exhausted());
        assert_eq!(supply.draw_card(), None);
        assert!(supply.deal_cards(3).is_empty());
    }

    #[test]
    fn reset_rebuilds_full_pile() {
        let mut supply = CardSupply::with_seed(5);
        let hand = supply.deal_cards(8);
        supply.discard_card(hand[0]);
        supply.reset();
        assert_eq!(supply.draw_pile_len(), DECK_SIZE);
        assert_eq!(supply.discard_pile_len(), 0);
        assert_conserved(&supply, &[]);
    }

    #[derive(Debug, Clone, Copy)]
    enum SupplyOp {
        Deal(usize),
        Draw,
        Discard(usize),
        Reset,
    }

    fn supply_op() -> impl Strategy<Value = SupplyOp> {
        prop_oneof![
            2 => (0usize..8).prop_map(SupplyOp::Deal),
            2 => Just(SupplyOp::Draw),
            5 => any::<usize>().prop_map(SupplyOp::Discard),
            1 => Just(SupplyOp::Reset),
        ]
    }

    fn is_conserved(supply: &CardSupply, held: &[Card]) -> bool {
        let mut seen = HashSet::new();
        supply
            .cards()
            .chain(held.iter())
            .all(|card| seen.insert(card.id()))
            && seen.len() == DECK_SIZE
    }

    proptest! {
        #[test]
        fn conservation_holds_over_any_operation_sequence(
            seed in any::<u64>(),
            ops in prop::collection::vec(supply_op(), 0..200),
        ) {
            let mut supply = CardSupply::with_seed(seed);
            let mut held: Vec<Card> = Vec::new();
            for op in ops {
                match op {
                    SupplyOp::Deal(count) => {
                        let available = supply.draw_pile_len() + supply.discard_pile_len();
                        let dealt = supply.deal_cards(count);
                        prop_assert_eq!(dealt.len(), count.min(available));
                        held.extend(dealt);
                    }
                    SupplyOp::Draw => {
                        let drawn = supply.draw_card();
                        prop_assert_eq!(drawn.is_none(), held.len() == DECK_SIZE);
                        held.extend(drawn);
                    }
                    SupplyOp::Discard(pick) => {
                        if !held.is_empty() {
                            let card = held.swap_remove(pick % held.len());
                            supply.discard_card(card);
                        }
                    }
                    SupplyOp::Reset => {
                        supply.reset();
                        held.clear();
                    }
                }
                prop_assert!(is_conserved(&supply, &held), "lost or duplicated a card after {:?}", op);
            }
        }
    }
}

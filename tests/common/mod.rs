#![allow(dead_code)]

use card_chess::game::PlayerState;
use card_chess::{standard_deck, Board, Card, CardSupply, Color, Game, GameConfig, GameState, Square};

pub fn sq(name: &str) -> Square {
    name.parse().expect("valid square")
}

pub fn cards(ids: &[&str]) -> Vec<Card> {
    ids.iter().map(|id| id.parse().expect("valid card")).collect()
}

/// Seats explicit hands and Courts on a FEN position. Every other card goes
/// to the draw pile in canonical order, so the Ace of Spades (when free) is
/// drawn first.
pub struct Table<'a> {
    pub fen: &'a str,
    pub white_hand: &'a [&'a str],
    pub white_court: &'a [&'a str],
    pub black_hand: &'a [&'a str],
    pub black_court: &'a [&'a str],
}

impl Table<'_> {
    pub fn seat(&self) -> Game<Board> {
        let white = PlayerState {
            color: Color::White,
            hand: cards(self.white_hand),
            court: cards(self.white_court),
        };
        let black = PlayerState {
            color: Color::Black,
            hand: cards(self.black_hand),
            court: cards(self.black_court),
        };
        let held: Vec<Card> = [&white, &black]
            .iter()
            .flat_map(|p| p.hand.iter().chain(p.court.iter()).copied())
            .collect();
        let draw = standard_deck()
            .iter()
            .filter(|card| !held.contains(card))
            .copied()
            .collect();
        let state = GameState::from_seats(
            GameConfig::default(),
            CardSupply::from_piles(draw, Vec::new()),
            white,
            black,
        );
        let board = Board::from_fen(self.fen).expect("valid fen");
        Game::from_parts(state, board)
    }
}

pub fn opening() -> Game<Board> {
    Table {
        fen: card_chess::START_FEN,
        white_hand: &["H5", "H9", "S3", "D2", "C9"],
        white_court: &["C2", "C3", "C4"],
        black_hand: &["HK", "D3", "D7", "CQ", "S9"],
        black_court: &["C5", "C6", "C7"],
    }
    .seat()
}

pub fn held_by(game: &Game<Board>, player: Color, id: &str) -> bool {
    game.hand(player).iter().any(|card| card.has_id(id))
}

pub fn discarded(game: &Game<Board>, id: &str) -> bool {
    game.state()
        .supply
        .discard_pile()
        .iter()
        .any(|card| card.has_id(id))
}

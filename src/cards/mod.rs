//! 扑克牌模型与双方共用的抽牌堆、弃牌堆。

pub mod card;
pub mod supply;

pub use card::{standard_deck, Card, CardId, CardParseError, Rank, Suit, DECK_SIZE};
pub use supply::CardSupply;

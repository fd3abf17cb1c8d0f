//! 棋盘侧模块：卡牌规则所依赖的适配器接口，以及内置的棋盘实现。

pub mod adapter;
pub mod board;

pub use adapter::{ChessAdapter, ChessMove, Color, Piece, PieceKind, Square, SquareParseError};
pub use board::{square_attacked, Board, FenError, START_FEN};

use std::fmt;

use thiserror::Error;

use super::adapter::{ChessAdapter, ChessMove, Color, Piece, PieceKind, Square};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w";

const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];
const KING_DELTAS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected 8 ranks in placement, found {0}")]
    RankCount(usize),
    #[error("rank {rank} does not describe exactly 8 squares")]
    RankWidth { rank: usize },
    #[error("unknown piece letter '{0}'")]
    UnknownPiece(char),
    #[error("unknown side to move '{0}'")]
    UnknownSide(String),
}

/// Mailbox board implementing [`ChessAdapter`].
///
/// Generates legal moves for every piece type with king safety and
/// promotion. Castling and en passant are not generated.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; 64],
    turn: Color,
}

impl Board {
    pub fn empty(turn: Color) -> Self {
        Self {
            squares: [None; 64],
            turn,
        }
    }

    pub fn standard() -> Self {
        match Self::from_fen(START_FEN) {
            Ok(board) => board,
            Err(_) => unreachable!("start position parses"),
        }
    }

    /// Parses the placement and optional side-to-move fields of a FEN string.
    /// Remaining fields are ignored.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().unwrap_or_default();
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount(ranks.len()));
        }

        let turn = match fields.next() {
            None | Some("w") => Color::White,
            Some("b") => Color::Black,
            Some(other) => return Err(FenError::UnknownSide(other.into())),
        };

        let mut board = Self::empty(turn);
        for (row, text) in ranks.iter().enumerate() {
            let rank = 7 - row as u8;
            let mut file = 0u8;
            for ch in text.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file = file
                        .checked_add(skip as u8)
                        .filter(|width| *width <= 8)
                        .ok_or(FenError::RankWidth {
                            rank: rank as usize + 1,
                        })?;
                    continue;
                }
                let piece = Piece::from_fen_char(ch).ok_or(FenError::UnknownPiece(ch))?;
                let square = Square::new(file, rank).ok_or(FenError::RankWidth { rank: rank as usize + 1 })?;
                board.squares[square.index()] = Some(piece);
                file += 1;
            }
            if file != 8 {
                return Err(FenError::RankWidth {
                    rank: rank as usize + 1,
                });
            }
        }
        Ok(board)
    }

    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut gap = 0;
            for file in 0..8u8 {
                let piece = Square::new(file, rank).and_then(|sq| self.squares[sq.index()]);
                match piece {
                    Some(piece) => {
                        if gap > 0 {
                            out.push_str(&gap.to_string());
                            gap = 0;
                        }
                        out.push(piece.fen_char());
                    }
                    None => gap += 1,
                }
            }
            if gap > 0 {
                out.push_str(&gap.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out.push_str(match self.turn {
            Color::White => " w",
            Color::Black => " b",
        });
        out
    }

    fn get(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    fn pawn_dir(color: Color) -> i8 {
        match color {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    fn last_rank(color: Color) -> u8 {
        match color {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Destinations reachable by the piece on `from`, ignoring king safety.
    fn pseudo_targets(&self, from: Square) -> Vec<Square> {
        let piece = match self.get(from) {
            Some(piece) => piece,
            None => return Vec::new(),
        };
        let mut targets = Vec::new();
        // Kings are never captured; check and mate end the game first.
        let capturable = |p: Piece| p.color != piece.color && !p.is_king();
        let open_or_enemy = |sq: Square| self.get(sq).map_or(true, capturable);

        match piece.kind {
            PieceKind::Pawn => {
                let dir = Self::pawn_dir(piece.color);
                let start_rank = match piece.color {
                    Color::White => 1,
                    Color::Black => 6,
                };
                if let Some(one) = from.offset(0, dir).filter(|sq| self.get(*sq).is_none()) {
                    targets.push(one);
                    if from.rank() == start_rank {
                        if let Some(two) = one.offset(0, dir).filter(|sq| self.get(*sq).is_none()) {
                            targets.push(two);
                        }
                    }
                }
                for df in [-1, 1] {
                    if let Some(diag) = from.offset(df, dir) {
                        if self.get(diag).is_some_and(capturable) {
                            targets.push(diag);
                        }
                    }
                }
            }
            PieceKind::Knight | PieceKind::King => {
                let deltas = if piece.kind == PieceKind::Knight {
                    &KNIGHT_DELTAS
                } else {
                    &KING_DELTAS
                };
                targets.extend(
                    deltas
                        .iter()
                        .filter_map(|(df, dr)| from.offset(*df, *dr))
                        .filter(|sq| open_or_enemy(*sq)),
                );
            }
            PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
                let dirs: Vec<(i8, i8)> = match piece.kind {
                    PieceKind::Bishop => BISHOP_DIRS.to_vec(),
                    PieceKind::Rook => ROOK_DIRS.to_vec(),
                    _ => ROOK_DIRS.iter().chain(BISHOP_DIRS.iter()).copied().collect(),
                };
                for (df, dr) in dirs {
                    let mut cursor = from;
                    while let Some(next) = cursor.offset(df, dr) {
                        match self.get(next) {
                            None => targets.push(next),
                            Some(other) => {
                                if capturable(other) {
                                    targets.push(next);
                                }
                                break;
                            }
                        }
                        cursor = next;
                    }
                }
            }
        }
        targets
    }

    fn is_attacked_by(&self, target: Square, by: Color) -> bool {
        square_attacked(|sq| self.get(sq), target, by)
    }

    fn play_unchecked(&mut self, mv: &ChessMove) {
        let moving = self.squares[mv.from.index()].take();
        let placed = moving.map(|piece| {
            if piece.kind == PieceKind::Pawn && mv.to.rank() == Self::last_rank(piece.color) {
                Piece::new(mv.promotion.unwrap_or(PieceKind::Queen), piece.color)
            } else {
                piece
            }
        });
        self.squares[mv.to.index()] = placed;
    }

    fn leaves_king_safe(&self, mv: &ChessMove, color: Color) -> bool {
        let mut scratch = self.clone();
        scratch.play_unchecked(mv);
        !scratch.is_in_check(color)
    }

    fn has_legal_move(&self, color: Color) -> bool {
        Square::all()
            .filter(|sq| self.get(*sq).is_some_and(|p| p.color == color))
            .any(|from| {
                self.pseudo_targets(from)
                    .into_iter()
                    .any(|to| self.leaves_king_safe(&ChessMove::new(from, to), color))
            })
    }

    /// All legal moves for the side to move. Promotions are listed as queen moves.
    pub fn legal_moves(&self) -> Vec<ChessMove> {
        let color = self.turn;
        Square::all()
            .filter(|sq| self.get(*sq).is_some_and(|p| p.color == color))
            .flat_map(|from| {
                self.pseudo_targets(from)
                    .into_iter()
                    .map(move |to| ChessMove::new(from, to))
            })
            .filter(|mv| self.leaves_king_safe(mv, color))
            .collect()
    }
}

/// Whether any piece of color `by` attacks `target`, reading the position
/// through `lookup`. Lets callers test positions that only exist as an
/// overlay on top of a board.
pub fn square_attacked(lookup: impl Fn(Square) -> Option<Piece>, target: Square, by: Color) -> bool {
    let holds = |sq: Option<Square>, kinds: &[PieceKind]| {
        sq.and_then(&lookup)
            .is_some_and(|p| p.color == by && kinds.contains(&p.kind))
    };

    let pawn_rank = -Board::pawn_dir(by);
    if holds(target.offset(-1, pawn_rank), &[PieceKind::Pawn])
        || holds(target.offset(1, pawn_rank), &[PieceKind::Pawn])
    {
        return true;
    }
    if KNIGHT_DELTAS
        .iter()
        .any(|(df, dr)| holds(target.offset(*df, *dr), &[PieceKind::Knight]))
    {
        return true;
    }
    if KING_DELTAS
        .iter()
        .any(|(df, dr)| holds(target.offset(*df, *dr), &[PieceKind::King]))
    {
        return true;
    }

    let rays = [
        (&ROOK_DIRS, [PieceKind::Rook, PieceKind::Queen]),
        (&BISHOP_DIRS, [PieceKind::Bishop, PieceKind::Queen]),
    ];
    for (dirs, sliders) in rays {
        for (df, dr) in dirs.iter() {
            let mut cursor = target;
            while let Some(next) = cursor.offset(*df, *dr) {
                if let Some(piece) = lookup(next) {
                    if piece.color == by && sliders.contains(&piece.kind) {
                        return true;
                    }
                    break;
                }
                cursor = next;
            }
        }
    }
    false
}

impl ChessAdapter for Board {
    fn is_legal_move(&self, mv: &ChessMove) -> bool {
        let piece = match self.get(mv.from) {
            Some(piece) if piece.color == self.turn => piece,
            _ => return false,
        };
        if matches!(mv.promotion, Some(PieceKind::King | PieceKind::Pawn)) {
            return false;
        }
        if mv.promotion.is_some()
            && !(piece.kind == PieceKind::Pawn && mv.to.rank() == Self::last_rank(piece.color))
        {
            return false;
        }
        self.pseudo_targets(mv.from).contains(&mv.to) && self.leaves_king_safe(mv, piece.color)
    }

    fn apply_move(&mut self, mv: &ChessMove) -> bool {
        if !self.is_legal_move(mv) {
            return false;
        }
        self.play_unchecked(mv);
        self.turn = self.turn.opponent();
        true
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.get(square)
    }

    fn remove_piece_at(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.index()].take()
    }

    fn place_piece(&mut self, square: Square, piece: Piece) {
        self.squares[square.index()] = Some(piece);
    }

    fn is_in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .is_some_and(|king| self.is_attacked_by(king, color.opponent()))
    }

    fn is_checkmate(&self) -> bool {
        self.is_in_check(self.turn) && !self.has_legal_move(self.turn)
    }

    fn is_stalemate(&self) -> bool {
        !self.is_in_check(self.turn) && !self.has_legal_move(self.turn)
    }

    fn turn(&self) -> Color {
        self.turn
    }

    fn set_turn(&mut self, color: Color) {
        self.turn = color;
    }

    fn king_square(&self, color: Color) -> Option<Square> {
        Square::all().find(|sq| {
            self.get(*sq)
                .is_some_and(|p| p.is_king() && p.color == color)
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Board").field(&self.to_fen()).finish()
    }
}

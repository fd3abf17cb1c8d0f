use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cards::{Card, Suit};
use crate::chess::{square_attacked, ChessAdapter, Color, Piece, PieceKind, Square};

/// Effect family triggered by a suit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Rescue,
    Upgrade,
    Swap,
    Strike,
}

impl EffectKind {
    pub fn for_suit(suit: Suit) -> Self {
        match suit {
            Suit::Hearts => EffectKind::Rescue,
            Suit::Diamonds => EffectKind::Upgrade,
            Suit::Clubs => EffectKind::Swap,
            Suit::Spades => EffectKind::Strike,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EffectKind::Rescue => "rescue",
            EffectKind::Upgrade => "upgrade",
            EffectKind::Swap => "swap",
            EffectKind::Strike => "strike",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relocation {
    pub from: Square,
    pub to: Square,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SquarePair {
    pub a: Square,
    pub b: Square,
}

/// Targets chosen for a card play, one shape per effect family.
///
/// `secondary` is only accepted while the play continues a power chain.
/// `fallback` names the piece a Royal Assassin strike removes instead when
/// the defender wards the king.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "effect", rename_all = "lowercase")]
pub enum CardTargets {
    Rescue {
        primary: Relocation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary: Option<Relocation>,
    },
    Upgrade {
        primary: Square,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary: Option<Square>,
    },
    Swap {
        primary: SquarePair,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary: Option<SquarePair>,
    },
    Strike {
        primary: Square,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary: Option<Square>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<Square>,
    },
}

impl CardTargets {
    pub fn kind(&self) -> EffectKind {
        match self {
            CardTargets::Rescue { .. } => EffectKind::Rescue,
            CardTargets::Upgrade { .. } => EffectKind::Upgrade,
            CardTargets::Swap { .. } => EffectKind::Swap,
            CardTargets::Strike { .. } => EffectKind::Strike,
        }
    }

    pub fn rescue(from: Square, to: Square) -> Self {
        CardTargets::Rescue {
            primary: Relocation { from, to },
            secondary: None,
        }
    }

    pub fn upgrade(square: Square) -> Self {
        CardTargets::Upgrade {
            primary: square,
            secondary: None,
        }
    }

    pub fn swap(a: Square, b: Square) -> Self {
        CardTargets::Swap {
            primary: SquarePair { a, b },
            secondary: None,
        }
    }

    pub fn strike(square: Square) -> Self {
        CardTargets::Strike {
            primary: square,
            secondary: None,
            fallback: None,
        }
    }
}

/// A raw board change issued through the adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BoardMutation {
    Relocate { from: Square, to: Square },
    Promote { square: Square, to: PieceKind },
    Exchange { a: Square, b: Square },
    Remove { square: Square },
}

/// Reason a target fails validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetError {
    #[error("a {expected} card cannot use {actual} targets")]
    WrongEffect {
        expected: EffectKind,
        actual: EffectKind,
    },
    #[error("there is no piece on {square}")]
    EmptySquare { square: Square },
    #[error("{square} is occupied")]
    Occupied { square: Square },
    #[error("the piece on {square} is not yours")]
    NotOwnPiece { square: Square },
    #[error("the piece on {square} is not an opponent piece")]
    NotOpponentPiece { square: Square },
    #[error("the piece on {square} is not a pawn")]
    NotAPawn { square: Square },
    #[error("the piece on {square} is already a queen")]
    AlreadyQueen { square: Square },
    #[error("only an Ace may target the king on {square}")]
    KingRequiresAce { square: Square },
    #[error("the king on {square} cannot be targeted by this effect")]
    KingNotEligible { square: Square },
    #[error("the king on {square} is not in check")]
    KingNotInCheck { square: Square },
    #[error("{square} is targeted twice")]
    DuplicateTarget { square: Square },
    #[error("the boosted {effect} needs a second target")]
    MissingTarget { effect: EffectKind },
    #[error("a second {effect} target needs an active power chain")]
    UnexpectedTarget { effect: EffectKind },
    #[error("a fallback target only applies when an Ace strikes the king")]
    UnexpectedFallback,
    #[error("the play leaves your king on {square} in check")]
    KingExposed { square: Square },
}

/// King removal authorised by the Ace of Spades.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoyalStrike {
    pub king: Square,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Square>,
}

/// A validated effect, ready to be applied or contested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectPlan {
    pub kind: EffectKind,
    pub player: Color,
    pub ace: bool,
    pub boosted: bool,
    pub mutations: Vec<BoardMutation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub royal: Option<RoyalStrike>,
    /// Whether any mutation touches an opponent piece, which opens a joust.
    pub contested: bool,
}

impl EffectPlan {
    /// The plan after the defender wards the king: the king removal is
    /// replaced by the fallback removal. `None` if no fallback was named.
    pub fn warded(&self) -> Option<EffectPlan> {
        let royal = self.royal?;
        let fallback = royal.fallback?;
        let mutations = self
            .mutations
            .iter()
            .map(|mutation| match mutation {
                BoardMutation::Remove { square } if *square == royal.king => {
                    BoardMutation::Remove { square: fallback }
                }
                other => *other,
            })
            .collect();
        Some(EffectPlan {
            mutations,
            royal: None,
            ..self.clone()
        })
    }
}

/// Board view with pending mutations layered on top, so multi-step effects
/// validate each step against the result of the previous one.
struct Preview<'a, A: ChessAdapter + ?Sized> {
    board: &'a A,
    overrides: Vec<(Square, Option<Piece>)>,
}

impl<'a, A: ChessAdapter + ?Sized> Preview<'a, A> {
    fn new(board: &'a A) -> Self {
        Self {
            board,
            overrides: Vec::new(),
        }
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.overrides
            .iter()
            .rev()
            .find(|(sq, _)| *sq == square)
            .map(|(_, piece)| *piece)
            .unwrap_or_else(|| self.board.piece_at(square))
    }

    fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.overrides.push((square, piece));
    }

    fn apply(&mut self, mutation: &BoardMutation) {
        match *mutation {
            BoardMutation::Relocate { from, to } => {
                let piece = self.piece_at(from);
                self.set(from, None);
                self.set(to, piece);
            }
            BoardMutation::Promote { square, to } => {
                let piece = self.piece_at(square).map(|p| Piece::new(to, p.color));
                self.set(square, piece);
            }
            BoardMutation::Exchange { a, b } => {
                let (pa, pb) = (self.piece_at(a), self.piece_at(b));
                self.set(a, pb);
                self.set(b, pa);
            }
            BoardMutation::Remove { square } => self.set(square, None),
        }
    }
}

struct Planner<'a, A: ChessAdapter + ?Sized> {
    preview: Preview<'a, A>,
    player: Color,
    ace: bool,
    boosted: bool,
    mutations: Vec<BoardMutation>,
}

impl<'a, A: ChessAdapter + ?Sized> Planner<'a, A> {
    fn push(&mut self, mutation: BoardMutation) {
        self.preview.apply(&mutation);
        self.mutations.push(mutation);
    }

    fn occupant(&self, square: Square) -> Result<Piece, TargetError> {
        self.preview
            .piece_at(square)
            .ok_or(TargetError::EmptySquare { square })
    }

    fn own_piece(&self, square: Square) -> Result<Piece, TargetError> {
        let piece = self.occupant(square)?;
        if piece.color != self.player {
            return Err(TargetError::NotOwnPiece { square });
        }
        Ok(piece)
    }

    fn opponent_piece(&self, square: Square) -> Result<Piece, TargetError> {
        let piece = self.occupant(square)?;
        if piece.color == self.player {
            return Err(TargetError::NotOpponentPiece { square });
        }
        Ok(piece)
    }

    /// Rejects the plan if its final position leaves the acting king attacked.
    fn ensure_king_safe(&self) -> Result<(), TargetError> {
        let own_king = Square::all().find(|square| {
            self.preview
                .piece_at(*square)
                .is_some_and(|piece| piece.is_king() && piece.color == self.player)
        });
        match own_king {
            Some(square)
                if square_attacked(|sq| self.preview.piece_at(sq), square, self.player.opponent()) =>
            {
                Err(TargetError::KingExposed { square })
            }
            _ => Ok(()),
        }
    }

    fn allow_secondary<T>(&self, effect: EffectKind, secondary: Option<T>) -> Result<Option<T>, TargetError> {
        if secondary.is_some() && !self.boosted {
            return Err(TargetError::UnexpectedTarget { effect });
        }
        Ok(secondary)
    }

    fn rescue(&mut self, primary: Relocation, secondary: Option<Relocation>) -> Result<(), TargetError> {
        let secondary = self.allow_secondary(EffectKind::Rescue, secondary)?;
        if let Some(second) = secondary {
            if second.from == primary.to {
                return Err(TargetError::DuplicateTarget {
                    square: second.from,
                });
            }
        }
        for relocation in std::iter::once(primary).chain(secondary) {
            let piece = self.own_piece(relocation.from)?;
            if piece.is_king() && !self.ace {
                return Err(TargetError::KingRequiresAce {
                    square: relocation.from,
                });
            }
            if self.preview.piece_at(relocation.to).is_some() {
                return Err(TargetError::Occupied {
                    square: relocation.to,
                });
            }
            self.push(BoardMutation::Relocate {
                from: relocation.from,
                to: relocation.to,
            });
        }
        Ok(())
    }

    fn upgrade(&mut self, primary: Square, secondary: Option<Square>) -> Result<(), TargetError> {
        let secondary = self.allow_secondary(EffectKind::Upgrade, secondary)?;
        if secondary == Some(primary) {
            return Err(TargetError::DuplicateTarget { square: primary });
        }
        // An Ace lets exactly one non-pawn be promoted.
        let mut non_pawn_allowance = usize::from(self.ace);
        for square in std::iter::once(primary).chain(secondary) {
            let piece = self.own_piece(square)?;
            match piece.kind {
                PieceKind::King => return Err(TargetError::KingNotEligible { square }),
                PieceKind::Queen => return Err(TargetError::AlreadyQueen { square }),
                PieceKind::Pawn => {}
                _ => {
                    if non_pawn_allowance == 0 {
                        return Err(TargetError::NotAPawn { square });
                    }
                    non_pawn_allowance -= 1;
                }
            }
            self.push(BoardMutation::Promote {
                square,
                to: PieceKind::Queen,
            });
        }
        Ok(())
    }

    fn swap(&mut self, primary: SquarePair, secondary: Option<SquarePair>) -> Result<bool, TargetError> {
        let secondary = self.allow_secondary(EffectKind::Swap, secondary)?;
        if primary.a == primary.b {
            return Err(TargetError::DuplicateTarget { square: primary.a });
        }
        let pa = self.occupant(primary.a)?;
        let pb = self.occupant(primary.b)?;
        let (own_a, own_b) = (pa.color == self.player, pb.color == self.player);
        if self.ace {
            match (own_a, own_b) {
                (true, true) => return Err(TargetError::NotOpponentPiece { square: primary.b }),
                (false, false) => return Err(TargetError::NotOwnPiece { square: primary.a }),
                _ => {}
            }
        } else if !own_a {
            return Err(TargetError::NotOwnPiece { square: primary.a });
        } else if !own_b {
            return Err(TargetError::NotOwnPiece { square: primary.b });
        }
        self.push(BoardMutation::Exchange {
            a: primary.a,
            b: primary.b,
        });
        let mut contested = self.ace;

        if self.boosted {
            match secondary {
                Some(pair) => {
                    if pair.a == pair.b {
                        return Err(TargetError::DuplicateTarget { square: pair.a });
                    }
                    self.opponent_piece(pair.a)?;
                    self.opponent_piece(pair.b)?;
                    self.push(BoardMutation::Exchange {
                        a: pair.a,
                        b: pair.b,
                    });
                    contested = true;
                }
                None => {
                    let opponent_pieces = self
                        .preview
                        .board
                        .pieces()
                        .iter()
                        .filter(|(_, piece)| piece.color != self.player)
                        .count();
                    if opponent_pieces >= 2 {
                        return Err(TargetError::MissingTarget {
                            effect: EffectKind::Swap,
                        });
                    }
                }
            }
        }
        Ok(contested)
    }

    fn strike(
        &mut self,
        primary: Square,
        secondary: Option<Square>,
        fallback: Option<Square>,
    ) -> Result<Option<RoyalStrike>, TargetError> {
        let secondary = self.allow_secondary(EffectKind::Strike, secondary)?;
        if secondary == Some(primary) {
            return Err(TargetError::DuplicateTarget { square: primary });
        }
        let opponent = self.player.opponent();
        let mut royal = None;
        for square in std::iter::once(primary).chain(secondary) {
            let piece = self.opponent_piece(square)?;
            if piece.is_king() {
                if !self.ace {
                    return Err(TargetError::KingRequiresAce { square });
                }
                if !self.preview.board.is_in_check(opponent) {
                    return Err(TargetError::KingNotInCheck { square });
                }
                royal = Some(square);
            }
            self.push(BoardMutation::Remove { square });
        }

        match (royal, fallback) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(TargetError::UnexpectedFallback),
            (Some(king), None) => {
                // A ward falls back to another piece, so one must be named
                // while any candidate is left.
                let candidate = self.preview.board.pieces().into_iter().any(|(square, piece)| {
                    piece.color == opponent
                        && !piece.is_king()
                        && square != primary
                        && Some(square) != secondary
                });
                if candidate {
                    return Err(TargetError::MissingTarget {
                        effect: EffectKind::Strike,
                    });
                }
                Ok(Some(RoyalStrike {
                    king,
                    fallback: None,
                }))
            }
            (Some(king), Some(square)) => {
                if square == primary || Some(square) == secondary {
                    return Err(TargetError::DuplicateTarget { square });
                }
                let piece = self
                    .preview
                    .board
                    .piece_at(square)
                    .ok_or(TargetError::EmptySquare { square })?;
                if piece.color == self.player {
                    return Err(TargetError::NotOpponentPiece { square });
                }
                if piece.is_king() {
                    return Err(TargetError::KingNotEligible { square });
                }
                Ok(Some(RoyalStrike {
                    king,
                    fallback: Some(square),
                }))
            }
        }
    }
}

/// Validates `targets` for `card` and returns the mutations to apply.
/// Never touches the board.
pub fn plan_effect<A: ChessAdapter + ?Sized>(
    card: &Card,
    targets: &CardTargets,
    boosted: bool,
    player: Color,
    board: &A,
) -> Result<EffectPlan, TargetError> {
    let kind = EffectKind::for_suit(card.suit);
    if targets.kind() != kind {
        return Err(TargetError::WrongEffect {
            expected: kind,
            actual: targets.kind(),
        });
    }

    let mut planner = Planner {
        preview: Preview::new(board),
        player,
        ace: card.is_ace(),
        boosted,
        mutations: Vec::new(),
    };

    let mut royal = None;
    let contested = match *targets {
        CardTargets::Rescue { primary, secondary } => {
            planner.rescue(primary, secondary)?;
            false
        }
        CardTargets::Upgrade { primary, secondary } => {
            planner.upgrade(primary, secondary)?;
            false
        }
        CardTargets::Swap { primary, secondary } => planner.swap(primary, secondary)?,
        CardTargets::Strike {
            primary,
            secondary,
            fallback,
        } => {
            royal = planner.strike(primary, secondary, fallback)?;
            true
        }
    };
    planner.ensure_king_safe()?;

    Ok(EffectPlan {
        kind,
        player,
        ace: planner.ace,
        boosted,
        mutations: planner.mutations,
        royal,
        contested,
    })
}

/// Issues the plan's mutations through the adapter.
pub fn apply_plan<A: ChessAdapter + ?Sized>(plan: &EffectPlan, board: &mut A) {
    for mutation in &plan.mutations {
        match *mutation {
            BoardMutation::Relocate { from, to } => {
                if let Some(piece) = board.remove_piece_at(from) {
                    board.place_piece(to, piece);
                }
            }
            BoardMutation::Promote { square, to } => {
                if let Some(piece) = board.remove_piece_at(square) {
                    board.place_piece(square, Piece::new(to, piece.color));
                }
            }
            BoardMutation::Exchange { a, b } => {
                let pa = board.remove_piece_at(a);
                let pb = board.remove_piece_at(b);
                if let Some(piece) = pb {
                    board.place_piece(a, piece);
                }
                if let Some(piece) = pa {
                    board.place_piece(b, piece);
                }
            }
            BoardMutation::Remove { square } => {
                board.remove_piece_at(square);
            }
        }
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::effects::{apply_plan, plan_effect, CardTargets, EffectKind, EffectPlan, TargetError};
use super::engine::Game;
use super::events::GameEvent;
use super::joust::{duel, JoustDecision, JoustOutcome, PendingJoust};
use super::state::{CardSource, IntegrityError, Outcome, OutcomeReason};
use crate::cards::{Card, CardId, Suit};
use crate::chess::{ChessAdapter, ChessMove, Color, PieceKind, Square};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveAction {
    pub player: Color,
    pub from: Square,
    pub to: Square,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceKind>,
}

impl MoveAction {
    pub fn new(player: Color, from: Square, to: Square) -> Self {
        Self {
            player,
            from,
            to,
            promotion: None,
        }
    }

    pub fn chess_move(&self) -> ChessMove {
        ChessMove {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayCardAction {
    pub player: Color,
    pub card_id: CardId,
    #[serde(default = "hand_source")]
    pub source: CardSource,
    pub targets: CardTargets,
}

fn hand_source() -> CardSource {
    CardSource::Hand
}

impl PlayCardAction {
    pub fn from_hand(player: Color, card_id: impl Into<CardId>, targets: CardTargets) -> Self {
        Self {
            player,
            card_id: card_id.into(),
            source: CardSource::Hand,
            targets,
        }
    }

    pub fn from_court(player: Color, card_id: impl Into<CardId>, targets: CardTargets) -> Self {
        Self {
            source: CardSource::Court,
            ..Self::from_hand(player, card_id, targets)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoustResponse {
    pub player: Color,
    pub answer: JoustDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoustResolution {
    pub outcome: JoustOutcome,
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("the game is over")]
    GameFinished,
    #[error("it is {expected}'s turn, not {actual}'s")]
    InvalidTurn { expected: Color, actual: Color },
    #[error("card {card_id} is not in the {location}")]
    CardNotFound {
        card_id: CardId,
        location: CardSource,
    },
    #[error("illegal target: {reason}")]
    IllegalTarget { reason: TargetError },
    #[error("{from}-{to} is not a legal chess move")]
    NoLegalChessMove { from: Square, to: Square },
    #[error("a joust is waiting for the defender")]
    JoustPending,
    #[error("no joust is pending")]
    JoustNotPending,
    #[error("the defender has no hand card to wager")]
    NoCardToWager,
    #[error("only a Royal Assassin strike can be warded")]
    WardUnavailable,
    #[error("card {card_id} is not a Spade")]
    NotASpade { card_id: CardId },
    #[error("card {card_id} cannot both ward the king and be wagered")]
    WardCardWagered { card_id: CardId },
    #[error("game state is corrupt: {error}")]
    IntegrityViolation { error: IntegrityError },
}

impl From<TargetError> for RuleError {
    fn from(reason: TargetError) -> Self {
        RuleError::IllegalTarget { reason }
    }
}

/// Defender cards and the effect that survives a joust, decided before any
/// state is touched.
struct JoustVerdict {
    outcome: JoustOutcome,
    plan: Option<EffectPlan>,
    spade: Option<Card>,
    wager: Option<Card>,
}

impl<A: ChessAdapter> Game<A> {
    fn ensure_active(&self) -> Result<(), RuleError> {
        if self.state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        self.state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn ensure_no_joust(&self) -> Result<(), RuleError> {
        if self.state.pending_joust.is_some() {
            return Err(RuleError::JoustPending);
        }
        Ok(())
    }

    fn ensure_turn_owner(&self, player: Color) -> Result<(), RuleError> {
        if self.state.current_player != player {
            return Err(RuleError::InvalidTurn {
                expected: self.state.current_player,
                actual: player,
            });
        }
        Ok(())
    }

    fn record(&mut self, events: &mut Vec<GameEvent>, event: GameEvent) {
        self.state.record_event(event.clone());
        events.push(event);
    }

    /// Plays a chess move through the adapter. Does not draw a card unless
    /// `draw_after_move` is configured.
    pub fn make_move(&mut self, action: MoveAction) -> Result<Vec<GameEvent>, RuleError> {
        self.ensure_active()?;
        self.ensure_no_joust()?;
        self.ensure_turn_owner(action.player)?;

        let mv = action.chess_move();
        let illegal = RuleError::NoLegalChessMove {
            from: mv.from,
            to: mv.to,
        };
        if !self.board.is_legal_move(&mv) {
            return Err(illegal);
        }
        let captured = self.board.piece_at(mv.to);
        if !self.board.apply_move(&mv) {
            return Err(illegal);
        }

        let mark = self.state.event_log.len();
        let player = action.player;
        let mut events = Vec::new();
        self.record(
            &mut events,
            GameEvent::MoveMade {
                player,
                mv,
                captured,
            },
        );
        tracing::debug!(%player, from = %mv.from, to = %mv.to, "move applied");

        if self.state.config.draw_after_move {
            events.extend(self.state.top_up_hand(player));
        }
        if self.board.turn() != player.opponent() {
            tracing::warn!(%player, "chess adapter kept the turn after a move, resyncing");
        }
        events.extend(self.finish_turn(player));
        self.notify_since(mark);
        Ok(events)
    }

    /// Plays a card from hand or Court. When the effect reaches an opponent
    /// piece and the defender holds hand cards, the play stops at a pending
    /// joust and the turn passes only once [`Game::resolve_joust`] settles it.
    pub fn play_card(&mut self, action: PlayCardAction) -> Result<Vec<GameEvent>, RuleError> {
        self.ensure_active()?;
        self.ensure_no_joust()?;
        self.ensure_turn_owner(action.player)?;

        let player = action.player;
        let not_found = || RuleError::CardNotFound {
            card_id: action.card_id.clone(),
            location: action.source,
        };
        let card = self
            .state
            .player(player)
            .find_card(action.source, &action.card_id)
            .ok_or_else(not_found)?;
        let boosted = self.state.power_chains.is_boosted(player, card.suit);
        let plan = plan_effect(&card, &action.targets, boosted, player, &self.board)?;

        let card = self
            .state
            .player_mut(player)
            .take_card(action.source, &action.card_id)
            .ok_or_else(not_found)?;
        let mark = self.state.event_log.len();
        let mut events = Vec::new();
        self.record(
            &mut events,
            GameEvent::CardPlayed {
                player,
                card,
                source: action.source,
                boosted,
            },
        );
        if action.source == CardSource::Court {
            events.extend(self.state.replenish_court(player));
        }
        self.state.power_chains.record(player, card.suit);
        tracing::debug!(%player, %card, boosted, "card played");

        let defender = player.opponent();
        if plan.contested && !self.state.player(defender).hand.is_empty() {
            let royal_assassin = plan.royal.is_some();
            self.state.pending_joust = Some(PendingJoust {
                attacker: player,
                card,
                plan,
            });
            self.record(
                &mut events,
                GameEvent::JoustOffered {
                    attacker: player,
                    defender,
                    card,
                    royal_assassin,
                },
            );
            tracing::info!(%player, %defender, %card, royal_assassin, "joust offered");
        } else {
            events.extend(self.complete_play(player, card, plan.kind, Some(plan)));
        }

        self.notify_since(mark);
        Ok(events)
    }

    /// Settles a pending joust with the defender's answer.
    ///
    /// A wager is revealed against the played card: the attack goes through
    /// only on a strictly higher attacker rank. A ward discards a Spade to
    /// save the king from a Royal Assassin; the strike then hits its fallback
    /// piece, or fizzles if none was named (a wager is then not taken).
    /// Every card committed here is discarded.
    pub fn resolve_joust(&mut self, response: JoustResponse) -> Result<JoustResolution, RuleError> {
        self.ensure_active()?;
        let pending = self
            .state
            .pending_joust
            .clone()
            .ok_or(RuleError::JoustNotPending)?;
        let defender = pending.defender();
        if response.player != defender {
            return Err(RuleError::InvalidTurn {
                expected: defender,
                actual: response.player,
            });
        }

        let verdict = self.judge_joust(&pending, &response.answer)?;

        let mark = self.state.event_log.len();
        let mut events = Vec::new();
        self.state.pending_joust = None;
        if let Some(spade) = verdict.spade {
            self.state
                .player_mut(defender)
                .take_card(CardSource::Hand, &spade.id());
            self.record(&mut events, GameEvent::KingWarded { defender, spade });
            events.push(self.state.discard(defender, spade));
        }
        if let Some(wager) = verdict.wager {
            self.state
                .player_mut(defender)
                .take_card(CardSource::Hand, &wager.id());
        }
        self.record(
            &mut events,
            GameEvent::JoustResolved {
                attacker_card: pending.card,
                defender_card: verdict.wager,
                outcome: verdict.outcome,
            },
        );
        if let Some(wager) = verdict.wager {
            events.push(self.state.discard(defender, wager));
        }
        tracing::info!(outcome = ?verdict.outcome, "joust resolved");

        events.extend(self.complete_play(pending.attacker, pending.card, pending.plan.kind, verdict.plan));
        self.notify_since(mark);
        Ok(JoustResolution {
            outcome: verdict.outcome,
            events,
        })
    }

    fn judge_joust(&self, pending: &PendingJoust, answer: &JoustDecision) -> Result<JoustVerdict, RuleError> {
        let hand = self.state.player(pending.defender());
        let in_hand = |card_id: &CardId| {
            hand.find_card(CardSource::Hand, card_id)
                .ok_or_else(|| RuleError::CardNotFound {
                    card_id: card_id.clone(),
                    location: CardSource::Hand,
                })
        };

        let verdict = match answer {
            JoustDecision::Decline => JoustVerdict {
                outcome: JoustOutcome::Declined,
                plan: Some(pending.plan.clone()),
                spade: None,
                wager: None,
            },
            JoustDecision::Wager { card_id } => {
                if hand.hand.is_empty() {
                    return Err(RuleError::NoCardToWager);
                }
                let wager = in_hand(card_id)?;
                let outcome = duel(&pending.card, &wager);
                JoustVerdict {
                    outcome,
                    plan: outcome.attack_proceeds().then(|| pending.plan.clone()),
                    spade: None,
                    wager: Some(wager),
                }
            }
            JoustDecision::Ward { spade_id, wager_id } => {
                if !pending.is_royal_assassin() {
                    return Err(RuleError::WardUnavailable);
                }
                let spade = in_hand(spade_id)?;
                if spade.suit != Suit::Spades {
                    return Err(RuleError::NotASpade {
                        card_id: spade_id.clone(),
                    });
                }
                match pending.plan.warded() {
                    None => JoustVerdict {
                        outcome: JoustOutcome::Fizzled,
                        plan: None,
                        spade: Some(spade),
                        wager: None,
                    },
                    Some(fallback) => match wager_id {
                        None => JoustVerdict {
                            outcome: JoustOutcome::Warded,
                            plan: Some(fallback),
                            spade: Some(spade),
                            wager: None,
                        },
                        Some(wager_id) => {
                            let wager = in_hand(wager_id)?;
                            if wager == spade {
                                return Err(RuleError::WardCardWagered {
                                    card_id: wager_id.clone(),
                                });
                            }
                            let outcome = duel(&pending.card, &wager);
                            JoustVerdict {
                                outcome,
                                plan: outcome.attack_proceeds().then_some(fallback),
                                spade: Some(spade),
                                wager: Some(wager),
                            }
                        }
                    },
                }
            }
        };
        Ok(verdict)
    }

    /// Applies (or drops) the effect, spends the card, refills the hand and
    /// passes the turn.
    fn complete_play(
        &mut self,
        player: Color,
        card: Card,
        effect: EffectKind,
        plan: Option<EffectPlan>,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        match plan {
            Some(plan) => {
                apply_plan(&plan, &mut self.board);
                self.record(
                    &mut events,
                    GameEvent::EffectApplied {
                        player,
                        card,
                        effect,
                        mutations: plan.mutations,
                    },
                );
            }
            None => self.record(
                &mut events,
                GameEvent::EffectFizzled {
                    player,
                    card,
                    effect,
                },
            ),
        }
        events.push(self.state.discard(player, card));
        events.extend(self.state.top_up_hand(player));
        events.extend(self.finish_turn(player));
        events
    }

    fn finish_turn(&mut self, player: Color) -> Vec<GameEvent> {
        let next = player.opponent();
        if self.board.turn() != next {
            self.board.set_turn(next);
        }
        let mut events = vec![self.state.pass_turn()];
        if let Some(outcome) = self.evaluate_outcome(player) {
            events.extend(self.state.declare_outcome(outcome));
        }
        events
    }

    fn evaluate_outcome(&self, actor: Color) -> Option<Outcome> {
        if self.board.king_square(actor.opponent()).is_none() {
            return Some(Outcome {
                winner: Some(actor),
                reason: OutcomeReason::KingCaptured,
            });
        }
        if self.board.is_checkmate() {
            return Some(Outcome {
                winner: Some(self.board.turn().opponent()),
                reason: OutcomeReason::Checkmate,
            });
        }
        if self.board.is_stalemate() {
            return Some(Outcome {
                winner: None,
                reason: OutcomeReason::Stalemate,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::cards::{standard_deck, CardSupply};
    use crate::chess::{Board, Piece};
    use crate::game::state::{GameConfig, GameState, PlayerState};

    fn sq(name: &str) -> Square {
        name.parse().expect("valid square")
    }

    fn cards(ids: &[&str]) -> Vec<Card> {
        ids.iter().map(|id| id.parse().expect("valid card")).collect()
    }

    fn staged(fen: &str, white: [&[&str]; 2], black: [&[&str]; 2]) -> Game<Board> {
        let seat = |color, [hand, court]: [&[&str]; 2]| PlayerState {
            color,
            hand: cards(hand),
            court: cards(court),
        };
        let white = seat(Color::White, white);
        let black = seat(Color::Black, black);
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
        Game::from_parts(state, Board::from_fen(fen).expect("valid fen"))
    }

    fn opening() -> Game<Board> {
        staged(
            crate::chess::START_FEN,
            [&["H5", "H8", "S5", "D2", "C9"], &["C2", "C3", "C4"]],
            [&["HK", "D3", "D4", "D5", "S9"], &["C5", "C6", "C7"]],
        )
    }

    fn wager(card_id: &str) -> JoustResponse {
        JoustResponse {
            player: Color::Black,
            answer: JoustDecision::Wager {
                card_id: card_id.into(),
            },
        }
    }

    #[test]
    fn move_passes_turn_without_drawing() {
        let mut game = opening();
        let events = game
            .make_move(MoveAction::new(Color::White, sq("e2"), sq("e4")))
            .expect("legal move");
        assert!(matches!(events[0], GameEvent::MoveMade { .. }));
        assert_eq!(game.current_player(), Color::Black);
        assert_eq!(game.board().turn(), Color::Black);
        assert_eq!(game.hand(Color::White).len(), 5);
        assert_eq!(game.state().turn, 2);
    }

    #[test]
    fn rejected_moves_change_nothing() {
        let mut game = opening();
        let before = game.snapshot();
        assert_eq!(
            game.make_move(MoveAction::new(Color::Black, sq("e7"), sq("e5"))),
            Err(RuleError::InvalidTurn {
                expected: Color::White,
                actual: Color::Black
            })
        );
        assert_eq!(
            game.make_move(MoveAction::new(Color::White, sq("e2"), sq("e5"))),
            Err(RuleError::NoLegalChessMove {
                from: sq("e2"),
                to: sq("e5")
            })
        );
        assert_eq!(game.snapshot(), before);
        assert_eq!(game.board(), &Board::standard());
    }

    #[test]
    fn draw_after_move_tops_up_hand() {
        let mut game = opening();
        game.state.config = GameConfig::default().with_draw_after_move(true);
        let spent = game.state.white.hand.pop().expect("white holds cards");
        game.state.supply.discard_card(spent);
        game.make_move(MoveAction::new(Color::White, sq("e2"), sq("e4")))
            .expect("legal move");
        assert_eq!(game.hand(Color::White).len(), 5);
    }

    #[test]
    fn hand_play_refills_and_passes_turn() {
        let mut game = opening();
        let events = game
            .play_card(PlayCardAction::from_hand(
                Color::White,
                "H5",
                CardTargets::rescue(sq("d2"), sq("e3")),
            ))
            .expect("rescue");
        assert_eq!(game.board().piece_at(sq("d2")), None);
        assert_eq!(
            game.board().piece_at(sq("e3")),
            Some(Piece::new(PieceKind::Pawn, Color::White))
        );
        assert_eq!(game.hand(Color::White).len(), 5);
        assert!(!game.hand(Color::White).iter().any(|c| c.has_id("H5")));
        assert_eq!(game.current_player(), Color::Black);
        assert_eq!(game.board().turn(), Color::Black);
        assert!(game.state().supply.discard_pile().iter().any(|c| c.has_id("H5")));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::EffectApplied { effect: EffectKind::Rescue, .. })));
    }

    #[test]
    fn court_play_replaces_court_card_immediately() {
        let mut game = opening();
        game.play_card(PlayCardAction::from_court(
            Color::White,
            "C2",
            CardTargets::swap(sq("b1"), sq("g1")),
        ))
        .expect("swap from court");
        assert_eq!(game.court(Color::White).len(), 3);
        assert!(!game.court(Color::White).iter().any(|c| c.has_id("C2")));
        assert_eq!(game.hand(Color::White).len(), 5);
        assert_eq!(game.state().integrity_check(), Ok(()));
    }

    #[test]
    fn card_must_be_in_named_source() {
        let mut game = opening();
        assert_eq!(
            game.play_card(PlayCardAction::from_court(
                Color::White,
                "H5",
                CardTargets::rescue(sq("d2"), sq("e3")),
            )),
            Err(RuleError::CardNotFound {
                card_id: "H5".into(),
                location: CardSource::Court
            })
        );
    }

    #[test]
    fn illegal_target_leaves_everything_untouched() {
        let mut game = opening();
        let before = game.snapshot();
        let result = game.play_card(PlayCardAction::from_hand(
            Color::White,
            "H5",
            CardTargets::rescue(sq("d2"), sq("d7")),
        ));
        assert_eq!(
            result,
            Err(RuleError::IllegalTarget {
                reason: TargetError::Occupied { square: sq("d7") }
            })
        );
        assert_eq!(game.snapshot(), before);
        assert_eq!(game.board(), &Board::standard());
        assert_eq!(game.current_player(), Color::White);
    }

    #[test]
    fn strike_opens_joust_and_blocks_other_actions() {
        let mut game = opening();
        game.play_card(PlayCardAction::from_hand(
            Color::White,
            "S5",
            CardTargets::strike(sq("d7")),
        ))
        .expect("strike");
        assert!(game.pending_joust().is_some());
        assert_eq!(game.current_player(), Color::White);
        assert_eq!(
            game.make_move(MoveAction::new(Color::White, sq("e2"), sq("e4"))),
            Err(RuleError::JoustPending)
        );
        let mut wrong = wager("HK");
        wrong.player = Color::White;
        assert_eq!(
            game.resolve_joust(wrong),
            Err(RuleError::InvalidTurn {
                expected: Color::Black,
                actual: Color::White
            })
        );
    }

    #[test]
    fn higher_defender_blocks_strike() {
        let mut game = opening();
        game.play_card(PlayCardAction::from_hand(
            Color::White,
            "S5",
            CardTargets::strike(sq("d7")),
        ))
        .expect("strike");
        let resolution = game.resolve_joust(wager("HK")).expect("wager");
        assert_eq!(resolution.outcome, JoustOutcome::DefenderWon);
        assert_eq!(
            game.board().piece_at(sq("d7")),
            Some(Piece::new(PieceKind::Pawn, Color::Black))
        );
        let discards = game.state().supply.discard_pile();
        assert!(discards.iter().any(|c| c.has_id("S5")));
        assert!(discards.iter().any(|c| c.has_id("HK")));
        assert_eq!(game.hand(Color::Black).len(), 4);
        assert_eq!(game.current_player(), Color::Black);
        assert!(game.pending_joust().is_none());
        assert_eq!(game.state().integrity_check(), Ok(()));
    }

    #[test]
    fn lower_defender_loses_and_tie_blocks() {
        let mut game = opening();
        game.play_card(PlayCardAction::from_hand(
            Color::White,
            "S5",
            CardTargets::strike(sq("d7")),
        ))
        .expect("strike");
        let resolution = game.resolve_joust(wager("D4")).expect("wager");
        assert_eq!(resolution.outcome, JoustOutcome::AttackerWon);
        assert_eq!(game.board().piece_at(sq("d7")), None);

        let mut tied = opening();
        tied.play_card(PlayCardAction::from_hand(
            Color::White,
            "S5",
            CardTargets::strike(sq("d7")),
        ))
        .expect("strike");
        let resolution = tied.resolve_joust(wager("D5")).expect("wager");
        assert_eq!(resolution.outcome, JoustOutcome::Tied);
        assert!(tied.board().piece_at(sq("d7")).is_some());
    }

    #[test]
    fn declined_joust_applies_attack() {
        let mut game = opening();
        game.play_card(PlayCardAction::from_hand(
            Color::White,
            "S5",
            CardTargets::strike(sq("d7")),
        ))
        .expect("strike");
        let resolution = game
            .resolve_joust(JoustResponse {
                player: Color::Black,
                answer: JoustDecision::Decline,
            })
            .expect("decline");
        assert_eq!(resolution.outcome, JoustOutcome::Declined);
        assert_eq!(game.board().piece_at(sq("d7")), None);
        assert_eq!(game.hand(Color::Black).len(), 5);
    }

    #[test]
    fn empty_defender_hand_skips_joust() {
        let mut game = staged(
            crate::chess::START_FEN,
            [&["S5"], &[]],
            [&[], &["C5", "C6", "C7"]],
        );
        game.play_card(PlayCardAction::from_hand(
            Color::White,
            "S5",
            CardTargets::strike(sq("d7")),
        ))
        .expect("strike");
        assert!(game.pending_joust().is_none());
        assert_eq!(game.board().piece_at(sq("d7")), None);
        assert_eq!(game.current_player(), Color::Black);
    }

    #[test]
    fn joust_resolution_errors() {
        let mut game = opening();
        assert_eq!(
            game.resolve_joust(wager("HK")),
            Err(RuleError::JoustNotPending)
        );
        game.play_card(PlayCardAction::from_hand(
            Color::White,
            "S5",
            CardTargets::strike(sq("d7")),
        ))
        .expect("strike");
        assert_eq!(
            game.resolve_joust(wager("HA")),
            Err(RuleError::CardNotFound {
                card_id: "HA".into(),
                location: CardSource::Hand
            })
        );
        assert_eq!(
            game.resolve_joust(JoustResponse {
                player: Color::Black,
                answer: JoustDecision::Ward {
                    spade_id: "S9".into(),
                    wager_id: None
                },
            }),
            Err(RuleError::WardUnavailable)
        );
        assert!(game.pending_joust().is_some());
    }

    const ROYAL_FEN: &str = "r3k3/8/8/8/8/8/4R3/4K3 w";
    const LONE_KING_FEN: &str = "4k3/8/8/8/8/8/4R3/4K3 w";

    fn royal_strike(game: &mut Game<Board>, fallback: Option<&str>) {
        game.play_card(PlayCardAction::from_hand(
            Color::White,
            "SA",
            CardTargets::Strike {
                primary: sq("e8"),
                secondary: None,
                fallback: fallback.map(sq),
            },
        ))
        .expect("royal assassin");
    }

    fn ward(spade: &str, wager: Option<&str>) -> JoustResponse {
        JoustResponse {
            player: Color::Black,
            answer: JoustDecision::Ward {
                spade_id: spade.into(),
                wager_id: wager.map(Into::into),
            },
        }
    }

    #[test]
    fn ward_redirects_royal_assassin_to_fallback() {
        let mut game = staged(ROYAL_FEN, [&["SA"], &[]], [&["S2", "H3"], &[]]);
        royal_strike(&mut game, Some("a8"));
        assert!(game.pending_joust().is_some_and(PendingJoust::is_royal_assassin));
        let resolution = game.resolve_joust(ward("S2", None)).expect("ward");
        assert_eq!(resolution.outcome, JoustOutcome::Warded);
        assert!(game.board().piece_at(sq("e8")).is_some());
        assert_eq!(game.board().piece_at(sq("a8")), None);
        assert_eq!(game.hand(Color::Black), cards(&["H3"]).as_slice());
        assert_eq!(game.outcome(), None);
    }

    #[test]
    fn king_strike_must_name_a_fallback_while_one_exists() {
        let mut game = staged(ROYAL_FEN, [&["SA"], &[]], [&["S2", "H3"], &[]]);
        let before = game.snapshot();
        assert_eq!(
            game.play_card(PlayCardAction::from_hand(
                Color::White,
                "SA",
                CardTargets::strike(sq("e8")),
            )),
            Err(RuleError::IllegalTarget {
                reason: TargetError::MissingTarget {
                    effect: EffectKind::Strike
                }
            })
        );
        assert_eq!(game.snapshot(), before);
        assert!(game.pending_joust().is_none());
    }

    #[test]
    fn ward_without_fallback_spends_the_card() {
        let mut game = staged(LONE_KING_FEN, [&["SA"], &[]], [&["S2", "H3"], &[]]);
        royal_strike(&mut game, None);
        let before = game.board().clone();
        let resolution = game.resolve_joust(ward("S2", Some("H3"))).expect("ward");
        assert_eq!(resolution.outcome, JoustOutcome::Fizzled);
        assert_eq!(game.board(), &{
            let mut expected = before;
            expected.set_turn(Color::Black);
            expected
        });
        assert!(game.state().supply.discard_pile().iter().any(|c| c.has_id("SA")));
        assert_eq!(game.hand(Color::Black), cards(&["H3"]).as_slice());
        assert_eq!(game.current_player(), Color::Black);
    }

    #[test]
    fn ward_with_wager_contests_fallback() {
        let mut game = staged(ROYAL_FEN, [&["SA"], &[]], [&["S2", "H3"], &[]]);
        royal_strike(&mut game, Some("a8"));
        assert_eq!(
            game.resolve_joust(ward("H3", None)),
            Err(RuleError::NotASpade {
                card_id: "H3".into()
            })
        );
        assert_eq!(
            game.resolve_joust(ward("S2", Some("S2"))),
            Err(RuleError::WardCardWagered {
                card_id: "S2".into()
            })
        );
        let resolution = game.resolve_joust(ward("S2", Some("H3"))).expect("ward");
        assert_eq!(resolution.outcome, JoustOutcome::AttackerWon);
        assert_eq!(game.board().piece_at(sq("a8")), None);
        assert!(game.board().piece_at(sq("e8")).is_some());
        assert!(game.hand(Color::Black).is_empty());
    }

    #[test]
    fn unanswered_royal_assassin_captures_king() {
        let mut game = staged(ROYAL_FEN, [&["SA"], &[]], [&[], &[]]);
        royal_strike(&mut game, Some("a8"));
        assert!(game.board().piece_at(sq("a8")).is_some());
        assert_eq!(game.board().piece_at(sq("e8")), None);
        assert_eq!(
            game.outcome(),
            Some(Outcome {
                winner: Some(Color::White),
                reason: OutcomeReason::KingCaptured
            })
        );
        assert_eq!(
            game.make_move(MoveAction::new(Color::Black, sq("a8"), sq("a1"))),
            Err(RuleError::GameFinished)
        );
    }

    #[test]
    fn ace_swap_with_opponent_piece_opens_joust() {
        let mut game = staged(crate::chess::START_FEN, [&["CA", "H2"], &[]], [&["HK", "D3"], &[]]);
        game.play_card(PlayCardAction::from_hand(
            Color::White,
            "CA",
            CardTargets::swap(sq("a1"), sq("a8")),
        ))
        .expect("ace swap");
        let pending = game.pending_joust().expect("swap reaches a black piece");
        assert_eq!(pending.plan.kind, EffectKind::Swap);
        assert!(!pending.is_royal_assassin());
        assert_eq!(game.board(), &Board::standard());

        let resolution = game.resolve_joust(wager("HK")).expect("wager");
        assert_eq!(resolution.outcome, JoustOutcome::AttackerWon);
        assert_eq!(
            game.board().piece_at(sq("a1")),
            Some(Piece::new(PieceKind::Rook, Color::Black))
        );
        assert_eq!(
            game.board().piece_at(sq("a8")),
            Some(Piece::new(PieceKind::Rook, Color::White))
        );
        assert!(game.state().supply.discard_pile().iter().any(|c| c.has_id("HK")));
        assert_eq!(game.current_player(), Color::Black);
    }

    #[test]
    fn court_play_with_dry_supply_leaves_court_short() {
        let court = cards(&["C2", "C3", "C4"]);
        let rest: Vec<Card> = standard_deck()
            .iter()
            .filter(|card| !court.contains(card))
            .copied()
            .collect();
        let white = PlayerState {
            color: Color::White,
            hand: rest[..22].to_vec(),
            court,
        };
        let black = PlayerState {
            color: Color::Black,
            hand: rest[22..46].to_vec(),
            court: rest[46..].to_vec(),
        };
        let config = GameConfig {
            hand_size: 24,
            ..GameConfig::default()
        };
        let state = GameState::from_seats(config, CardSupply::from_piles(Vec::new(), Vec::new()), white, black);
        let mut game = Game::from_parts(state, Board::standard());

        let events = game
            .play_card(PlayCardAction::from_court(
                Color::White,
                "C2",
                CardTargets::swap(sq("b1"), sq("g1")),
            ))
            .expect("swap from court");

        assert_eq!(game.court(Color::White).len(), 2);
        let drawn: Vec<&GameEvent> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::CardDrawn { .. }))
            .collect();
        assert_eq!(
            drawn,
            vec![&GameEvent::CardDrawn {
                player: Color::White,
                card: "C2".parse().expect("valid card"),
                into: CardSource::Hand,
            }],
            "only the reshuffled discard comes back, into the hand"
        );
        assert_eq!(game.hand(Color::White).len(), 23);
        assert!(game.state().supply.is_exhausted());
        assert_eq!(game.state().integrity_check(), Ok(()));
    }

    #[test]
    fn checkmating_move_ends_game() {
        let mut game = staged("6k1/5ppp/8/8/8/8/8/R5K1 w", [&["H2"], &[]], [&["H3"], &[]]);
        game.make_move(MoveAction::new(Color::White, sq("a1"), sq("a8")))
            .expect("mating move");
        assert_eq!(
            game.outcome(),
            Some(Outcome {
                winner: Some(Color::White),
                reason: OutcomeReason::Checkmate
            })
        );
    }

    #[test]
    fn observers_see_committed_events_in_order() {
        let mut game = opening();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        game.subscribe(move |entry| sink.borrow_mut().push(entry.sequence));
        game.make_move(MoveAction::new(Color::White, sq("e2"), sq("e4")))
            .expect("legal move");
        let _ = game.make_move(MoveAction::new(Color::White, sq("d2"), sq("d4")));
        let sequences = seen.borrow().clone();
        assert_eq!(sequences.len(), 2, "move and turn pass only");
        assert!(sequences.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            sequences.last().copied(),
            game.event_log().last().map(|e| e.sequence)
        );
    }
}

pub mod cards;
pub mod chess;
pub mod game;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use web_sys::js_sys::Function;

pub use cards::{standard_deck, Card, CardId, CardParseError, CardSupply, Rank, Suit, DECK_SIZE};
pub use chess::{
    Board, ChessAdapter, ChessMove, Color, FenError, Piece, PieceKind, Square, SquareParseError,
    START_FEN,
};
pub use game::{
    BoardMutation, CardSource, CardTargets, EffectKind, EffectPlan, Game, GameConfig, GameEvent,
    GameState, IntegrityError, JoustDecision, JoustOutcome, JoustResolution, JoustResponse,
    LoggedEvent, MoveAction, Outcome, OutcomeReason, PlayCardAction, PowerChain, RuleError,
    TargetError,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// 每次动作成功后返回给宿主的结果。
#[derive(Serialize)]
struct ActionResolution<'a> {
    state: &'a GameState,
    fen: String,
    events: &'a [GameEvent],
    #[serde(skip_serializing_if = "Option::is_none")]
    joust: Option<JoustOutcome>,
}

#[wasm_bindgen]
pub struct CardChessEngine {
    game: Game<Board>,
}

impl CardChessEngine {
    fn resolution_json(
        &self,
        events: &[GameEvent],
        joust: Option<JoustOutcome>,
    ) -> Result<String, JsValue> {
        let resolution = ActionResolution {
            state: self.game.state(),
            fen: self.game.board().to_fen(),
            events,
            joust,
        };
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }
}

#[wasm_bindgen]
impl CardChessEngine {
    /// Starts a game from the standard position. `config_json` is an optional
    /// `GameConfig`; missing fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<CardChessEngine, JsValue> {
        let config: GameConfig = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => GameConfig::default(),
        };
        Ok(CardChessEngine {
            game: Game::new(config),
        })
    }

    /// Resumes a saved game from its card state and board FEN.
    pub fn resume(state_json: &str, fen: &str) -> Result<CardChessEngine, JsValue> {
        let state: GameState = serde_json::from_str(state_json).map_err(serde_to_js_error)?;
        let board = Board::from_fen(fen).map_err(serde_to_js_error)?;
        state
            .integrity_check()
            .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
        Ok(CardChessEngine {
            game: Game::from_parts(state, board),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.game.state()).map_err(serde_to_js_error)
    }

    pub fn board_fen(&self) -> String {
        self.game.board().to_fen()
    }

    pub fn current_player(&self) -> String {
        self.game.current_player().to_string()
    }

    pub fn legal_moves_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.game.board().legal_moves()).map_err(serde_to_js_error)
    }

    pub fn make_move_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: MoveAction = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let events = self.game.make_move(action).map_err(to_js_error)?;
        self.resolution_json(&events, None)
    }

    pub fn play_card_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: PlayCardAction =
            serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let events = self.game.play_card(action).map_err(to_js_error)?;
        self.resolution_json(&events, None)
    }

    pub fn resolve_joust_json(&mut self, response_json: &str) -> Result<String, JsValue> {
        let response: JoustResponse =
            serde_json::from_str(response_json).map_err(serde_to_js_error)?;
        let resolution = self.game.resolve_joust(response).map_err(to_js_error)?;
        self.resolution_json(&resolution.events, Some(resolution.outcome))
    }

    pub fn hand(&self, player: JsValue) -> Result<JsValue, JsValue> {
        let player: Color = from_value(player).map_err(JsValue::from)?;
        to_value(self.game.hand(player)).map_err(JsValue::from)
    }

    pub fn court(&self, player: JsValue) -> Result<JsValue, JsValue> {
        let player: Color = from_value(player).map_err(JsValue::from)?;
        to_value(self.game.court(player)).map_err(JsValue::from)
    }

    pub fn power_chain(&self, player: JsValue) -> Result<JsValue, JsValue> {
        let player: Color = from_value(player).map_err(JsValue::from)?;
        to_value(&self.game.power_chain(player)).map_err(JsValue::from)
    }

    pub fn pending_joust(&self) -> Result<JsValue, JsValue> {
        to_value(&self.game.pending_joust()).map_err(JsValue::from)
    }

    pub fn event_log_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.game.event_log()).map_err(serde_to_js_error)
    }

    /// Calls `callback` with each logged event once its action commits.
    pub fn on_event(&mut self, callback: Function) {
        self.game.subscribe(move |entry| {
            let Ok(value) = to_value(entry) else {
                return;
            };
            if let Err(error) = callback.call1(&JsValue::NULL, &value) {
                web_sys::console::error_2(&"card_chess: event observer threw".into(), &error);
            }
        });
    }
}

/// 按标准顺序返回 52 张牌。
#[wasm_bindgen(js_name = "standardDeck")]
pub fn standard_deck_js() -> Result<JsValue, JsValue> {
    to_value(standard_deck()).map_err(JsValue::from)
}

/// 针对给定局面校验卡牌目标，不修改任何状态。
#[wasm_bindgen(js_name = "planEffect")]
pub fn plan_effect_js(
    fen: &str,
    card: &str,
    targets: JsValue,
    boosted: bool,
    player: JsValue,
) -> Result<JsValue, JsValue> {
    let board = Board::from_fen(fen).map_err(serde_to_js_error)?;
    let card: Card = card.parse().map_err(serde_to_js_error)?;
    let targets: CardTargets = from_value(targets).map_err(JsValue::from)?;
    let player: Color = from_value(player).map_err(JsValue::from)?;
    let plan = game::plan_effect(&card, &targets, boosted, player, &board)
        .map_err(|reason| to_js_error(reason.into()))?;
    to_value(&plan).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}

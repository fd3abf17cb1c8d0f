//! 卡牌侧游戏核心逻辑模块（状态、花色效果、对决与回合状态机）。

pub mod effects;
pub mod engine;
pub mod events;
pub mod joust;
pub mod power_chain;
pub mod rules;
pub mod state;

pub use effects::{
    apply_plan,
    plan_effect,
    BoardMutation,
    CardTargets,
    EffectKind,
    EffectPlan,
    Relocation,
    RoyalStrike,
    SquarePair,
    TargetError,
};
pub use engine::{Game, Observer};
pub use events::{EventCategory, EventLog, GameEvent, LoggedEvent};
pub use joust::{duel, JoustDecision, JoustOutcome, PendingJoust};
pub use power_chain::{PowerChain, PowerChains};
pub use rules::{JoustResolution, JoustResponse, MoveAction, PlayCardAction, RuleError};
pub use state::{
    CardSource,
    GameConfig,
    GameState,
    IntegrityError,
    Outcome,
    OutcomeReason,
    PlayerState,
    DEFAULT_COURT_SIZE,
    DEFAULT_HAND_SIZE,
};

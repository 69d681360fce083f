use std::rc::Rc;

use sanban_core::{
    GameKind, GameOutcome, GamePhase, ParticipantRole, ScorePair, SessionSnapshot,
};

use crate::clock_sync::ClockReadout;
use crate::rematch::OfferState;
use crate::session_machine::SessionPhase;

/// Transient happenings the embedder may want to toast or log. Durable state
/// belongs in [`ArenaView`], not here.
#[derive(Debug, Clone)]
pub enum ArenaEvent {
    Joined {
        code: String,
        role: ParticipantRole,
    },
    PeerJoined {
        name: String,
    },
    ConnectionLost,
    Reconnecting {
        attempt: u32,
        delay_ms: u32,
    },
    /// The retry ladder is exhausted; the embedder decides what to do next.
    ReconnectFailed,
    /// Authority-reported protocol error; display only, no phase change.
    Notice {
        message: String,
    },
    RematchOffer {
        from: ParticipantRole,
        game: GameKind,
    },
    RematchDeclined {
        by: String,
    },
}

/// Callback bundle installed by the embedding view layer. `on_view` fires
/// after every state change (including clock ticks) with a fresh renderable
/// snapshot; `on_event` carries the transients.
#[derive(Clone)]
pub struct SessionHooks {
    pub on_view: Rc<dyn Fn(ArenaView)>,
    pub on_event: Rc<dyn Fn(ArenaEvent)>,
}

impl SessionHooks {
    pub fn empty() -> Self {
        Self {
            on_view: Rc::new(|_| {}),
            on_event: Rc::new(|_| {}),
        }
    }
}

/// Everything a view needs to draw one frame of the arena, computed from the
/// owned components. Cheap to clone and carries no references back into the
/// runtime.
#[derive(Debug, Clone)]
pub struct ArenaView {
    pub connected: bool,
    pub joined: bool,
    pub phase: Option<SessionPhase>,
    pub game: Option<GameKind>,
    pub game_phase: GamePhase,
    pub my_role: Option<ParticipantRole>,
    pub turn: Option<ParticipantRole>,
    pub my_turn: bool,
    pub locked: bool,
    pub scores: ScorePair,
    pub outcome: Option<GameOutcome>,
    /// (host, guest) displays while a countdown is active.
    pub clocks: Option<(ClockReadout, ClockReadout)>,
    pub rematch: OfferState,
    pub notice: Option<String>,
    pub session: Option<SessionSnapshot>,
}

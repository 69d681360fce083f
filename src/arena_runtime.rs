use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};
use thiserror::Error;

use sanban_core::{
    BoardGeometry, ClientMsg, GameKind, GameSettings, HoverIndicator, MoveCandidate, ServerMsg,
    SessionStatus,
};

use crate::clock_sync::ClockReconciler;
use crate::directory::SessionDirectory;
use crate::move_gate::{MoveSubmissionGate, SubmitContext, SubmitError};
use crate::rematch::RematchNegotiator;
use crate::runtime::{ArenaEvent, ArenaView, SessionHooks};
use crate::schedule::{Scheduler, TaskHandle};
use crate::session_channel::{ChannelCallbacks, SessionChannel, SessionTransport};
use crate::session_machine::{SessionMachine, SessionPhase};

/// Reconnect backoff ladder; after the last rung the runtime gives up and
/// surfaces [`ArenaEvent::ReconnectFailed`].
pub const RETRY_DELAYS_MS: &[u32] = &[200, 500, 1_000, 2_000, 4_000, 8_000, 15_000, 30_000];

/// Local clock prediction granularity.
pub const CLOCK_TICK_MS: u32 = 100;

#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Websocket base, e.g. `wss://arena.example/ws`; the session code is
    /// appended as the room path segment.
    pub ws_base: String,
    /// Opaque credential issued by the account collaborator, forwarded to
    /// the transport at connect time.
    pub credential: String,
}

pub fn normalize_ws_base(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else {
        trimmed.to_string()
    }
}

pub fn build_session_ws_url(ws_base: &str, code: &str) -> String {
    let base = ws_base.trim_end_matches('/');
    format!("{base}/{code}")
}

/// Why a board placement attempt went nowhere. The first two are caught by
/// the interaction mapper before the submission gate is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlaceError {
    #[error("no intersection at that point")]
    OffBoard,
    #[error("intersection already occupied")]
    Occupied,
    #[error(transparent)]
    Gate(#[from] SubmitError),
}

struct ArenaState {
    machine: SessionMachine,
    clock: ClockReconciler,
    gate: MoveSubmissionGate,
    rematch: RematchNegotiator,
    hooks: SessionHooks,
    code: Option<String>,
    tick_task: Option<TaskHandle>,
    retry_task: Option<TaskHandle>,
    retry_attempts: u32,
    shutting_down: bool,
}

struct RuntimeShared {
    state: RefCell<ArenaState>,
    channel: SessionChannel,
    scheduler: Rc<dyn Scheduler>,
    directory: Rc<dyn SessionDirectory>,
    config: ArenaConfig,
}

/// The one controller instance owning a session's state: channel, machine,
/// clock, gate and rematch negotiator. Views read [`ArenaRuntime::view`] and
/// push user intent through the methods below; all mutation funnels through
/// the single server-message reducer and these intent methods.
#[derive(Clone)]
pub struct ArenaRuntime {
    inner: Rc<RuntimeShared>,
}

impl ArenaRuntime {
    pub fn new(
        transport: Box<dyn SessionTransport>,
        scheduler: Rc<dyn Scheduler>,
        directory: Rc<dyn SessionDirectory>,
        config: ArenaConfig,
    ) -> Self {
        Self {
            inner: Rc::new(RuntimeShared {
                state: RefCell::new(ArenaState {
                    machine: SessionMachine::new(),
                    clock: ClockReconciler::new(),
                    gate: MoveSubmissionGate::new(),
                    rematch: RematchNegotiator::new(),
                    hooks: SessionHooks::empty(),
                    code: None,
                    tick_task: None,
                    retry_task: None,
                    retry_attempts: 0,
                    shutting_down: false,
                }),
                channel: SessionChannel::new(transport),
                scheduler,
                directory,
                config,
            }),
        }
    }

    pub fn set_hooks(&self, hooks: SessionHooks) {
        self.inner.state.borrow_mut().hooks = hooks;
    }

    pub fn connected(&self) -> bool {
        self.inner.channel.connected()
    }

    pub fn joined(&self) -> bool {
        self.inner.channel.joined()
    }

    /// Connects the channel and (once open) joins the session room.
    pub fn connect(&self, code: &str) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.code = Some(code.to_string());
            state.retry_attempts = 0;
            state.retry_task = None;
            state.shutting_down = false;
        }
        self.dial();
    }

    fn dial(&self) {
        let Some(code) = self.inner.state.borrow().code.clone() else {
            return;
        };
        let url = build_session_ws_url(&self.inner.config.ws_base, &code);
        let callbacks = ChannelCallbacks {
            on_open: {
                let rt = self.clone();
                Rc::new(move || rt.handle_open())
            },
            on_message: {
                let rt = self.clone();
                Rc::new(move |msg| rt.handle_server_msg(msg))
            },
            on_drop: {
                let rt = self.clone();
                Rc::new(move || rt.handle_drop())
            },
        };
        self.inner
            .channel
            .connect(&url, &self.inner.config.credential, callbacks);
    }

    fn handle_open(&self) {
        let code = {
            let mut state = self.inner.state.borrow_mut();
            state.retry_attempts = 0;
            state.retry_task = None;
            state.code.clone()
        };
        // Room membership does not survive a dropped link; join explicitly
        // every time the link comes up.
        if let Some(code) = code {
            self.inner.channel.join(&code);
        }
        self.emit(Vec::new());
    }

    fn handle_drop(&self) {
        let mut events = vec![ArenaEvent::ConnectionLost];
        {
            let mut state = self.inner.state.borrow_mut();
            if state.shutting_down {
                return;
            }
            let attempt = state.retry_attempts;
            match RETRY_DELAYS_MS.get(attempt as usize).copied() {
                Some(delay_ms) => {
                    state.retry_attempts = attempt.saturating_add(1);
                    let rt = self.clone();
                    state.retry_task = Some(
                        self.inner
                            .scheduler
                            .timeout(delay_ms, Box::new(move || rt.dial())),
                    );
                    events.push(ArenaEvent::Reconnecting {
                        attempt: attempt + 1,
                        delay_ms,
                    });
                }
                None => {
                    state.retry_attempts = 0;
                    state.retry_task = None;
                    events.push(ArenaEvent::ReconnectFailed);
                }
            }
        }
        self.emit(events);
    }

    /// The single reducer for authoritative events. Unknown or out-of-phase
    /// messages are logged and dropped; nothing in here can crash the
    /// machine.
    fn handle_server_msg(&self, msg: ServerMsg) {
        let now_ms = self.inner.scheduler.now_ms();
        let mut events = Vec::new();
        let mut sends: Vec<ClientMsg> = Vec::new();
        let mut rejoin: Option<String> = None;
        {
            let mut state = self.inner.state.borrow_mut();
            let state = &mut *state;
            match msg {
                ServerMsg::Joined { session, role } => {
                    events.push(ArenaEvent::Joined {
                        code: session.code.clone(),
                        role,
                    });
                    state.machine.joined(session, role);
                }
                ServerMsg::AdminAck { .. } => {
                    debug!("admin ack outside an admin flow ignored");
                }
                ServerMsg::PeerJoined { name } => {
                    events.push(ArenaEvent::PeerJoined { name });
                }
                ServerMsg::GuestJoined { session } => {
                    state
                        .machine
                        .guest_joined(session, self.inner.directory.as_ref());
                }
                ServerMsg::GameStarted {
                    session,
                    game,
                    settings,
                } => {
                    if state.machine.game_started(session, game, settings) {
                        state.gate.resolve();
                        state.clock.clear();
                        state.rematch.reset();
                    }
                }
                ServerMsg::MoveResult {
                    by,
                    applied,
                    scores,
                    next_turn,
                    complete,
                    time,
                } => {
                    if state
                        .machine
                        .move_result(by, applied, scores, next_turn, complete)
                    {
                        state.gate.resolve();
                        match time {
                            Some(time) if !complete => state.clock.observe(time, now_ms),
                            _ => {}
                        }
                        if complete {
                            state.clock.clear();
                        }
                    }
                }
                ServerMsg::PassResult {
                    next_turn,
                    phase,
                    time,
                } => {
                    if state.machine.pass_result(next_turn, phase) {
                        state.gate.resolve();
                        if state.machine.playing() {
                            if let Some(time) = time {
                                state.clock.observe(time, now_ms);
                            }
                        } else {
                            state.clock.clear();
                        }
                    }
                }
                ServerMsg::ClockUpdate { time } => {
                    if state.machine.playing() {
                        state.clock.observe(time, now_ms);
                    } else {
                        debug!("clock update outside play dropped");
                    }
                }
                ServerMsg::ClockExpired { winner, message } => {
                    state.machine.clock_expired(winner, message);
                    state.clock.clear();
                    state.gate.resolve();
                }
                ServerMsg::Resigned { winner, message } => {
                    state.machine.resigned(winner, message);
                    state.clock.clear();
                    state.gate.resolve();
                }
                ServerMsg::ScoreFinalized { winner, breakdown } => {
                    state.machine.score_finalized(winner, breakdown);
                    state.clock.clear();
                }
                ServerMsg::RematchRequested {
                    requester,
                    game,
                    settings,
                } => {
                    if Some(requester) == state.machine.my_role() {
                        debug!("own rematch request echoed back; ignored");
                    } else {
                        let replaced = state.rematch.remote_requested(requester, game, settings);
                        if replaced {
                            events.push(ArenaEvent::Notice {
                                message: "previous rematch offer was replaced".to_string(),
                            });
                        }
                        events.push(ArenaEvent::RematchOffer {
                            from: requester,
                            game,
                        });
                    }
                }
                ServerMsg::RematchAccepted { session } => {
                    let was_requester = state.rematch.locally_requested();
                    let code = session.code.clone();
                    let auto_started = session.status == SessionStatus::InProgress;
                    let game = session
                        .active_game
                        .or_else(|| session.pending_settings.map(|s| s.kind()));
                    state.machine.rematch_armed(session);
                    state.gate.resolve();
                    state.clock.clear();
                    state.rematch.reset();
                    state.code = Some(code.clone());
                    rejoin = Some(code.clone());
                    if was_requester && !auto_started {
                        if let Some(game) = game {
                            sends.push(ClientMsg::StartRound { code, game });
                        }
                    }
                }
                ServerMsg::RematchRejected { rejector } => {
                    state.rematch.declined(rejector.clone());
                    events.push(ArenaEvent::RematchDeclined { by: rejector });
                }
                ServerMsg::Error { code, message } => {
                    warn!("authority error {code}: {message}");
                    state.machine.set_notice(message.clone());
                    events.push(ArenaEvent::Notice { message });
                }
            }
            self.ensure_tick(state);
        }
        if let Some(code) = rejoin {
            self.inner.channel.join(&code);
        }
        for msg in sends {
            self.inner.channel.send(msg);
        }
        self.emit(events);
    }

    /// One repeating tick per session, alive exactly while the active game
    /// is playing under a configured clock.
    fn ensure_tick(&self, state: &mut ArenaState) {
        let want = state.machine.playing()
            && state
                .machine
                .settings()
                .map_or(false, |settings| settings.clock().is_some());
        if want {
            if state.tick_task.is_none() {
                let rt = self.clone();
                state.tick_task = Some(
                    self.inner
                        .scheduler
                        .interval(CLOCK_TICK_MS, Box::new(move || rt.tick())),
                );
            }
        } else {
            state.tick_task = None;
        }
    }

    fn tick(&self) {
        self.emit(Vec::new());
    }

    fn emit(&self, events: Vec<ArenaEvent>) {
        let hooks = self.inner.state.borrow().hooks.clone();
        for event in events {
            (hooks.on_event)(event);
        }
        (hooks.on_view)(self.view());
    }

    pub fn view(&self) -> ArenaView {
        let state = self.inner.state.borrow();
        ArenaView {
            connected: self.inner.channel.connected(),
            joined: self.inner.channel.joined(),
            phase: state.machine.phase(),
            game: state.machine.game(),
            game_phase: state.machine.game_phase(),
            my_role: state.machine.my_role(),
            turn: state.machine.turn(),
            my_turn: state.machine.is_my_turn(),
            locked: state.gate.locked(),
            scores: state.machine.scores(),
            outcome: state.machine.outcome().cloned(),
            clocks: state.clock.readout(self.inner.scheduler.now_ms()),
            rematch: state.rematch.state().clone(),
            notice: state.machine.notice().map(str::to_string),
            session: state.machine.session().cloned(),
        }
    }

    /// Common path for all committed turn actions: gate, lock, hold the
    /// local clock, then emit exactly one outbound action.
    fn submit(&self, candidate: MoveCandidate) -> Result<(), SubmitError> {
        let now_ms = self.inner.scheduler.now_ms();
        let outbound = {
            let mut state = self.inner.state.borrow_mut();
            let ctx = SubmitContext {
                connected: self.inner.channel.connected(),
                joined: self.inner.channel.joined(),
                playing: state.machine.playing(),
                my_turn: state.machine.is_my_turn(),
            };
            state.gate.submit(candidate, ctx)?;
            if let Some(role) = state.machine.my_role() {
                state.clock.hold(role, now_ms);
            }
            let code = state.code.clone().unwrap_or_default();
            match candidate {
                MoveCandidate::Pass => ClientMsg::Pass { code },
                candidate => ClientMsg::SubmitMove { code, candidate },
            }
        };
        self.inner.channel.send(outbound);
        self.emit(Vec::new());
        Ok(())
    }

    /// Board-game placement: maps the input point to an intersection and
    /// validates it locally before the gate is consulted. Returns the
    /// intersection actually submitted.
    pub fn place_stone(&self, x: f32, y: f32, geom: BoardGeometry) -> Result<(u8, u8), PlaceError> {
        let (row, col) = geom.intersection_at(x, y).ok_or(PlaceError::OffBoard)?;
        {
            let state = self.inner.state.borrow();
            if let Some(board) = state.machine.board() {
                if !board.is_empty(row, col) {
                    return Err(PlaceError::Occupied);
                }
            }
        }
        self.submit(MoveCandidate::Stone { row, col })?;
        Ok((row, col))
    }

    /// Hover feedback for the board game; purely local.
    pub fn hover(&self, x: f32, y: f32, geom: BoardGeometry) -> HoverIndicator {
        let Some((row, col)) = geom.intersection_at(x, y) else {
            return HoverIndicator::Neutral;
        };
        let state = self.inner.state.borrow();
        let empty = state
            .machine
            .board()
            .map_or(false, |board| board.is_empty(row, col));
        HoverIndicator::evaluate(empty, state.machine.is_my_turn(), self.inner.channel.joined())
    }

    pub fn submit_choice(&self, option: u8) -> Result<(), SubmitError> {
        self.submit(MoveCandidate::Pick { option })
    }

    pub fn submit_reveal(&self, first: u8, second: u8) -> Result<(), SubmitError> {
        self.submit(MoveCandidate::Reveal { first, second })
    }

    pub fn pass(&self) -> Result<(), SubmitError> {
        self.submit(MoveCandidate::Pass)
    }

    /// Resignation is allowed whenever a game is running, independent of
    /// turn and lock; it is not a turn action.
    pub fn resign(&self) -> Result<(), SubmitError> {
        if !self.inner.channel.connected() {
            return Err(SubmitError::NotConnected);
        }
        if !self.inner.channel.joined() {
            return Err(SubmitError::NotJoined);
        }
        let code = {
            let state = self.inner.state.borrow();
            if state.machine.phase() != Some(SessionPhase::InProgress) {
                return Err(SubmitError::GameNotActive);
            }
            state.code.clone().unwrap_or_default()
        };
        self.inner.channel.send(ClientMsg::Resign { code });
        Ok(())
    }

    /// Asks the authority to begin the given game (and its per-move timing).
    pub fn start_round(&self, game: GameKind) -> Result<(), SubmitError> {
        if !self.inner.channel.connected() {
            return Err(SubmitError::NotConnected);
        }
        if !self.inner.channel.joined() {
            return Err(SubmitError::NotJoined);
        }
        let code = {
            let state = self.inner.state.borrow();
            if state.machine.phase() != Some(SessionPhase::Ready) {
                return Err(SubmitError::GameNotActive);
            }
            state.code.clone().unwrap_or_default()
        };
        self.inner.channel.send(ClientMsg::StartRound { code, game });
        Ok(())
    }

    pub fn request_rematch(&self, game: GameKind, settings: GameSettings) -> bool {
        if !self.inner.channel.joined() {
            return false;
        }
        let code = {
            let mut state = self.inner.state.borrow_mut();
            if state.machine.phase() != Some(SessionPhase::Complete) {
                return false;
            }
            if !state.rematch.begin_local(game, settings) {
                return false;
            }
            state.code.clone().unwrap_or_default()
        };
        self.inner.channel.send(ClientMsg::RematchRequest {
            code,
            game,
            settings,
        });
        self.emit(Vec::new());
        true
    }

    pub fn accept_rematch(&self) -> bool {
        let code = {
            let mut state = self.inner.state.borrow_mut();
            if state.rematch.accept().is_none() {
                return false;
            }
            state.code.clone().unwrap_or_default()
        };
        self.inner.channel.send(ClientMsg::RematchAccept { code });
        self.emit(Vec::new());
        true
    }

    pub fn reject_rematch(&self) -> bool {
        let code = {
            let mut state = self.inner.state.borrow_mut();
            if !state.rematch.reject() {
                return false;
            }
            state.code.clone().unwrap_or_default()
        };
        self.inner.channel.send(ClientMsg::RematchReject { code });
        self.emit(Vec::new());
        true
    }

    /// Tears down timers and the channel. The runtime may be connected again
    /// afterwards with a fresh `connect`.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.shutting_down = true;
            state.tick_task = None;
            state.retry_task = None;
        }
        self.inner.channel.disconnect();
    }
}

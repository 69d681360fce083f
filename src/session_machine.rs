use log::{debug, warn};

use sanban_core::{
    BoardOccupancy, GameKind, GameOutcome, GamePhase, GameSettings, MoveCandidate, ParticipantRole,
    ScoreBreakdown, ScorePair, SessionSnapshot, SessionStatus,
};

use crate::directory::SessionDirectory;

/// Session lifecycle as the client renders it. `Complete` is terminal for the
/// active game only; a successful rematch loops the machine back to `Ready`
/// (or straight to `InProgress` when the new session auto-starts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Waiting,
    Ready,
    InProgress,
    Complete,
}

fn phase_of(status: SessionStatus) -> SessionPhase {
    match status {
        SessionStatus::Waiting => SessionPhase::Waiting,
        SessionStatus::Ready => SessionPhase::Ready,
        SessionStatus::InProgress => SessionPhase::InProgress,
        SessionStatus::Complete => SessionPhase::Complete,
    }
}

/// The board and matching games alternate from a fixed first mover; the
/// choice game has simultaneous rounds, so nobody holds the turn.
fn first_mover(game: GameKind) -> Option<ParticipantRole> {
    match game {
        GameKind::Choice => None,
        GameKind::Board | GameKind::Matching => Some(ParticipantRole::Host),
    }
}

/// Tracks one session's phase and the active game's renderable state by
/// consuming authoritative events. All transitions are idempotent; events
/// that do not fit the current phase are logged and discarded rather than
/// applied or propagated.
#[derive(Debug)]
pub struct SessionMachine {
    session: Option<SessionSnapshot>,
    my_role: Option<ParticipantRole>,
    phase: Option<SessionPhase>,
    game: Option<GameKind>,
    settings: Option<GameSettings>,
    game_phase: GamePhase,
    turn: Option<ParticipantRole>,
    scores: ScorePair,
    outcome: Option<GameOutcome>,
    board: Option<BoardOccupancy>,
    notice: Option<String>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            session: None,
            my_role: None,
            phase: None,
            game: None,
            settings: None,
            game_phase: GamePhase::Playing,
            turn: None,
            scores: ScorePair::default(),
            outcome: None,
            board: None,
            notice: None,
        }
    }

    pub fn phase(&self) -> Option<SessionPhase> {
        self.phase
    }

    pub fn my_role(&self) -> Option<ParticipantRole> {
        self.my_role
    }

    pub fn session(&self) -> Option<&SessionSnapshot> {
        self.session.as_ref()
    }

    pub fn game(&self) -> Option<GameKind> {
        self.game
    }

    pub fn settings(&self) -> Option<&GameSettings> {
        self.settings.as_ref()
    }

    pub fn game_phase(&self) -> GamePhase {
        self.game_phase
    }

    pub fn turn(&self) -> Option<ParticipantRole> {
        self.turn
    }

    pub fn scores(&self) -> ScorePair {
        self.scores
    }

    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    pub fn board(&self) -> Option<&BoardOccupancy> {
        self.board.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn playing(&self) -> bool {
        self.phase == Some(SessionPhase::InProgress) && self.game_phase == GamePhase::Playing
    }

    /// Whether the local participant may act this turn. Rounds in the choice
    /// game are simultaneous, so during play both sides hold the turn there
    /// and the submission lock is what prevents double commitment.
    pub fn is_my_turn(&self) -> bool {
        if !self.playing() {
            return false;
        }
        match self.game {
            Some(GameKind::Choice) => true,
            _ => self.my_role.is_some() && self.turn == self.my_role,
        }
    }

    /// Room-join ack: adopt the authoritative snapshot and our role in it.
    pub fn joined(&mut self, session: SessionSnapshot, role: ParticipantRole) {
        self.my_role = Some(role);
        self.adopt_session(session);
    }

    /// Guest attach. A payload that omits the refreshed session (or arrived
    /// without the guest populated) is repaired by re-fetching the full
    /// snapshot instead of rendering partial data.
    pub fn guest_joined(
        &mut self,
        payload: Option<SessionSnapshot>,
        directory: &dyn SessionDirectory,
    ) {
        let session = match payload {
            Some(session) if session.guest.is_some() => Some(session),
            incomplete => {
                if incomplete.is_some() {
                    debug!("guest join event missing guest identity; refetching session");
                }
                let code = self
                    .session
                    .as_ref()
                    .map(|s| s.code.clone())
                    .or_else(|| incomplete.as_ref().map(|s| s.code.clone()));
                match code {
                    Some(code) => match directory.fetch(&code) {
                        Ok(session) => Some(session),
                        Err(err) => {
                            warn!("session refetch failed: {err}");
                            self.notice = Some(format!("session refresh failed: {err}"));
                            None
                        }
                    },
                    None => {
                        warn!("guest join event with no known session code");
                        None
                    }
                }
            }
        };
        let Some(session) = session else {
            return;
        };
        self.adopt_session(session);
        if self.phase == Some(SessionPhase::Waiting) {
            self.phase = Some(SessionPhase::Ready);
        }
    }

    /// Game start, locally requested or authoritative auto-start. Receiving a
    /// duplicate start for the game already running is a no-op, reported as
    /// not applied so callers leave locks and clocks alone.
    pub fn game_started(
        &mut self,
        session: SessionSnapshot,
        game: GameKind,
        settings: GameSettings,
    ) -> bool {
        if self.phase == Some(SessionPhase::InProgress) && self.game == Some(game) {
            debug!("duplicate start for running {} game ignored", game.label());
            return false;
        }
        self.session = Some(session);
        self.phase = Some(SessionPhase::InProgress);
        self.game = Some(game);
        self.board = match settings {
            GameSettings::Board { size, .. } => Some(BoardOccupancy::new(size)),
            _ => None,
        };
        self.settings = Some(settings);
        self.game_phase = GamePhase::Playing;
        self.turn = first_mover(game);
        self.scores = ScorePair::default();
        self.outcome = None;
        self.notice = None;
        true
    }

    /// Authoritative move resolution. Updates the board mirror, running
    /// scores and turn. Returns whether the result applied; a result for a
    /// game that is not running is stale and gets dropped.
    pub fn move_result(
        &mut self,
        by: ParticipantRole,
        applied: Option<MoveCandidate>,
        scores: ScorePair,
        next_turn: Option<ParticipantRole>,
        complete: bool,
    ) -> bool {
        if self.phase != Some(SessionPhase::InProgress) {
            warn!("move result outside an active game dropped");
            return false;
        }
        if let (Some(board), Some(MoveCandidate::Stone { row, col })) =
            (self.board.as_mut(), applied)
        {
            if !board.place(row, col, by) {
                debug!("move echo for non-empty intersection ({row},{col}) ignored");
            }
        }
        self.scores = scores;
        if complete {
            self.game_phase = GamePhase::Complete;
            self.phase = Some(SessionPhase::Complete);
            self.turn = None;
        } else {
            self.turn = next_turn;
        }
        true
    }

    /// Returns whether the result applied, like [`SessionMachine::move_result`].
    pub fn pass_result(&mut self, next_turn: Option<ParticipantRole>, phase: GamePhase) -> bool {
        if self.phase != Some(SessionPhase::InProgress) {
            warn!("pass result outside an active game dropped");
            return false;
        }
        self.game_phase = phase;
        self.turn = next_turn;
        if phase == GamePhase::Complete {
            self.phase = Some(SessionPhase::Complete);
            self.turn = None;
        }
        true
    }

    pub fn score_finalized(&mut self, winner: Option<ParticipantRole>, breakdown: ScoreBreakdown) {
        self.finish(GameOutcome::Scored { winner, breakdown });
    }

    pub fn resigned(&mut self, winner: ParticipantRole, message: String) {
        self.finish(GameOutcome::Resigned { winner, message });
    }

    pub fn clock_expired(&mut self, winner: ParticipantRole, message: String) {
        self.finish(GameOutcome::TimedOut { winner, message });
    }

    /// Records a terminal outcome exactly once. A duplicate of the stored
    /// outcome is a no-op; a different outcome after the first is an
    /// authority contradiction and is dropped in favor of what was shown.
    fn finish(&mut self, outcome: GameOutcome) {
        if let Some(existing) = &self.outcome {
            if *existing == outcome {
                debug!("duplicate terminal result ignored");
            } else {
                warn!(
                    "conflicting terminal result ({} vs {}) dropped",
                    outcome.reason(),
                    existing.reason()
                );
            }
            return;
        }
        self.outcome = Some(outcome);
        self.phase = Some(SessionPhase::Complete);
        self.game_phase = GamePhase::Complete;
        self.turn = None;
    }

    /// Transient authority error: surfaced for display, no phase change.
    pub fn set_notice(&mut self, message: String) {
        self.notice = Some(message);
    }

    /// Re-arms the machine on the successor session after an accepted
    /// rematch: scores, outcome, board and turn all reset before the new
    /// game's first move.
    pub fn rematch_armed(&mut self, session: SessionSnapshot) {
        self.scores = ScorePair::default();
        self.outcome = None;
        self.board = None;
        self.notice = None;
        self.game = None;
        self.settings = None;
        self.game_phase = GamePhase::Playing;
        self.turn = None;
        let auto_started = session.status == SessionStatus::InProgress;
        let game = session.active_game;
        let settings = session.pending_settings;
        self.adopt_session(session.clone());
        if auto_started {
            if let (Some(game), Some(settings)) = (game, settings) {
                // adopt_session left us InProgress; rebuild game state as a
                // fresh start.
                self.phase = Some(SessionPhase::Ready);
                let _ = self.game_started(session, game, settings);
            }
        }
    }

    fn adopt_session(&mut self, session: SessionSnapshot) {
        self.phase = Some(phase_of(session.status));
        if session.status == SessionStatus::InProgress && self.game.is_none() {
            // Late join into a running game: adopt what the snapshot knows.
            self.game = session.active_game;
            self.settings = session.pending_settings;
            self.game_phase = GamePhase::Playing;
            if let Some(GameSettings::Board { size, .. }) = session.pending_settings {
                // The mirror starts empty; it refills from move echoes.
                self.board = Some(BoardOccupancy::new(size));
            }
            if self.turn.is_none() {
                self.turn = session.active_game.and_then(first_mover);
            }
        }
        self.session = Some(session);
    }
}

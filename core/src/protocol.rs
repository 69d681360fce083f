use rkyv::{Archive, Deserialize, Serialize};

use crate::clock::TimeInfo;
use crate::outcome::{GamePhase, ScoreBreakdown, ScorePair};
use crate::session::{GameKind, GameSettings, ParticipantRole, SessionSnapshot};

/// One committed turn action, across all three games. `Pass` exists so a
/// board-game pass locks the turn the same way a placement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum MoveCandidate {
    Pick { option: u8 },
    Stone { row: u8, col: u8 },
    Reveal { first: u8, second: u8 },
    Pass,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum ClientMsg {
    Join {
        code: String,
    },
    SubmitMove {
        code: String,
        candidate: MoveCandidate,
    },
    Pass {
        code: String,
    },
    Resign {
        code: String,
    },
    StartRound {
        code: String,
        game: GameKind,
    },
    RematchRequest {
        code: String,
        game: GameKind,
        settings: GameSettings,
    },
    RematchAccept {
        code: String,
    },
    RematchReject {
        code: String,
    },
    Ping {
        nonce: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum AdminMsg {
    Create {
        code: Option<String>,
        host_name: String,
        settings: Option<GameSettings>,
    },
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum ServerMsg {
    /// Ack of a room join; flips the channel's `joined` flag.
    Joined {
        session: SessionSnapshot,
        role: ParticipantRole,
    },
    AdminAck {
        session: SessionSnapshot,
    },
    PeerJoined {
        name: String,
    },
    /// The payload may omit the refreshed session; the client repairs the gap
    /// by fetching the full snapshot from the directory.
    GuestJoined {
        session: Option<SessionSnapshot>,
    },
    GameStarted {
        session: SessionSnapshot,
        game: GameKind,
        settings: GameSettings,
    },
    MoveResult {
        by: ParticipantRole,
        applied: Option<MoveCandidate>,
        scores: ScorePair,
        next_turn: Option<ParticipantRole>,
        complete: bool,
        time: Option<TimeInfo>,
    },
    PassResult {
        next_turn: Option<ParticipantRole>,
        phase: GamePhase,
        time: Option<TimeInfo>,
    },
    ClockUpdate {
        time: TimeInfo,
    },
    ClockExpired {
        winner: ParticipantRole,
        message: String,
    },
    Resigned {
        winner: ParticipantRole,
        message: String,
    },
    ScoreFinalized {
        winner: Option<ParticipantRole>,
        breakdown: ScoreBreakdown,
    },
    RematchRequested {
        requester: ParticipantRole,
        game: GameKind,
        settings: GameSettings,
    },
    RematchAccepted {
        session: SessionSnapshot,
    },
    RematchRejected {
        rejector: String,
    },
    Error {
        code: String,
        message: String,
    },
}

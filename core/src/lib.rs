pub mod board;
pub mod clock;
pub mod codec;
pub mod outcome;
pub mod protocol;
pub mod session;
pub mod session_code;

pub use board::{BoardGeometry, BoardOccupancy, HoverIndicator};
pub use clock::{display_seconds, ClockMode, ClockSnapshot, OvertimeSnapshot, TimeInfo};
pub use codec::{decode, encode};
pub use outcome::{GameOutcome, GamePhase, ScoreBreakdown, ScorePair, TerritoryScore};
pub use protocol::{AdminMsg, ClientMsg, MoveCandidate, ServerMsg};
pub use session::{
    GameKind, GameSettings, Participant, ParticipantRole, SessionSnapshot, SessionStatus,
};
pub use session_code::{
    is_valid_session_code, SessionCode, SessionCodeError, SESSION_CODE_ALPHABET, SESSION_CODE_LEN,
};

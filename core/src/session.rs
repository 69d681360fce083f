use rkyv::{Archive, Deserialize, Serialize};

use crate::clock::ClockMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[repr(u8)]
pub enum ParticipantRole {
    Host,
    Guest,
}

impl ParticipantRole {
    pub fn other(self) -> Self {
        match self {
            ParticipantRole::Host => ParticipantRole::Guest,
            ParticipantRole::Guest => ParticipantRole::Host,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ParticipantRole::Host => "host",
            ParticipantRole::Guest => "guest",
        }
    }
}

/// Identity reference owned by the account collaborator; this core only
/// carries it around for display and role resolution.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[repr(u8)]
pub enum SessionStatus {
    Waiting,
    Ready,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[repr(u8)]
pub enum GameKind {
    Choice,
    Board,
    Matching,
}

impl GameKind {
    pub fn label(self) -> &'static str {
        match self {
            GameKind::Choice => "choice",
            GameKind::Board => "board",
            GameKind::Matching => "matching",
        }
    }
}

pub const BOARD_SIZE_MIN: u8 = 5;
pub const BOARD_SIZE_MAX: u8 = 19;

/// One settings union across all three games; the kind is implied by the
/// variant so a session never carries settings for a game it is not running.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub enum GameSettings {
    Choice { best_of: u8 },
    Board { size: u8, clock: Option<ClockMode> },
    Matching { pairs: u8 },
}

impl GameSettings {
    pub fn kind(&self) -> GameKind {
        match self {
            GameSettings::Choice { .. } => GameKind::Choice,
            GameSettings::Board { .. } => GameKind::Board,
            GameSettings::Matching { .. } => GameKind::Matching,
        }
    }

    pub fn clock(&self) -> Option<ClockMode> {
        match self {
            GameSettings::Board { clock, .. } => *clock,
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            GameSettings::Choice { best_of } => {
                if *best_of == 0 || *best_of % 2 == 0 || *best_of > 9 {
                    return Err(format!("best_of must be odd and in 1..=9, got {best_of}"));
                }
                Ok(())
            }
            GameSettings::Board { size, clock } => {
                if *size < BOARD_SIZE_MIN || *size > BOARD_SIZE_MAX {
                    return Err(format!(
                        "board size must be in {BOARD_SIZE_MIN}..={BOARD_SIZE_MAX}, got {size}"
                    ));
                }
                if let Some(clock) = clock {
                    clock.validate()?;
                }
                Ok(())
            }
            GameSettings::Matching { pairs } => {
                if *pairs < 2 || *pairs > 32 {
                    return Err(format!("pairs must be in 2..=32, got {pairs}"));
                }
                Ok(())
            }
        }
    }
}

/// Authoritative description of one arena instance. Snapshots are pushed in
/// lifecycle events and fetched whole from the directory when a push omits
/// fields the client needs.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub code: String,
    pub host: Participant,
    pub guest: Option<Participant>,
    pub status: SessionStatus,
    pub active_game: Option<GameKind>,
    pub pending_settings: Option<GameSettings>,
}

impl SessionSnapshot {
    pub fn role_of(&self, participant_id: &str) -> Option<ParticipantRole> {
        if self.host.id == participant_id {
            return Some(ParticipantRole::Host);
        }
        match &self.guest {
            Some(guest) if guest.id == participant_id => Some(ParticipantRole::Guest),
            _ => None,
        }
    }

    pub fn participant(&self, role: ParticipantRole) -> Option<&Participant> {
        match role {
            ParticipantRole::Host => Some(&self.host),
            ParticipantRole::Guest => self.guest.as_ref(),
        }
    }
}

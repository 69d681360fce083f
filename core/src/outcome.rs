use rkyv::{Archive, Deserialize, Serialize};

use crate::session::ParticipantRole;

/// Phase of the active game. `Scoring` is reached in the board game after
/// consecutive passes; the other games go straight from playing to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[repr(u8)]
pub enum GamePhase {
    Playing,
    Scoring,
    Complete,
}

/// Running totals shown during play (rounds won, captures, matched pairs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct ScorePair {
    pub host: u32,
    pub guest: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct TerritoryScore {
    pub territory: u32,
    pub captures: u32,
    pub komi: f32,
}

impl TerritoryScore {
    pub fn total(&self) -> f32 {
        self.territory as f32 + self.captures as f32 + self.komi
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub enum ScoreBreakdown {
    Choice { host_rounds: u8, guest_rounds: u8 },
    Board { host: TerritoryScore, guest: TerritoryScore },
    Matching { host_pairs: u8, guest_pairs: u8 },
}

/// Terminal result of a game. Resignation and timeout endings carry no
/// breakdown by construction, so no detailed score can be rendered for them.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum GameOutcome {
    Scored {
        winner: Option<ParticipantRole>,
        breakdown: ScoreBreakdown,
    },
    Resigned {
        winner: ParticipantRole,
        message: String,
    },
    TimedOut {
        winner: ParticipantRole,
        message: String,
    },
}

impl GameOutcome {
    pub fn winner(&self) -> Option<ParticipantRole> {
        match self {
            GameOutcome::Scored { winner, .. } => *winner,
            GameOutcome::Resigned { winner, .. } => Some(*winner),
            GameOutcome::TimedOut { winner, .. } => Some(*winner),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            GameOutcome::Scored { .. } => "score",
            GameOutcome::Resigned { .. } => "resignation",
            GameOutcome::TimedOut { .. } => "timeout",
        }
    }

    pub fn breakdown(&self) -> Option<&ScoreBreakdown> {
        match self {
            GameOutcome::Scored { breakdown, .. } => Some(breakdown),
            _ => None,
        }
    }
}

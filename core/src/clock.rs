use rkyv::{Archive, Deserialize, Serialize};

use crate::session::ParticipantRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum ClockMode {
    /// A fixed bonus is credited after each of the player's moves, uncapped.
    IncrementOnMove { main_ms: u64, increment_ms: u64 },
    /// After main time runs out the player gets `periods` extra periods of
    /// `period_ms` each; overrunning a period consumes it.
    Periods {
        main_ms: u64,
        period_ms: u64,
        periods: u8,
    },
}

impl ClockMode {
    pub fn main_ms(&self) -> u64 {
        match self {
            ClockMode::IncrementOnMove { main_ms, .. } => *main_ms,
            ClockMode::Periods { main_ms, .. } => *main_ms,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            ClockMode::IncrementOnMove { main_ms, .. } => {
                if *main_ms == 0 {
                    return Err("main time must be positive".to_string());
                }
                Ok(())
            }
            ClockMode::Periods {
                main_ms,
                period_ms,
                periods,
            } => {
                if *main_ms == 0 || *period_ms == 0 {
                    return Err("main and period time must be positive".to_string());
                }
                if *periods == 0 {
                    return Err("period count must be positive".to_string());
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct OvertimeSnapshot {
    pub remaining_ms: u64,
    pub periods_left: u8,
}

/// One player's clock as last reported by the authority. Present overtime
/// means main time is exhausted and the overtime counter governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub main_remaining_ms: u64,
    pub overtime: Option<OvertimeSnapshot>,
}

impl ClockSnapshot {
    pub fn in_overtime(&self) -> bool {
        self.overtime.is_some()
    }

    /// Local prediction: decrements whichever counter governs, saturating at
    /// zero. Rolling main time over into an overtime period is authoritative
    /// only; prediction never does it.
    pub fn predict_after(&self, elapsed_ms: u64) -> ClockSnapshot {
        match self.overtime {
            Some(overtime) => ClockSnapshot {
                main_remaining_ms: self.main_remaining_ms,
                overtime: Some(OvertimeSnapshot {
                    remaining_ms: overtime.remaining_ms.saturating_sub(elapsed_ms),
                    periods_left: overtime.periods_left,
                }),
            },
            None => ClockSnapshot {
                main_remaining_ms: self.main_remaining_ms.saturating_sub(elapsed_ms),
                overtime: None,
            },
        }
    }

    /// The governing counter, in whole seconds for display.
    pub fn display_remaining(&self) -> u64 {
        match self.overtime {
            Some(overtime) => display_seconds(overtime.remaining_ms),
            None => display_seconds(self.main_remaining_ms),
        }
    }
}

/// Authoritative time report covering both players plus whose clock runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct TimeInfo {
    pub active: Option<ParticipantRole>,
    pub host: ClockSnapshot,
    pub guest: ClockSnapshot,
}

impl TimeInfo {
    pub fn clock(&self, role: ParticipantRole) -> &ClockSnapshot {
        match role {
            ParticipantRole::Host => &self.host,
            ParticipantRole::Guest => &self.guest,
        }
    }
}

/// Display durations are floored whole seconds; sub-second precision stays
/// internal to prediction.
pub fn display_seconds(ms: u64) -> u64 {
    ms / 1000
}

use sanban_core::{ClockSnapshot, ParticipantRole, TimeInfo};

/// One player's clock as the UI should draw it right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReadout {
    pub seconds: u64,
    pub in_overtime: bool,
    pub periods_left: Option<u8>,
    /// Whether this display is counting down locally.
    pub ticking: bool,
}

/// Turns sparse authoritative time reports into a smooth countdown.
///
/// Every report replaces the baseline wholesale together with its local
/// receipt timestamp; between reports the active player's display is
/// `baseline - elapsed`, floored and clamped at zero, and the inactive
/// player's display is frozen. Local prediction therefore never accumulates
/// drift across reports, and never invents an increment or a period
/// rollover.
#[derive(Debug, Default)]
pub struct ClockReconciler {
    baseline: Option<TimeInfo>,
    baseline_at_ms: f64,
    /// Set while the local participant's move is locked awaiting resolution;
    /// that player's display freezes since the authority is about to
    /// overwrite it anyway.
    hold: Option<ParticipantRole>,
}

impl ClockReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts an authoritative report received at `now_ms`. Releases any
    /// lock-hold: the report already reflects the resolved turn.
    pub fn observe(&mut self, info: TimeInfo, now_ms: f64) {
        self.baseline = Some(info);
        self.baseline_at_ms = now_ms;
        self.hold = None;
    }

    /// Freezes `role`'s displayed clock until the next authoritative report.
    /// The baseline is rebased to the prediction at `now_ms` first, so the
    /// frozen display holds the value the player saw, not an older one.
    pub fn hold(&mut self, role: ParticipantRole, now_ms: f64) {
        let Some(info) = self.baseline.as_ref() else {
            return;
        };
        let elapsed_ms = (now_ms - self.baseline_at_ms).max(0.0) as u64;
        let rebase = |r: ParticipantRole| {
            let clock = *info.clock(r);
            if info.active == Some(r) {
                clock.predict_after(elapsed_ms)
            } else {
                clock
            }
        };
        self.baseline = Some(TimeInfo {
            active: info.active,
            host: rebase(ParticipantRole::Host),
            guest: rebase(ParticipantRole::Guest),
        });
        self.baseline_at_ms = now_ms;
        self.hold = Some(role);
    }

    /// Drops the countdown entirely (game no longer playing, or no clock
    /// configured).
    pub fn clear(&mut self) {
        self.baseline = None;
        self.hold = None;
    }

    pub fn is_running(&self) -> bool {
        self.baseline.is_some()
    }

    /// Current displays for (host, guest), or `None` when no countdown is
    /// active.
    pub fn readout(&self, now_ms: f64) -> Option<(ClockReadout, ClockReadout)> {
        let info = self.baseline.as_ref()?;
        let elapsed_ms = (now_ms - self.baseline_at_ms).max(0.0) as u64;
        let host = self.readout_for(info, ParticipantRole::Host, elapsed_ms);
        let guest = self.readout_for(info, ParticipantRole::Guest, elapsed_ms);
        Some((host, guest))
    }

    fn readout_for(&self, info: &TimeInfo, role: ParticipantRole, elapsed_ms: u64) -> ClockReadout {
        let baseline = info.clock(role);
        let ticking = info.active == Some(role) && self.hold != Some(role);
        let current: ClockSnapshot = if ticking {
            baseline.predict_after(elapsed_ms)
        } else {
            *baseline
        };
        ClockReadout {
            seconds: current.display_remaining(),
            in_overtime: current.in_overtime(),
            periods_left: current.overtime.map(|o| o.periods_left),
            ticking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanban_core::OvertimeSnapshot;

    fn info(active: Option<ParticipantRole>, host_ms: u64, guest_ms: u64) -> TimeInfo {
        TimeInfo {
            active,
            host: ClockSnapshot {
                main_remaining_ms: host_ms,
                overtime: None,
            },
            guest: ClockSnapshot {
                main_remaining_ms: guest_ms,
                overtime: None,
            },
        }
    }

    #[test]
    fn active_player_ticks_inactive_freezes() {
        let mut clock = ClockReconciler::new();
        clock.observe(info(Some(ParticipantRole::Host), 30_000, 25_000), 1_000.0);
        let (host, guest) = clock.readout(3_500.0).expect("running");
        assert_eq!(host.seconds, 27);
        assert!(host.ticking);
        assert_eq!(guest.seconds, 25);
        assert!(!guest.ticking);
    }

    #[test]
    fn new_report_replaces_prediction_wholesale() {
        let mut clock = ClockReconciler::new();
        clock.observe(info(Some(ParticipantRole::Host), 30_000, 25_000), 0.0);
        // Two seconds elapse, then the authority credits an increment.
        clock.observe(info(Some(ParticipantRole::Guest), 33_000, 25_000), 2_000.0);
        let (host, guest) = clock.readout(2_000.0).expect("running");
        assert_eq!(host.seconds, 33);
        assert!(!host.ticking);
        assert!(guest.ticking);
    }

    #[test]
    fn hold_freezes_active_display_until_next_report() {
        let mut clock = ClockReconciler::new();
        clock.observe(info(Some(ParticipantRole::Host), 10_000, 10_000), 0.0);
        // Two seconds in, the player locks a move: the display freezes at
        // the eight seconds they were looking at.
        clock.hold(ParticipantRole::Host, 2_000.0);
        let (host, _) = clock.readout(6_000.0).expect("running");
        assert_eq!(host.seconds, 8);
        assert!(!host.ticking);
        clock.observe(info(Some(ParticipantRole::Guest), 12_000, 10_000), 6_000.0);
        let (host, _) = clock.readout(6_000.0).expect("running");
        assert_eq!(host.seconds, 12);
    }

    #[test]
    fn overtime_presentation_switches_only_on_report() {
        let mut clock = ClockReconciler::new();
        clock.observe(info(Some(ParticipantRole::Host), 500, 9_000), 0.0);
        let (host, _) = clock.readout(5_000.0).expect("running");
        assert_eq!(host.seconds, 0);
        assert!(!host.in_overtime);

        let mut overtime = info(Some(ParticipantRole::Host), 0, 9_000);
        overtime.host.overtime = Some(OvertimeSnapshot {
            remaining_ms: 10_000,
            periods_left: 4,
        });
        clock.observe(overtime, 5_000.0);
        let (host, _) = clock.readout(5_000.0).expect("running");
        assert!(host.in_overtime);
        assert_eq!(host.seconds, 10);
        assert_eq!(host.periods_left, Some(4));
    }

    #[test]
    fn clear_stops_the_countdown() {
        let mut clock = ClockReconciler::new();
        clock.observe(info(Some(ParticipantRole::Host), 30_000, 30_000), 0.0);
        clock.clear();
        assert!(clock.readout(1_000.0).is_none());
        assert!(!clock.is_running());
    }
}

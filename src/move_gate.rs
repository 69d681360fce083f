use thiserror::Error;

use sanban_core::MoveCandidate;

/// Why a submission was refused locally. Nothing is sent to the authority in
/// any of these cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("not connected")]
    NotConnected,
    #[error("not joined to the session room")]
    NotJoined,
    #[error("no game is accepting moves")]
    GameNotActive,
    #[error("not your turn")]
    NotYourTurn,
    #[error("a move is already locked for this turn")]
    AlreadyLocked,
}

/// The facts a submission is judged against, sampled at call time so the
/// gate itself stays independent of channel and machine internals.
#[derive(Debug, Clone, Copy)]
pub struct SubmitContext {
    pub connected: bool,
    pub joined: bool,
    pub playing: bool,
    pub my_turn: bool,
}

/// Enforces at-most-one submission per turn for the local participant.
///
/// Acceptance stores the candidate and locks; the lock is released only by
/// [`MoveSubmissionGate::resolve`], which the runtime calls on authoritative
/// resolution events — never on re-renders, duplicate clicks, or local
/// timeouts.
#[derive(Debug, Default)]
pub struct MoveSubmissionGate {
    lock: Option<MoveCandidate>,
}

impl MoveSubmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(
        &mut self,
        candidate: MoveCandidate,
        ctx: SubmitContext,
    ) -> Result<(), SubmitError> {
        if !ctx.connected {
            return Err(SubmitError::NotConnected);
        }
        if !ctx.joined {
            return Err(SubmitError::NotJoined);
        }
        if !ctx.playing {
            return Err(SubmitError::GameNotActive);
        }
        if !ctx.my_turn {
            return Err(SubmitError::NotYourTurn);
        }
        if self.lock.is_some() {
            return Err(SubmitError::AlreadyLocked);
        }
        self.lock = Some(candidate);
        Ok(())
    }

    pub fn locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn value(&self) -> Option<&MoveCandidate> {
        self.lock.as_ref()
    }

    /// Clears the lock. Valid only as the reflection of an authoritative
    /// resolution (result, next-turn, game start, or rematch re-arm).
    pub fn resolve(&mut self) {
        self.lock = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_ctx() -> SubmitContext {
        SubmitContext {
            connected: true,
            joined: true,
            playing: true,
            my_turn: true,
        }
    }

    #[test]
    fn accepts_once_then_rejects_until_resolved() {
        let mut gate = MoveSubmissionGate::new();
        let stone = MoveCandidate::Stone { row: 3, col: 3 };
        assert!(gate.submit(stone, open_ctx()).is_ok());
        assert_eq!(
            gate.submit(MoveCandidate::Stone { row: 4, col: 4 }, open_ctx()),
            Err(SubmitError::AlreadyLocked)
        );
        assert_eq!(gate.value(), Some(&stone));
        gate.resolve();
        assert!(gate
            .submit(MoveCandidate::Stone { row: 4, col: 4 }, open_ctx())
            .is_ok());
    }

    #[test]
    fn rejection_order_reports_connection_problems_first() {
        let mut gate = MoveSubmissionGate::new();
        let ctx = SubmitContext {
            connected: false,
            joined: false,
            playing: false,
            my_turn: false,
        };
        assert_eq!(
            gate.submit(MoveCandidate::Pass, ctx),
            Err(SubmitError::NotConnected)
        );
        let ctx = SubmitContext {
            connected: true,
            joined: false,
            playing: false,
            my_turn: false,
        };
        assert_eq!(
            gate.submit(MoveCandidate::Pass, ctx),
            Err(SubmitError::NotJoined)
        );
        let ctx = SubmitContext {
            connected: true,
            joined: true,
            playing: false,
            my_turn: true,
        };
        assert_eq!(
            gate.submit(MoveCandidate::Pass, ctx),
            Err(SubmitError::GameNotActive)
        );
        let ctx = SubmitContext {
            connected: true,
            joined: true,
            playing: true,
            my_turn: false,
        };
        assert_eq!(
            gate.submit(MoveCandidate::Pass, ctx),
            Err(SubmitError::NotYourTurn)
        );
        assert!(!gate.locked());
    }
}

use log::debug;

use sanban_core::{GameKind, GameSettings, ParticipantRole};

/// Where the rematch handshake stands. At most one offer is outstanding per
/// session: a newer incoming offer replaces a pending one.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferState {
    Idle,
    /// We asked; waiting for the peer.
    PendingLocal { game: GameKind, settings: GameSettings },
    /// The peer asked; waiting for us.
    PendingRemote {
        from: ParticipantRole,
        game: GameKind,
        settings: GameSettings,
    },
    /// Authority confirmed; a successor session is being armed.
    Accepted,
    Rejected { by: String },
}

/// Drives the two-party rematch handshake on top of the session machine.
/// The negotiator owns only offer state; sending and re-arming are the
/// runtime's side of each transition.
#[derive(Debug, Default)]
pub struct RematchNegotiator {
    state: OfferState,
}

impl Default for OfferState {
    fn default() -> Self {
        OfferState::Idle
    }
}

impl RematchNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OfferState {
        &self.state
    }

    /// Local request. Refused while our own offer is already pending; a
    /// pending remote offer is superseded (the peer asked, we counter-ask).
    pub fn begin_local(&mut self, game: GameKind, settings: GameSettings) -> bool {
        if matches!(self.state, OfferState::PendingLocal { .. }) {
            debug!("rematch request ignored; one is already pending");
            return false;
        }
        self.state = OfferState::PendingLocal { game, settings };
        true
    }

    /// Peer request relayed by the authority. Only one offer may be pending,
    /// so an existing one is replaced; returns whether a replacement
    /// happened (for surfacing a notice).
    pub fn remote_requested(
        &mut self,
        from: ParticipantRole,
        game: GameKind,
        settings: GameSettings,
    ) -> bool {
        let replaced = matches!(
            self.state,
            OfferState::PendingLocal { .. } | OfferState::PendingRemote { .. }
        );
        if replaced {
            debug!("pending rematch offer replaced by a newer one");
        }
        self.state = OfferState::PendingRemote {
            from,
            game,
            settings,
        };
        replaced
    }

    /// Local accept of the pending remote offer; returns the accepted offer
    /// so the runtime can emit the accept action.
    pub fn accept(&mut self) -> Option<(GameKind, GameSettings)> {
        match self.state.clone() {
            OfferState::PendingRemote { game, settings, .. } => {
                self.state = OfferState::Accepted;
                Some((game, settings))
            }
            _ => None,
        }
    }

    /// Local reject of the pending remote offer.
    pub fn reject(&mut self) -> bool {
        match self.state {
            OfferState::PendingRemote { .. } => {
                self.state = OfferState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Authority confirmed an accepted offer (ours or the peer's).
    pub fn confirmed(&mut self) {
        self.state = OfferState::Accepted;
    }

    /// Peer declined our request. The completed-game display persists
    /// unchanged; only the offer is discarded.
    pub fn declined(&mut self, by: String) {
        self.state = OfferState::Rejected { by };
    }

    /// Whether the local side was the requester (it then owns starting the
    /// successor round).
    pub fn locally_requested(&self) -> bool {
        matches!(self.state, OfferState::PendingLocal { .. })
    }

    pub fn pending_local(&self) -> Option<(GameKind, GameSettings)> {
        match &self.state {
            OfferState::PendingLocal { game, settings } => Some((*game, *settings)),
            _ => None,
        }
    }

    /// Discard on session exit or after the successor session is armed.
    pub fn reset(&mut self) {
        self.state = OfferState::Idle;
    }
}

//! Client session core for sanban arenas.
//!
//! One arena session hosts two participants across three turn-based games.
//! The authority lives on the other end of a room channel and pushes state
//! intermittently; this crate keeps a locally smooth, renderable view of the
//! session consistent with it: lifecycle phases, a predicted-but-overwritten
//! game clock, an at-most-once turn submission gate, and the rematch
//! handshake. Rendering, rules, accounts, and persistence are external.

pub mod arena_runtime;
pub mod clock_sync;
pub mod directory;
pub mod move_gate;
pub mod rematch;
pub mod runtime;
pub mod schedule;
pub mod session_channel;
pub mod session_machine;

pub use arena_runtime::{ArenaConfig, ArenaRuntime, PlaceError};
pub use clock_sync::{ClockReadout, ClockReconciler};
pub use directory::{DirectoryError, SessionDirectory};
pub use move_gate::{MoveSubmissionGate, SubmitContext, SubmitError};
pub use rematch::{OfferState, RematchNegotiator};
pub use runtime::{ArenaEvent, ArenaView, SessionHooks};
pub use schedule::{Scheduler, TaskHandle};
pub use session_channel::{ChannelCallbacks, SessionChannel, SessionTransport, TransportSink};
pub use session_machine::{SessionMachine, SessionPhase};

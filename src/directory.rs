use thiserror::Error;

use sanban_core::{GameSettings, Participant, SessionSnapshot};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("session {0} not found")]
    NotFound(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Request/response collaborator for session records, consumed as opaque
/// calls that always return a full snapshot. The runtime uses `fetch` to
/// repair local state whenever a push event omits fields it needs; the
/// other operations back explicit user actions. Transport, retries and
/// authentication for these calls live with the implementor.
pub trait SessionDirectory {
    fn create(
        &self,
        host: &Participant,
        settings: Option<GameSettings>,
    ) -> Result<SessionSnapshot, DirectoryError>;

    fn join(&self, code: &str, guest: &Participant) -> Result<SessionSnapshot, DirectoryError>;

    fn fetch(&self, code: &str) -> Result<SessionSnapshot, DirectoryError>;

    fn start(&self, code: &str, settings: GameSettings) -> Result<SessionSnapshot, DirectoryError>;

    fn end(&self, code: &str) -> Result<SessionSnapshot, DirectoryError>;
}

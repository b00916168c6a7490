use thiserror::Error;
use urbalex_sync::SyncError;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    #[error("no pending changes to finalize")]
    NothingPending,

    #[error(transparent)]
    Sync(#[from] SyncError),
}

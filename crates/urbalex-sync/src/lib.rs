//! Sync layer: backend seam for the reglas API and the finalize-review
//! batch synchronizer.

pub mod backend;
pub mod batch;
mod error;

#[cfg(feature = "http")]
pub mod http;

pub use backend::RuleBackend;
pub use batch::{BATCH_DELAY, BATCH_SIZE, SyncOp, SyncReport, SyncTask, Synchronizer, TaskOutcome, plan_tasks};
pub use error::SyncError;

#[cfg(feature = "http")]
pub use http::RuleApi;

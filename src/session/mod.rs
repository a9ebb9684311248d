//! Sync session module
//!
//! A logical sync pass is carried across bounded invocations:
//! - [`SyncEvent`]: trigger and continuation event detail
//! - [`SessionState`]: per-invocation state machine
//! - [`SyncSession`]: the budgeted page loop
//! - [`handle`]: top-level entry point that always answers with an [`InvocationResponse`]
//! - [`Watermark`]: last fully crawled instant, read once and written on completion

mod event;
mod handler;
mod orchestrator;
mod state;
mod watermark;

pub use event::{SyncEvent, SELF_INVOCATION};
pub use handler::{handle, InvocationResponse};
pub use orchestrator::{SessionOutcome, SyncSession};
pub use state::SessionState;
pub use watermark::{read_watermark, write_watermark, Watermark};

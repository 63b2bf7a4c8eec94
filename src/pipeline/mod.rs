//! Pipeline entry points for indexing.
//!
//! - `run_backfill`: Queue recent timeline posts at startup
//! - `dispatch`: Route a single stream event
//! - `run_pipeline`: Backfill, then follow the stream until it ends

mod backfill;
mod dispatch;
mod run;

pub use backfill::run_backfill;
pub use dispatch::dispatch;
pub use run::run_pipeline;

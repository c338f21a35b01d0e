//! Discovery-and-extraction pipeline for Ad Library records.
//!
//! [`Pipeline`] pages a catalog, screens publishers through
//! [`PublisherGate`], and inspects allowed ads on pooled browser sessions
//! until a stop condition fires. [`run_request`] wires the production
//! catalog client and Chrome together for one run.

pub mod controller;
pub mod counters;
pub mod error;
pub mod gate;
pub mod inspector;
pub mod pool;
pub mod runner;
pub mod settings;

use adscout_core::ExtractedRecord;
use serde::Serialize;

pub use controller::Pipeline;
pub use counters::{RunCounters, StopReason};
pub use error::PipelineError;
pub use gate::PublisherGate;
pub use inspector::{AdInspector, BrowserInspector};
pub use pool::SessionPool;
pub use runner::run_request;
pub use settings::PipelineSettings;

/// Result of one run: accepted records in completion order (at most `limit`)
/// and the run counters.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub records: Vec<ExtractedRecord>,
    pub counters: RunCounters,
}

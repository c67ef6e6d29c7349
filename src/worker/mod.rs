//! # Worker
//!
//! The fetch-lock-dispatch core: per-topic pollers, the dispatcher and failure
//! path they share, the monitor, and the supervisor that owns them all.

pub mod backoff;
pub mod dispatcher;
pub mod failure;
pub mod monitor;
pub mod poller;
pub mod stats;
pub mod supervisor;

pub use backoff::{BackoffPolicy, PollerState};
pub use dispatcher::{DispatchOutcome, TaskDispatcher};
pub use failure::{FailureHandler, FailureResolution};
pub use monitor::Monitor;
pub use poller::{PollerExit, PollerTimings, TopicPoller};
pub use stats::{AggregateStats, StatsSnapshot, TaskOutcome};
pub use supervisor::{ShutdownReport, TaskExit, WorkerStatus, WorkerSupervisor};

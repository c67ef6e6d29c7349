//! # Data Models
//!
//! Wire types exchanged with the engine and the broker.

pub mod external_task;
pub mod routed_message;

pub use external_task::{ExternalTask, TypedVariable};
pub use routed_message::{FailureReport, RoutedTaskMessage, TaskErrorEvent};

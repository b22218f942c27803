//! The evaluation engine: completion values, scopes, closures and the
//! per-node state machine.

pub mod function;
pub mod scope;
pub mod state;
pub mod types;

pub use state::{State, StepResult};
pub use types::{Completion, CompletionType};

//! Session orchestration for Foreman Core.
//!
//! The orchestrator interprets a registered step sequence plus a session's
//! interaction history to decide the next step. Steps are pure: they build
//! commands and interpret results without executing anything themselves,
//! which keeps the state machine decoupled from workflow domain logic.

pub mod builtin;
pub mod history;
pub mod orchestrator;
pub mod registry;
pub mod step;

pub use history::InteractionHistory;
pub use orchestrator::{NextStep, Orchestrator, OrchestratorBuilder, OrchestratorError, Transition};
pub use registry::WorkflowRegistry;
pub use step::{StateUpdate, StepError, StepOptions, StepOutcome, StepScope, WorkflowStep};

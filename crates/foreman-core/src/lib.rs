//! Foreman Core - session orchestration and component tracking.
//!
//! This crate provides the core functionality for Foreman, including:
//! - Data model for workflow sessions, interactions, commands and results
//! - Data model for tracked components and their completion requirements
//! - The session orchestration state machine and step contract
//! - Repository-pattern persistence for sessions and components
//!
//! # Example
//!
//! ```rust
//! use foreman_core::workflow::builtin;
//! use foreman_core::{NextStep, Session};
//!
//! let orchestrator = builtin::artifact_orchestrator();
//! let session = Session::new(builtin::ARTIFACT_WORKFLOW);
//!
//! // A fresh session starts at the first registered step.
//! assert_eq!(
//!     orchestrator.next_step(&session).unwrap(),
//!     NextStep::Step(builtin::STEP_INIT.to_string()),
//! );
//! ```

pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod workflow;

pub use error::{ForemanError, Result};
pub use models::component::{
    Component, ComponentStatus, ComponentType, Dependency, DependencyList, TestStatus,
};
pub use models::requirement::{Requirement, RequirementDefinition, RequirementKind};
pub use models::session::{
    Command, CommandInstruction, CommandResult, Interaction, ResultStatus, Session, SessionStatus,
    WorkflowKind,
};
pub use storage::{
    ComponentStore, Database, MemorySessionStore, SessionStore, SqliteComponentStore,
    SqliteSessionStore, StorageError,
};
pub use workflow::history::InteractionHistory;
pub use workflow::orchestrator::{
    NextStep, Orchestrator, OrchestratorBuilder, OrchestratorError, Transition,
};
pub use workflow::registry::WorkflowRegistry;
pub use workflow::step::{StateUpdate, StepError, StepOptions, StepOutcome, StepScope, WorkflowStep};

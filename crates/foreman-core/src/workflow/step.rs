//! The step contract.
//!
//! A step does two things, both pure: build the next command from session
//! state and read-only context, and interpret the result the external
//! executor reported back. Interpretation may reclassify a nominally
//! successful execution as a domain error (e.g. a test run that passed
//! when the workflow expected new tests to fail), which is routed back
//! through ordinary transition logic rather than treated as a crash.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::session::{Command, CommandResult, Session};

/// Read-only context handed to steps by the driver.
///
/// Carries component/project metadata the step may need to build commands;
/// steps must not mutate anything outside their return values.
#[derive(Debug, Clone, Default)]
pub struct StepScope {
    /// Name of the component the session is working on.
    pub component_name: String,
    /// Module path of the component.
    pub module_path: String,
    /// Name of the target project.
    pub project_name: String,
    /// Additional metadata (free-form).
    pub metadata: HashMap<String, String>,
}

impl StepScope {
    /// Creates a scope for a component of a project.
    pub fn new(
        project_name: impl Into<String>,
        component_name: impl Into<String>,
        module_path: impl Into<String>,
    ) -> Self {
        Self {
            component_name: component_name.into(),
            module_path: module_path.into(),
            project_name: project_name.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Per-invocation options supplied by the driver.
#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    /// Free-form option values keyed by name.
    pub values: HashMap<String, Value>,
}

impl StepOptions {
    /// Gets an option value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Partial session-state update returned by a step.
pub type StateUpdate = HashMap<String, Value>;

/// What a step produced from interpreting a result.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// The result, possibly reclassified by the step.
    pub result: CommandResult,
    /// Partial state to merge into the session.
    pub state_update: StateUpdate,
}

impl StepOutcome {
    /// Passes a result through unchanged with no state update.
    pub fn unchanged(result: CommandResult) -> Self {
        Self { result, state_update: StateUpdate::new() }
    }

    /// Attaches a state entry to the outcome.
    #[must_use]
    pub fn with_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state_update.insert(key.into(), value);
        self
    }
}

/// A unit of workflow logic: builds a command, interprets its result.
pub trait WorkflowStep: Send + Sync {
    /// Returns the step identifier used in transition tables and
    /// interaction records.
    fn id(&self) -> &str;

    /// Constructs the next command from session state and read-only scope.
    ///
    /// Must not execute anything itself.
    ///
    /// # Errors
    /// * `StepError` - if the command cannot be constructed from the
    ///   available state.
    fn command(
        &self,
        scope: &StepScope,
        session: &Session,
        options: &StepOptions,
    ) -> Result<Command, StepError>;

    /// Interprets a result and produces a possibly-modified result plus a
    /// partial state update for the session.
    ///
    /// Side effects beyond the returned values are disallowed.
    ///
    /// # Errors
    /// * `StepError` - if the result payload cannot be interpreted at all
    ///   (distinct from a domain failure, which is expressed by returning
    ///   an `Error` result).
    fn handle_result(
        &self,
        scope: &StepScope,
        session: &Session,
        result: CommandResult,
        options: &StepOptions,
    ) -> Result<StepOutcome, StepError>;
}

/// Errors that can occur inside a step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// Required session state is missing or malformed.
    #[error("Missing state for step {step_id}: {detail}")]
    MissingState {
        /// The step that needed the state.
        step_id: String,
        /// What was missing.
        detail: String,
    },

    /// The result payload could not be interpreted.
    #[error("Uninterpretable result for step {step_id}: {detail}")]
    BadResult {
        /// The step that received the result.
        step_id: String,
        /// Why interpretation failed.
        detail: String,
    },
}

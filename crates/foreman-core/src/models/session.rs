//! Session data structures for Foreman Core.
//!
//! This module defines workflow sessions and their interaction history.
//! A session is one instance of a multi-step workflow; each step execution
//! appends exactly one interaction recording the command that was issued
//! and the result the external executor reported back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Identifier of the workflow a session runs.
///
/// Selects which orchestrator and step list apply to the session.
pub type WorkflowKind = String;

/// Runtime status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is active and stepping through its workflow.
    #[default]
    Running,
    /// Session reached its terminal step successfully.
    Complete,
    /// Session terminated with an unrecoverable error.
    Failed,
}

/// Status tag on a command result.
///
/// Hashable so transition tables can key on `(step_id, status)` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// The command executed successfully.
    Ok,
    /// The command failed, or a step reclassified the outcome as a failure.
    Error,
}

impl ResultStatus {
    /// Returns the lowercase string form used in transition tables and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Ok => "ok",
            ResultStatus::Error => "error",
        }
    }
}

/// The instruction carried by a command.
///
/// Opaque to the core: the external executor decides how to run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandInstruction {
    /// An executable string (shell command, prompt, etc.).
    Shell(String),
    /// A structured payload for executors that consume JSON.
    Structured(Value),
}

/// An instruction produced by a step, consumed by an external executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// ID of the step that created this command.
    pub issued_by: String,
    /// The instruction to execute.
    pub instruction: CommandInstruction,
    /// Executor-facing metadata (working directory, labels, ...).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Command {
    /// Creates a shell command tagged with the issuing step.
    pub fn shell(issued_by: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            issued_by: issued_by.into(),
            instruction: CommandInstruction::Shell(instruction.into()),
            metadata: HashMap::new(),
        }
    }

    /// Creates a structured command tagged with the issuing step.
    pub fn structured(issued_by: impl Into<String>, payload: Value) -> Self {
        Self {
            issued_by: issued_by.into(),
            instruction: CommandInstruction::Structured(payload),
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Outcome of executing a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether execution succeeded or failed.
    pub status: ResultStatus,
    /// Free-form data payload returned by the executor.
    pub data: Value,
    /// Error message when `status` is `Error`.
    pub error: Option<String>,
}

impl CommandResult {
    /// Creates a successful result with the given payload.
    pub fn ok(data: Value) -> Self {
        Self { status: ResultStatus::Ok, data, error: None }
    }

    /// Creates a failed result with a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self { status: ResultStatus::Error, data: Value::Null, error: Some(message.into()) }
    }

    /// Returns true if the result status is `Ok`.
    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

/// One recorded step execution within a session.
///
/// Immutable once completed; owned exclusively by its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Unique interaction identifier.
    pub id: String,
    /// ID of the step that produced this interaction.
    pub step_id: String,
    /// The command the step issued.
    pub command: Command,
    /// The result of executing the command. `None` while in flight.
    pub result: Option<CommandResult>,
    /// When the interaction was created.
    pub started_at: DateTime<Utc>,
    /// When the result was recorded.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Interaction {
    /// Creates a new in-flight interaction for a command.
    pub fn new(command: Command) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            step_id: command.issued_by.clone(),
            command,
            result: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Records the result, completing the interaction.
    pub fn complete(&mut self, result: CommandResult) {
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// Returns true if a result has been recorded.
    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }
}

/// Partial state produced by a step, merged into the session.
pub type StateMap = HashMap<String, Value>;

/// One instance of a multi-step workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// The workflow this session runs.
    pub workflow: WorkflowKind,
    /// Current session status.
    pub status: SessionStatus,
    /// Ordered, append-only interaction history.
    pub interactions: Vec<Interaction>,
    /// Key/value state accumulated across steps.
    pub state: StateMap,
    /// Parent session, for sessions spawned to handle sub-components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session: Option<String>,
    /// Child sessions spawned from this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_sessions: Vec<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new running session for a workflow.
    pub fn new(workflow: impl Into<WorkflowKind>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            workflow: workflow.into(),
            status: SessionStatus::Running,
            interactions: Vec::new(),
            state: StateMap::new(),
            parent_session: None,
            child_sessions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a child session linked to a parent.
    pub fn child_of(parent: &Session, workflow: impl Into<WorkflowKind>) -> Self {
        let mut session = Self::new(workflow);
        session.parent_session = Some(parent.id.clone());
        session
    }

    /// Appends an interaction to the history.
    ///
    /// Exactly one interaction is appended per step execution.
    pub fn append_interaction(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
        self.touch();
    }

    /// Records the result of the most recent in-flight interaction.
    ///
    /// # Errors
    /// * `SessionError::NoInteractionInFlight` - if the last interaction is
    ///   already completed or no interaction exists.
    pub fn complete_last_interaction(
        &mut self,
        result: CommandResult,
    ) -> Result<(), SessionError> {
        let interaction = self
            .interactions
            .last_mut()
            .filter(|i| !i.is_completed())
            .ok_or(SessionError::NoInteractionInFlight)?;
        interaction.complete(result);
        self.touch();
        Ok(())
    }

    /// Returns the most recent *completed* interaction, skipping any
    /// in-flight interaction that has no result yet.
    pub fn last_completed_interaction(&self) -> Option<&Interaction> {
        self.interactions.iter().rev().find(|i| i.is_completed())
    }

    /// Merges a partial state update into the session state.
    ///
    /// Last write wins per key.
    pub fn merge_state(&mut self, update: StateMap) {
        for (key, value) in update {
            self.state.insert(key, value);
        }
        self.touch();
    }

    /// Updates the session status.
    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.touch();
    }

    /// Validates the session data.
    ///
    /// # Errors
    /// * `SessionError::Invalid` - if the session data is invalid.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.id.is_empty() {
            return Err(SessionError::Invalid("id cannot be empty".to_string()));
        }
        if self.workflow.is_empty() {
            return Err(SessionError::Invalid("workflow cannot be empty".to_string()));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Errors that can occur when working with sessions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Invalid session data.
    #[error("Invalid session: {0}")]
    Invalid(String),

    /// No in-flight interaction to complete.
    #[error("No in-flight interaction to complete")]
    NoInteractionInFlight,
}

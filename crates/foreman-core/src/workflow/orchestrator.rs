//! The session orchestration state machine.
//!
//! A small interpreter that, given an ordered list of workflow steps and
//! the outcome of the most recently completed step, decides the next step
//! to execute. Transitions are looked up in a table keyed by
//! `(step id, result status)`; missing entries and unregistered steps are
//! surfaced as errors rather than guessed around, and remediation loops
//! (validate -> revise -> validate) carry an explicit attempt cap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::models::session::{ResultStatus, Session};
use crate::workflow::history::InteractionHistory;

/// Where a `(step, status)` pair routes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Move forward to the given step.
    Advance(String),
    /// Route to a remediation step, at most `max_attempts` times.
    ///
    /// The cap bounds retry/revision ping-pong loops; exceeding it is a
    /// distinct terminal failure, not a silent retry.
    Remediate {
        /// The remediation step to route to.
        step: String,
        /// Maximum completed executions of the remediation step.
        max_attempts: usize,
    },
    /// The workflow is finished.
    Complete,
}

/// What the driver should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Execute the given step.
    Step(String),
    /// The session is complete; stop polling.
    SessionComplete,
}

/// The state machine for one workflow kind.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    steps: Vec<String>,
    terminal: String,
    transitions: HashMap<(String, ResultStatus), Transition>,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Returns the ordered registered step identifiers.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Returns the designated terminal step identifier.
    pub fn terminal_step(&self) -> &str {
        &self.terminal
    }

    /// Returns true iff the most recent interaction is the terminal step
    /// completed with an `Ok` result.
    pub fn is_complete(&self, session: &Session) -> bool {
        session
            .interactions
            .last()
            .and_then(|i| i.result.as_ref().map(|r| (i.step_id.as_str(), r.status)))
            .is_some_and(|(step_id, status)| {
                step_id == self.terminal && status == ResultStatus::Ok
            })
    }

    /// Decides the next step from the session's interaction history.
    ///
    /// The last *completed* interaction drives the decision; an in-flight
    /// interaction with no result yet is skipped. With no completed
    /// interaction the first registered step is returned.
    ///
    /// # Errors
    /// * `OrchestratorError::InvalidInteraction` - the last completed
    ///   interaction references a step that is not registered (state
    ///   corruption).
    /// * `OrchestratorError::InvalidState` - no transition is defined for
    ///   the `(step, status)` pair.
    /// * `OrchestratorError::RetryLimitExceeded` - a remediation step has
    ///   exhausted its attempt cap.
    pub fn next_step(&self, session: &Session) -> Result<NextStep, OrchestratorError> {
        let history = InteractionHistory::of(session);

        let Some(interaction) = history.last_completed() else {
            // Builder guarantees at least one step.
            return Ok(NextStep::Step(self.steps[0].clone()));
        };

        let step_id = interaction.step_id.as_str();
        if !self.steps.iter().any(|s| s == step_id) {
            return Err(OrchestratorError::InvalidInteraction { step_id: step_id.to_string() });
        }

        // Result is present by construction of last_completed().
        let status = interaction.result.as_ref().map_or(ResultStatus::Error, |r| r.status);

        if step_id == self.terminal && status == ResultStatus::Ok {
            debug!(session_id = %session.id, "Session reached terminal step");
            return Ok(NextStep::SessionComplete);
        }

        let transition = self
            .transitions
            .get(&(step_id.to_string(), status))
            .ok_or_else(|| OrchestratorError::InvalidState {
                step_id: step_id.to_string(),
                status: status.as_str().to_string(),
            })?;

        match transition {
            Transition::Advance(next) => {
                debug!(session_id = %session.id, from = %step_id, to = %next, "Advancing");
                Ok(NextStep::Step(next.clone()))
            }
            Transition::Remediate { step: next, max_attempts } => {
                let attempts = history.executions_of(next);
                if attempts >= *max_attempts {
                    return Err(OrchestratorError::RetryLimitExceeded {
                        step_id: next.clone(),
                        attempts,
                    });
                }
                debug!(
                    session_id = %session.id,
                    from = %step_id,
                    to = %next,
                    attempt = attempts + 1,
                    max_attempts,
                    "Routing to remediation step"
                );
                Ok(NextStep::Step(next.clone()))
            }
            Transition::Complete => Ok(NextStep::SessionComplete),
        }
    }
}

/// Builder for [`Orchestrator`] definitions.
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    steps: Vec<String>,
    terminal: Option<String>,
    transitions: HashMap<(String, ResultStatus), Transition>,
}

impl OrchestratorBuilder {
    /// Appends a step to the ordered registered list.
    #[must_use]
    pub fn step(mut self, step_id: impl Into<String>) -> Self {
        self.steps.push(step_id.into());
        self
    }

    /// Designates the terminal step.
    #[must_use]
    pub fn terminal(mut self, step_id: impl Into<String>) -> Self {
        self.terminal = Some(step_id.into());
        self
    }

    /// Adds a transition for a `(step, status)` pair.
    #[must_use]
    pub fn on(
        mut self,
        step_id: impl Into<String>,
        status: ResultStatus,
        transition: Transition,
    ) -> Self {
        self.transitions.insert((step_id.into(), status), transition);
        self
    }

    /// Builds the orchestrator, validating the definition.
    ///
    /// # Errors
    /// * `OrchestratorError::InvalidDefinition` - empty step list, terminal
    ///   step not registered, or a transition referencing an unregistered
    ///   step.
    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        if self.steps.is_empty() {
            return Err(OrchestratorError::InvalidDefinition(
                "step list cannot be empty".to_string(),
            ));
        }

        let terminal = self.terminal.ok_or_else(|| {
            OrchestratorError::InvalidDefinition("terminal step is required".to_string())
        })?;
        if !self.steps.contains(&terminal) {
            return Err(OrchestratorError::InvalidDefinition(format!(
                "terminal step {} is not registered",
                terminal
            )));
        }

        for ((source, _), transition) in &self.transitions {
            if !self.steps.contains(source) {
                return Err(OrchestratorError::InvalidDefinition(format!(
                    "transition source {} is not registered",
                    source
                )));
            }
            let target = match transition {
                Transition::Advance(step) | Transition::Remediate { step, .. } => Some(step),
                Transition::Complete => None,
            };
            if let Some(target) = target {
                if !self.steps.contains(target) {
                    return Err(OrchestratorError::InvalidDefinition(format!(
                        "transition target {} is not registered",
                        target
                    )));
                }
            }
        }

        Ok(Orchestrator { steps: self.steps, terminal, transitions: self.transitions })
    }
}

/// Errors that can occur during orchestration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The last completed interaction references an unregistered step.
    /// Indicates state corruption; never retried.
    #[error("Invalid interaction: step {step_id} is not registered for this workflow")]
    InvalidInteraction {
        /// The unregistered step id.
        step_id: String,
    },

    /// No transition is defined for the `(step, status)` pair.
    #[error("Invalid state: no transition defined for step {step_id} with status {status}")]
    InvalidState {
        /// The step the session last completed.
        step_id: String,
        /// The result status of that step.
        status: String,
    },

    /// A remediation step exhausted its attempt cap.
    #[error("Retry limit exceeded: step {step_id} already ran {attempts} times")]
    RetryLimitExceeded {
        /// The remediation step that is out of attempts.
        step_id: String,
        /// How many completed executions it already has.
        attempts: usize,
    },

    /// The orchestrator definition itself is invalid.
    #[error("Invalid orchestrator definition: {0}")]
    InvalidDefinition(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{Command, CommandResult, Interaction, Session};
    use serde_json::Value;

    fn linear_orchestrator() -> Orchestrator {
        Orchestrator::builder()
            .step("init")
            .step("generate")
            .step("validate")
            .step("revise")
            .step("finalize")
            .terminal("finalize")
            .on("init", ResultStatus::Ok, Transition::Advance("generate".to_string()))
            .on("init", ResultStatus::Error, Transition::Advance("init".to_string()))
            .on("generate", ResultStatus::Ok, Transition::Advance("validate".to_string()))
            .on(
                "generate",
                ResultStatus::Error,
                Transition::Remediate { step: "generate".to_string(), max_attempts: 3 },
            )
            .on("validate", ResultStatus::Ok, Transition::Advance("finalize".to_string()))
            .on(
                "validate",
                ResultStatus::Error,
                Transition::Remediate { step: "revise".to_string(), max_attempts: 3 },
            )
            .on("revise", ResultStatus::Ok, Transition::Advance("validate".to_string()))
            .on(
                "revise",
                ResultStatus::Error,
                Transition::Remediate { step: "revise".to_string(), max_attempts: 3 },
            )
            .on("finalize", ResultStatus::Ok, Transition::Complete)
            .build()
            .unwrap()
    }

    fn record(session: &mut Session, step_id: &str, result: CommandResult) {
        session.append_interaction(Interaction::new(Command::shell(step_id, "cmd")));
        session.complete_last_interaction(result).unwrap();
    }

    #[test]
    fn test_first_step_for_fresh_session() {
        let orchestrator = linear_orchestrator();
        let session = Session::new("artifact");
        assert_eq!(
            orchestrator.next_step(&session).unwrap(),
            NextStep::Step("init".to_string())
        );
    }

    #[test]
    fn test_success_advances_linearly() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "init", CommandResult::ok(Value::Null));
        assert_eq!(
            orchestrator.next_step(&session).unwrap(),
            NextStep::Step("generate".to_string())
        );
    }

    #[test]
    fn test_validation_failure_routes_to_revise() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "validate", CommandResult::error("issues found"));
        assert_eq!(
            orchestrator.next_step(&session).unwrap(),
            NextStep::Step("revise".to_string())
        );
    }

    #[test]
    fn test_revise_success_loops_back_to_validate() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "validate", CommandResult::error("issues found"));
        record(&mut session, "revise", CommandResult::ok(Value::Null));
        assert_eq!(
            orchestrator.next_step(&session).unwrap(),
            NextStep::Step("validate".to_string())
        );
    }

    #[test]
    fn test_terminal_ok_reports_complete() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "finalize", CommandResult::ok(Value::Null));

        assert!(orchestrator.is_complete(&session));
        // The sentinel is returned on every further call.
        assert_eq!(orchestrator.next_step(&session).unwrap(), NextStep::SessionComplete);
        assert_eq!(orchestrator.next_step(&session).unwrap(), NextStep::SessionComplete);
    }

    #[test]
    fn test_in_flight_interaction_is_skipped() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "init", CommandResult::ok(Value::Null));
        session.append_interaction(Interaction::new(Command::shell("generate", "cmd")));

        // Decision is driven by the completed init interaction.
        assert_eq!(
            orchestrator.next_step(&session).unwrap(),
            NextStep::Step("generate".to_string())
        );
    }

    #[test]
    fn test_unregistered_step_is_invalid_interaction() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "deploy", CommandResult::ok(Value::Null));

        match orchestrator.next_step(&session).unwrap_err() {
            OrchestratorError::InvalidInteraction { step_id } => assert_eq!(step_id, "deploy"),
            other => panic!("Expected InvalidInteraction, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_transition_is_invalid_state() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        // finalize/error has no transition defined.
        record(&mut session, "finalize", CommandResult::error("publish failed"));

        match orchestrator.next_step(&session).unwrap_err() {
            OrchestratorError::InvalidState { step_id, status } => {
                assert_eq!(step_id, "finalize");
                assert_eq!(status, "error");
            }
            other => panic!("Expected InvalidState, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_limit_exceeded() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");

        // Three full validate->revise round trips exhaust the cap.
        for _ in 0..3 {
            record(&mut session, "validate", CommandResult::error("issues found"));
            record(&mut session, "revise", CommandResult::ok(Value::Null));
        }
        record(&mut session, "validate", CommandResult::error("issues found"));

        match orchestrator.next_step(&session).unwrap_err() {
            OrchestratorError::RetryLimitExceeded { step_id, attempts } => {
                assert_eq!(step_id, "revise");
                assert_eq!(attempts, 3);
            }
            other => panic!("Expected RetryLimitExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_remediation_allowed_below_cap() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "validate", CommandResult::error("issues found"));
        record(&mut session, "revise", CommandResult::ok(Value::Null));
        record(&mut session, "validate", CommandResult::error("still broken"));

        // Two completed revise runs would still be below the cap of 3.
        assert_eq!(
            orchestrator.next_step(&session).unwrap(),
            NextStep::Step("revise".to_string())
        );
    }

    #[test]
    fn test_is_complete_requires_ok_result() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "finalize", CommandResult::error("publish failed"));
        assert!(!orchestrator.is_complete(&session));
    }

    #[test]
    fn test_is_complete_looks_at_most_recent_interaction() {
        let orchestrator = linear_orchestrator();
        let mut session = Session::new("artifact");
        record(&mut session, "finalize", CommandResult::ok(Value::Null));
        // A later interaction supersedes the terminal one.
        record(&mut session, "validate", CommandResult::error("regression"));
        assert!(!orchestrator.is_complete(&session));
    }

    #[test]
    fn test_builder_rejects_empty_steps() {
        let result = Orchestrator::builder().terminal("done").build();
        assert!(matches!(result, Err(OrchestratorError::InvalidDefinition(_))));
    }

    #[test]
    fn test_builder_rejects_unregistered_terminal() {
        let result = Orchestrator::builder().step("init").terminal("done").build();
        assert!(matches!(result, Err(OrchestratorError::InvalidDefinition(_))));
    }

    #[test]
    fn test_builder_rejects_unregistered_transition_target() {
        let result = Orchestrator::builder()
            .step("init")
            .terminal("init")
            .on("init", ResultStatus::Ok, Transition::Advance("missing".to_string()))
            .build();
        assert!(matches!(result, Err(OrchestratorError::InvalidDefinition(_))));
    }

    #[test]
    fn test_steps_returns_registration_order() {
        let orchestrator = linear_orchestrator();
        assert_eq!(
            orchestrator.steps(),
            &["init", "generate", "validate", "revise", "finalize"]
        );
        assert_eq!(orchestrator.terminal_step(), "finalize");
    }
}

//! Interaction-history utility.
//!
//! A read-only view over a session's interactions used by the orchestrator
//! for transition lookup and retry accounting.

use crate::models::session::{Interaction, ResultStatus, Session};

/// Read-only view over a session's interaction history.
#[derive(Debug, Clone, Copy)]
pub struct InteractionHistory<'a> {
    interactions: &'a [Interaction],
}

impl<'a> InteractionHistory<'a> {
    /// Creates a history view over a session.
    pub fn of(session: &'a Session) -> Self {
        Self { interactions: &session.interactions }
    }

    /// Returns the most recent completed interaction, skipping any
    /// in-flight interaction that has no result yet.
    pub fn last_completed(&self) -> Option<&'a Interaction> {
        self.interactions.iter().rev().find(|i| i.is_completed())
    }

    /// Counts how many completed executions a step has in the history.
    ///
    /// In-flight interactions are not counted: only observed results
    /// participate in retry accounting.
    pub fn executions_of(&self, step_id: &str) -> usize {
        self.interactions.iter().filter(|i| i.step_id == step_id && i.is_completed()).count()
    }

    /// Counts completed executions of a step that ended with the given
    /// result status.
    pub fn executions_with_status(&self, step_id: &str, status: ResultStatus) -> usize {
        self.interactions
            .iter()
            .filter(|i| i.step_id == step_id)
            .filter_map(|i| i.result.as_ref())
            .filter(|r| r.status == status)
            .count()
    }

    /// Returns true if the history records no completed interaction.
    pub fn is_empty(&self) -> bool {
        self.last_completed().is_none()
    }
}

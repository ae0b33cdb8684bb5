//! Workflow registry.
//!
//! Maps a workflow kind to its orchestrator and step implementations.
//! Populated once at startup; lookups after that are infallible-by-option
//! so drivers can decide how to treat an unknown kind.

use std::collections::HashMap;

use crate::models::session::WorkflowKind;
use crate::workflow::builtin;
use crate::workflow::orchestrator::Orchestrator;
use crate::workflow::step::WorkflowStep;

/// A registered workflow: its state machine plus its step implementations.
struct WorkflowEntry {
    orchestrator: Orchestrator,
    steps: HashMap<String, Box<dyn WorkflowStep>>,
}

/// Registry of workflow kinds resolved at startup.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: HashMap<WorkflowKind, WorkflowEntry>,
}

impl WorkflowRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the builtin artifact workflow registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            builtin::ARTIFACT_WORKFLOW,
            builtin::artifact_orchestrator(),
            builtin::artifact_steps(),
        );
        registry
    }

    /// Registers a workflow kind, replacing any previous registration.
    pub fn register(
        &mut self,
        kind: impl Into<WorkflowKind>,
        orchestrator: Orchestrator,
        steps: Vec<Box<dyn WorkflowStep>>,
    ) {
        let steps = steps.into_iter().map(|s| (s.id().to_string(), s)).collect();
        self.workflows.insert(kind.into(), WorkflowEntry { orchestrator, steps });
    }

    /// Looks up the orchestrator for a workflow kind.
    pub fn orchestrator(&self, kind: &str) -> Option<&Orchestrator> {
        self.workflows.get(kind).map(|entry| &entry.orchestrator)
    }

    /// Looks up a step implementation within a workflow kind.
    pub fn step(&self, kind: &str, step_id: &str) -> Option<&dyn WorkflowStep> {
        self.workflows
            .get(kind)
            .and_then(|entry| entry.steps.get(step_id))
            .map(AsRef::as_ref)
    }

    /// Returns the registered workflow kinds.
    pub fn kinds(&self) -> Vec<&str> {
        self.workflows.keys().map(String::as_str).collect()
    }
}

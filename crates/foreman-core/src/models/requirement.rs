//! Requirement data structures for Foreman Core.
//!
//! A requirement is the evaluated result of one requirement definition
//! against one component. Requirements are a cache of a checker invocation:
//! they are cleared and regenerated on every analysis pass, and `satisfied`
//! is always reproducible from the current component status plus the state
//! of neighboring components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::session::WorkflowKind;

/// The completion criteria a component can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    /// The design document exists.
    DesignFile,
    /// The implementation file exists.
    ImplementationFile,
    /// The test file exists.
    TestFile,
    /// The test file exists and the latest run passed.
    TestsPassing,
    /// The design document matches its structural schema.
    DesignValid,
    /// Every dependency has all of its own requirements satisfied.
    DependenciesSatisfied,
    /// Every descendant has a satisfied design-file requirement.
    ChildrenDesigns,
    /// Every descendant has a satisfied implementation-file requirement.
    ChildrenImplementations,
    /// Every descendant has a satisfied test-file requirement.
    ChildrenTests,
    /// Every descendant has all requirements satisfied.
    ChildrenComplete,
}

impl RequirementKind {
    /// Returns true for requirements computable from a component's own
    /// status alone (evaluated in the first analysis pass).
    ///
    /// Graph-aware kinds read the first-pass requirements off neighboring
    /// components and must run in the second pass.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            RequirementKind::DesignFile
                | RequirementKind::ImplementationFile
                | RequirementKind::TestFile
                | RequirementKind::TestsPassing
                | RequirementKind::DesignValid
        )
    }

    /// Stable rank used to sort merged requirement lists into the
    /// canonical consumer-facing order, independent of checker execution
    /// order.
    pub fn canonical_rank(self) -> u8 {
        match self {
            RequirementKind::DesignFile => 0,
            RequirementKind::DesignValid => 1,
            RequirementKind::ImplementationFile => 2,
            RequirementKind::TestFile => 3,
            RequirementKind::TestsPassing => 4,
            RequirementKind::DependenciesSatisfied => 5,
            RequirementKind::ChildrenDesigns => 6,
            RequirementKind::ChildrenImplementations => 7,
            RequirementKind::ChildrenTests => 8,
            RequirementKind::ChildrenComplete => 9,
        }
    }

    /// Returns the snake_case tag used in configuration and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementKind::DesignFile => "design_file",
            RequirementKind::ImplementationFile => "implementation_file",
            RequirementKind::TestFile => "test_file",
            RequirementKind::TestsPassing => "tests_passing",
            RequirementKind::DesignValid => "design_valid",
            RequirementKind::DependenciesSatisfied => "dependencies_satisfied",
            RequirementKind::ChildrenDesigns => "children_designs",
            RequirementKind::ChildrenImplementations => "children_implementations",
            RequirementKind::ChildrenTests => "children_tests",
            RequirementKind::ChildrenComplete => "children_complete",
        }
    }
}

/// A requirement catalog entry: which criterion applies and which workflow
/// can satisfy it.
///
/// Supplied by an external registry keyed by component type; the engine
/// consumes this table, it does not own it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDefinition {
    /// The criterion to evaluate.
    pub kind: RequirementKind,
    /// Display name for the requirement.
    pub name: String,
    /// Workflow kind whose sessions can satisfy this requirement, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfied_by: Option<WorkflowKind>,
}

impl RequirementDefinition {
    /// Creates a definition named after the kind's tag.
    pub fn new(kind: RequirementKind) -> Self {
        Self { kind, name: kind.as_str().to_string(), satisfied_by: None }
    }

    /// Sets the workflow kind that can satisfy this requirement.
    #[must_use]
    pub fn satisfied_by(mut self, workflow: impl Into<WorkflowKind>) -> Self {
        self.satisfied_by = Some(workflow.into());
        self
    }
}

/// The evaluated result of one requirement definition against one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// The criterion that was evaluated.
    pub kind: RequirementKind,
    /// Display name carried over from the definition.
    pub name: String,
    /// The checker's verdict.
    pub satisfied: bool,
    /// When the checker ran.
    pub checked_at: DateTime<Utc>,
    /// Free-form payload explaining the verdict.
    pub details: Value,
    /// Workflow kind that can satisfy this requirement, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfied_by: Option<WorkflowKind>,
}

impl Requirement {
    /// Creates a requirement record from a checker verdict.
    pub fn from_verdict(
        definition: &RequirementDefinition,
        satisfied: bool,
        details: Value,
    ) -> Self {
        Self {
            kind: definition.kind,
            name: definition.name.clone(),
            satisfied,
            checked_at: Utc::now(),
            details,
            satisfied_by: definition.satisfied_by.clone(),
        }
    }

    /// Creates a satisfied requirement with empty details (test helper
    /// shape, also used for vacuous verdicts).
    pub fn satisfied(kind: RequirementKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            satisfied: true,
            checked_at: Utc::now(),
            details: Value::Null,
            satisfied_by: None,
        }
    }

    /// Creates an unsatisfied requirement with empty details.
    pub fn unsatisfied(kind: RequirementKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            satisfied: false,
            checked_at: Utc::now(),
            details: Value::Null,
            satisfied_by: None,
        }
    }
}

/// Sorts requirements into the canonical consumer-facing order.
///
/// Primary key is the kind's canonical rank; name breaks ties so catalogs
/// with several definitions of one kind stay deterministic.
pub fn sort_canonical(requirements: &mut [Requirement]) {
    requirements.sort_by(|a, b| {
        a.kind
            .canonical_rank()
            .cmp(&b.kind.canonical_rank())
            .then_with(|| a.name.cmp(&b.name))
    });
}

//! Component data structures for Foreman Core.
//!
//! A component is a declared unit of the target system tracked for
//! completeness: it carries a type tag, a module path used to derive
//! expected artifact locations, dependency edges to other components and
//! an optional parent for the component hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::requirement::Requirement;

/// Type tag classifying what kind of unit a component is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// A bounded context grouping related components.
    Context,
    /// A data schema definition.
    Schema,
    /// A data access repository.
    Repository,
    /// A domain service.
    Service,
    /// An externally reachable endpoint.
    Endpoint,
}

impl ComponentType {
    /// Returns the lowercase tag used in configuration and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Context => "context",
            ComponentType::Schema => "schema",
            ComponentType::Repository => "repository",
            ComponentType::Service => "service",
            ComponentType::Endpoint => "endpoint",
        }
    }
}

/// Outcome of the most recent test run for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// The component's tests passed.
    Passing,
    /// At least one of the component's tests failed.
    Failing,
    /// No test run has been observed for the component.
    #[default]
    NotRun,
}

/// Derived file/test facts for a component.
///
/// Computed fresh on every analysis pass from a file-list snapshot and a
/// test-failure snapshot; never edited by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComponentStatus {
    /// Whether the design document exists.
    pub design_exists: bool,
    /// Whether the implementation file exists.
    pub code_exists: bool,
    /// Whether the test file exists.
    pub test_exists: bool,
    /// Outcome of the most recent test run.
    pub test_status: TestStatus,
}

/// Outgoing dependency edges of a component.
///
/// Explicitly distinguishes "loaded, possibly empty" from "never fetched"
/// so consumers can pattern-match instead of relying on sentinel values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyList {
    /// Dependency ids were resolved (the list may be empty).
    Loaded(Vec<String>),
    /// Dependencies were never fetched for this component view.
    #[default]
    NotLoaded,
}

impl DependencyList {
    /// Creates a loaded list from component ids.
    pub fn loaded<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DependencyList::Loaded(ids.into_iter().map(Into::into).collect())
    }

    /// Returns the resolved ids, or `None` when not loaded.
    pub fn ids(&self) -> Option<&[String]> {
        match self {
            DependencyList::Loaded(ids) => Some(ids),
            DependencyList::NotLoaded => None,
        }
    }

    /// Returns true if the list has been resolved.
    pub fn is_loaded(&self) -> bool {
        matches!(self, DependencyList::Loaded(_))
    }
}

/// A directed "depends on" edge between two components.
///
/// Uniqueness on the ordered pair is enforced by storage; deleting either
/// endpoint removes the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// The component that depends on another.
    pub source: String,
    /// The component being depended upon.
    pub target: String,
}

impl Dependency {
    /// Creates a dependency edge.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into() }
    }
}

/// A declared unit of the target system tracked for completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Unique component identifier.
    pub id: String,
    /// Human-readable component name.
    pub name: String,
    /// What kind of unit this component is.
    pub component_type: ComponentType,
    /// Module path used to derive expected artifact locations.
    pub module_path: String,
    /// Parent component id (hierarchy edge), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Outgoing dependency edges.
    #[serde(default)]
    pub dependencies: DependencyList,
    /// Derived file/test facts, recomputed each analysis pass.
    #[serde(default)]
    pub status: ComponentStatus,
    /// Evaluated requirements, regenerated each analysis pass.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// User-assigned ordering priority (lower sorts first).
    #[serde(default)]
    pub priority: u32,
    /// When the component was declared.
    pub created_at: DateTime<Utc>,
    /// When the component was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Component {
    /// Creates a new component with no parent and loaded-empty dependencies.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        component_type: ComponentType,
        module_path: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            component_type,
            module_path: module_path.into(),
            parent: None,
            dependencies: DependencyList::Loaded(Vec::new()),
            status: ComponentStatus::default(),
            requirements: Vec::new(),
            priority: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the parent component id.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets the dependency list.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: DependencyList) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Sets the ordering priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns true if every attached requirement is satisfied.
    ///
    /// A component with no requirements attached is not considered
    /// satisfied: an unevaluated component must not read as complete.
    pub fn all_requirements_satisfied(&self) -> bool {
        !self.requirements.is_empty() && self.requirements.iter().all(|r| r.satisfied)
    }

    /// Validates the component data.
    ///
    /// # Errors
    /// * `ComponentError::Invalid` - if the component data is invalid.
    pub fn validate(&self) -> Result<(), ComponentError> {
        if self.id.is_empty() {
            return Err(ComponentError::Invalid("id cannot be empty".to_string()));
        }
        if self.name.is_empty() {
            return Err(ComponentError::Invalid("name cannot be empty".to_string()));
        }
        if self.module_path.is_empty() {
            return Err(ComponentError::Invalid("module_path cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Replaces the derived status and touches the update timestamp.
    pub fn set_status(&mut self, status: ComponentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Replaces the attached requirements and touches the update timestamp.
    pub fn set_requirements(&mut self, requirements: Vec<Requirement>) {
        self.requirements = requirements;
        self.updated_at = Utc::now();
    }
}

/// Errors that can occur when working with components.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// Invalid component data.
    #[error("Invalid component: {0}")]
    Invalid(String),
}

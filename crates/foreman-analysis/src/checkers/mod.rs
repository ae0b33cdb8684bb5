//! Requirement checking engine.
//!
//! Each requirement kind maps to a checker through a static registry
//! resolved at startup. Checkers are total functions over a check context:
//! missing or unresolved data yields "not satisfied" with an explanatory
//! detail payload, never an error.

pub mod dependencies;
pub mod document;
pub mod files;
pub mod hierarchy;
pub mod test_status;

use serde_json::{json, Value};
use std::collections::HashMap;

use foreman_core::{Component, Requirement, RequirementDefinition, RequirementKind};

use crate::catalog::DocumentSchema;
use crate::graph::ComponentNode;
use crate::snapshot::{ComponentPaths, ProjectSnapshot};

pub use dependencies::DependenciesSatisfiedChecker;
pub use document::DocumentValidChecker;
pub use files::FileExistenceChecker;
pub use hierarchy::HierarchyChecker;
pub use test_status::TestsPassingChecker;

/// Everything a checker may read when evaluating one requirement against
/// one component.
///
/// The trees are present only during the graph-aware pass; local checkers
/// must not depend on them.
pub struct CheckContext<'a> {
    /// The component under evaluation, carrying pass-one requirements
    /// during the graph-aware pass.
    pub component: &'a Component,
    /// The project snapshot the analysis runs against.
    pub snapshot: &'a ProjectSnapshot,
    /// Expected artifact paths for the component.
    pub paths: &'a ComponentPaths,
    /// Structural schema for the component's design document, if the
    /// catalog defines one.
    pub schema: Option<&'a DocumentSchema>,
    /// Expanded dependency tree rooted at the component.
    pub dependency_tree: Option<&'a ComponentNode>,
    /// Expanded hierarchy tree rooted at the component.
    pub hierarchy_tree: Option<&'a ComponentNode>,
}

/// A checker's judgement on one requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Whether the requirement is satisfied.
    pub satisfied: bool,
    /// Free-form payload explaining the judgement.
    pub details: Value,
}

impl Verdict {
    /// A satisfied verdict with a detail payload.
    pub fn satisfied(details: Value) -> Self {
        Self { satisfied: true, details }
    }

    /// An unsatisfied verdict with a detail payload.
    pub fn unsatisfied(details: Value) -> Self {
        Self { satisfied: false, details }
    }

    /// An unsatisfied verdict carrying only a reason string.
    pub fn because(reason: &str) -> Self {
        Self::unsatisfied(json!({ "reason": reason }))
    }
}

/// Evaluates one requirement definition against a check context.
pub trait RequirementChecker: Send + Sync {
    /// Produces a verdict. Total: never fails, never panics.
    fn check(&self, definition: &RequirementDefinition, ctx: &CheckContext<'_>) -> Verdict;
}

/// Static map from requirement kind to checker implementation.
///
/// Built once at startup; dispatch is a plain map lookup with no runtime
/// reflection.
pub struct CheckerRegistry {
    checkers: HashMap<RequirementKind, Box<dyn RequirementChecker>>,
}

impl CheckerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { checkers: HashMap::new() }
    }

    /// Creates a registry covering every requirement kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in [
            RequirementKind::DesignFile,
            RequirementKind::ImplementationFile,
            RequirementKind::TestFile,
        ] {
            registry.register(kind, Box::new(FileExistenceChecker));
        }
        registry.register(RequirementKind::TestsPassing, Box::new(TestsPassingChecker));
        registry.register(RequirementKind::DesignValid, Box::new(DocumentValidChecker));
        registry.register(
            RequirementKind::DependenciesSatisfied,
            Box::new(DependenciesSatisfiedChecker),
        );
        for kind in [
            RequirementKind::ChildrenDesigns,
            RequirementKind::ChildrenImplementations,
            RequirementKind::ChildrenTests,
            RequirementKind::ChildrenComplete,
        ] {
            registry.register(kind, Box::new(HierarchyChecker));
        }
        registry
    }

    /// Registers a checker for a kind, replacing any previous one.
    pub fn register(&mut self, kind: RequirementKind, checker: Box<dyn RequirementChecker>) {
        self.checkers.insert(kind, checker);
    }

    /// Evaluates a definition, producing a requirement record.
    ///
    /// A kind with no registered checker evaluates to unsatisfied; an
    /// unevaluable requirement must not read as complete.
    pub fn evaluate(
        &self,
        definition: &RequirementDefinition,
        ctx: &CheckContext<'_>,
    ) -> Requirement {
        let verdict = self.checkers.get(&definition.kind).map_or_else(
            || Verdict::because("No checker registered for this requirement kind."),
            |checker| checker.check(definition, ctx),
        );
        Requirement::from_verdict(definition, verdict.satisfied, verdict.details)
    }
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

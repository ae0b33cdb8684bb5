//! Component analyzer.
//!
//! Drives a full analysis pass: derive each component's status from the
//! snapshot, evaluate local requirements, build the dependency and
//! hierarchy graphs over the locally-annotated components, evaluate the
//! graph-aware requirements, and hand back fully-annotated components in a
//! deterministic order. An optional sync step persists the results; a
//! persistence failure degrades that one component instead of failing the
//! whole pass.

use tracing::{debug, warn};

use foreman_core::models::requirement::sort_canonical;
use foreman_core::{
    Component, ComponentStatus, ComponentStore, Requirement, TestStatus,
};

use crate::catalog::RequirementCatalog;
use crate::checkers::{CheckContext, CheckerRegistry};
use crate::graph::ComponentGraph;
use crate::snapshot::{ComponentPaths, NamingConvention, ProjectSnapshot};

/// A component annotated by an analysis pass, with the artifact paths the
/// verdicts were computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedComponent {
    /// The component with fresh status and requirements.
    pub component: Component,
    /// The expected artifact paths used during checking.
    pub paths: ComponentPaths,
}

/// Runs analysis passes over component sets.
pub struct ComponentAnalyzer {
    catalog: RequirementCatalog,
    convention: NamingConvention,
    registry: CheckerRegistry,
}

impl ComponentAnalyzer {
    /// Creates an analyzer with the default checker registry.
    pub fn new(catalog: RequirementCatalog, convention: NamingConvention) -> Self {
        Self { catalog, convention, registry: CheckerRegistry::with_defaults() }
    }

    /// Replaces the checker registry.
    #[must_use]
    pub fn with_registry(mut self, registry: CheckerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Analyzes a component set against a snapshot.
    ///
    /// Two passes: local requirements first, then graph-aware requirements
    /// over trees built from the locally-annotated components. Output is
    /// sorted by priority (ties by name) and each component's requirements
    /// are in canonical order, so consumers see a deterministic result.
    pub fn analyze(
        &self,
        components: Vec<Component>,
        snapshot: &ProjectSnapshot,
    ) -> Vec<AnalyzedComponent> {
        // Pass one: status from the snapshot, then local requirements.
        let mut annotated = Vec::with_capacity(components.len());
        for mut component in components {
            let paths = self.convention.expected_paths(&component);
            component.set_status(derive_status(&paths, snapshot));
            let local = self.evaluate(&component, &paths, snapshot, None);
            component.set_requirements(local);
            annotated.push((component, paths));
        }

        // The graphs see pass-one requirements on every node.
        let graph =
            ComponentGraph::new(annotated.iter().map(|(c, _)| c.clone()).collect());
        let outcome = graph.topo_order();
        for cycle in &outcome.cycles {
            warn!(from = %cycle.from, to = %cycle.to, "Broke dependency cycle during analysis");
        }

        // Pass two: graph-aware requirements, then the canonical ordering.
        let mut results = Vec::with_capacity(annotated.len());
        for (mut component, paths) in annotated {
            let graph_aware =
                self.evaluate(&component, &paths, snapshot, Some(&graph));
            let mut requirements = component.requirements.clone();
            requirements.extend(graph_aware);
            sort_canonical(&mut requirements);
            component.set_requirements(requirements);
            debug!(
                component_id = %component.id,
                satisfied = component.all_requirements_satisfied(),
                "Analyzed component"
            );
            results.push(AnalyzedComponent { component, paths });
        }

        results.sort_by(|a, b| {
            a.component
                .priority
                .cmp(&b.component.priority)
                .then_with(|| a.component.name.cmp(&b.component.name))
        });
        results
    }

    /// Analyzes and persists the results through a component store.
    ///
    /// A store failure for one component is logged and skipped; the
    /// returned results still carry that component's full annotation.
    pub fn sync(
        &self,
        components: Vec<Component>,
        snapshot: &ProjectSnapshot,
        store: &mut dyn ComponentStore,
    ) -> Vec<AnalyzedComponent> {
        let results = self.analyze(components, snapshot);
        for analyzed in &results {
            let component = &analyzed.component;
            if let Err(e) = store.update_status(&component.id, component.status) {
                warn!(component_id = %component.id, error = %e, "Failed to persist status");
                continue;
            }
            if let Err(e) = store.replace_requirements(&component.id, &component.requirements) {
                warn!(component_id = %component.id, error = %e, "Failed to persist requirements");
            }
        }
        results
    }

    /// Evaluates one pass of catalog definitions for a component.
    ///
    /// With `graph` absent only local definitions run; with it present only
    /// graph-aware ones, with trees expanded from the component.
    fn evaluate(
        &self,
        component: &Component,
        paths: &ComponentPaths,
        snapshot: &ProjectSnapshot,
        graph: Option<&ComponentGraph>,
    ) -> Vec<Requirement> {
        let trees = graph.map(|g| {
            (g.dependency_tree(&component.id), g.hierarchy_tree(&component.id))
        });
        let ctx = CheckContext {
            component,
            snapshot,
            paths,
            schema: self.catalog.schema_for(component.component_type),
            dependency_tree: trees.as_ref().map(|(d, _)| d),
            hierarchy_tree: trees.as_ref().map(|(_, h)| h),
        };

        self.catalog
            .definitions_for(component.component_type)
            .iter()
            .filter(|def| def.kind.is_local() == graph.is_none())
            .map(|def| self.registry.evaluate(def, &ctx))
            .collect()
    }
}

/// Derives a component's status from snapshot membership.
///
/// The snapshot records failures, not runs: a test file with no recorded
/// failure reads as passing, and a missing test file as not run.
fn derive_status(paths: &ComponentPaths, snapshot: &ProjectSnapshot) -> ComponentStatus {
    let test_exists = snapshot.has_file(&paths.test);
    let test_status = if !test_exists {
        TestStatus::NotRun
    } else if snapshot.has_failure_in(&paths.test) {
        TestStatus::Failing
    } else {
        TestStatus::Passing
    };
    ComponentStatus {
        design_exists: snapshot.has_file(&paths.design),
        code_exists: snapshot.has_file(&paths.implementation),
        test_exists,
        test_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::snapshot::TestFailure;
    use foreman_core::{ComponentType, RequirementKind};
    use pretty_assertions::assert_eq;

    fn analyzer() -> ComponentAnalyzer {
        ComponentAnalyzer::new(default_catalog(), NamingConvention::default())
    }

    fn users() -> Component {
        Component::new("users", "Users", ComponentType::Schema, "accounts/users")
    }

    fn complete_snapshot() -> ProjectSnapshot {
        ProjectSnapshot::new()
            .with_document(
                "designs/accounts/users.md",
                "## Purpose\nTrack users.\n## Fields\n- email\n",
            )
            .with_file("src/accounts/users.rs")
            .with_file("tests/accounts/users_test.rs")
    }

    fn requirement<'a>(
        analyzed: &'a AnalyzedComponent,
        kind: RequirementKind,
    ) -> &'a Requirement {
        analyzed
            .component
            .requirements
            .iter()
            .find(|r| r.kind == kind)
            .unwrap_or_else(|| panic!("no {kind:?} requirement"))
    }

    #[test]
    fn test_fully_complete_component() {
        let results = analyzer().analyze(vec![users()], &complete_snapshot());
        assert_eq!(results.len(), 1);

        let analyzed = &results[0];
        assert!(analyzed.component.status.design_exists);
        assert!(analyzed.component.status.code_exists);
        assert_eq!(analyzed.component.status.test_status, TestStatus::Passing);
        assert!(analyzed.component.all_requirements_satisfied());
    }

    #[test]
    fn test_code_only_component() {
        let snapshot = ProjectSnapshot::new().with_file("src/accounts/users.rs");
        let results = analyzer().analyze(vec![users()], &snapshot);
        let analyzed = &results[0];

        assert!(requirement(analyzed, RequirementKind::ImplementationFile).satisfied);
        assert!(!requirement(analyzed, RequirementKind::DesignFile).satisfied);

        let tests_passing = requirement(analyzed, RequirementKind::TestsPassing);
        assert!(!tests_passing.satisfied);
        assert_eq!(tests_passing.details["reason"], "No test file exists.");
    }

    #[test]
    fn test_failing_tests_mark_status() {
        let snapshot = complete_snapshot()
            .with_failure(TestFailure::new("tests/accounts/users_test.rs", "creates a user"));
        let results = analyzer().analyze(vec![users()], &snapshot);
        let analyzed = &results[0];

        assert_eq!(analyzed.component.status.test_status, TestStatus::Failing);
        assert!(!requirement(analyzed, RequirementKind::TestsPassing).satisfied);
    }

    #[test]
    fn test_requirements_are_in_canonical_order() {
        let results = analyzer().analyze(vec![users()], &complete_snapshot());
        let ranks: Vec<u8> = results[0]
            .component
            .requirements
            .iter()
            .map(|r| r.kind.canonical_rank())
            .collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn test_output_sorted_by_priority_then_name() {
        let components = vec![
            Component::new("b", "Beta", ComponentType::Service, "core/beta").with_priority(2),
            Component::new("a", "Alpha", ComponentType::Service, "core/alpha").with_priority(2),
            Component::new("z", "Zulu", ComponentType::Service, "core/zulu").with_priority(1),
        ];
        let results = analyzer().analyze(components, &ProjectSnapshot::new());
        let names: Vec<&str> = results.iter().map(|r| r.component.name.as_str()).collect();
        assert_eq!(names, vec!["Zulu", "Alpha", "Beta"]);
    }

    #[test]
    fn test_dependencies_satisfied_uses_neighbor_local_requirements() {
        // tokens is fully complete; users depends on it.
        let tokens = Component::new("tokens", "Tokens", ComponentType::Schema, "accounts/tokens");
        let users = users().with_dependencies(foreman_core::DependencyList::loaded(["tokens"]));
        let snapshot = complete_snapshot()
            .with_document(
                "designs/accounts/tokens.md",
                "## Purpose\nTokens.\n## Fields\n- value\n",
            )
            .with_file("src/accounts/tokens.rs")
            .with_file("tests/accounts/tokens_test.rs");

        let results = analyzer().analyze(vec![users, tokens], &snapshot);
        let users = results.iter().find(|r| r.component.id == "users").unwrap();
        assert!(requirement(users, RequirementKind::DependenciesSatisfied).satisfied);
    }

    #[test]
    fn test_incomplete_dependency_blocks_dependent() {
        let tokens = Component::new("tokens", "Tokens", ComponentType::Schema, "accounts/tokens");
        let users = users().with_dependencies(foreman_core::DependencyList::loaded(["tokens"]));

        // tokens has no artifacts at all.
        let results = analyzer().analyze(vec![users, tokens], &complete_snapshot());
        let users = results.iter().find(|r| r.component.id == "users").unwrap();
        let dep = requirement(users, RequirementKind::DependenciesSatisfied);
        assert!(!dep.satisfied);
        assert_eq!(dep.details["unsatisfied"], serde_json::json!(["tokens"]));
    }

    #[test]
    fn test_context_tracks_descendants() {
        let context = Component::new("accounts", "Accounts", ComponentType::Context, "accounts");
        let child = users().with_parent("accounts");

        let snapshot = complete_snapshot().with_document(
            "designs/accounts.md",
            "## Purpose\nAccounts.\n## Components\n- users\n",
        );
        let results = analyzer().analyze(vec![context, child], &snapshot);
        let context = results.iter().find(|r| r.component.id == "accounts").unwrap();

        assert!(requirement(context, RequirementKind::ChildrenDesigns).satisfied);
        assert!(requirement(context, RequirementKind::ChildrenComplete).satisfied);
    }

    #[test]
    fn test_cyclic_dependencies_still_produce_results() {
        let a = Component::new("a", "A", ComponentType::Service, "core/a")
            .with_dependencies(foreman_core::DependencyList::loaded(["b"]));
        let b = Component::new("b", "B", ComponentType::Service, "core/b")
            .with_dependencies(foreman_core::DependencyList::loaded(["a"]));

        let results = analyzer().analyze(vec![a, b], &ProjectSnapshot::new());
        assert_eq!(results.len(), 2);
        for analyzed in &results {
            assert!(!analyzed.component.requirements.is_empty());
        }
    }

    #[test]
    fn test_empty_input() {
        let results = analyzer().analyze(Vec::new(), &ProjectSnapshot::new());
        assert!(results.is_empty());
    }

    #[test]
    fn test_sync_degrades_on_store_failure() {
        use foreman_core::{
            Dependency, Requirement as Req, StorageError,
        };

        // A store that rejects everything.
        struct FailingStore;
        impl ComponentStore for FailingStore {
            fn create(&mut self, _: &Component) -> Result<(), StorageError> {
                Err(StorageError::InvalidData("down".to_string()))
            }
            fn get(&self, id: &str) -> Result<Component, StorageError> {
                Err(StorageError::not_found("components", id))
            }
            fn get_all(&self) -> Result<Vec<Component>, StorageError> {
                Ok(Vec::new())
            }
            fn update_status(
                &mut self,
                _: &str,
                _: ComponentStatus,
            ) -> Result<(), StorageError> {
                Err(StorageError::InvalidData("down".to_string()))
            }
            fn replace_requirements(
                &mut self,
                _: &str,
                _: &[Req],
            ) -> Result<(), StorageError> {
                Err(StorageError::InvalidData("down".to_string()))
            }
            fn add_dependency(&mut self, _: &Dependency) -> Result<(), StorageError> {
                Ok(())
            }
            fn remove_dependency(&mut self, _: &Dependency) -> Result<(), StorageError> {
                Ok(())
            }
            fn remove(&mut self, _: &str) -> Result<(), StorageError> {
                Ok(())
            }
        }

        let mut store = FailingStore;
        let results = analyzer().sync(vec![users()], &complete_snapshot(), &mut store);

        // Partial results over total failure: the analysis still comes back.
        assert_eq!(results.len(), 1);
        assert!(results[0].component.all_requirements_satisfied());
    }
}

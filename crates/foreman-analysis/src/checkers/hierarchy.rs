//! Hierarchy requirement checkers.
//!
//! Four variants over the same walk: every descendant at every depth of a
//! component's hierarchy tree must have a particular satisfied requirement
//! (or all of them, for the completeness variant). A component with no
//! descendants is vacuously satisfied.

use serde_json::json;

use foreman_core::{RequirementDefinition, RequirementKind};

use crate::checkers::{CheckContext, RequirementChecker, Verdict};
use crate::graph::ComponentNode;

/// Checks hierarchy requirements (`children_*` kinds).
pub struct HierarchyChecker;

impl RequirementChecker for HierarchyChecker {
    fn check(&self, definition: &RequirementDefinition, ctx: &CheckContext<'_>) -> Verdict {
        let required = match definition.kind {
            RequirementKind::ChildrenDesigns => Some(RequirementKind::DesignFile),
            RequirementKind::ChildrenImplementations => Some(RequirementKind::ImplementationFile),
            RequirementKind::ChildrenTests => Some(RequirementKind::TestFile),
            RequirementKind::ChildrenComplete => None,
            other => {
                return Verdict::unsatisfied(json!({
                    "reason": format!("{} is not a hierarchy requirement", other.as_str()),
                }));
            }
        };

        let Some(tree) = ctx.hierarchy_tree else {
            return Verdict::because("Hierarchy tree is not available.");
        };

        let mut failing = Vec::new();
        collect_failing(tree, required, &mut failing);
        failing.sort();
        failing.dedup();

        if failing.is_empty() {
            Verdict::satisfied(json!({ "descendants": tree.walk().len() - 1 }))
        } else {
            Verdict::unsatisfied(json!({
                "reason": "Descendants are incomplete.",
                "failing": failing,
            }))
        }
    }
}

/// Records every descendant missing the required satisfied requirement
/// (or, when `required` is `None`, any satisfied-requirement set at all).
fn collect_failing(
    root: &ComponentNode,
    required: Option<RequirementKind>,
    out: &mut Vec<String>,
) {
    for child in &root.children {
        let ok = child.component.as_ref().is_some_and(|component| match required {
            Some(kind) => {
                component.requirements.iter().any(|r| r.kind == kind && r.satisfied)
            }
            None => component.all_requirements_satisfied(),
        });
        if !ok {
            out.push(child.id.clone());
        }
        collect_failing(child, required, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::test_support::{component, paths_for};
    use crate::graph::ComponentGraph;
    use crate::snapshot::ProjectSnapshot;
    use foreman_core::{Component, Requirement};

    fn check(kind: RequirementKind, root: &Component, tree: &ComponentNode) -> Verdict {
        let paths = paths_for(root);
        let snapshot = ProjectSnapshot::new();
        let ctx = CheckContext {
            component: root,
            snapshot: &snapshot,
            paths: &paths,
            schema: None,
            dependency_tree: None,
            hierarchy_tree: Some(tree),
        };
        HierarchyChecker.check(&RequirementDefinition::new(kind), &ctx)
    }

    fn child_with(id: &str, parent: &str, requirements: Vec<Requirement>) -> Component {
        let mut c = component(id).with_parent(parent);
        c.set_requirements(requirements);
        c
    }

    #[test]
    fn test_no_descendants_is_vacuously_satisfied() {
        let graph = ComponentGraph::new(vec![component("accounts")]);
        let tree = graph.hierarchy_tree("accounts");
        for kind in [
            RequirementKind::ChildrenDesigns,
            RequirementKind::ChildrenImplementations,
            RequirementKind::ChildrenTests,
            RequirementKind::ChildrenComplete,
        ] {
            let verdict = check(kind, graph.get("accounts").unwrap(), &tree);
            assert!(verdict.satisfied, "{kind:?} should be vacuously satisfied");
        }
    }

    #[test]
    fn test_children_designs_checks_every_depth() {
        let graph = ComponentGraph::new(vec![
            component("accounts"),
            child_with(
                "users",
                "accounts",
                vec![Requirement::satisfied(RequirementKind::DesignFile, "design_file")],
            ),
            // Grandchild with no satisfied design requirement.
            child_with("sessions", "users", vec![]),
        ]);
        let tree = graph.hierarchy_tree("accounts");
        let verdict =
            check(RequirementKind::ChildrenDesigns, graph.get("accounts").unwrap(), &tree);

        assert!(!verdict.satisfied);
        assert_eq!(verdict.details["failing"], serde_json::json!(["sessions"]));
    }

    #[test]
    fn test_children_complete_requires_full_satisfaction() {
        let graph = ComponentGraph::new(vec![
            component("accounts"),
            child_with(
                "users",
                "accounts",
                vec![
                    Requirement::satisfied(RequirementKind::DesignFile, "design_file"),
                    Requirement::unsatisfied(RequirementKind::TestFile, "test_file"),
                ],
            ),
        ]);
        let tree = graph.hierarchy_tree("accounts");
        let verdict =
            check(RequirementKind::ChildrenComplete, graph.get("accounts").unwrap(), &tree);

        assert!(!verdict.satisfied);
        assert_eq!(verdict.details["failing"], serde_json::json!(["users"]));
    }

    #[test]
    fn test_all_variants_satisfied() {
        let requirements = vec![
            Requirement::satisfied(RequirementKind::DesignFile, "design_file"),
            Requirement::satisfied(RequirementKind::ImplementationFile, "implementation_file"),
            Requirement::satisfied(RequirementKind::TestFile, "test_file"),
        ];
        let graph = ComponentGraph::new(vec![
            component("accounts"),
            child_with("users", "accounts", requirements.clone()),
            child_with("tokens", "accounts", requirements),
        ]);
        let tree = graph.hierarchy_tree("accounts");

        for kind in [
            RequirementKind::ChildrenDesigns,
            RequirementKind::ChildrenImplementations,
            RequirementKind::ChildrenTests,
            RequirementKind::ChildrenComplete,
        ] {
            let verdict = check(kind, graph.get("accounts").unwrap(), &tree);
            assert!(verdict.satisfied, "{kind:?} should be satisfied");
        }
    }

    #[test]
    fn test_missing_tree_is_fail_safe() {
        let root = component("accounts");
        let paths = paths_for(&root);
        let snapshot = ProjectSnapshot::new();
        let ctx = CheckContext {
            component: &root,
            snapshot: &snapshot,
            paths: &paths,
            schema: None,
            dependency_tree: None,
            hierarchy_tree: None,
        };
        let verdict = HierarchyChecker
            .check(&RequirementDefinition::new(RequirementKind::ChildrenComplete), &ctx);
        assert!(!verdict.satisfied);
    }
}

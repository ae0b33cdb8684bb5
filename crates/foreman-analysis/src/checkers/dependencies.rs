//! Dependency-satisfaction requirement checker.

use serde_json::json;

use foreman_core::{DependencyList, RequirementDefinition};

use crate::checkers::{CheckContext, RequirementChecker, Verdict};
use crate::graph::ComponentNode;

/// Checks that every transitive dependency has all of its own requirements
/// satisfied.
///
/// Fail-safe on incomplete data: an unloaded dependency list, a missing
/// dependency tree or an unresolved dependency id all read as unsatisfied.
pub struct DependenciesSatisfiedChecker;

impl RequirementChecker for DependenciesSatisfiedChecker {
    fn check(&self, _definition: &RequirementDefinition, ctx: &CheckContext<'_>) -> Verdict {
        let ids = match &ctx.component.dependencies {
            DependencyList::NotLoaded => {
                return Verdict::because("Dependencies were not loaded.");
            }
            DependencyList::Loaded(ids) => ids,
        };
        if ids.is_empty() {
            // No dependencies to satisfy.
            return Verdict::satisfied(json!({ "dependencies": [] }));
        }

        let Some(tree) = ctx.dependency_tree else {
            return Verdict::because("Dependency tree is not available.");
        };

        let mut unsatisfied = Vec::new();
        collect_unsatisfied(tree, &mut unsatisfied);
        unsatisfied.sort();
        unsatisfied.dedup();

        if unsatisfied.is_empty() {
            Verdict::satisfied(json!({ "dependencies": ids }))
        } else {
            Verdict::unsatisfied(json!({
                "reason": "Unsatisfied dependencies.",
                "unsatisfied": unsatisfied,
            }))
        }
    }
}

/// Records every descendant of the root that is unresolved or has an
/// unsatisfied requirement.
fn collect_unsatisfied(root: &ComponentNode, out: &mut Vec<String>) {
    for child in &root.children {
        match &child.component {
            Some(component) if component.all_requirements_satisfied() => {}
            _ => out.push(child.id.clone()),
        }
        collect_unsatisfied(child, out);
    }
}

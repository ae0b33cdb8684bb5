//! File-existence requirement checkers.

use serde_json::json;

use foreman_core::{RequirementDefinition, RequirementKind};

use crate::checkers::{CheckContext, RequirementChecker, Verdict};

/// Checks design/implementation/test file existence against the derived
/// component status.
pub struct FileExistenceChecker;

impl RequirementChecker for FileExistenceChecker {
    fn check(&self, definition: &RequirementDefinition, ctx: &CheckContext<'_>) -> Verdict {
        let (exists, path) = match definition.kind {
            RequirementKind::DesignFile => (ctx.component.status.design_exists, &ctx.paths.design),
            RequirementKind::ImplementationFile => {
                (ctx.component.status.code_exists, &ctx.paths.implementation)
            }
            RequirementKind::TestFile => (ctx.component.status.test_exists, &ctx.paths.test),
            other => {
                return Verdict::unsatisfied(json!({
                    "reason": format!("{} is not a file-existence requirement", other.as_str()),
                }));
            }
        };

        let details = json!({ "path": path, "exists": exists });
        if exists {
            Verdict::satisfied(details)
        } else {
            Verdict::unsatisfied(details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::test_support::{component_with_status, paths_for};
    use crate::snapshot::ProjectSnapshot;
    use foreman_core::ComponentStatus;

    fn check(kind: RequirementKind, status: ComponentStatus) -> Verdict {
        let component = component_with_status("users", status);
        let paths = paths_for(&component);
        let snapshot = ProjectSnapshot::new();
        let ctx = CheckContext {
            component: &component,
            snapshot: &snapshot,
            paths: &paths,
            schema: None,
            dependency_tree: None,
            hierarchy_tree: None,
        };
        FileExistenceChecker.check(&RequirementDefinition::new(kind), &ctx)
    }

    #[test]
    fn test_design_file_present() {
        let status = ComponentStatus { design_exists: true, ..ComponentStatus::default() };
        let verdict = check(RequirementKind::DesignFile, status);
        assert!(verdict.satisfied);
        assert_eq!(verdict.details["path"], "designs/accounts/users.md");
    }

    #[test]
    fn test_implementation_file_missing() {
        let verdict = check(RequirementKind::ImplementationFile, ComponentStatus::default());
        assert!(!verdict.satisfied);
        assert_eq!(verdict.details["exists"], false);
    }

    #[test]
    fn test_test_file_present() {
        let status = ComponentStatus { test_exists: true, ..ComponentStatus::default() };
        let verdict = check(RequirementKind::TestFile, status);
        assert!(verdict.satisfied);
        assert_eq!(verdict.details["path"], "tests/accounts/users_test.rs");
    }

    #[test]
    fn test_non_file_kind_is_rejected() {
        let verdict = check(RequirementKind::TestsPassing, ComponentStatus::default());
        assert!(!verdict.satisfied);
    }
}

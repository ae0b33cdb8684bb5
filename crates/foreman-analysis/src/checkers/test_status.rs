//! Test-run requirement checker.

use serde_json::json;

use foreman_core::{RequirementDefinition, TestStatus};

use crate::checkers::{CheckContext, RequirementChecker, Verdict};

/// Checks that a component's test file exists and its latest run passed.
pub struct TestsPassingChecker;

impl RequirementChecker for TestsPassingChecker {
    fn check(&self, _definition: &RequirementDefinition, ctx: &CheckContext<'_>) -> Verdict {
        let status = ctx.component.status;
        if !status.test_exists {
            return Verdict::because("No test file exists.");
        }
        match status.test_status {
            TestStatus::Passing => Verdict::satisfied(json!({ "path": ctx.paths.test })),
            TestStatus::Failing => {
                let failures: Vec<&str> = ctx
                    .snapshot
                    .test_failures
                    .iter()
                    .filter(|f| f.file == ctx.paths.test)
                    .map(|f| f.title.as_str())
                    .collect();
                Verdict::unsatisfied(json!({
                    "reason": "Tests are failing.",
                    "failures": failures,
                }))
            }
            TestStatus::NotRun => Verdict::because("Tests have not been run."),
        }
    }
}

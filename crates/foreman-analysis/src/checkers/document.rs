//! Design-document structural validity checker.
//!
//! Parses markdown section headers out of the design document and compares
//! them against the per-component-type schema: required sections must be
//! present, disallowed sections must be absent. A missing document is a
//! distinct verdict from a structurally invalid one.

use serde_json::json;

use foreman_core::RequirementDefinition;

use crate::checkers::{CheckContext, RequirementChecker, Verdict};

/// Checks a design document against its structural schema.
pub struct DocumentValidChecker;

impl RequirementChecker for DocumentValidChecker {
    fn check(&self, _definition: &RequirementDefinition, ctx: &CheckContext<'_>) -> Verdict {
        let Some(contents) = ctx.snapshot.document(&ctx.paths.design) else {
            return Verdict::unsatisfied(json!({
                "reason": "Design document is missing.",
                "path": ctx.paths.design,
                "missing_file": true,
            }));
        };

        let Some(schema) = ctx.schema else {
            // No schema for this component type: any document is valid.
            return Verdict::satisfied(json!({ "path": ctx.paths.design }));
        };

        let sections = section_headers(contents);
        let missing: Vec<&str> = schema
            .required
            .iter()
            .filter(|s| !sections.iter().any(|h| h.eq_ignore_ascii_case(s)))
            .map(String::as_str)
            .collect();
        let forbidden: Vec<&str> = schema
            .disallowed
            .iter()
            .filter(|s| sections.iter().any(|h| h.eq_ignore_ascii_case(s)))
            .map(String::as_str)
            .collect();

        if missing.is_empty() && forbidden.is_empty() {
            Verdict::satisfied(json!({ "path": ctx.paths.design, "sections": sections }))
        } else {
            Verdict::unsatisfied(json!({
                "reason": "Design document structure is invalid.",
                "missing_sections": missing,
                "disallowed_sections": forbidden,
            }))
        }
    }
}

/// Extracts markdown section header titles, any level, in document order.
fn section_headers(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            let stripped = trimmed.trim_start_matches('#');
            if stripped.len() == trimmed.len() {
                return None;
            }
            let title = stripped.trim();
            (!title.is_empty()).then(|| title.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DocumentSchema;
    use crate::checkers::test_support::{component, paths_for};
    use crate::snapshot::ProjectSnapshot;
    use foreman_core::RequirementKind;

    fn schema() -> DocumentSchema {
        DocumentSchema {
            required: vec!["Purpose".to_string(), "Fields".to_string()],
            disallowed: vec!["TODO".to_string()],
        }
    }

    fn check(snapshot: &ProjectSnapshot, schema: Option<&DocumentSchema>) -> Verdict {
        let component = component("users");
        let paths = paths_for(&component);
        let ctx = CheckContext {
            component: &component,
            snapshot,
            paths: &paths,
            schema,
            dependency_tree: None,
            hierarchy_tree: None,
        };
        DocumentValidChecker.check(&RequirementDefinition::new(RequirementKind::DesignValid), &ctx)
    }

    #[test]
    fn test_missing_document_has_distinct_detail() {
        let verdict = check(&ProjectSnapshot::new(), Some(&schema()));
        assert!(!verdict.satisfied);
        assert_eq!(verdict.details["missing_file"], true);
    }

    #[test]
    fn test_valid_document() {
        let snapshot = ProjectSnapshot::new().with_document(
            "designs/accounts/users.md",
            "# Users\n\n## Purpose\nTrack users.\n\n## Fields\n- email\n",
        );
        let verdict = check(&snapshot, Some(&schema()));
        assert!(verdict.satisfied);
    }

    #[test]
    fn test_missing_required_section() {
        let snapshot = ProjectSnapshot::new()
            .with_document("designs/accounts/users.md", "# Users\n\n## Purpose\nTrack users.\n");
        let verdict = check(&snapshot, Some(&schema()));
        assert!(!verdict.satisfied);
        assert_eq!(verdict.details["missing_sections"], serde_json::json!(["Fields"]));
        assert_eq!(verdict.details["missing_file"], serde_json::Value::Null);
    }

    #[test]
    fn test_disallowed_section_present() {
        let snapshot = ProjectSnapshot::new().with_document(
            "designs/accounts/users.md",
            "## Purpose\nx\n## Fields\ny\n## TODO\nlater\n",
        );
        let verdict = check(&snapshot, Some(&schema()));
        assert!(!verdict.satisfied);
        assert_eq!(verdict.details["disallowed_sections"], serde_json::json!(["TODO"]));
    }

    #[test]
    fn test_no_schema_accepts_any_document() {
        let snapshot =
            ProjectSnapshot::new().with_document("designs/accounts/users.md", "anything");
        let verdict = check(&snapshot, None);
        assert!(verdict.satisfied);
    }

    #[test]
    fn test_section_headers_parsing() {
        let headers = section_headers("# A\ntext\n## B c\n####   D\n#\nnot # a header\n");
        assert_eq!(headers, vec!["A", "B c", "D"]);
    }

    #[test]
    fn test_section_matching_is_case_insensitive() {
        let snapshot = ProjectSnapshot::new()
            .with_document("designs/accounts/users.md", "## purpose\nx\n## FIELDS\ny\n");
        let verdict = check(&snapshot, Some(&schema()));
        assert!(verdict.satisfied);
    }
}

//! Project snapshots and naming conventions.
//!
//! The analyzer never touches the filesystem: callers hand it a snapshot of
//! existing file paths, failing tests and design-document contents, plus a
//! naming convention that maps a component's module path to the artifact
//! locations the project expects.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use foreman_core::Component;

/// One failing test observed in the most recent test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    /// Path of the test file the failure came from.
    pub file: String,
    /// Title of the failing test.
    pub title: String,
}

impl TestFailure {
    /// Creates a failure record.
    pub fn new(file: impl Into<String>, title: impl Into<String>) -> Self {
        Self { file: file.into(), title: title.into() }
    }
}

/// Value snapshot of the target project at one instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Every file path that exists in the project.
    pub files: HashSet<String>,
    /// Failures from the most recent test run.
    pub test_failures: Vec<TestFailure>,
    /// Design-document contents keyed by path.
    pub documents: HashMap<String, String>,
}

impl ProjectSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing file path.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.insert(path.into());
        self
    }

    /// Adds a failing-test record.
    #[must_use]
    pub fn with_failure(mut self, failure: TestFailure) -> Self {
        self.test_failures.push(failure);
        self
    }

    /// Adds a design document, registering its path as an existing file.
    #[must_use]
    pub fn with_document(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        let path = path.into();
        self.files.insert(path.clone());
        self.documents.insert(path, contents.into());
        self
    }

    /// Returns true if the path exists in the snapshot.
    pub fn has_file(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    /// Returns true if any failure came from the given test file.
    pub fn has_failure_in(&self, test_path: &str) -> bool {
        self.test_failures.iter().any(|f| f.file == test_path)
    }

    /// Returns the contents of a design document, if captured.
    pub fn document(&self, path: &str) -> Option<&str> {
        self.documents.get(path).map(String::as_str)
    }
}

/// Expected artifact locations for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPaths {
    /// Expected design-document path.
    pub design: String,
    /// Expected implementation-file path.
    pub implementation: String,
    /// Expected test-file path.
    pub test: String,
}

/// Maps a component's module path to expected artifact locations.
///
/// Configurable per project via TOML; the defaults suit a layout with
/// `designs/`, `src/` and `tests/` roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    /// Directory holding design documents.
    pub design_dir: String,
    /// Design document file extension.
    pub design_ext: String,
    /// Directory holding implementation files.
    pub source_dir: String,
    /// Implementation file extension.
    pub source_ext: String,
    /// Directory holding test files.
    pub test_dir: String,
    /// Suffix appended to the module path for test files (before the
    /// extension).
    pub test_suffix: String,
    /// Test file extension.
    pub test_ext: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            design_dir: "designs".to_string(),
            design_ext: "md".to_string(),
            source_dir: "src".to_string(),
            source_ext: "rs".to_string(),
            test_dir: "tests".to_string(),
            test_suffix: "_test".to_string(),
            test_ext: "rs".to_string(),
        }
    }
}

impl NamingConvention {
    /// Derives the expected artifact paths for a component.
    pub fn expected_paths(&self, component: &Component) -> ComponentPaths {
        let module = &component.module_path;
        ComponentPaths {
            design: format!("{}/{}.{}", self.design_dir, module, self.design_ext),
            implementation: format!("{}/{}.{}", self.source_dir, module, self.source_ext),
            test: format!("{}/{}{}.{}", self.test_dir, module, self.test_suffix, self.test_ext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_core::ComponentType;

    fn users() -> Component {
        Component::new("users", "Users", ComponentType::Schema, "accounts/users")
    }

    #[test]
    fn test_default_convention_paths() {
        let paths = NamingConvention::default().expected_paths(&users());
        assert_eq!(paths.design, "designs/accounts/users.md");
        assert_eq!(paths.implementation, "src/accounts/users.rs");
        assert_eq!(paths.test, "tests/accounts/users_test.rs");
    }

    #[test]
    fn test_convention_from_toml() {
        let convention: NamingConvention = toml::from_str(
            r#"
            design_dir = "docs/design"
            source_dir = "lib"
            source_ext = "ex"
            test_suffix = ""
            test_ext = "exs"
            "#,
        )
        .unwrap();

        let paths = convention.expected_paths(&users());
        assert_eq!(paths.design, "docs/design/accounts/users.md");
        assert_eq!(paths.implementation, "lib/accounts/users.ex");
        assert_eq!(paths.test, "tests/accounts/users.exs");
    }

    #[test]
    fn test_snapshot_membership() {
        let snapshot = ProjectSnapshot::new()
            .with_file("src/accounts/users.rs")
            .with_document("designs/accounts/users.md", "# Users\n")
            .with_failure(TestFailure::new("tests/accounts/users_test.rs", "creates a user"));

        assert!(snapshot.has_file("src/accounts/users.rs"));
        // Documents register as files too.
        assert!(snapshot.has_file("designs/accounts/users.md"));
        assert!(!snapshot.has_file("tests/accounts/users_test.rs"));
        assert!(snapshot.has_failure_in("tests/accounts/users_test.rs"));
        assert!(!snapshot.has_failure_in("tests/accounts/tokens_test.rs"));
        assert_eq!(snapshot.document("designs/accounts/users.md"), Some("# Users\n"));
    }
}

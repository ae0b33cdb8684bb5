//! Foreman Analysis - dependency graphs and requirement checking.
//!
//! This crate analyzes tracked components against a project snapshot:
//! - Builds dependency and hierarchy graphs with cycle-tolerant traversal
//! - Derives per-component status from file and test-run snapshots
//! - Evaluates completion requirements through a static checker registry
//! - Produces fully-annotated, deterministically-ordered component lists
//!
//! All analysis is pure and synchronous: inputs are value snapshots, the
//! analyzer performs no I/O of its own.

pub mod analyzer;
pub mod catalog;
pub mod checkers;
pub mod graph;
pub mod snapshot;

pub use analyzer::{AnalyzedComponent, ComponentAnalyzer};
pub use catalog::{default_catalog, CatalogError, DocumentSchema, RequirementCatalog};
pub use checkers::{CheckContext, CheckerRegistry, RequirementChecker, Verdict};
pub use graph::{ComponentGraph, ComponentNode, CycleEdge, TopoOutcome};
pub use snapshot::{ComponentPaths, NamingConvention, ProjectSnapshot, TestFailure};

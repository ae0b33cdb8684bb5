//! Data model for Foreman Core.

pub mod component;
pub mod requirement;
pub mod session;

pub use component::{Component, ComponentStatus, ComponentType, Dependency, DependencyList, TestStatus};
pub use requirement::{Requirement, RequirementDefinition, RequirementKind};
pub use session::{
    Command, CommandInstruction, CommandResult, Interaction, ResultStatus, Session, SessionStatus,
    WorkflowKind,
};

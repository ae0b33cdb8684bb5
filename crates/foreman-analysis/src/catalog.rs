//! Requirement catalog.
//!
//! The catalog is the policy table the checking engine consumes: which
//! requirement definitions apply to each component type, and what the
//! structural schema of each type's design document looks like. It can be
//! loaded from TOML so projects can tune policy without code changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use foreman_core::{ComponentType, RequirementDefinition, RequirementKind};

/// Structural schema for one component type's design document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSchema {
    /// Section headers that must be present.
    pub required: Vec<String>,
    /// Section headers that must not be present.
    pub disallowed: Vec<String>,
}

/// Errors that can occur loading a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The TOML source could not be parsed.
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CatalogEntry {
    requirements: Vec<RequirementDefinition>,
    document: Option<DocumentSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CatalogFile {
    types: HashMap<ComponentType, CatalogEntry>,
}

/// Requirement definitions and document schemas keyed by component type.
#[derive(Debug, Clone, Default)]
pub struct RequirementCatalog {
    definitions: HashMap<ComponentType, Vec<RequirementDefinition>>,
    schemas: HashMap<ComponentType, DocumentSchema>,
}

impl RequirementCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a catalog from TOML source.
    ///
    /// # Errors
    /// * `CatalogError::Parse` - if the source is not valid catalog TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(source)?;
        let mut catalog = Self::new();
        for (component_type, entry) in file.types {
            catalog.definitions.insert(component_type, entry.requirements);
            if let Some(schema) = entry.document {
                catalog.schemas.insert(component_type, schema);
            }
        }
        Ok(catalog)
    }

    /// Sets the requirement definitions for a component type.
    pub fn define(&mut self, component_type: ComponentType, defs: Vec<RequirementDefinition>) {
        self.definitions.insert(component_type, defs);
    }

    /// Sets the document schema for a component type.
    pub fn define_schema(&mut self, component_type: ComponentType, schema: DocumentSchema) {
        self.schemas.insert(component_type, schema);
    }

    /// Returns the requirement definitions for a component type.
    pub fn definitions_for(&self, component_type: ComponentType) -> &[RequirementDefinition] {
        self.definitions.get(&component_type).map_or(&[], Vec::as_slice)
    }

    /// Returns the document schema for a component type, if defined.
    pub fn schema_for(&self, component_type: ComponentType) -> Option<&DocumentSchema> {
        self.schemas.get(&component_type)
    }
}

/// The default catalog: leaf types carry the artifact-and-dependency
/// requirements, contexts track their descendants.
pub fn default_catalog() -> RequirementCatalog {
    let mut catalog = RequirementCatalog::new();

    let leaf_definitions = || {
        vec![
            RequirementDefinition::new(RequirementKind::DesignFile).satisfied_by("design"),
            RequirementDefinition::new(RequirementKind::DesignValid).satisfied_by("design"),
            RequirementDefinition::new(RequirementKind::ImplementationFile)
                .satisfied_by("artifact"),
            RequirementDefinition::new(RequirementKind::TestFile).satisfied_by("artifact"),
            RequirementDefinition::new(RequirementKind::TestsPassing).satisfied_by("artifact"),
            RequirementDefinition::new(RequirementKind::DependenciesSatisfied),
        ]
    };
    for component_type in [
        ComponentType::Schema,
        ComponentType::Repository,
        ComponentType::Service,
        ComponentType::Endpoint,
    ] {
        catalog.define(component_type, leaf_definitions());
    }
    catalog.define(
        ComponentType::Context,
        vec![
            RequirementDefinition::new(RequirementKind::DesignFile).satisfied_by("design"),
            RequirementDefinition::new(RequirementKind::DesignValid).satisfied_by("design"),
            RequirementDefinition::new(RequirementKind::ChildrenDesigns),
            RequirementDefinition::new(RequirementKind::ChildrenImplementations),
            RequirementDefinition::new(RequirementKind::ChildrenTests),
            RequirementDefinition::new(RequirementKind::ChildrenComplete),
        ],
    );

    catalog.define_schema(
        ComponentType::Schema,
        DocumentSchema {
            required: vec!["Purpose".to_string(), "Fields".to_string()],
            disallowed: Vec::new(),
        },
    );
    catalog.define_schema(
        ComponentType::Context,
        DocumentSchema {
            required: vec!["Purpose".to_string(), "Components".to_string()],
            disallowed: Vec::new(),
        },
    );

    catalog
}

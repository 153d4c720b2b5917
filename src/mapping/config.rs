//! Mapping document loading.
//!
//! Mapping catalogs can be declared in YAML or JSON with the following structure:
//!
//! ```yaml
//! entities:
//!   - name: Person            # Entity type name
//!     id: id                  # Identifier property
//!     properties:
//!       - { name: id, basic: i64 }
//!       - { name: name, basic: String }
//!       - { name: spouse, to_one: Person }
//!       - { name: children, to_many: Person }
//!       - { name: address, embedded: Address }
//! embeddables:
//!   - name: Address
//!     properties:
//!       - { name: city, basic: String }
//! ```
//!
//! Every document is validated with [`MappingCatalog::validate`] before a
//! catalog is handed out.
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::catalog::{EmbeddableMapping, EntityMapping, MappingCatalog, PropertyKind};
use super::errors::MetadataError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
    #[serde(default)]
    pub embeddables: Vec<EmbeddableDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddableDefinition {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(flatten)]
    pub mapping: MappingDefinition,
}

/// Kind and target of one property, keyed by kind in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingDefinition {
    Basic(String),
    ToOne(String),
    ToMany(String),
    Embedded(String),
    ElementCollection(String),
    Map(String),
}

impl From<MappingDefinition> for PropertyKind {
    fn from(definition: MappingDefinition) -> Self {
        match definition {
            MappingDefinition::Basic(type_name) => PropertyKind::Basic { type_name },
            MappingDefinition::ToOne(target) => PropertyKind::ToOne { target },
            MappingDefinition::ToMany(target) => PropertyKind::ToMany { target },
            MappingDefinition::Embedded(target) => PropertyKind::Embedded { target },
            MappingDefinition::ElementCollection(element) => {
                PropertyKind::ElementCollection { element }
            }
            MappingDefinition::Map(value) => PropertyKind::Map { value },
        }
    }
}

impl MappingConfig {
    /// Load a mapping document from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let contents = fs::read_to_string(path).map_err(|e| MetadataError::ConfigReadError {
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Load a mapping document from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MetadataError> {
        serde_yaml::from_str(yaml).map_err(|e| MetadataError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Load a mapping document from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(json).map_err(|e| MetadataError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Build and validate a catalog from this document.
    pub fn to_catalog(&self) -> Result<MappingCatalog, MetadataError> {
        let mut seen = HashSet::new();
        let mut catalog = MappingCatalog::new();

        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(MetadataError::DuplicateType {
                    name: entity.name.clone(),
                });
            }
            let mapping = entity.properties.iter().fold(
                EntityMapping::new(&entity.name, &entity.id),
                |mapping, p| mapping.with_kind(&p.name, p.mapping.clone().into()),
            );
            catalog = catalog.with_entity(mapping);
        }

        for embeddable in &self.embeddables {
            if !seen.insert(embeddable.name.as_str()) {
                return Err(MetadataError::DuplicateType {
                    name: embeddable.name.clone(),
                });
            }
            let mapping = embeddable.properties.iter().fold(
                EmbeddableMapping::new(&embeddable.name),
                |mapping, p| mapping.with_kind(&p.name, p.mapping.clone().into()),
            );
            catalog = catalog.with_embeddable(mapping);
        }

        catalog.validate()?;
        Ok(catalog)
    }
}

/// Load and validate a catalog from a YAML mapping file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<MappingCatalog, MetadataError> {
    MappingConfig::from_yaml_file(path)?.to_catalog()
}

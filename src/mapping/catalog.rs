//! In-memory mapping catalog.
//!
//! Holds entity and embeddable mappings and answers the [`MetadataProvider`]
//! lookups the query graph needs. Catalogs are usually built fluently in code
//! or loaded from a mapping document through [`super::config::MappingConfig`].

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::errors::MetadataError;
use super::{EntityInfo, MetadataProvider, PropertyInfo};
use crate::utils::identifiers::{is_identifier, is_qualified_name};

/// How a mapped property relates to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// Scalar column (`i64`, `String`, `bool`, ...)
    Basic { type_name: String },
    /// Single-valued association to another entity
    ToOne { target: String },
    /// Collection-valued association to another entity
    ToMany { target: String },
    /// Embedded value stored in the owner's table
    Embedded { target: String },
    /// Collection of basic or embeddable values
    ElementCollection { element: String },
    /// Keyed collection; `value` is the element type
    Map { value: String },
}

impl PropertyKind {
    fn target(&self) -> &str {
        match self {
            PropertyKind::Basic { type_name } => type_name,
            PropertyKind::ToOne { target }
            | PropertyKind::ToMany { target }
            | PropertyKind::Embedded { target } => target,
            PropertyKind::ElementCollection { element } => element,
            PropertyKind::Map { value } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMapping {
    pub name: String,
    pub kind: PropertyKind,
}

/// Mapping of one entity type. Properties keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub name: String,
    pub identifier: String,
    pub properties: Vec<PropertyMapping>,
}

impl EntityMapping {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            properties: Vec::new(),
        }
    }

    pub fn basic(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::Basic { type_name: type_name.into() })
    }

    pub fn to_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::ToOne { target: target.into() })
    }

    pub fn to_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::ToMany { target: target.into() })
    }

    pub fn embedded(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::Embedded { target: target.into() })
    }

    pub fn element_collection(self, name: impl Into<String>, element: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::ElementCollection { element: element.into() })
    }

    pub fn map(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::Map { value: value.into() })
    }

    /// Adds or replaces a property.
    pub fn with_kind(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        upsert(&mut self.properties, name.into(), kind);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMapping> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Mapping of an embeddable (component) type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddableMapping {
    pub name: String,
    pub properties: Vec<PropertyMapping>,
}

impl EmbeddableMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn basic(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::Basic { type_name: type_name.into() })
    }

    pub fn to_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::ToOne { target: target.into() })
    }

    pub fn embedded(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_kind(name, PropertyKind::Embedded { target: target.into() })
    }

    pub fn with_kind(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        upsert(&mut self.properties, name.into(), kind);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMapping> {
        self.properties.iter().find(|p| p.name == name)
    }
}

fn upsert(properties: &mut Vec<PropertyMapping>, name: String, kind: PropertyKind) {
    match properties.iter_mut().find(|p| p.name == name) {
        Some(existing) => existing.kind = kind,
        None => properties.push(PropertyMapping { name, kind }),
    }
}

/// Entity and embeddable mappings keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct MappingCatalog {
    entities: HashMap<String, EntityMapping>,
    embeddables: HashMap<String, EmbeddableMapping>,
}

impl MappingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity mapping, replacing any previous one of that name.
    pub fn with_entity(mut self, mapping: EntityMapping) -> Self {
        self.entities.insert(mapping.name.clone(), mapping);
        self
    }

    /// Registers an embeddable mapping, replacing any previous one of that name.
    pub fn with_embeddable(mut self, mapping: EmbeddableMapping) -> Self {
        self.embeddables.insert(mapping.name.clone(), mapping);
        self
    }

    pub fn entity_mapping(&self, name: &str) -> Option<&EntityMapping> {
        self.entities.get(name)
    }

    pub fn embeddable_mapping(&self, name: &str) -> Option<&EmbeddableMapping> {
        self.embeddables.get(name)
    }

    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Checks names, identifiers and relation targets of every mapping.
    pub fn validate(&self) -> Result<(), MetadataError> {
        for name in self.entities.keys() {
            if self.embeddables.contains_key(name) {
                return Err(MetadataError::DuplicateType { name: name.clone() });
            }
        }

        let mut entity_names: Vec<&String> = self.entities.keys().collect();
        entity_names.sort();
        for name in entity_names {
            let entity = &self.entities[name];
            if !is_qualified_name(&entity.name) {
                return Err(MetadataError::InvalidName {
                    name: entity.name.clone(),
                });
            }
            match entity.property(&entity.identifier) {
                Some(PropertyMapping {
                    kind: PropertyKind::Basic { .. } | PropertyKind::Embedded { .. },
                    ..
                }) => {}
                _ => {
                    return Err(MetadataError::InvalidIdentifier {
                        entity: entity.name.clone(),
                        identifier: entity.identifier.clone(),
                    })
                }
            }
            self.validate_properties(&entity.name, &entity.properties)?;
        }

        let mut embeddable_names: Vec<&String> = self.embeddables.keys().collect();
        embeddable_names.sort();
        for name in embeddable_names {
            let embeddable = &self.embeddables[name];
            if !is_qualified_name(&embeddable.name) {
                return Err(MetadataError::InvalidName {
                    name: embeddable.name.clone(),
                });
            }
            self.validate_properties(&embeddable.name, &embeddable.properties)?;
        }
        Ok(())
    }

    fn validate_properties(
        &self,
        owner: &str,
        properties: &[PropertyMapping],
    ) -> Result<(), MetadataError> {
        for property in properties {
            if !is_identifier(&property.name) {
                return Err(MetadataError::InvalidName {
                    name: format!("{}.{}", owner, property.name),
                });
            }
            let declared = match &property.kind {
                PropertyKind::ToOne { target } | PropertyKind::ToMany { target } => {
                    self.entities.contains_key(target)
                }
                PropertyKind::Embedded { target } => self.embeddables.contains_key(target),
                PropertyKind::Basic { .. }
                | PropertyKind::ElementCollection { .. }
                | PropertyKind::Map { .. } => true,
            };
            if !declared {
                return Err(MetadataError::UnknownTarget {
                    owner: owner.to_string(),
                    property: property.name.clone(),
                    target: property.kind.target().to_string(),
                });
            }
        }
        Ok(())
    }

    fn owner_properties(&self, owner_type: &str) -> Result<&[PropertyMapping], MetadataError> {
        if let Some(entity) = self.entities.get(owner_type) {
            return Ok(&entity.properties);
        }
        if let Some(embeddable) = self.embeddables.get(owner_type) {
            return Ok(&embeddable.properties);
        }
        Err(MetadataError::NotNavigable {
            owner: owner_type.to_string(),
        })
    }

    /// `PropertyInfo` for a target that may be an entity, an embeddable or a basic type.
    fn describe_target(&self, target: &str, is_collection: bool) -> PropertyInfo {
        let entity = self.entities.get(target);
        PropertyInfo {
            target_type: target.to_string(),
            is_collection,
            is_identifiable: entity.is_some(),
            identifier_property: entity.map(|e| e.identifier.clone()),
            is_embedded: self.embeddables.contains_key(target),
        }
    }
}

impl MetadataProvider for MappingCatalog {
    fn entity(&self, type_name: &str) -> Result<EntityInfo, MetadataError> {
        self.entities
            .get(type_name)
            .map(|e| EntityInfo {
                name: e.name.clone(),
                identifier_property: e.identifier.clone(),
            })
            .ok_or_else(|| MetadataError::UnknownEntity {
                entity: type_name.to_string(),
            })
    }

    fn resolve(&self, owner_type: &str, property: &str) -> Result<PropertyInfo, MetadataError> {
        let mapping = self
            .owner_properties(owner_type)?
            .iter()
            .find(|p| p.name == property)
            .ok_or_else(|| MetadataError::unknown_property(owner_type, property))?;

        let info = match &mapping.kind {
            PropertyKind::Basic { type_name } => PropertyInfo::basic(type_name.clone()),
            PropertyKind::ToOne { target } | PropertyKind::Embedded { target } => {
                self.describe_target(target, false)
            }
            PropertyKind::ToMany { target } => self.describe_target(target, true),
            PropertyKind::ElementCollection { element } => self.describe_target(element, true),
            PropertyKind::Map { value } => self.describe_target(value, true),
        };
        debug!(
            "resolved {}.{} -> {} (collection={}, identifiable={}, embedded={})",
            owner_type,
            property,
            info.target_type,
            info.is_collection,
            info.is_identifiable,
            info.is_embedded
        );
        Ok(info)
    }
}

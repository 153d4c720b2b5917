//! Metadata collaborator.
//!
//! The query builder never inspects mapped types itself. Whenever a property is
//! navigated for the first time it asks a [`MetadataProvider`] what the
//! property points at, and the answer decides the kind of query node created:
//!
//! | `PropertyInfo`                     | node kind              |
//! |------------------------------------|------------------------|
//! | `is_collection`                    | `EntityCollectionJoin` |
//! | `is_identifiable`                  | `EntityJoin`           |
//! | `is_embedded`                      | `Component`            |
//! | otherwise                          | `Basic`                |
//!
//! [`MappingCatalog`] is the in-memory implementation, loadable from YAML or
//! JSON mapping documents (see [`config`]).

pub mod catalog;
pub mod config;
pub mod errors;

pub use catalog::{EmbeddableMapping, EntityMapping, MappingCatalog, PropertyKind, PropertyMapping};
pub use config::{MappingConfig, MappingDefinition};
pub use errors::MetadataError;

use serde::{Deserialize, Serialize};

/// What a mapped entity type looks like from the outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub name: String,
    /// Name of the identifying property (may itself be an embedded key)
    pub identifier_property: String,
}

/// Resolution of one `(owner type, property)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    /// Target type; the element type for collections
    pub target_type: String,
    pub is_collection: bool,
    /// Target is an entity with its own identity
    pub is_identifiable: bool,
    /// Identifier property of the target when it is identifiable
    pub identifier_property: Option<String>,
    /// Target is an embedded value stored with its owner
    pub is_embedded: bool,
}

impl PropertyInfo {
    pub fn basic(target_type: impl Into<String>) -> Self {
        PropertyInfo {
            target_type: target_type.into(),
            is_collection: false,
            is_identifiable: false,
            identifier_property: None,
            is_embedded: false,
        }
    }
}

/// Metadata lookups consulted by the query graph.
///
/// Implementations must be deterministic: the graph consults `resolve` at most
/// once per (parent node, property) pair and caches the answer in the node.
pub trait MetadataProvider {
    /// Describes an entity that can be declared as a from-root.
    fn entity(&self, type_name: &str) -> Result<EntityInfo, MetadataError>;

    /// Resolves a property of an entity or embeddable type.
    fn resolve(&self, owner_type: &str, property: &str) -> Result<PropertyInfo, MetadataError>;
}

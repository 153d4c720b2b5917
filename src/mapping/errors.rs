//! # Mapping Error Types
//!
//! Errors raised by the metadata collaborator: unknown entities or properties
//! during navigation, and invalid mapping definitions while loading a catalog.
//!
//! The query builder never wraps or reinterprets these; they surface through
//! `QueryError::Metadata` exactly as produced here.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetadataError {
    #[error("No mapping found for entity `{entity}`")]
    UnknownEntity { entity: String },
    #[error("Type `{owner}` has no mapped property `{property}`")]
    UnknownProperty { owner: String, property: String },
    #[error("Type `{owner}` is not navigable (only entities and embeddables have properties)")]
    NotNavigable { owner: String },
    #[error("Invalid mapping name `{name}` (must be an identifier)")]
    InvalidName { name: String },
    #[error("Entity `{entity}` declares identifier `{identifier}` which is not a basic or embedded property")]
    InvalidIdentifier { entity: String, identifier: String },
    #[error("Property `{owner}.{property}` targets undeclared type `{target}`")]
    UnknownTarget {
        owner: String,
        property: String,
        target: String,
    },
    #[error("Type `{name}` is declared more than once")]
    DuplicateType { name: String },
    #[error("Failed to read mapping file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse mapping: {error}")]
    ConfigParseError { error: String },
}

impl MetadataError {
    /// Unknown property on an owner type
    pub fn unknown_property(owner: impl Into<String>, property: impl Into<String>) -> Self {
        MetadataError::UnknownProperty {
            owner: owner.into(),
            property: property.into(),
        }
    }
}

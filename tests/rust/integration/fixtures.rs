//! Shared mapping used by the integration tests.
//!
//! ```text
//! Person   (id)   id, age, name, spouse -> Person, children -> [Person],
//!                 address: Address, nicknames: [String]
//! Address         street, city, country -> Country
//! Country  (code) code, name
//! Relation (id)   id, parent -> Person, child -> Person
//! ```

use std::cell::Cell;
use std::sync::Arc;

use proxyql::{
    BuilderConfig, EmbeddableMapping, EntityInfo, EntityMapping, MappingCatalog, MetadataError,
    MetadataProvider, PropertyInfo, QueryFactory,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn catalog() -> MappingCatalog {
    MappingCatalog::new()
        .with_entity(
            EntityMapping::new("Person", "id")
                .basic("id", "i64")
                .basic("age", "i32")
                .basic("name", "String")
                .to_one("spouse", "Person")
                .to_many("children", "Person")
                .embedded("address", "Address")
                .element_collection("nicknames", "String"),
        )
        .with_embeddable(
            EmbeddableMapping::new("Address")
                .basic("street", "String")
                .basic("city", "String")
                .to_one("country", "Country"),
        )
        .with_entity(
            EntityMapping::new("Country", "code")
                .basic("code", "String")
                .basic("name", "String"),
        )
        .with_entity(
            EntityMapping::new("Relation", "id")
                .basic("id", "i64")
                .to_one("parent", "Person")
                .to_one("child", "Person"),
        )
}

pub fn factory() -> QueryFactory {
    init_logging();
    QueryFactory::new(Arc::new(catalog()))
}

pub fn factory_with(config: BuilderConfig) -> QueryFactory {
    init_logging();
    QueryFactory::with_config(Arc::new(catalog()), config)
}

/// Catalog wrapper counting `resolve` calls.
pub struct CountingProvider {
    inner: MappingCatalog,
    resolved: Cell<usize>,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            inner: catalog(),
            resolved: Cell::new(0),
        }
    }

    pub fn resolved(&self) -> usize {
        self.resolved.get()
    }
}

impl MetadataProvider for CountingProvider {
    fn entity(&self, type_name: &str) -> Result<EntityInfo, MetadataError> {
        self.inner.entity(type_name)
    }

    fn resolve(&self, owner_type: &str, property: &str) -> Result<PropertyInfo, MetadataError> {
        self.resolved.set(self.resolved.get() + 1);
        self.inner.resolve(owner_type, property)
    }
}

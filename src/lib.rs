//! ProxyQL - ORM query statements from recorded accessor calls
//!
//! Callers build queries by calling accessor methods on proxy objects instead
//! of writing query strings:
//! - Mapping metadata describing entities, associations and embeddables
//! - Proxy interception turning accessor calls into query-graph navigation
//! - Join-type resolution and scope checks across nested sub-queries
//! - HQL-style statement assembly with an ordered parameter list

pub mod config;
pub mod interception;
pub mod mapping;
pub mod query_expr;
pub mod query_graph;
pub mod render;
pub mod session;
pub mod utils;

pub use config::{BuilderConfig, ConfigError, ParamStyle};
pub use interception::{
    CollectionToken, DummyValue, InterceptionResult, Invocation, Proxy, ReturnKind, ScalarKind,
};
pub use mapping::{
    EmbeddableMapping, EntityInfo, EntityMapping, MappingCatalog, MappingConfig,
    MetadataError, MetadataProvider, PropertyInfo,
};
pub use query_expr::{Arg, Literal, Operand};
pub use query_graph::{JoinType, NodeId};
pub use render::{Param, Statement};
pub use session::{
    ArmedJoin, CaseBuilder, EngineId, ErrorKind, LogicalCondition, OnGoingCondition, Query,
    QueryError, QueryFactory, SessionId, SessionKind,
};

//! Error types for query building.
//!
//! Every variant is a usage error raised synchronously at the point of misuse;
//! nothing here is retryable. [`QueryError::kind`] groups the variants into the
//! four categories callers usually branch on.

use thiserror::Error;

use crate::mapping::MetadataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// More than one navigation was pending for a single value
    AmbiguousNavigation,
    /// A value references a node that is not visible where it is consumed
    Scope,
    /// The builder was driven in an order or shape it does not support
    StructuralMisuse,
    /// Propagated unchanged from the metadata collaborator
    Metadata,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("Ambiguous navigation: {} navigations pending for one value ({})", paths.len(), paths.join(", "))]
    AmbiguousNavigation { paths: Vec<String> },

    #[error("Navigation to `{path}` was never consumed before passing another value")]
    UnconsumedNavigation { path: String },

    #[error("`{path}` is not visible from this query")]
    OutOfScope { path: String },

    #[error("`{path}` is declared after join `{join}` and cannot be used in its with clause")]
    ForwardJoinReference { path: String, join: String },

    #[error("Sub-query cannot be used here: it does not belong to this query or an enclosing one")]
    SubqueryOutOfScope,

    #[error("Condition group belongs to a query that is not visible here")]
    ConditionOutOfScope,

    #[error("Setter on `{path}` is only allowed in update queries")]
    SetterOutsideUpdate { path: String },

    #[error("Bulk {kind} statements address a single entity; `{entity}` cannot be added")]
    SecondBulkRoot { kind: String, entity: String },

    #[error("`{path}` requires a join, which bulk statements do not support")]
    BulkJoin { path: String },

    #[error("Update statement has no assignments")]
    EmptyUpdate,

    #[error("Join handle is stale: it was already used or the armed join was discarded")]
    StaleJoinHandle,

    #[error("A multi-target join is armed; `{operation}` must not be called before it is consumed")]
    ArmedJoinPending { operation: String },

    #[error("Join type of `{path}` is already resolved as {resolved}, cannot change it to {requested}")]
    JoinTypeConflict {
        path: String,
        resolved: String,
        requested: String,
    },

    #[error("`{path}` is not an association and cannot be joined")]
    NotJoinable { path: String },

    #[error("`{path}` has no explicit join; with clauses qualify joins only")]
    WithoutJoin { path: String },

    #[error("Only standalone conditions can be nested as a group")]
    InvalidGroup,

    #[error("`{path}` is a basic value and has no properties")]
    NotNavigable { path: String },

    #[error("Invalid accessor `{accessor}`: {reason}")]
    InvalidAccessor { accessor: String, reason: String },

    #[error("{clause} is not supported in {kind} statements")]
    ClauseNotSupported { clause: String, kind: String },

    #[error("Sub-query depth {depth} exceeds the configured maximum of {max}")]
    SubqueryTooDeep { depth: u32, max: u32 },

    #[error("Named parameter `{name}` is already bound to a different value")]
    NamedParamConflict { name: String },

    #[error("Invalid named parameter `{name}` (must be an identifier)")]
    InvalidParamName { name: String },

    #[error("Named parameter `{name}` collides with a generated {style} placeholder")]
    ReservedParamName { name: String, style: String },

    #[error("Sub-queries are rendered inside their enclosing statement and cannot be built on their own")]
    SubqueryBuild,

    #[error("Value belongs to a different query")]
    ForeignQuery,

    #[error("Query has no from clause")]
    MissingFrom,

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::AmbiguousNavigation { .. } | QueryError::UnconsumedNavigation { .. } => {
                ErrorKind::AmbiguousNavigation
            }
            QueryError::OutOfScope { .. }
            | QueryError::ForwardJoinReference { .. }
            | QueryError::SubqueryOutOfScope
            | QueryError::ConditionOutOfScope => ErrorKind::Scope,
            QueryError::Metadata(_) => ErrorKind::Metadata,
            QueryError::SetterOutsideUpdate { .. }
            | QueryError::SecondBulkRoot { .. }
            | QueryError::BulkJoin { .. }
            | QueryError::EmptyUpdate
            | QueryError::StaleJoinHandle
            | QueryError::ArmedJoinPending { .. }
            | QueryError::JoinTypeConflict { .. }
            | QueryError::NotJoinable { .. }
            | QueryError::WithoutJoin { .. }
            | QueryError::InvalidGroup
            | QueryError::NotNavigable { .. }
            | QueryError::InvalidAccessor { .. }
            | QueryError::ClauseNotSupported { .. }
            | QueryError::SubqueryTooDeep { .. }
            | QueryError::NamedParamConflict { .. }
            | QueryError::InvalidParamName { .. }
            | QueryError::ReservedParamName { .. }
            | QueryError::SubqueryBuild
            | QueryError::ForeignQuery
            | QueryError::MissingFrom => ErrorKind::StructuralMisuse,
        }
    }
}

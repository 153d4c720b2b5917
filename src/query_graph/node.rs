use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mapping::PropertyInfo;
use crate::session::SessionId;

/// Index of a node in the query graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Declared with `from`
    EntityRoot,
    /// Single-valued association
    EntityJoin,
    /// Collection-valued association
    EntityCollectionJoin,
    /// Embedded value
    Component,
    /// Scalar leaf
    Basic,
}

impl NodeKind {
    pub fn classify(info: &PropertyInfo) -> Self {
        if info.is_collection {
            NodeKind::EntityCollectionJoin
        } else if info.is_identifiable {
            NodeKind::EntityJoin
        } else if info.is_embedded {
            NodeKind::Component
        } else {
            NodeKind::Basic
        }
    }

    /// Kinds that can carry an alias and a join clause
    pub fn is_entity_like(&self) -> bool {
        matches!(
            self,
            NodeKind::EntityRoot | NodeKind::EntityJoin | NodeKind::EntityCollectionJoin
        )
    }

    pub fn is_joinable(&self) -> bool {
        matches!(self, NodeKind::EntityJoin | NodeKind::EntityCollectionJoin)
    }

    pub fn is_navigable(&self) -> bool {
        !matches!(self, NodeKind::Basic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// No join clause; the node is addressed through its parent's path
    None,
    Inner,
    Left,
    Right,
    /// Inner join fetch
    Fetch,
    LeftFetch,
    /// Plain `join`, left to the persistence layer
    Default,
}

impl JoinType {
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            JoinType::None => None,
            JoinType::Inner => Some("inner join"),
            JoinType::Left => Some("left join"),
            JoinType::Right => Some("right join"),
            JoinType::Fetch => Some("inner join fetch"),
            JoinType::LeftFetch => Some("left join fetch"),
            JoinType::Default => Some("join"),
        }
    }

    pub fn is_left(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::LeftFetch)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::None => write!(f, "none"),
            JoinType::Inner => write!(f, "inner"),
            JoinType::Left => write!(f, "left"),
            JoinType::Right => write!(f, "right"),
            JoinType::Fetch => write!(f, "fetch"),
            JoinType::LeftFetch => write!(f, "left fetch"),
            JoinType::Default => write!(f, "default"),
        }
    }
}

/// One vertex of the query graph.
#[derive(Debug, Clone)]
pub struct QueryNode {
    pub id: NodeId,
    pub session: SessionId,
    pub parent: Option<NodeId>,
    /// Path segment; the entity name for roots
    pub property_name: String,
    /// Dotted path from the nearest entity-like ancestor
    pub property_path: String,
    pub kind: NodeKind,
    pub resolved_type: String,
    /// Identifier property of entity-like nodes
    pub identifier_path: Option<String>,
    pub alias: Option<String>,
    /// Join type requested by the caller
    pub join_type: Option<JoinType>,
    /// Effective join type, frozen once assembly has computed it
    pub resolved_join: Option<JoinType>,
    /// Consumed as a value somewhere
    pub referenced: bool,
    pub has_proxy: bool,
    /// Registration order
    pub children: Vec<NodeId>,
}

impl QueryNode {
    /// True if `path` is the identifier path or lies below it.
    pub fn is_within_identifier(&self, path: &str) -> bool {
        match &self.identifier_path {
            Some(identifier) => {
                path == identifier
                    || (path.len() > identifier.len()
                        && path.starts_with(identifier.as_str())
                        && path.as_bytes()[identifier.len()] == b'.')
            }
            None => false,
        }
    }
}

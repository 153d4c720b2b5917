//! Append-only graph of query nodes.
//!
//! Nodes live in an arena addressed by [`NodeId`]; a side table maps
//! `(parent, property name)` to the child, so navigating the same path twice
//! returns the same node and consults the metadata collaborator only once.
//! Nodes are never removed. Roots (from-declarations) are tracked per session
//! by the session layer, children in registration order by their parent.

pub mod join_resolver;
pub mod node;

use std::collections::HashMap;

use log::debug;

pub use join_resolver::JoinResolver;
pub use node::{JoinType, NodeId, NodeKind, QueryNode};

use crate::mapping::{EntityInfo, MetadataProvider};
use crate::session::errors::QueryError;
use crate::session::SessionId;

#[derive(Debug, Clone, Default)]
pub struct QueryGraph {
    nodes: Vec<QueryNode>,
    child_index: HashMap<(NodeId, String), NodeId>,
}

impl QueryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &QueryNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut QueryNode {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &QueryNode> {
        self.nodes.iter()
    }

    /// Registers a new from-root. Every call creates a distinct node so the
    /// same entity can be declared twice (self joins).
    pub fn add_root(&mut self, session: SessionId, entity: &EntityInfo) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(QueryNode {
            id,
            session,
            parent: None,
            property_name: entity.name.clone(),
            property_path: String::new(),
            kind: NodeKind::EntityRoot,
            resolved_type: entity.name.clone(),
            identifier_path: Some(entity.identifier_property.clone()),
            alias: None,
            join_type: None,
            resolved_join: None,
            referenced: false,
            has_proxy: true,
            children: Vec::new(),
        });
        debug!("created root node {:?} for entity {}", id, entity.name);
        id
    }

    pub fn child(&self, parent: NodeId, property: &str) -> Option<NodeId> {
        self.child_index.get(&(parent, property.to_string())).copied()
    }

    /// Path of a would-be child relative to the nearest entity-like ancestor.
    pub fn child_path(&self, parent: NodeId, property: &str) -> String {
        let parent = self.node(parent);
        if parent.kind.is_entity_like() {
            property.to_string()
        } else {
            format!("{}.{}", parent.property_path, property)
        }
    }

    /// Returns the child of `parent` named `property`, creating it on first use.
    ///
    /// Metadata is consulted only when the child does not exist yet.
    pub fn get_or_create_child(
        &mut self,
        parent: NodeId,
        property: &str,
        metadata: &dyn MetadataProvider,
    ) -> Result<NodeId, QueryError> {
        if let Some(existing) = self.child(parent, property) {
            return Ok(existing);
        }

        let (owner_type, session, parent_kind) = {
            let node = self.node(parent);
            (node.resolved_type.clone(), node.session, node.kind)
        };
        if !parent_kind.is_navigable() {
            return Err(QueryError::NotNavigable {
                path: format!("{}.{}", self.display_path(parent), property),
            });
        }

        let info = metadata.resolve(&owner_type, property)?;
        let kind = NodeKind::classify(&info);
        let id = NodeId(self.nodes.len());
        let property_path = self.child_path(parent, property);
        let identifier_path = if kind.is_entity_like() {
            info.identifier_property.clone()
        } else {
            None
        };

        self.nodes.push(QueryNode {
            id,
            session,
            parent: Some(parent),
            property_name: property.to_string(),
            property_path,
            kind,
            resolved_type: info.target_type,
            identifier_path,
            alias: None,
            join_type: None,
            resolved_join: None,
            referenced: false,
            has_proxy: false,
            children: Vec::new(),
        });
        self.node_mut(parent).children.push(id);
        self.child_index.insert((parent, property.to_string()), id);
        debug!(
            "created {:?} node {:?} at {}",
            kind,
            id,
            self.display_path(id)
        );
        Ok(id)
    }

    /// Nearest entity-like node at or above `id`.
    pub fn owning_entity(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            let node = self.node(current);
            if node.kind.is_entity_like() {
                return current;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Root of the tree containing `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            current = parent;
        }
        current
    }

    /// `Person.spouse.name` style path used in diagnostics.
    pub fn display_path(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node.parent {
            Some(parent) => format!("{}.{}", self.display_path(parent), node.property_name),
            None => node.property_name.clone(),
        }
    }

    /// True if `id` is `ancestor` or lies below it.
    pub fn is_in_subtree(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.node(node).parent;
        }
        false
    }

    /// Depth-first preorder over the given roots, children in registration order.
    pub fn preorder(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut order = Vec::new();
        for root in roots {
            self.collect_preorder(*root, &mut order);
        }
        order
    }

    fn collect_preorder(&self, id: NodeId, order: &mut Vec<NodeId>) {
        order.push(id);
        for child in &self.node(id).children {
            self.collect_preorder(*child, order);
        }
    }
}

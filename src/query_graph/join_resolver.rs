//! Effective join type computation.
//!
//! Runs once per assembly over every tree of the root query. Types already
//! frozen by an earlier assembly are kept; everything else is computed and
//! frozen here:
//!
//! - an explicit join type wins
//! - an association read only through its identifier path is not joined
//!   (`JoinType::None`), its identifier is addressed through the parent path
//! - a collection is only joined when something below it is read
//! - otherwise `Inner`, or `Left` when the nearest joined ancestor is a left join

use log::debug;

use super::node::{JoinType, NodeId, NodeKind};
use super::QueryGraph;

pub struct JoinResolver<'a> {
    graph: &'a mut QueryGraph,
    join_elision: bool,
}

impl<'a> JoinResolver<'a> {
    pub fn new(graph: &'a mut QueryGraph, join_elision: bool) -> Self {
        Self {
            graph,
            join_elision,
        }
    }

    /// Resolves every node below `root`. Bulk (update/delete) trees never join.
    pub fn resolve_tree(&mut self, root: NodeId, bulk: bool) {
        let children = self.graph.node(root).children.clone();
        for child in children {
            self.resolve_node(child, false, bulk);
        }
    }

    fn resolve_node(&mut self, id: NodeId, inherited_left: bool, bulk: bool) {
        let kind = self.graph.node(id).kind;
        let mut left_below = inherited_left;

        if kind.is_joinable() {
            let resolved = match self.graph.node(id).resolved_join {
                Some(frozen) => frozen,
                None => {
                    let computed = self.compute(id, inherited_left, bulk);
                    self.graph.node_mut(id).resolved_join = Some(computed);
                    debug!(
                        "join type of {} resolved to {}",
                        self.graph.display_path(id),
                        computed
                    );
                    computed
                }
            };
            left_below = match resolved {
                JoinType::None => inherited_left,
                JoinType::Default => inherited_left,
                other => other.is_left(),
            };
        }

        let children = self.graph.node(id).children.clone();
        for child in children {
            self.resolve_node(child, left_below, bulk);
        }
    }

    fn compute(&self, id: NodeId, inherited_left: bool, bulk: bool) -> JoinType {
        if bulk {
            return JoinType::None;
        }
        let node = self.graph.node(id);
        if let Some(explicit) = node.join_type {
            return explicit;
        }
        let defaulted = if inherited_left {
            JoinType::Left
        } else {
            JoinType::Inner
        };
        match node.kind {
            NodeKind::EntityCollectionJoin => {
                if node.children.iter().any(|c| self.is_used(*c)) {
                    defaulted
                } else {
                    JoinType::None
                }
            }
            _ => {
                if self.join_elision && self.is_identifier_only(id) {
                    JoinType::None
                } else {
                    defaulted
                }
            }
        }
    }

    /// A node is used when it is referenced, explicitly joined, or has a used descendant.
    pub fn is_used(&self, id: NodeId) -> bool {
        let node = self.graph.node(id);
        node.referenced || node.join_type.is_some() || node.children.iter().any(|c| self.is_used(*c))
    }

    /// True if nothing but the identifier path of `entity` is ever read.
    pub fn is_identifier_only(&self, entity: NodeId) -> bool {
        let node = self.graph.node(entity);
        if node.referenced || node.join_type.is_some() || node.identifier_path.is_none() {
            return false;
        }
        node.children
            .iter()
            .all(|child| self.descendants_within_identifier(entity, *child))
    }

    fn descendants_within_identifier(&self, entity: NodeId, id: NodeId) -> bool {
        if !self.is_used(id) {
            return true;
        }
        let node = self.graph.node(id);
        if node.kind.is_entity_like() {
            return false;
        }
        if node.referenced && !self.graph.node(entity).is_within_identifier(&node.property_path) {
            return false;
        }
        node.children
            .iter()
            .all(|child| self.descendants_within_identifier(entity, *child))
    }
}

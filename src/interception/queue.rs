//! Invocation queue shared by a root query and all of its sub-queries.
//!
//! Terminal accessor calls push the node they read; the next value-consuming
//! builder call drains the queue. At most one entry may be pending at that
//! point, the list form only exists to report which navigations collided.

use log::trace;

use crate::query_graph::NodeId;

/// Queue contents at the moment a builder call drains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Empty,
    One(NodeId),
    Ambiguous(Vec<NodeId>),
}

#[derive(Debug, Clone, Default)]
pub struct InvocationQueue {
    entries: Vec<NodeId>,
}

impl InvocationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeId) {
        trace!("queue push {:?} (pending: {})", node, self.entries.len() + 1);
        self.entries.push(node);
    }

    /// Empties the queue and classifies what was pending.
    pub fn take(&mut self) -> Pending {
        let entries = std::mem::take(&mut self.entries);
        trace!("queue drained ({} pending)", entries.len());
        match entries.len() {
            0 => Pending::Empty,
            1 => Pending::One(entries[0]),
            _ => Pending::Ambiguous(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

//! Visibility rules for consumed values.
//!
//! A node reference is usable by a session when the node belongs to that
//! session or to one of its ancestors. Inside the with clause of a join `J`,
//! nodes of `J`'s own session must additionally sit in `J`'s subtree or be
//! declared before `J` in from/join order. Sub-queries are usable by their
//! parent session and by anything nested below that parent.
//!
//! Validation walks every nested operand and condition group. Accepted nodes
//! are marked referenced for the join resolver only after the whole call
//! passes, so a rejected call leaves no joins behind.

use crate::query_expr::{ContainerId, Operand, Restriction};
use crate::query_graph::NodeId;

use super::errors::QueryError;
use super::{Engine, SessionId};

/// Where a value is being consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeContext {
    pub session: SessionId,
    /// Join whose with clause is being built
    pub with_join: Option<NodeId>,
}

impl ScopeContext {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            with_join: None,
        }
    }

    pub fn for_join(session: SessionId, join: NodeId) -> Self {
        Self {
            session,
            with_join: Some(join),
        }
    }
}

impl Engine {
    /// True if `ancestor` is `session` or encloses it.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: SessionId, session: SessionId) -> bool {
        let mut current = Some(session);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.session(id).parent;
        }
        false
    }

    /// Checks one node reference without recording it.
    pub(crate) fn check_node(&self, node: NodeId, ctx: &ScopeContext) -> Result<(), QueryError> {
        if node.index() >= self.graph.len() {
            return Err(QueryError::ForeignQuery);
        }
        let node_session = self.graph.node(node).session;
        if !self.is_ancestor_or_self(node_session, ctx.session) {
            return Err(QueryError::OutOfScope {
                path: self.graph.display_path(node),
            });
        }

        if let Some(join) = ctx.with_join {
            if self.graph.node(join).session == node_session
                && !self.graph.is_in_subtree(join, node)
                && !self.declared_before(node, join)
            {
                return Err(QueryError::ForwardJoinReference {
                    path: self.graph.display_path(node),
                    join: self.graph.display_path(join),
                });
            }
        }
        Ok(())
    }

    /// True if the from-root or join owning `node` precedes `join` in
    /// from/join declaration order. Properties are judged by their owner, not
    /// by when they were first navigated.
    fn declared_before(&self, node: NodeId, join: NodeId) -> bool {
        let owner = self.graph.owning_entity(node);
        let roots = &self.session(self.graph.node(join).session).roots;
        let order = self.graph.preorder(roots);
        let position = |id: NodeId| order.iter().position(|n| *n == id);
        match (position(owner), position(join)) {
            (Some(o), Some(j)) => o < j,
            _ => false,
        }
    }

    pub(crate) fn validate_subquery(&self, subquery: SessionId, ctx: &ScopeContext) -> Result<(), QueryError> {
        if subquery.0 >= self.sessions.len() {
            return Err(QueryError::ForeignQuery);
        }
        if self.is_ancestor_or_self(subquery, ctx.session) {
            return Err(QueryError::SubqueryOutOfScope);
        }
        match self.session(subquery).parent {
            Some(parent) if self.is_ancestor_or_self(parent, ctx.session) => Ok(()),
            _ => Err(QueryError::SubqueryOutOfScope),
        }
    }

    /// Scope-checks `operands` without recording anything; returns the nodes
    /// they reference.
    pub(crate) fn check_operands(&self, operands: &[Operand], ctx: &ScopeContext) -> Result<Vec<NodeId>, QueryError> {
        let mut accepted = Vec::new();
        for operand in operands {
            self.check_operand(operand, ctx, &mut accepted)?;
        }
        Ok(accepted)
    }

    /// Scope-checks `operands` as one call: nodes are marked referenced only
    /// when every operand passes.
    pub(crate) fn validate_operands(&mut self, operands: &[Operand], ctx: &ScopeContext) -> Result<(), QueryError> {
        let accepted = self.check_operands(operands, ctx)?;
        self.mark_referenced(&accepted);
        Ok(())
    }

    pub(crate) fn validate_operand(&mut self, operand: &Operand, ctx: &ScopeContext) -> Result<(), QueryError> {
        self.validate_operands(std::slice::from_ref(operand), ctx)
    }

    /// Re-validates a condition group in the context it is being attached to.
    pub(crate) fn validate_container(&mut self, container: ContainerId, ctx: &ScopeContext) -> Result<(), QueryError> {
        let mut accepted = Vec::new();
        self.check_container(container, ctx, &mut accepted)?;
        self.mark_referenced(&accepted);
        Ok(())
    }

    fn mark_referenced(&mut self, nodes: &[NodeId]) {
        for node in nodes {
            self.graph.node_mut(*node).referenced = true;
        }
    }

    fn check_operand(
        &self,
        operand: &Operand,
        ctx: &ScopeContext,
        accepted: &mut Vec<NodeId>,
    ) -> Result<(), QueryError> {
        match operand {
            Operand::Literal(_) | Operand::NamedParam(_) => Ok(()),
            Operand::Reference { node, .. } => {
                self.check_node(*node, ctx)?;
                accepted.push(*node);
                Ok(())
            }
            Operand::Subquery { session, .. } => self.validate_subquery(*session, ctx),
            Operand::Function { arg, .. } => self.check_operand(arg, ctx, accepted),
            Operand::Arithmetic { left, right, .. } => {
                self.check_operand(left, ctx, accepted)?;
                self.check_operand(right, ctx, accepted)
            }
            Operand::Concat(items) | Operand::Coalesce(items) => {
                for item in items {
                    self.check_operand(item, ctx, accepted)?;
                }
                Ok(())
            }
            Operand::Case {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    self.check_container(branch.condition, ctx, accepted)?;
                    self.check_operand(&branch.result, ctx, accepted)?;
                }
                if let Some(otherwise) = otherwise {
                    self.check_operand(otherwise, ctx, accepted)?;
                }
                Ok(())
            }
        }
    }

    fn check_restriction(
        &self,
        restriction: &Restriction,
        ctx: &ScopeContext,
        accepted: &mut Vec<NodeId>,
    ) -> Result<(), QueryError> {
        for operand in restriction.operands() {
            self.check_operand(operand, ctx, accepted)?;
        }
        if let Some(subquery) = restriction.subquery() {
            self.validate_subquery(subquery, ctx)?;
        }
        if let Restriction::Group(group) = restriction {
            self.check_container(*group, ctx, accepted)?;
        }
        Ok(())
    }

    fn check_container(
        &self,
        container: ContainerId,
        ctx: &ScopeContext,
        accepted: &mut Vec<NodeId>,
    ) -> Result<(), QueryError> {
        if container.0 >= self.conditions.len() {
            return Err(QueryError::ForeignQuery);
        }
        let owner_session = self.container(container).session;
        if !self.is_ancestor_or_self(owner_session, ctx.session) {
            return Err(QueryError::ConditionOutOfScope);
        }
        for (_, restriction) in &self.container(container).items {
            self.check_restriction(restriction, ctx, accepted)?;
        }
        Ok(())
    }
}

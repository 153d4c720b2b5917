//! Explicit joins.
//!
//! `join(value, type)` joins a single association. `join_chain(type)` arms a
//! join type for every association navigated until the returned
//! [`ArmedJoin`] is consumed by its `join` call; any other builder call in
//! between discards the armed state and fails.

use log::debug;

use super::errors::QueryError;
use super::scope::ScopeContext;
use super::{ArmedState, Engine, Query, SessionId};
use crate::interception::Proxy;
use crate::query_expr::{Arg, Operand};
use crate::query_graph::{JoinType, NodeId};

impl Engine {
    fn reject_bulk_join(&self, session: SessionId) -> Result<(), QueryError> {
        let kind = self.session(session).kind;
        if kind.is_bulk() {
            return Err(QueryError::ClauseNotSupported {
                clause: "join".to_string(),
                kind: kind.to_string(),
            });
        }
        Ok(())
    }

    /// Resolves a join argument to the association node it names.
    fn join_target(&mut self, session: SessionId, arg: Arg) -> Result<NodeId, QueryError> {
        let operand = self.consume(arg)?;
        let node = match operand {
            Operand::Reference { node, .. } => node,
            _ => {
                return Err(QueryError::NotJoinable {
                    path: "<value>".to_string(),
                })
            }
        };
        self.check_node(node, &ScopeContext::new(session))?;
        if !self.graph.node(node).kind.is_joinable() {
            return Err(QueryError::NotJoinable {
                path: self.graph.display_path(node),
            });
        }
        Ok(node)
    }

    fn join_node(&mut self, session: SessionId, arg: Arg, join_type: JoinType) -> Result<NodeId, QueryError> {
        self.reject_bulk_join(session)?;
        let node = self.join_target(session, arg)?;
        self.apply_join_type(node, join_type, true)?;
        let target = self.graph.node_mut(node);
        target.referenced = true;
        target.has_proxy = true;
        debug!(
            "explicit {} join on {}",
            join_type,
            self.graph.display_path(node)
        );
        Ok(node)
    }
}

impl Query {
    /// Joins the association passed as `arg` with `join_type` and returns its proxy.
    pub fn join(&self, arg: impl Into<Arg>, join_type: JoinType) -> Result<Proxy, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("join")?;
        let node = engine.join_node(self.session, arg.into(), join_type)?;
        Ok(self.proxy(node))
    }

    pub fn inner_join(&self, arg: impl Into<Arg>) -> Result<Proxy, QueryError> {
        self.join(arg, JoinType::Inner)
    }

    pub fn left_join(&self, arg: impl Into<Arg>) -> Result<Proxy, QueryError> {
        self.join(arg, JoinType::Left)
    }

    pub fn right_join(&self, arg: impl Into<Arg>) -> Result<Proxy, QueryError> {
        self.join(arg, JoinType::Right)
    }

    pub fn fetch_join(&self, arg: impl Into<Arg>) -> Result<Proxy, QueryError> {
        self.join(arg, JoinType::Fetch)
    }

    pub fn left_fetch_join(&self, arg: impl Into<Arg>) -> Result<Proxy, QueryError> {
        self.join(arg, JoinType::LeftFetch)
    }

    /// Arms `join_type` for every association navigated before the returned
    /// handle's `join` call.
    pub fn join_chain(&self, join_type: JoinType) -> Result<ArmedJoin, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("join_chain")?;
        engine.reject_bulk_join(self.session)?;
        engine.arm_generation += 1;
        let generation = engine.arm_generation;
        engine.armed = Some(ArmedState {
            join_type,
            generation,
        });
        debug!("armed {} join (generation {})", join_type, generation);
        Ok(ArmedJoin {
            query: self.clone(),
            join_type,
            generation,
        })
    }
}

/// Single-use token returned by [`Query::join_chain`].
#[must_use = "an armed join must be consumed by calling `join`"]
#[derive(Debug)]
pub struct ArmedJoin {
    query: Query,
    join_type: JoinType,
    generation: u64,
}

impl ArmedJoin {
    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    /// Joins the final association of the chain and disarms.
    pub fn join(self, arg: impl Into<Arg>) -> Result<Proxy, QueryError> {
        let mut engine = self.query.engine.borrow_mut();
        match engine.armed {
            Some(armed) if armed.generation == self.generation => {}
            _ => return Err(QueryError::StaleJoinHandle),
        }
        engine.armed = None;
        let node = engine.join_node(self.query.session, arg.into(), self.join_type)?;
        Ok(self.query.proxy(node))
    }
}

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::trace;

use super::accessor::Accessor;
use super::{CollectionToken, DummyValue, InterceptionResult, Invocation, ReturnKind, ScalarKind};
use crate::query_expr::{Arg, Operand};
use crate::query_graph::{JoinType, NodeId};
use crate::session::errors::QueryError;
use crate::session::scope::ScopeContext;
use crate::session::{Engine, EngineId, SessionKind};

/// Placeholder object standing for one query node.
#[derive(Clone)]
pub struct Proxy {
    pub(crate) engine: Rc<RefCell<Engine>>,
    pub(crate) origin: EngineId,
    pub(crate) node: NodeId,
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy").field("node", &self.node).finish()
    }
}

/// Engine-side outcome; the proxy turns node ids back into proxies.
enum Outcome {
    Handle(NodeId),
    Proxy(NodeId),
    Dummy(DummyValue),
    Assigned,
}

impl Proxy {
    /// Bookkeeping handle of the node behind this proxy.
    pub fn handle(&self) -> NodeId {
        self.node
    }

    /// `Person.spouse` style path of the node.
    pub fn path(&self) -> String {
        self.engine.borrow().graph.display_path(self.node)
    }

    /// Alias of the node, once assembly has assigned one.
    pub fn alias(&self) -> Option<String> {
        self.engine.borrow().graph.node(self.node).alias.clone()
    }

    pub fn resolved_type(&self) -> String {
        self.engine.borrow().graph.node(self.node).resolved_type.clone()
    }

    /// Delivers one accessor call to the engine.
    pub fn intercept(&self, invocation: Invocation) -> Result<InterceptionResult, QueryError> {
        let outcome = self.engine.borrow_mut().intercept(self.node, invocation)?;
        Ok(match outcome {
            Outcome::Handle(node) => InterceptionResult::Handle(node),
            Outcome::Proxy(node) => InterceptionResult::Proxy(Proxy {
                engine: Rc::clone(&self.engine),
                origin: self.origin,
                node,
            }),
            Outcome::Dummy(value) => InterceptionResult::Dummy(value),
            Outcome::Assigned => InterceptionResult::Assigned,
        })
    }

    fn read(&self, accessor: &str, returns: ReturnKind) -> Result<DummyValue, QueryError> {
        match self.intercept(Invocation::new(accessor, returns))? {
            InterceptionResult::Dummy(value) => Ok(value),
            _ => Err(QueryError::InvalidAccessor {
                accessor: accessor.to_string(),
                reason: "expected a terminal read".to_string(),
            }),
        }
    }

    pub fn get_i64(&self, accessor: &str) -> Result<i64, QueryError> {
        match self.read(accessor, ReturnKind::Scalar(ScalarKind::Int))? {
            DummyValue::Int(value) => Ok(value),
            _ => Ok(0),
        }
    }

    pub fn get_f64(&self, accessor: &str) -> Result<f64, QueryError> {
        match self.read(accessor, ReturnKind::Scalar(ScalarKind::Float))? {
            DummyValue::Float(value) => Ok(value),
            _ => Ok(0.0),
        }
    }

    pub fn get_bool(&self, accessor: &str) -> Result<bool, QueryError> {
        match self.read(accessor, ReturnKind::Scalar(ScalarKind::Bool))? {
            DummyValue::Bool(value) => Ok(value),
            _ => Ok(false),
        }
    }

    pub fn get_str(&self, accessor: &str) -> Result<String, QueryError> {
        match self.read(accessor, ReturnKind::Scalar(ScalarKind::Text))? {
            DummyValue::Text(value) => Ok(value),
            _ => Ok(String::new()),
        }
    }

    pub fn get_collection(&self, accessor: &str) -> Result<CollectionToken, QueryError> {
        self.read(accessor, ReturnKind::Collection)?;
        Ok(CollectionToken)
    }

    pub fn get_map(&self, accessor: &str) -> Result<CollectionToken, QueryError> {
        self.read(accessor, ReturnKind::Map)?;
        Ok(CollectionToken)
    }

    /// Follows an association or embedded value and returns its proxy.
    pub fn navigate(&self, accessor: &str) -> Result<Proxy, QueryError> {
        match self.intercept(Invocation::new(accessor, ReturnKind::Entity))? {
            InterceptionResult::Proxy(proxy) => Ok(proxy),
            _ => Err(QueryError::InvalidAccessor {
                accessor: accessor.to_string(),
                reason: "expected an entity or embedded value".to_string(),
            }),
        }
    }

    /// Records `accessor(value)` as an assignment of an update query.
    pub fn set(&self, accessor: &str, value: impl Into<Arg>) -> Result<(), QueryError> {
        self.intercept(Invocation::new(accessor, ReturnKind::Void).with_arg(value))?;
        Ok(())
    }
}

impl From<&Proxy> for Arg {
    fn from(proxy: &Proxy) -> Self {
        Arg::Value(Operand::Reference {
            origin: proxy.origin,
            node: proxy.node,
        })
    }
}

impl From<Proxy> for Arg {
    fn from(proxy: Proxy) -> Self {
        Arg::from(&proxy)
    }
}

impl Engine {
    fn intercept(&mut self, node: NodeId, invocation: Invocation) -> Result<Outcome, QueryError> {
        if invocation.returns == ReturnKind::Handle {
            return Ok(Outcome::Handle(node));
        }

        let accessor =
            Accessor::parse(&invocation.accessor).ok_or_else(|| QueryError::InvalidAccessor {
                accessor: invocation.accessor.clone(),
                reason: "not a property accessor".to_string(),
            })?;

        if accessor.is_setter() {
            return self.assign(node, &accessor, invocation);
        }

        let child = self.navigate(node, &accessor.property)?;
        trace!(
            "intercepted {} on {} -> {:?}",
            invocation.accessor,
            self.graph.display_path(node),
            child
        );

        if let Some(armed) = self.armed {
            if self.graph.node(child).kind.is_joinable() {
                self.apply_join_type(child, armed.join_type, false)?;
            }
        }

        match invocation.returns {
            returns if returns.is_terminal() => {
                self.queue.push(child);
                Ok(Outcome::Dummy(returns.dummy()))
            }
            ReturnKind::Entity | ReturnKind::Embedded => {
                if !self.graph.node(child).kind.is_navigable() {
                    return Err(QueryError::NotNavigable {
                        path: self.graph.display_path(child),
                    });
                }
                self.graph.node_mut(child).has_proxy = true;
                Ok(Outcome::Proxy(child))
            }
            _ => Err(QueryError::InvalidAccessor {
                accessor: invocation.accessor,
                reason: "getter declared without a return value".to_string(),
            }),
        }
    }

    fn assign(
        &mut self,
        node: NodeId,
        accessor: &Accessor,
        invocation: Invocation,
    ) -> Result<Outcome, QueryError> {
        let session = self.graph.node(node).session;
        if self.session(session).kind != SessionKind::Update {
            return Err(QueryError::SetterOutsideUpdate {
                path: format!("{}.{}", self.graph.display_path(node), accessor.property),
            });
        }
        self.ensure_not_armed("setter")?;

        let mut args = invocation.args;
        if args.len() != 1 {
            return Err(QueryError::InvalidAccessor {
                accessor: invocation.accessor,
                reason: format!("setters take exactly one argument, got {}", args.len()),
            });
        }
        let target = self.navigate(node, &accessor.property)?;
        let value = self.consume(args.remove(0))?;
        let target_ref = Operand::Reference {
            origin: self.id,
            node: target,
        };
        self.validate_operands(&[target_ref, value.clone()], &ScopeContext::new(session))?;
        self.session_mut(session).assignments.push((target, value));
        Ok(Outcome::Assigned)
    }

    /// Child lookup with the bulk-statement navigation rule applied.
    pub(crate) fn navigate(&mut self, parent: NodeId, property: &str) -> Result<NodeId, QueryError> {
        let session = self.graph.node(parent).session;
        if self.session(session).kind.is_bulk() {
            let owner = self.graph.owning_entity(parent);
            let owner_node = self.graph.node(owner);
            if owner_node.parent.is_some()
                && !owner_node.is_within_identifier(&self.graph.child_path(parent, property))
            {
                return Err(QueryError::BulkJoin {
                    path: format!("{}.{}", self.graph.display_path(parent), property),
                });
            }
        }
        self.graph
            .get_or_create_child(parent, property, self.metadata.as_ref())
    }

    /// Sets the caller-requested join type of `node`.
    ///
    /// Targets of a join call must not contradict an earlier explicit or
    /// resolved type. Intermediate hops passed while a join is armed keep any
    /// type they already have.
    pub(crate) fn apply_join_type(
        &mut self,
        node: NodeId,
        join_type: JoinType,
        is_target: bool,
    ) -> Result<(), QueryError> {
        let current = {
            let n = self.graph.node(node);
            n.resolved_join.or(n.join_type)
        };
        match current {
            Some(existing) if existing == join_type => Ok(()),
            Some(existing) if is_target => Err(QueryError::JoinTypeConflict {
                path: self.graph.display_path(node),
                resolved: existing.to_string(),
                requested: join_type.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.graph.node_mut(node).join_type = Some(join_type);
                Ok(())
            }
        }
    }
}

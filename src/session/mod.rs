//! Query sessions and the builder entry points.
//!
//! A [`QueryFactory`] creates root queries. Each root owns one [`Engine`]: the
//! node graph, the invocation queue, the alias counter and every condition
//! container of the root and all of its sub-queries. [`Query`] and
//! [`Proxy`](crate::interception::Proxy) are cheap handles into that shared
//! state; a sub-query is just another session id on the same engine, which is
//! how the queue and the alias counter end up shared across nesting levels.

pub mod builder;
pub mod errors;
pub mod join;
pub mod scope;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;

pub use builder::{CaseBuilder, LogicalCondition, OnGoingCondition};
pub use errors::{ErrorKind, QueryError};
pub use join::ArmedJoin;

use crate::config::BuilderConfig;
use crate::interception::queue::{InvocationQueue, Pending};
use crate::interception::Proxy;
use crate::mapping::MetadataProvider;
use crate::query_expr::{
    Arg, ConditionContainer, ConditionOwner, ContainerId, Literal, Operand,
};
use crate::query_graph::{JoinType, NodeId, QueryGraph};
use crate::render::{Assembler, Statement};
use crate::utils::alias_naming::AliasGenerator;
use crate::utils::identifiers::is_identifier;
use scope::ScopeContext;

/// Index of a session (root or sub-query) within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct SessionId(pub(crate) usize);

/// Identity of one root engine. A copy gets a fresh identity, so handles of
/// the original are foreign to it until rebound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(pub(crate) u64);

impl EngineId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        EngineId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Select,
    Subquery,
    Update,
    Delete,
}

impl SessionKind {
    /// Update and delete statements address a single entity without joins.
    pub fn is_bulk(&self) -> bool {
        matches!(self, SessionKind::Update | SessionKind::Delete)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionKind::Select => "select",
            SessionKind::Subquery => "sub-query",
            SessionKind::Update => "update",
            SessionKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    pub(crate) kind: SessionKind,
    pub(crate) parent: Option<SessionId>,
    pub(crate) depth: u32,
    pub(crate) roots: Vec<NodeId>,
    pub(crate) projections: Vec<Operand>,
    pub(crate) distinct: bool,
    pub(crate) where_clause: ContainerId,
    pub(crate) having_clause: ContainerId,
    pub(crate) group_by: Vec<Operand>,
    pub(crate) order_by: Vec<(Operand, SortOrder)>,
    pub(crate) assignments: Vec<(NodeId, Operand)>,
}

/// Multi-target join awaiting its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArmedState {
    pub(crate) join_type: JoinType,
    pub(crate) generation: u64,
}

/// State shared by a root query and all of its sub-queries.
#[derive(Clone)]
pub(crate) struct Engine {
    pub(crate) id: EngineId,
    /// Engine this one was copied from
    pub(crate) copied_from: Option<EngineId>,
    pub(crate) metadata: Arc<dyn MetadataProvider>,
    pub(crate) config: BuilderConfig,
    pub(crate) graph: QueryGraph,
    pub(crate) sessions: Vec<SessionState>,
    pub(crate) queue: InvocationQueue,
    pub(crate) aliases: AliasGenerator,
    pub(crate) conditions: Vec<ConditionContainer>,
    pub(crate) with_clauses: HashMap<NodeId, ContainerId>,
    pub(crate) named_params: HashMap<String, Literal>,
    pub(crate) armed: Option<ArmedState>,
    pub(crate) arm_generation: u64,
}

impl Engine {
    fn new(metadata: Arc<dyn MetadataProvider>, config: BuilderConfig) -> Self {
        Self {
            id: EngineId::next(),
            copied_from: None,
            metadata,
            config,
            graph: QueryGraph::new(),
            sessions: Vec::new(),
            queue: InvocationQueue::new(),
            aliases: AliasGenerator::new(),
            conditions: Vec::new(),
            with_clauses: HashMap::new(),
            named_params: HashMap::new(),
            armed: None,
            arm_generation: 0,
        }
    }

    pub(crate) fn session(&self, id: SessionId) -> &SessionState {
        &self.sessions[id.0]
    }

    pub(crate) fn session_mut(&mut self, id: SessionId) -> &mut SessionState {
        &mut self.sessions[id.0]
    }

    pub(crate) fn container(&self, id: ContainerId) -> &ConditionContainer {
        &self.conditions[id.0]
    }

    pub(crate) fn container_mut(&mut self, id: ContainerId) -> &mut ConditionContainer {
        &mut self.conditions[id.0]
    }

    pub(crate) fn new_container(&mut self, owner: ConditionOwner, session: SessionId) -> ContainerId {
        let id = ContainerId(self.conditions.len());
        self.conditions.push(ConditionContainer::new(owner, session));
        id
    }

    fn push_session(&mut self, kind: SessionKind, parent: Option<SessionId>, depth: u32) -> SessionId {
        let id = SessionId(self.sessions.len());
        let where_clause = self.new_container(ConditionOwner::Where, id);
        let having_clause = self.new_container(ConditionOwner::Having, id);
        self.sessions.push(SessionState {
            kind,
            parent,
            depth,
            roots: Vec::new(),
            projections: Vec::new(),
            distinct: false,
            where_clause,
            having_clause,
            group_by: Vec::new(),
            order_by: Vec::new(),
            assignments: Vec::new(),
        });
        debug!("created {} session {:?} (depth {})", kind, id, depth);
        id
    }

    fn new_subquery(&mut self, parent: SessionId) -> Result<SessionId, QueryError> {
        let depth = self.session(parent).depth + 1;
        if depth > self.config.max_subquery_depth {
            return Err(QueryError::SubqueryTooDeep {
                depth,
                max: self.config.max_subquery_depth,
            });
        }
        Ok(self.push_session(SessionKind::Subquery, Some(parent), depth))
    }

    /// Fails while a multi-target join is armed; the armed state is discarded.
    pub(crate) fn ensure_not_armed(&mut self, operation: &str) -> Result<(), QueryError> {
        if self.armed.take().is_some() {
            return Err(QueryError::ArmedJoinPending {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn display_paths(&self, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().map(|n| self.graph.display_path(*n)).collect()
    }

    /// Fails if `operand` carries a node, sub-query or case condition of another engine.
    pub(crate) fn ensure_owned(&self, operand: &Operand) -> Result<(), QueryError> {
        if operand.origins().iter().all(|origin| *origin == self.id) {
            Ok(())
        } else {
            Err(QueryError::ForeignQuery)
        }
    }

    fn reference(&self, node: NodeId) -> Operand {
        Operand::Reference {
            origin: self.id,
            node,
        }
    }

    /// Turns one builder argument into an operand, draining the invocation queue.
    pub(crate) fn consume(&mut self, arg: Arg) -> Result<Operand, QueryError> {
        match (arg, self.queue.take()) {
            (Arg::Pending(literal), Pending::Empty) => Ok(Operand::Literal(literal)),
            (Arg::Pending(_), Pending::One(node)) => Ok(self.reference(node)),
            (Arg::Value(operand), Pending::Empty) => {
                self.ensure_owned(&operand)?;
                Ok(operand)
            }
            (Arg::Value(_), Pending::One(node)) => Err(QueryError::UnconsumedNavigation {
                path: self.graph.display_path(node),
            }),
            (_, Pending::Ambiguous(nodes)) => Err(QueryError::AmbiguousNavigation {
                paths: self.display_paths(&nodes),
            }),
        }
    }

    /// Consumes several arguments of one call against a single queue drain.
    ///
    /// One pending navigation is matched to the only plain argument, or else to
    /// the only plain argument that looks like an interception dummy value.
    pub(crate) fn consume_all(&mut self, args: Vec<Arg>) -> Result<Vec<Operand>, QueryError> {
        let pending = self.queue.take();
        let navigated = match pending {
            Pending::Empty => None,
            Pending::One(node) => Some(node),
            Pending::Ambiguous(nodes) => {
                return Err(QueryError::AmbiguousNavigation {
                    paths: self.display_paths(&nodes),
                })
            }
        };

        let target = match navigated {
            None => None,
            Some(node) => {
                let plain: Vec<usize> = args
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| matches!(a, Arg::Pending(_)))
                    .map(|(i, _)| i)
                    .collect();
                let dummies: Vec<usize> = plain
                    .iter()
                    .copied()
                    .filter(|i| matches!(&args[*i], Arg::Pending(l) if l.is_dummy_shaped()))
                    .collect();
                let path = self.graph.display_path(node);
                match (plain.len(), dummies.len()) {
                    (0, _) => return Err(QueryError::UnconsumedNavigation { path }),
                    (1, _) => Some((plain[0], node)),
                    (_, 1) => Some((dummies[0], node)),
                    _ => {
                        return Err(QueryError::AmbiguousNavigation {
                            paths: vec![path],
                        })
                    }
                }
            }
        };

        for arg in &args {
            if let Arg::Value(operand) = arg {
                self.ensure_owned(operand)?;
            }
        }
        Ok(args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| match (arg, target) {
                (Arg::Pending(_), Some((index, node))) if index == i => self.reference(node),
                (Arg::Pending(literal), _) => Operand::Literal(literal),
                (Arg::Value(operand), _) => operand,
            })
            .collect())
    }

    /// Consumes and scope-checks a value for `session`.
    pub(crate) fn accept(&mut self, session: SessionId, arg: Arg) -> Result<Operand, QueryError> {
        let operand = self.consume(arg)?;
        self.validate_operand(&operand, &ScopeContext::new(session))?;
        Ok(operand)
    }

    pub(crate) fn accept_all(&mut self, session: SessionId, args: Vec<Arg>) -> Result<Vec<Operand>, QueryError> {
        let operands = self.consume_all(args)?;
        self.validate_operands(&operands, &ScopeContext::new(session))?;
        Ok(operands)
    }

    fn reject_bulk(&self, session: SessionId, clause: &str) -> Result<(), QueryError> {
        let kind = self.session(session).kind;
        if kind.is_bulk() {
            return Err(QueryError::ClauseNotSupported {
                clause: clause.to_string(),
                kind: kind.to_string(),
            });
        }
        Ok(())
    }
}

/// Creates root queries against one metadata provider.
#[derive(Clone)]
pub struct QueryFactory {
    metadata: Arc<dyn MetadataProvider>,
    config: BuilderConfig,
}

impl QueryFactory {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self::with_config(metadata, BuilderConfig::default())
    }

    pub fn with_config(metadata: Arc<dyn MetadataProvider>, config: BuilderConfig) -> Self {
        Self { metadata, config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn select(&self) -> Query {
        self.root(SessionKind::Select)
    }

    pub fn update(&self) -> Query {
        self.root(SessionKind::Update)
    }

    pub fn delete(&self) -> Query {
        self.root(SessionKind::Delete)
    }

    fn root(&self, kind: SessionKind) -> Query {
        let mut engine = Engine::new(Arc::clone(&self.metadata), self.config.clone());
        let session = engine.push_session(kind, None, 0);
        Query {
            origin: engine.id,
            engine: Rc::new(RefCell::new(engine)),
            session,
        }
    }
}

/// Handle on one session of a query.
#[derive(Clone)]
pub struct Query {
    pub(crate) engine: Rc<RefCell<Engine>>,
    pub(crate) origin: EngineId,
    pub(crate) session: SessionId,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("session", &self.session)
            .field("kind", &self.kind())
            .finish()
    }
}

impl Query {
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn kind(&self) -> SessionKind {
        self.engine.borrow().session(self.session).kind
    }

    /// Enclosing session of a sub-query.
    pub fn parent(&self) -> Option<SessionId> {
        self.engine.borrow().session(self.session).parent
    }

    /// Number of navigations recorded but not consumed yet.
    pub fn pending_navigations(&self) -> usize {
        self.engine.borrow().queue.len()
    }

    /// True if `other` shares this query's engine.
    pub fn same_root(&self, other: &Query) -> bool {
        Rc::ptr_eq(&self.engine, &other.engine)
    }

    pub(crate) fn ensure_same_root(&self, other: &Query) -> Result<(), QueryError> {
        if self.same_root(other) {
            Ok(())
        } else {
            Err(QueryError::ForeignQuery)
        }
    }

    pub(crate) fn ensure_own_proxy(&self, proxy: &Proxy) -> Result<(), QueryError> {
        if Rc::ptr_eq(&self.engine, &proxy.engine) {
            Ok(())
        } else {
            Err(QueryError::ForeignQuery)
        }
    }

    pub(crate) fn proxy(&self, node: NodeId) -> Proxy {
        Proxy {
            engine: Rc::clone(&self.engine),
            origin: self.origin,
            node,
        }
    }

    fn sibling(&self, session: SessionId) -> Query {
        Query {
            engine: Rc::clone(&self.engine),
            origin: self.origin,
            session,
        }
    }

    /// Declares a from-root of `entity` and returns its proxy.
    pub fn from(&self, entity: &str) -> Result<Proxy, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("from")?;
        let kind = engine.session(self.session).kind;
        if kind.is_bulk() && !engine.session(self.session).roots.is_empty() {
            return Err(QueryError::SecondBulkRoot {
                kind: kind.to_string(),
                entity: entity.to_string(),
            });
        }

        let info = engine.metadata.entity(entity)?;
        let root = engine.graph.add_root(self.session, &info);
        if kind.is_bulk() {
            engine.graph.node_mut(root).alias = Some(String::new());
        }
        engine.session_mut(self.session).roots.push(root);
        Ok(self.proxy(root))
    }

    /// Opens a sub-query nested in this one.
    pub fn subquery(&self) -> Result<Query, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("subquery")?;
        let session = engine.new_subquery(self.session)?;
        Ok(self.sibling(session))
    }

    /// Registers a named parameter and returns it as a value.
    pub fn param(&self, name: &str, value: impl Into<Literal>) -> Result<Operand, QueryError> {
        if !is_identifier(name) {
            return Err(QueryError::InvalidParamName {
                name: name.to_string(),
            });
        }
        let value = value.into();
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("param")?;
        let style = engine.config.param_style;
        if style.reserves(name) {
            return Err(QueryError::ReservedParamName {
                name: name.to_string(),
                style: style.to_string(),
            });
        }
        match engine.named_params.get(name) {
            Some(existing) if *existing != value => Err(QueryError::NamedParamConflict {
                name: name.to_string(),
            }),
            Some(_) => Ok(Operand::NamedParam(name.to_string())),
            None => {
                engine.named_params.insert(name.to_string(), value);
                Ok(Operand::NamedParam(name.to_string()))
            }
        }
    }

    /// Consumes the value just navigated to, or wraps a literal.
    pub fn value(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("value")?;
        engine.accept(self.session, arg.into())
    }

    pub fn select(&self, arg: impl Into<Arg>) -> Result<(), QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("select")?;
        engine.reject_bulk(self.session, "select")?;
        let operand = engine.accept(self.session, arg.into())?;
        engine.session_mut(self.session).projections.push(operand);
        Ok(())
    }

    pub fn select_distinct(&self) -> Result<(), QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("select_distinct")?;
        engine.reject_bulk(self.session, "select distinct")?;
        engine.session_mut(self.session).distinct = true;
        Ok(())
    }

    pub fn group_by(&self, arg: impl Into<Arg>) -> Result<(), QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("group_by")?;
        engine.reject_bulk(self.session, "group by")?;
        let operand = engine.accept(self.session, arg.into())?;
        engine.session_mut(self.session).group_by.push(operand);
        Ok(())
    }

    pub fn order_by_asc(&self, arg: impl Into<Arg>) -> Result<(), QueryError> {
        self.order_by(arg.into(), SortOrder::Asc)
    }

    pub fn order_by_desc(&self, arg: impl Into<Arg>) -> Result<(), QueryError> {
        self.order_by(arg.into(), SortOrder::Desc)
    }

    fn order_by(&self, arg: Arg, order: SortOrder) -> Result<(), QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("order_by")?;
        engine.reject_bulk(self.session, "order by")?;
        let operand = engine.accept(self.session, arg)?;
        engine.session_mut(self.session).order_by.push((operand, order));
        Ok(())
    }

    /// Renders the statement. Can be called repeatedly; aliases and join types
    /// fixed by an earlier call are kept.
    pub fn build(&self) -> Result<Statement, QueryError> {
        let mut engine = self.engine.borrow_mut();
        Assembler::assemble(&mut engine, self.session)
    }

    /// Deep copy of the whole root query. The copy shares nothing with the
    /// original except the metadata provider.
    pub fn copy(&self) -> Query {
        let mut engine = self.engine.borrow().clone();
        engine.copied_from = Some(engine.id);
        engine.id = EngineId::next();
        debug!(
            "copied query with {} nodes and {} sessions",
            engine.graph.len(),
            engine.sessions.len()
        );
        Query {
            origin: engine.id,
            engine: Rc::new(RefCell::new(engine)),
            session: self.session,
        }
    }

    /// Handles of this query itself or of the query it was copied from.
    fn ensure_rebindable(&self, origin: EngineId) -> Result<(), QueryError> {
        let copied_from = self.engine.borrow().copied_from;
        if origin == self.origin || Some(origin) == copied_from {
            Ok(())
        } else {
            Err(QueryError::ForeignQuery)
        }
    }

    /// Maps a proxy of the original query onto the same node of this copy.
    pub fn rebind(&self, proxy: &Proxy) -> Result<Proxy, QueryError> {
        self.ensure_rebindable(proxy.origin)?;
        Ok(self.proxy(proxy.node))
    }

    /// Maps a sub-query handle of the original query onto this copy.
    pub fn rebind_query(&self, query: &Query) -> Result<Query, QueryError> {
        self.ensure_rebindable(query.origin)?;
        Ok(self.sibling(query.session))
    }
}

impl From<&Query> for Arg {
    fn from(query: &Query) -> Self {
        Arg::Value(Operand::Subquery {
            origin: query.origin,
            session: query.session,
        })
    }
}

//! Accessor-call interception.
//!
//! A [`Proxy`] stands for one query node. Every accessor call on it is
//! delivered as an [`Invocation`] and classified by the declared return kind:
//!
//! - `Handle` answers the node's bookkeeping handle
//! - setters record an assignment (update queries only)
//! - scalar, collection and map returns are terminal: the node is queued for
//!   the next builder call and a [`DummyValue`] keeps the caller's expression
//!   evaluating
//! - entity and embedded returns hand back the child proxy without queueing
//!
//! Calls made while a multi-target join is armed apply the armed join type to
//! every association they pass through.

pub mod accessor;
pub mod proxy;
pub mod queue;

pub use accessor::{Accessor, AccessorMode};
pub use proxy::Proxy;
pub use queue::{InvocationQueue, Pending};

use crate::query_expr::{Arg, Literal};
use crate::query_graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Text,
    /// Any other leaf type; its dummy is a null reference
    Other,
}

/// Declared return type of an intercepted accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// The proxy's own bookkeeping handle
    Handle,
    Scalar(ScalarKind),
    Collection,
    Map,
    Entity,
    Embedded,
    Void,
}

impl ReturnKind {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReturnKind::Scalar(_) | ReturnKind::Collection | ReturnKind::Map
        )
    }

    fn dummy(&self) -> DummyValue {
        match self {
            ReturnKind::Scalar(ScalarKind::Bool) => DummyValue::Bool(false),
            ReturnKind::Scalar(ScalarKind::Int) => DummyValue::Int(0),
            ReturnKind::Scalar(ScalarKind::Float) => DummyValue::Float(0.0),
            ReturnKind::Scalar(ScalarKind::Text) => DummyValue::Text(String::new()),
            ReturnKind::Collection | ReturnKind::Map => DummyValue::Collection(CollectionToken),
            _ => DummyValue::Null,
        }
    }
}

/// One intercepted accessor call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub accessor: String,
    pub returns: ReturnKind,
    pub args: Vec<Arg>,
}

impl Invocation {
    pub fn new(accessor: impl Into<String>, returns: ReturnKind) -> Self {
        Self {
            accessor: accessor.into(),
            returns,
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Stand-in returned for collection and map accessors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionToken;

impl From<CollectionToken> for Arg {
    fn from(_: CollectionToken) -> Self {
        Arg::Pending(Literal::Null)
    }
}

/// Value handed back by a terminal accessor call.
#[derive(Debug, Clone, PartialEq)]
pub enum DummyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
    Collection(CollectionToken),
}

impl From<DummyValue> for Arg {
    fn from(value: DummyValue) -> Self {
        let literal = match value {
            DummyValue::Bool(b) => Literal::Bool(b),
            DummyValue::Int(i) => Literal::Int(i),
            DummyValue::Float(f) => Literal::Float(f),
            DummyValue::Text(s) => Literal::Text(s),
            DummyValue::Null | DummyValue::Collection(_) => Literal::Null,
        };
        Arg::Pending(literal)
    }
}

#[derive(Debug, Clone)]
pub enum InterceptionResult {
    Handle(NodeId),
    Proxy(Proxy),
    Dummy(DummyValue),
    Assigned,
}

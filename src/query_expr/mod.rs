//! Values and restrictions recorded by the builder.
//!
//! An [`Operand`] is what a builder call turns its argument into once the
//! invocation queue has been consulted: a literal, a reference to a query node,
//! a sub-query or an expression built from other operands. Restrictions live in
//! [`restriction`].

pub mod restriction;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query_graph::NodeId;
use crate::session::{EngineId, SessionId};
pub use restriction::{Comparison, ConditionContainer, ConditionOwner, Connective, ContainerId, Restriction};

/// Parameter values handed to the statement consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Literal {
    /// True for the values interception hands back from terminal accessor calls.
    pub fn is_dummy_shaped(&self) -> bool {
        match self {
            Literal::Null => true,
            Literal::Bool(b) => !*b,
            Literal::Int(i) => *i == 0,
            Literal::Float(f) => *f == 0.0,
            Literal::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value as i64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Literal::Null)
    }
}

/// Wrap functions taking a single argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    Lower,
    Upper,
    Trim,
    Length,
    Abs,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Count | Function::CountDistinct => "count",
            Function::Sum => "sum",
            Function::Avg => "avg",
            Function::Min => "min",
            Function::Max => "max",
            Function::Lower => "lower",
            Function::Upper => "upper",
            Function::Trim => "trim",
            Function::Length => "length",
            Function::Abs => "abs",
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Function::Count
                | Function::CountDistinct
                | Function::Sum
                | Function::Avg
                | Function::Min
                | Function::Max
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Plus,
    Minus,
    Times,
    DividedBy,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Plus => "+",
            ArithmeticOp::Minus => "-",
            ArithmeticOp::Times => "*",
            ArithmeticOp::DividedBy => "/",
        }
    }
}

/// One `when <condition> then <value>` arm of a case expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    /// Engine owning `condition`
    pub origin: EngineId,
    pub condition: ContainerId,
    pub result: Operand,
}

/// A consumed builder value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Literal passed directly, rendered as a parameter
    Literal(Literal),
    /// Named parameter registered on the query
    NamedParam(String),
    /// Path or alias of a query node
    Reference { origin: EngineId, node: NodeId },
    /// Correlated sub-query spliced in parentheses
    Subquery { origin: EngineId, session: SessionId },
    Function {
        function: Function,
        arg: Box<Operand>,
    },
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Operand>,
        right: Box<Operand>,
    },
    Concat(Vec<Operand>),
    Coalesce(Vec<Operand>),
    Case {
        branches: Vec<CaseBranch>,
        otherwise: Option<Box<Operand>>,
    },
}

impl Operand {
    /// Nodes referenced anywhere inside this operand, outside nested conditions.
    pub fn referenced_nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        self.collect_nodes(&mut nodes);
        nodes
    }

    /// Engines owning the nodes, sub-queries and case conditions inside this operand.
    pub fn origins(&self) -> Vec<EngineId> {
        let mut origins = Vec::new();
        self.collect_origins(&mut origins);
        origins
    }

    fn collect_origins(&self, origins: &mut Vec<EngineId>) {
        match self {
            Operand::Reference { origin, .. } | Operand::Subquery { origin, .. } => {
                origins.push(*origin)
            }
            Operand::Function { arg, .. } => arg.collect_origins(origins),
            Operand::Arithmetic { left, right, .. } => {
                left.collect_origins(origins);
                right.collect_origins(origins);
            }
            Operand::Concat(items) | Operand::Coalesce(items) => {
                items.iter().for_each(|item| item.collect_origins(origins))
            }
            Operand::Case {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    origins.push(branch.origin);
                    branch.result.collect_origins(origins);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.collect_origins(origins);
                }
            }
            Operand::Literal(_) | Operand::NamedParam(_) => {}
        }
    }

    fn collect_nodes(&self, nodes: &mut Vec<NodeId>) {
        match self {
            Operand::Reference { node, .. } => nodes.push(*node),
            Operand::Function { arg, .. } => arg.collect_nodes(nodes),
            Operand::Arithmetic { left, right, .. } => {
                left.collect_nodes(nodes);
                right.collect_nodes(nodes);
            }
            Operand::Concat(items) | Operand::Coalesce(items) => {
                items.iter().for_each(|item| item.collect_nodes(nodes))
            }
            Operand::Case {
                branches,
                otherwise,
            } => {
                branches.iter().for_each(|b| b.result.collect_nodes(nodes));
                if let Some(otherwise) = otherwise {
                    otherwise.collect_nodes(nodes);
                }
            }
            Operand::Literal(_) | Operand::NamedParam(_) | Operand::Subquery { .. } => {}
        }
    }
}

impl From<Literal> for Operand {
    fn from(value: Literal) -> Self {
        Operand::Literal(value)
    }
}

/// Argument of a builder call before the invocation queue is consulted.
///
/// Plain Rust values (including the dummy values returned by terminal accessor
/// calls) arrive as `Pending`: whether they stand for the node just navigated
/// to or for a literal is only known once the queue is drained. Proxies,
/// sub-queries and already built operands arrive as `Value`.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Pending(Literal),
    Value(Operand),
}

impl From<Operand> for Arg {
    fn from(value: Operand) -> Self {
        Arg::Value(value)
    }
}

impl From<&Operand> for Arg {
    fn from(value: &Operand) -> Self {
        Arg::Value(value.clone())
    }
}

impl From<Literal> for Arg {
    fn from(value: Literal) -> Self {
        Arg::Pending(value)
    }
}

macro_rules! pending_arg_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Pending(Literal::from(value))
                }
            }
        )*
    };
}

pending_arg_from!(i64, i32, f64, bool, &str, String);

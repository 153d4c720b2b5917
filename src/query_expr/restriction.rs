//! Restrictions and the containers that group them.
//!
//! Every where, having and with clause is a [`ConditionContainer`]: a flat list
//! of restrictions joined by `and`/`or`. Nested groups are stored as separate
//! containers and referenced by [`Restriction::Group`], so a group renders with
//! parentheses exactly when it is consumed by a container other than its own.

use serde::Serialize;

use super::Operand;
use crate::query_graph::NodeId;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ContainerId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Neq => "<>",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Like => "like",
            Comparison::NotLike => "not like",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn keyword(&self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    Compare {
        left: Operand,
        op: Comparison,
        right: Operand,
    },
    Between {
        value: Operand,
        low: Operand,
        high: Operand,
    },
    InList {
        value: Operand,
        items: Vec<Operand>,
        negated: bool,
    },
    InSubquery {
        value: Operand,
        subquery: SessionId,
        negated: bool,
    },
    IsNull {
        value: Operand,
        negated: bool,
    },
    IsEmpty {
        value: Operand,
        negated: bool,
    },
    Exists {
        subquery: SessionId,
        negated: bool,
    },
    Group(ContainerId),
}

impl Restriction {
    /// Operands directly held by this restriction.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Restriction::Compare { left, right, .. } => vec![left, right],
            Restriction::Between { value, low, high } => vec![value, low, high],
            Restriction::InList { value, items, .. } => {
                let mut operands = vec![value];
                operands.extend(items.iter());
                operands
            }
            Restriction::InSubquery { value, .. }
            | Restriction::IsNull { value, .. }
            | Restriction::IsEmpty { value, .. } => vec![value],
            Restriction::Exists { .. } | Restriction::Group(_) => Vec::new(),
        }
    }

    /// Sub-query sessions spliced by this restriction.
    pub fn subquery(&self) -> Option<SessionId> {
        match self {
            Restriction::InSubquery { subquery, .. } | Restriction::Exists { subquery, .. } => {
                Some(*subquery)
            }
            _ => None,
        }
    }
}

/// Clause a container renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConditionOwner {
    Where,
    Having,
    /// Join qualifier of the given join target
    With(NodeId),
    /// Built on its own, consumed later as a group or case condition
    Standalone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionContainer {
    pub owner: ConditionOwner,
    pub session: SessionId,
    pub items: Vec<(Connective, Restriction)>,
}

impl ConditionContainer {
    pub fn new(owner: ConditionOwner, session: SessionId) -> Self {
        Self {
            owner,
            session,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, connective: Connective, restriction: Restriction) {
        self.items.push((connective, restriction));
    }

    /// A group needs brackets only when it holds more than one restriction.
    pub fn needs_parentheses(&self) -> bool {
        self.items.len() > 1
    }
}

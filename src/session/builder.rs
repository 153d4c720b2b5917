//! Restriction builders, functions and case expressions.
//!
//! `where_`, `having`, `with` and `condition` consume their left-hand value
//! immediately and return an [`OnGoingCondition`]; the comparison call that
//! follows consumes the right-hand side and yields a [`LogicalCondition`] that
//! can be continued with `and`/`or` or nested groups.

use log::debug;

use super::errors::QueryError;
use super::scope::ScopeContext;
use super::Query;
use crate::interception::Proxy;
use crate::query_expr::{
    Arg, ArithmeticOp, CaseBranch, Comparison, ConditionOwner, Connective, ContainerId, Function,
    Operand, Restriction,
};

impl Query {
    fn start_condition(
        &self,
        container: ContainerId,
        connective: Connective,
        ctx: ScopeContext,
        arg: Arg,
        operation: &str,
    ) -> Result<OnGoingCondition, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed(operation)?;
        let left = engine.consume(arg)?;
        engine.check_operands(std::slice::from_ref(&left), &ctx)?;
        Ok(OnGoingCondition {
            query: self.clone(),
            container,
            connective,
            ctx,
            left,
        })
    }

    /// Starts (or extends with `and`) the where clause.
    pub fn where_(&self, arg: impl Into<Arg>) -> Result<OnGoingCondition, QueryError> {
        let container = self.engine.borrow().session(self.session).where_clause;
        self.start_condition(
            container,
            Connective::And,
            ScopeContext::new(self.session),
            arg.into(),
            "where",
        )
    }

    /// Starts (or extends with `and`) the having clause.
    pub fn having(&self, arg: impl Into<Arg>) -> Result<OnGoingCondition, QueryError> {
        let container = {
            let engine = self.engine.borrow();
            engine.reject_bulk(self.session, "having")?;
            engine.session(self.session).having_clause
        };
        self.start_condition(
            container,
            Connective::And,
            ScopeContext::new(self.session),
            arg.into(),
            "having",
        )
    }

    /// Starts a standalone condition, to be nested with `where_group`,
    /// `and_group`/`or_group` or used in a case expression.
    pub fn condition(&self, arg: impl Into<Arg>) -> Result<OnGoingCondition, QueryError> {
        let container = self
            .engine
            .borrow_mut()
            .new_container(ConditionOwner::Standalone, self.session);
        self.start_condition(
            container,
            Connective::And,
            ScopeContext::new(self.session),
            arg.into(),
            "condition",
        )
    }

    /// Adds a standalone condition to the where clause as one group.
    pub fn where_group(&self, condition: &LogicalCondition) -> Result<LogicalCondition, QueryError> {
        let container = self.engine.borrow().session(self.session).where_clause;
        let current = LogicalCondition {
            query: self.clone(),
            container,
            ctx: ScopeContext::new(self.session),
        };
        current.group(Connective::And, condition, "where_group")
    }

    /// Starts (or extends with `and`) the with clause of an explicit join.
    pub fn with(&self, join: &Proxy, arg: impl Into<Arg>) -> Result<OnGoingCondition, QueryError> {
        self.ensure_own_proxy(join)?;
        let (container, ctx) = {
            let mut engine = self.engine.borrow_mut();
            engine.ensure_not_armed("with")?;
            let node = engine.graph.node(join.node);
            if node.join_type.is_none() {
                return Err(QueryError::WithoutJoin {
                    path: engine.graph.display_path(join.node),
                });
            }
            let join_session = node.session;
            if !engine.is_ancestor_or_self(join_session, self.session) {
                return Err(QueryError::OutOfScope {
                    path: engine.graph.display_path(join.node),
                });
            }
            let container = match engine.with_clauses.get(&join.node) {
                Some(existing) => *existing,
                None => {
                    let created =
                        engine.new_container(ConditionOwner::With(join.node), join_session);
                    engine.with_clauses.insert(join.node, created);
                    created
                }
            };
            (container, ScopeContext::for_join(join_session, join.node))
        };
        self.start_condition(container, Connective::And, ctx, arg.into(), "with")
    }

    /// Adds `exists (subquery)` to the where clause.
    pub fn exists(&self, subquery: &Query) -> Result<LogicalCondition, QueryError> {
        self.where_subquery(subquery, false)
    }

    /// Adds `not exists (subquery)` to the where clause.
    pub fn not_exists(&self, subquery: &Query) -> Result<LogicalCondition, QueryError> {
        self.where_subquery(subquery, true)
    }

    fn where_subquery(&self, subquery: &Query, negated: bool) -> Result<LogicalCondition, QueryError> {
        self.ensure_same_root(subquery)?;
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("exists")?;
        let ctx = ScopeContext::new(self.session);
        engine.validate_subquery(subquery.session, &ctx)?;
        let container = engine.session(self.session).where_clause;
        engine.container_mut(container).push(
            Connective::And,
            Restriction::Exists {
                subquery: subquery.session,
                negated,
            },
        );
        Ok(LogicalCondition {
            query: self.clone(),
            container,
            ctx,
        })
    }

    fn wrap(&self, function: Function, arg: Arg) -> Result<Operand, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("function")?;
        let arg = engine.accept(self.session, arg)?;
        Ok(Operand::Function {
            function,
            arg: Box::new(arg),
        })
    }

    pub fn count(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Count, arg.into())
    }

    pub fn count_distinct(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::CountDistinct, arg.into())
    }

    pub fn sum(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Sum, arg.into())
    }

    pub fn avg(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Avg, arg.into())
    }

    pub fn min(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Min, arg.into())
    }

    pub fn max(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Max, arg.into())
    }

    pub fn lower(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Lower, arg.into())
    }

    pub fn upper(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Upper, arg.into())
    }

    pub fn trim(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Trim, arg.into())
    }

    pub fn length(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Length, arg.into())
    }

    pub fn abs(&self, arg: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.wrap(Function::Abs, arg.into())
    }

    pub fn coalesce(&self, args: Vec<Arg>) -> Result<Operand, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("coalesce")?;
        Ok(Operand::Coalesce(engine.accept_all(self.session, args)?))
    }

    pub fn concat(&self, args: Vec<Arg>) -> Result<Operand, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("concat")?;
        Ok(Operand::Concat(engine.accept_all(self.session, args)?))
    }

    fn arithmetic(&self, op: ArithmeticOp, left: Arg, right: Arg) -> Result<Operand, QueryError> {
        let mut engine = self.engine.borrow_mut();
        engine.ensure_not_armed("arithmetic")?;
        let mut operands = engine.accept_all(self.session, vec![left, right])?.into_iter();
        match (operands.next(), operands.next()) {
            (Some(left), Some(right)) => Ok(Operand::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            }),
            _ => unreachable!("one operand per argument"),
        }
    }

    pub fn plus(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.arithmetic(ArithmeticOp::Plus, left.into(), right.into())
    }

    pub fn minus(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.arithmetic(ArithmeticOp::Minus, left.into(), right.into())
    }

    pub fn times(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.arithmetic(ArithmeticOp::Times, left.into(), right.into())
    }

    pub fn divided_by(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Result<Operand, QueryError> {
        self.arithmetic(ArithmeticOp::DividedBy, left.into(), right.into())
    }

    /// Starts `case when <condition> then <value> ...`.
    pub fn case_when(
        &self,
        condition: &LogicalCondition,
        then: impl Into<Arg>,
    ) -> Result<CaseBuilder, QueryError> {
        CaseBuilder {
            query: self.clone(),
            branches: Vec::new(),
        }
        .when(condition, then)
    }
}

/// A restriction waiting for its operator and right-hand side.
#[must_use = "a condition is only recorded once its operator is called"]
#[derive(Debug)]
pub struct OnGoingCondition {
    query: Query,
    container: ContainerId,
    connective: Connective,
    ctx: ScopeContext,
    left: Operand,
}

impl OnGoingCondition {
    /// Consumes the arguments of the operator call in this condition's scope.
    /// The left-hand value is marked referenced together with them, once the
    /// whole restriction is known to be valid.
    fn operands(&self, args: Vec<Arg>) -> Result<Vec<Operand>, QueryError> {
        let mut engine = self.query.engine.borrow_mut();
        engine.ensure_not_armed("condition")?;
        let operands = match <[Arg; 1]>::try_from(args) {
            Ok([arg]) => vec![engine.consume(arg)?],
            Err(args) => engine.consume_all(args)?,
        };
        let mut checked = Vec::with_capacity(operands.len() + 1);
        checked.push(self.left.clone());
        checked.extend(operands.iter().cloned());
        engine.validate_operands(&checked, &self.ctx)?;
        Ok(operands)
    }

    fn record(self, build: impl FnOnce(Operand) -> Restriction) -> LogicalCondition {
        let OnGoingCondition {
            query,
            container,
            connective,
            ctx,
            left,
        } = self;
        let restriction = build(left);
        debug!("recorded restriction {:?}", restriction);
        query
            .engine
            .borrow_mut()
            .container_mut(container)
            .push(connective, restriction);
        LogicalCondition {
            query,
            container,
            ctx,
        }
    }

    fn compare(self, op: Comparison, right: Arg) -> Result<LogicalCondition, QueryError> {
        let right = match self.operands(vec![right])?.pop() {
            Some(right) => right,
            None => unreachable!("one operand per argument"),
        };
        Ok(self.record(|left| Restriction::Compare { left, op, right }))
    }

    pub fn eq(self, right: impl Into<Arg>) -> Result<LogicalCondition, QueryError> {
        self.compare(Comparison::Eq, right.into())
    }

    pub fn neq(self, right: impl Into<Arg>) -> Result<LogicalCondition, QueryError> {
        self.compare(Comparison::Neq, right.into())
    }

    pub fn gt(self, right: impl Into<Arg>) -> Result<LogicalCondition, QueryError> {
        self.compare(Comparison::Gt, right.into())
    }

    pub fn gte(self, right: impl Into<Arg>) -> Result<LogicalCondition, QueryError> {
        self.compare(Comparison::Gte, right.into())
    }

    pub fn lt(self, right: impl Into<Arg>) -> Result<LogicalCondition, QueryError> {
        self.compare(Comparison::Lt, right.into())
    }

    pub fn lte(self, right: impl Into<Arg>) -> Result<LogicalCondition, QueryError> {
        self.compare(Comparison::Lte, right.into())
    }

    pub fn like(self, pattern: impl Into<Arg>) -> Result<LogicalCondition, QueryError> {
        self.compare(Comparison::Like, pattern.into())
    }

    pub fn not_like(self, pattern: impl Into<Arg>) -> Result<LogicalCondition, QueryError> {
        self.compare(Comparison::NotLike, pattern.into())
    }

    pub fn between(
        self,
        low: impl Into<Arg>,
        high: impl Into<Arg>,
    ) -> Result<LogicalCondition, QueryError> {
        let mut operands = self.operands(vec![low.into(), high.into()])?.into_iter();
        let (low, high) = match (operands.next(), operands.next()) {
            (Some(low), Some(high)) => (low, high),
            _ => unreachable!("one operand per argument"),
        };
        Ok(self.record(|value| Restriction::Between { value, low, high }))
    }

    pub fn in_list(self, items: Vec<Arg>) -> Result<LogicalCondition, QueryError> {
        self.list(items, false)
    }

    pub fn not_in_list(self, items: Vec<Arg>) -> Result<LogicalCondition, QueryError> {
        self.list(items, true)
    }

    fn list(self, items: Vec<Arg>, negated: bool) -> Result<LogicalCondition, QueryError> {
        let items = self.operands(items)?;
        Ok(self.record(|value| Restriction::InList {
            value,
            items,
            negated,
        }))
    }

    pub fn in_subquery(self, subquery: &Query) -> Result<LogicalCondition, QueryError> {
        self.subquery(subquery, false)
    }

    pub fn not_in_subquery(self, subquery: &Query) -> Result<LogicalCondition, QueryError> {
        self.subquery(subquery, true)
    }

    fn subquery(self, subquery: &Query, negated: bool) -> Result<LogicalCondition, QueryError> {
        self.query.ensure_same_root(subquery)?;
        self.query
            .engine
            .borrow()
            .validate_subquery(subquery.session, &self.ctx)?;
        self.operands(Vec::new())?;
        let session = subquery.session;
        Ok(self.record(|value| Restriction::InSubquery {
            value,
            subquery: session,
            negated,
        }))
    }

    fn unary(self, build: impl FnOnce(Operand) -> Restriction) -> Result<LogicalCondition, QueryError> {
        self.operands(Vec::new())?;
        Ok(self.record(build))
    }

    pub fn is_null(self) -> Result<LogicalCondition, QueryError> {
        self.unary(|value| Restriction::IsNull { value, negated: false })
    }

    pub fn is_not_null(self) -> Result<LogicalCondition, QueryError> {
        self.unary(|value| Restriction::IsNull { value, negated: true })
    }

    pub fn is_empty(self) -> Result<LogicalCondition, QueryError> {
        self.unary(|value| Restriction::IsEmpty { value, negated: false })
    }

    pub fn is_not_empty(self) -> Result<LogicalCondition, QueryError> {
        self.unary(|value| Restriction::IsEmpty { value, negated: true })
    }
}

/// A recorded restriction that can be continued.
#[derive(Debug, Clone)]
pub struct LogicalCondition {
    query: Query,
    container: ContainerId,
    ctx: ScopeContext,
}

impl LogicalCondition {
    pub fn container_id(&self) -> ContainerId {
        self.container
    }

    fn next(&self, connective: Connective, arg: Arg, operation: &str) -> Result<OnGoingCondition, QueryError> {
        self.query
            .start_condition(self.container, connective, self.ctx, arg, operation)
    }

    pub fn and(&self, arg: impl Into<Arg>) -> Result<OnGoingCondition, QueryError> {
        self.next(Connective::And, arg.into(), "and")
    }

    pub fn or(&self, arg: impl Into<Arg>) -> Result<OnGoingCondition, QueryError> {
        self.next(Connective::Or, arg.into(), "or")
    }

    /// Appends a standalone condition as a bracketed `and` group.
    pub fn and_group(&self, group: &LogicalCondition) -> Result<LogicalCondition, QueryError> {
        self.group(Connective::And, group, "and_group")
    }

    /// Appends a standalone condition as a bracketed `or` group.
    pub fn or_group(&self, group: &LogicalCondition) -> Result<LogicalCondition, QueryError> {
        self.group(Connective::Or, group, "or_group")
    }

    fn group(
        &self,
        connective: Connective,
        group: &LogicalCondition,
        operation: &str,
    ) -> Result<LogicalCondition, QueryError> {
        self.query.ensure_same_root(&group.query)?;
        let mut engine = self.query.engine.borrow_mut();
        engine.ensure_not_armed(operation)?;
        if group.container == self.container
            || engine.container(group.container).owner != ConditionOwner::Standalone
        {
            return Err(QueryError::InvalidGroup);
        }
        engine.validate_container(group.container, &self.ctx)?;
        engine
            .container_mut(self.container)
            .push(connective, Restriction::Group(group.container));
        Ok(self.clone())
    }
}

/// Builder for `case when ... then ... [else ...] end`.
#[derive(Debug)]
pub struct CaseBuilder {
    query: Query,
    branches: Vec<CaseBranch>,
}

impl CaseBuilder {
    pub fn when(
        mut self,
        condition: &LogicalCondition,
        then: impl Into<Arg>,
    ) -> Result<CaseBuilder, QueryError> {
        self.query.ensure_same_root(&condition.query)?;
        let mut engine = self.query.engine.borrow_mut();
        engine.ensure_not_armed("case_when")?;
        if engine.container(condition.container).owner != ConditionOwner::Standalone {
            return Err(QueryError::InvalidGroup);
        }
        let result = engine.accept(self.query.session, then.into())?;
        drop(engine);
        self.branches.push(CaseBranch {
            origin: self.query.origin,
            condition: condition.container,
            result,
        });
        Ok(self)
    }

    pub fn otherwise(self, value: impl Into<Arg>) -> Result<Operand, QueryError> {
        let otherwise = {
            let mut engine = self.query.engine.borrow_mut();
            engine.ensure_not_armed("otherwise")?;
            engine.accept(self.query.session, value.into())?
        };
        Ok(Operand::Case {
            branches: self.branches,
            otherwise: Some(Box::new(otherwise)),
        })
    }

    pub fn end(self) -> Result<Operand, QueryError> {
        self.query.engine.borrow_mut().ensure_not_armed("end")?;
        Ok(Operand::Case {
            branches: self.branches,
            otherwise: None,
        })
    }
}

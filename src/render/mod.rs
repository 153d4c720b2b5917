//! Statement assembly.
//!
//! Turns a finished session into statement text plus its parameter list:
//!
//! 1. join types of every tree of the root query are resolved (and frozen)
//! 2. aliases are handed out to from-roots and joined nodes in preorder
//! 3. clauses are written in grammar order, sub-queries spliced in place
//!
//! Aliases come from the engine-wide counter, so a sub-query rendered inside
//! its parent never reuses one of the parent's aliases. Aliases and join types
//! are stored on the nodes and survive repeated assembly.

mod writer;

use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use crate::query_expr::{ContainerId, Function, Literal, Operand, Restriction};
use crate::query_graph::{JoinResolver, NodeId};
use crate::session::errors::QueryError;
use crate::session::{Engine, SessionId, SessionKind};
use writer::StatementWriter;

/// One entry of the parameter list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    /// Text written into the statement (`?`, `?2`, `:p2` or `:name`)
    pub placeholder: String,
    pub value: Literal,
}

/// Rendered statement handed to the execution layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Param>,
}

impl Statement {
    /// Parameter values in placeholder order.
    pub fn values(&self) -> Vec<&Literal> {
        self.params.iter().map(|p| &p.value).collect()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Conversion of a recorded builder value into statement text.
trait ToHql {
    fn to_hql(&self, assembler: &mut Assembler<'_>) -> Result<(), QueryError>;
}

pub(crate) struct Assembler<'a> {
    engine: &'a mut Engine,
    out: StatementWriter,
}

impl<'a> Assembler<'a> {
    pub(crate) fn assemble(engine: &'a mut Engine, session: SessionId) -> Result<Statement, QueryError> {
        let kind = engine.session(session).kind;
        if kind == SessionKind::Subquery {
            return Err(QueryError::SubqueryBuild);
        }
        engine.ensure_not_armed("build")?;
        if !engine.queue.is_empty() {
            warn!(
                "assembling with {} unconsumed navigation(s): {:?}",
                engine.queue.len(),
                engine.display_paths(engine.queue.entries())
            );
        }
        if kind == SessionKind::Update && engine.session(session).assignments.is_empty() {
            return Err(QueryError::EmptyUpdate);
        }

        let trees: Vec<(NodeId, bool)> = engine
            .sessions
            .iter()
            .flat_map(|s| s.roots.iter().map(move |root| (*root, s.kind.is_bulk())))
            .collect();
        let mut resolver = JoinResolver::new(&mut engine.graph, engine.config.join_elision);
        for (root, bulk) in trees {
            resolver.resolve_tree(root, bulk);
        }

        let mut assembler = Assembler {
            out: StatementWriter::new(engine.config.param_style),
            engine,
        };
        assembler.write_session(session)?;
        let statement = assembler.out.finish();
        debug!(
            "assembled statement: {} ({} params)",
            statement.text,
            statement.params.len()
        );
        Ok(statement)
    }

    fn write_session(&mut self, session: SessionId) -> Result<(), QueryError> {
        let state = self.engine.session(session).clone();
        let first_root = match state.roots.first() {
            Some(root) => *root,
            None => return Err(QueryError::MissingFrom),
        };
        self.assign_aliases(&state.roots);

        match state.kind {
            SessionKind::Select | SessionKind::Subquery => {
                if !state.projections.is_empty() {
                    self.out.push("select ");
                    if state.distinct {
                        self.out.push("distinct ");
                    }
                    self.write_list(&state.projections)?;
                    self.out.push(" ");
                } else if state.kind == SessionKind::Subquery || state.distinct {
                    self.out.push("select ");
                    if state.distinct {
                        self.out.push("distinct ");
                    }
                    let alias = self.node_path(first_root);
                    self.out.push(&alias);
                    self.out.push(" ");
                }

                self.out.push("from ");
                for (i, root) in state.roots.iter().enumerate() {
                    if i > 0 {
                        self.out.push(", ");
                    }
                    let (entity, alias) = self.root_declaration(*root);
                    self.out.push(&entity);
                    self.out.push(" ");
                    self.out.push(&alias);
                    self.write_joins(*root)?;
                }

                self.write_clause(" where ", state.where_clause)?;
                if !state.group_by.is_empty() {
                    self.out.push(" group by ");
                    self.write_list(&state.group_by)?;
                }
                self.write_clause(" having ", state.having_clause)?;
                if !state.order_by.is_empty() {
                    self.out.push(" order by ");
                    for (i, (operand, order)) in state.order_by.iter().enumerate() {
                        if i > 0 {
                            self.out.push(", ");
                        }
                        operand.to_hql(self)?;
                        self.out.push(" ");
                        self.out.push(order.keyword());
                    }
                }
            }
            SessionKind::Update => {
                let (entity, _) = self.root_declaration(first_root);
                self.out.push("update ");
                self.out.push(&entity);
                self.out.push(" set ");
                for (i, (target, value)) in state.assignments.iter().enumerate() {
                    if i > 0 {
                        self.out.push(", ");
                    }
                    let path = self.node_path(*target);
                    self.out.push(&path);
                    self.out.push(" = ");
                    value.to_hql(self)?;
                }
                self.write_clause(" where ", state.where_clause)?;
            }
            SessionKind::Delete => {
                let (entity, _) = self.root_declaration(first_root);
                self.out.push("delete from ");
                self.out.push(&entity);
                self.write_clause(" where ", state.where_clause)?;
            }
        }
        Ok(())
    }

    /// Gives an alias to every from-root and joined node that lacks one.
    fn assign_aliases(&mut self, roots: &[NodeId]) {
        for id in self.engine.graph.preorder(roots) {
            if self.is_aliased_position(id) {
                self.ensure_alias(id);
            }
        }
    }

    fn is_aliased_position(&self, id: NodeId) -> bool {
        let node = self.engine.graph.node(id);
        node.parent.is_none() || self.join_keyword(id).is_some()
    }

    fn ensure_alias(&mut self, id: NodeId) -> String {
        if let Some(alias) = &self.engine.graph.node(id).alias {
            return alias.clone();
        }
        let resolved_type = self.engine.graph.node(id).resolved_type.clone();
        let alias = self.engine.aliases.next_alias(&resolved_type);
        debug!(
            "alias {} assigned to {}",
            alias,
            self.engine.graph.display_path(id)
        );
        self.engine.graph.node_mut(id).alias = Some(alias.clone());
        alias
    }

    /// Join keyword of a joined node, `None` when the node is addressed by path.
    fn join_keyword(&self, id: NodeId) -> Option<&'static str> {
        let node = self.engine.graph.node(id);
        if !node.kind.is_joinable() {
            return None;
        }
        node.resolved_join.and_then(|jt| jt.keyword())
    }

    fn root_declaration(&mut self, root: NodeId) -> (String, String) {
        let alias = self.ensure_alias(root);
        (self.engine.graph.node(root).property_name.clone(), alias)
    }

    /// Alias of an aliased node, otherwise the parent's path plus the property name.
    fn node_path(&mut self, id: NodeId) -> String {
        if self.is_aliased_position(id) {
            return self.ensure_alias(id);
        }
        let (parent, name) = {
            let node = self.engine.graph.node(id);
            (node.parent, node.property_name.clone())
        };
        match parent {
            Some(parent) => {
                let prefix = self.node_path(parent);
                if prefix.is_empty() {
                    name
                } else {
                    format!("{}.{}", prefix, name)
                }
            }
            None => name,
        }
    }

    fn write_joins(&mut self, parent: NodeId) -> Result<(), QueryError> {
        let children = self.engine.graph.node(parent).children.clone();
        for child in children {
            if let Some(keyword) = self.join_keyword(child) {
                let parent_path = self.node_path(parent);
                let name = self.engine.graph.node(child).property_name.clone();
                let alias = self.ensure_alias(child);
                self.out
                    .push(&format!(" {} {}.{} {}", keyword, parent_path, name, alias));
                if let Some(with) = self.engine.with_clauses.get(&child).copied() {
                    self.write_clause(" with ", with)?;
                }
            }
            self.write_joins(child)?;
        }
        Ok(())
    }

    fn write_list(&mut self, operands: &[Operand]) -> Result<(), QueryError> {
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                self.out.push(", ");
            }
            operand.to_hql(self)?;
        }
        Ok(())
    }

    /// Writes `keyword` and the container, or nothing if it holds no restriction.
    fn write_clause(&mut self, keyword: &str, container: ContainerId) -> Result<(), QueryError> {
        if self.is_blank(container) {
            return Ok(());
        }
        self.out.push(keyword);
        self.write_container(container)
    }

    fn is_blank(&self, container: ContainerId) -> bool {
        self.engine.container(container).items.iter().all(|(_, r)| match r {
            Restriction::Group(group) => self.is_blank(*group),
            _ => false,
        })
    }

    fn write_container(&mut self, container: ContainerId) -> Result<(), QueryError> {
        let items = self.engine.container(container).items.clone();
        let mut first = true;
        for (connective, restriction) in &items {
            if let Restriction::Group(group) = restriction {
                if self.is_blank(*group) {
                    continue;
                }
            }
            if !first {
                self.out.push(" ");
                self.out.push(connective.keyword());
                self.out.push(" ");
            }
            restriction.to_hql(self)?;
            first = false;
        }
        Ok(())
    }

    fn write_subquery(&mut self, subquery: SessionId) -> Result<(), QueryError> {
        self.out.push("(");
        self.write_session(subquery)?;
        self.out.push(")");
        Ok(())
    }
}

impl ToHql for Operand {
    fn to_hql(&self, assembler: &mut Assembler<'_>) -> Result<(), QueryError> {
        match self {
            Operand::Literal(value) => assembler.out.push_literal(value),
            Operand::NamedParam(name) => {
                let value = assembler
                    .engine
                    .named_params
                    .get(name)
                    .cloned()
                    .unwrap_or(Literal::Null);
                assembler.out.push_named(name, &value);
            }
            Operand::Reference { node, .. } => {
                let path = assembler.node_path(*node);
                assembler.out.push(&path);
            }
            Operand::Subquery { session, .. } => assembler.write_subquery(*session)?,
            Operand::Function { function, arg } => {
                assembler.out.push(function.name());
                assembler.out.push("(");
                if *function == Function::CountDistinct {
                    assembler.out.push("distinct ");
                }
                arg.to_hql(assembler)?;
                assembler.out.push(")");
            }
            Operand::Arithmetic { op, left, right } => {
                write_arithmetic_side(left, assembler)?;
                assembler.out.push(&format!(" {} ", op.symbol()));
                write_arithmetic_side(right, assembler)?;
            }
            Operand::Concat(items) => write_call("concat", items, assembler)?,
            Operand::Coalesce(items) => write_call("coalesce", items, assembler)?,
            Operand::Case {
                branches,
                otherwise,
            } => {
                assembler.out.push("case");
                for branch in branches {
                    assembler.out.push(" when ");
                    assembler.write_container(branch.condition)?;
                    assembler.out.push(" then ");
                    branch.result.to_hql(assembler)?;
                }
                if let Some(otherwise) = otherwise {
                    assembler.out.push(" else ");
                    otherwise.to_hql(assembler)?;
                }
                assembler.out.push(" end");
            }
        }
        Ok(())
    }
}

/// Nested arithmetic keeps its own brackets; `a - (b - c)` must not flatten.
fn write_arithmetic_side(operand: &Operand, assembler: &mut Assembler<'_>) -> Result<(), QueryError> {
    if let Operand::Arithmetic { .. } = operand {
        assembler.out.push("(");
        operand.to_hql(assembler)?;
        assembler.out.push(")");
        return Ok(());
    }
    operand.to_hql(assembler)
}

fn write_call(name: &str, items: &[Operand], assembler: &mut Assembler<'_>) -> Result<(), QueryError> {
    assembler.out.push(name);
    assembler.out.push("(");
    assembler.write_list(items)?;
    assembler.out.push(")");
    Ok(())
}

impl ToHql for Restriction {
    fn to_hql(&self, assembler: &mut Assembler<'_>) -> Result<(), QueryError> {
        match self {
            Restriction::Compare { left, op, right } => {
                left.to_hql(assembler)?;
                assembler.out.push(&format!(" {} ", op.symbol()));
                right.to_hql(assembler)?;
            }
            Restriction::Between { value, low, high } => {
                value.to_hql(assembler)?;
                assembler.out.push(" between ");
                low.to_hql(assembler)?;
                assembler.out.push(" and ");
                high.to_hql(assembler)?;
            }
            Restriction::InList {
                value,
                items,
                negated,
            } => {
                value.to_hql(assembler)?;
                assembler
                    .out
                    .push(if *negated { " not in (" } else { " in (" });
                assembler.write_list(items)?;
                assembler.out.push(")");
            }
            Restriction::InSubquery {
                value,
                subquery,
                negated,
            } => {
                value.to_hql(assembler)?;
                assembler.out.push(if *negated { " not in " } else { " in " });
                assembler.write_subquery(*subquery)?;
            }
            Restriction::IsNull { value, negated } => {
                value.to_hql(assembler)?;
                assembler
                    .out
                    .push(if *negated { " is not null" } else { " is null" });
            }
            Restriction::IsEmpty { value, negated } => {
                value.to_hql(assembler)?;
                assembler
                    .out
                    .push(if *negated { " is not empty" } else { " is empty" });
            }
            Restriction::Exists { subquery, negated } => {
                assembler
                    .out
                    .push(if *negated { "not exists " } else { "exists " });
                assembler.write_subquery(*subquery)?;
            }
            Restriction::Group(group) => group.to_hql(assembler)?,
        }
        Ok(())
    }
}

impl ToHql for ContainerId {
    /// A consumed group is bracketed when it holds more than one restriction.
    fn to_hql(&self, assembler: &mut Assembler<'_>) -> Result<(), QueryError> {
        let bracket = assembler.engine.container(*self).needs_parentheses();
        if bracket {
            assembler.out.push("(");
        }
        assembler.write_container(*self)?;
        if bracket {
            assembler.out.push(")");
        }
        Ok(())
    }
}

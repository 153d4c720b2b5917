//! Text buffer plus parameter list for one statement.

use std::collections::HashSet;

use super::{Param, Statement};
use crate::config::ParamStyle;
use crate::query_expr::Literal;

pub(crate) struct StatementWriter {
    text: String,
    params: Vec<Param>,
    style: ParamStyle,
    anonymous: usize,
    named_emitted: HashSet<String>,
}

impl StatementWriter {
    pub(crate) fn new(style: ParamStyle) -> Self {
        Self {
            text: String::new(),
            params: Vec::new(),
            style,
            anonymous: 0,
            named_emitted: HashSet::new(),
        }
    }

    pub(crate) fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    /// Writes a literal as a placeholder. `null` is written inline.
    pub(crate) fn push_literal(&mut self, value: &Literal) {
        if *value == Literal::Null {
            self.text.push_str("null");
            return;
        }
        self.anonymous += 1;
        let placeholder = self.style.placeholder(self.anonymous);
        self.text.push_str(&placeholder);
        self.params.push(Param {
            placeholder,
            value: value.clone(),
        });
    }

    /// Writes `:name`; the value is listed once however often the name appears.
    pub(crate) fn push_named(&mut self, name: &str, value: &Literal) {
        let placeholder = format!(":{}", name);
        self.text.push_str(&placeholder);
        if self.named_emitted.insert(name.to_string()) {
            self.params.push(Param {
                placeholder,
                value: value.clone(),
            });
        }
    }

    pub(crate) fn finish(self) -> Statement {
        Statement {
            text: self.text,
            params: self.params,
        }
    }
}

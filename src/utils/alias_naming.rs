//! Alias naming for query nodes.
//!
//! Every alias rendered into a statement comes from here so that from-roots,
//! join targets and sub-query roots all follow one convention.
//!
//! ## Naming Convention
//! Format: `{decapitalised simple type name}_{counter}`
//! - The counter is shared by a root query and all of its sub-queries
//! - Qualified type names contribute only their last segment
//!
//! Examples:
//! - `("Person", 0)` → `"person_0"`
//! - `("com.acme.OrderLine", 3)` → `"orderLine_3"`

use super::identifiers::{decapitalize, simple_name};

/// Generate the alias for a node of `type_name` with sequence `counter`.
///
/// # Examples
/// ```
/// use proxyql::utils::alias_naming::generate_alias;
///
/// assert_eq!(generate_alias("Person", 0), "person_0");
/// assert_eq!(generate_alias("acme::OrderLine", 7), "orderLine_7");
/// ```
pub fn generate_alias(type_name: &str, counter: usize) -> String {
    let base = alias_base_name(type_name);
    format!("{}_{}", base, counter)
}

/// Alias prefix without the counter. Always starts lower-case so aliases never
/// clash with entity names in the from-clause.
pub fn alias_base_name(type_name: &str) -> String {
    let simple = simple_name(type_name);
    let base = decapitalize(simple);
    match base.chars().next() {
        Some(c) if c.is_uppercase() => base.to_lowercase(),
        Some(_) => base,
        None => "node".to_string(),
    }
}

/// Monotonic alias counter owned by a root query.
#[derive(Debug, Clone, Default)]
pub struct AliasGenerator {
    next: usize,
}

impl AliasGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next alias for `type_name`.
    pub fn next_alias(&mut self, type_name: &str) -> String {
        let alias = generate_alias(type_name, self.next);
        self.next += 1;
        alias
    }

    /// Number of aliases handed out so far
    pub fn issued(&self) -> usize {
        self.next
    }
}

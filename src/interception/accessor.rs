//! Accessor-name classification.
//!
//! Follows the bean convention: `getX` and `isX` read property `x`, `setX`
//! writes it. Any other name reads the property of exactly that name, which
//! lets callers intercept plain field-style accessors (`name()`).

use lazy_static::lazy_static;
use regex::Regex;

use crate::utils::identifiers::{decapitalize, is_identifier};

lazy_static! {
    static ref BEAN_ACCESSOR: Regex = Regex::new(r"^(get|is|set)([A-Z][A-Za-z0-9_]*)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorMode {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub property: String,
    pub mode: AccessorMode,
}

impl Accessor {
    /// Classifies an accessor name. Returns `None` when the name cannot denote
    /// a property at all.
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(captures) = BEAN_ACCESSOR.captures(name) {
            let mode = match &captures[1] {
                "set" => AccessorMode::Write,
                _ => AccessorMode::Read,
            };
            return Some(Accessor {
                property: decapitalize(&captures[2]),
                mode,
            });
        }
        if is_identifier(name) {
            return Some(Accessor {
                property: name.to_string(),
                mode: AccessorMode::Read,
            });
        }
        None
    }

    pub fn is_setter(&self) -> bool {
        self.mode == AccessorMode::Write
    }
}

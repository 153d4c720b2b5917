//! Identifier helpers shared by the mapping catalog and the accessor parser.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    /// Dotted type names are accepted for entities (`com.acme.Person`, `acme::Person`)
    static ref QUALIFIED_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*((\.|::)[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

/// True if `name` is a plain identifier (`age`, `first_name`, `URL`).
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// True if `name` is an identifier optionally qualified with `.` or `::` segments.
pub fn is_qualified_name(name: &str) -> bool {
    QUALIFIED_NAME.is_match(name)
}

/// Last segment of a possibly qualified type name.
///
/// # Examples
/// ```
/// use proxyql::utils::identifiers::simple_name;
///
/// assert_eq!(simple_name("com.acme.Person"), "Person");
/// assert_eq!(simple_name("acme::Person"), "Person");
/// assert_eq!(simple_name("Person"), "Person");
/// ```
pub fn simple_name(type_name: &str) -> &str {
    let after_dot = type_name.rsplit('.').next().unwrap_or(type_name);
    after_dot.rsplit("::").next().unwrap_or(after_dot)
}

/// Bean-style decapitalisation: the first character is lowered unless the
/// name starts with two upper-case characters, in which case it is kept.
///
/// # Examples
/// ```
/// use proxyql::utils::identifiers::decapitalize;
///
/// assert_eq!(decapitalize("Name"), "name");
/// assert_eq!(decapitalize("URL"), "URL");
/// assert_eq!(decapitalize("x"), "x");
/// assert_eq!(decapitalize(""), "");
/// ```
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return String::new(),
    };
    if let Some(second) = name.chars().nth(1) {
        if first.is_uppercase() && second.is_uppercase() {
            return name.to_string();
        }
    }
    first.to_lowercase().chain(chars).collect()
}

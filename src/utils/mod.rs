pub mod alias_naming;
pub mod identifiers;

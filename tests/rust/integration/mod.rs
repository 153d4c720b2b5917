//! Integration tests - Build complete statements through the public API
//!
//! Every test drives a `QueryFactory` over the shared Person mapping and checks
//! the rendered text, the parameter list or the error raised on misuse.

mod fixtures;

mod bulk_tests;
mod join_tests;
mod scope_tests;
mod statement_tests;

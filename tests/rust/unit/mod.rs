//! Unit tests - Configuration and mapping documents loaded from disk

mod config_loading_tests;

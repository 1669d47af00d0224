//! STACKER — stack-seeded NFL DFS lineup optimizer
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod optimizer;
pub mod storage;

//! Integration tests for the STACKER optimizer.

mod fixtures;
mod pipeline;

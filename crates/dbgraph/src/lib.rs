//! dbgraph - schema dependency analysis from the command line.
//!
//! This crate provides the `dbgraph` binary. The library half exposes the
//! argument parser and the text renderers so they can be exercised in tests.

#![forbid(unsafe_code)]

pub mod cli;
pub mod output;

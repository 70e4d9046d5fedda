//! Core compilation logic for docbinder.
//!
//! This crate ties together tree traversal, ordered document fetching, and
//! HTML assembly into the end-to-end `compile_collection` workflow.

pub mod assembler;
pub mod fetcher;
pub mod pipeline;
pub mod traverse;

#[cfg(test)]
mod testing;

pub use assembler::{AssembleOptions, AssembledDocument, DegradedDocument, anchor_for, assemble};
pub use fetcher::{FetchOptions, FetchOutcome, SkippedDocument, resolve};
pub use pipeline::{CompileOptions, CompileReport, ProgressReporter, SilentProgress, compile_collection};
pub use traverse::{FlatNode, flatten, flatten_with_limits};

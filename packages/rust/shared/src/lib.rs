//! Shared types, error model, and configuration for docbinder.
//!
//! This crate is the foundation depended on by all other docbinder crates.
//! It provides:
//! - [`DocbinderError`]: the unified error type
//! - Domain types ([`DocumentNode`], [`DocumentRecord`], [`CollectionMetadata`])
//! - Configuration ([`AppConfig`], [`CompileConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, CompileConfig, CompileSection, config_dir, config_file_path,
    load_config, load_config_from, resolve_api_key, validate_api_url,
};
pub use error::{DocbinderError, Result};
pub use types::{
    CollectionMetadata, CompilationResult, DocumentContent, DocumentNode, DocumentRecord,
};

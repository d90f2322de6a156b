//! Shared types, error model, and configuration for SIL Inspector.
//!
//! This crate is the foundation depended on by all other SIL Inspector crates.
//! It provides:
//! - The unified error type, [`SilInspectorError`]
//! - Domain types ([`CompileRequest`], [`CommandResult`], [`ResultBundle`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExecutionConfig, ExecutionMode, PipelineConfig, ServerConfig, ToolchainConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, SilInspectorError};
pub use types::{
    CommandResult, CompileOptions, CompileRequest, CompileResponse, RequestId, ResultBundle,
};

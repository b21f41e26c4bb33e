//! Shared types, error model, configuration and HTTP client for BrochureKit.
//!
//! This crate is the foundation depended on by all other BrochureKit crates.
//! It provides:
//! - [`BrochureKitError`]: the unified error type
//! - Pipeline records ([`CuratedLink`], [`LinkSelection`], [`ExtractedPage`])
//! - Configuration ([`AppConfig`], per-stage runtime configs, config loading)
//! - [`HttpClient`]: the single page-fetching client shared by the stages

pub mod config;
pub mod error;
pub mod http;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ExtractConfig, HttpConfig, LlmConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{BrochureKitError, Result};
pub use http::HttpClient;
pub use types::{CuratedLink, ExtractedPage, LinkSelection, UNKNOWN_PAGE_TYPE};

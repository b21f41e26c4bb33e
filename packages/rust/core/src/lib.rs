//! Core pipeline orchestration and domain logic for BrochureKit.
//!
//! This crate ties together link discovery, model-driven link curation and
//! page extraction into the three pipeline stages, persisting each stage's
//! artifact so the next can run on its own.

pub mod artifacts;
pub mod curator;
pub mod llm;
pub mod pipeline;

pub use brochurekit_crawler::ExtractLimits;

pub use artifacts::{OutputLayout, PageWriter, page_filename, url_slug};
pub use curator::{clean_candidate_urls, curate_links, same_site_ignoring_www};
pub use llm::{ChatMessage, CompletionClient, OpenAiClient};
pub use pipeline::{
    CurateResult, DiscoverResult, ExtractResult, ProgressReporter, RunOptions, RunResult,
    SilentProgress, run_curate, run_discover, run_extract, run_pipeline,
};

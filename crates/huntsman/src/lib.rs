//! Job application pipeline: ingest postings, rank them against
//! keyword templates, and generate application documents for the ones
//! that qualify.
//!
//! The pipeline is a status-driven state machine over a SQLite store.
//! Stages are short-lived batch runs that claim records atomically,
//! so any number of concurrent runs is safe; see the `stage` module
//! for the claim/commit discipline and `pipeline::Pipeline` for the
//! operator-facing surface.

pub mod config;
pub mod db;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod scoring;
pub mod stage;
pub mod translate;

pub use config::Settings;
pub use error::{HuntsmanError, Result};
pub use pipeline::{Pipeline, ReprocessStage, RunOptions};

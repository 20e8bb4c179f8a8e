pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::storage::LocalStorage;
pub use crate::config::EnrichConfig;
#[cfg(feature = "cli")]
pub use crate::config::{CliArgs, Command};

pub use crate::core::{etl::StageRunner, pipeline::EnrichmentPipeline};
pub use crate::utils::error::{EnrichError, ErrorSeverity, Result};

pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, ApiSettings};
pub use core::engine::{run_export, validate_request, ExportEngine};
pub use core::pipeline::ExportPipeline;
pub use utils::error::{ExportError, Result};

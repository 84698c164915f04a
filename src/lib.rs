pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::toml_config::ExperimentConfig;

pub use core::etl::EtlEngine;
pub use utils::error::{EvalError, Result};

pub mod adapters;
pub mod app;
pub mod auth;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{http::PerplexityClient, storage::LocalStorage};
pub use app::pipelines::{BatchPipeline, DiffPipeline, SearchPipeline, WorkflowOptions};
pub use auth::{AccessGate, Session};
pub use config::TomlConfig;
pub use core::engine::WorkflowEngine;
pub use utils::error::{IntelError, Result};

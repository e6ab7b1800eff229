use crate::adapters::spreadsheet::OutputFormat;
use crate::config::toml_config::TomlConfig;
use crate::core::prompt::parse_extra_fields;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "company-intel", version)]
#[command(about = "Extract pharma/biotech company profiles from an LLM into spreadsheets")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Extra fields to request, comma separated (e.g. "Drug Pipeline, Therapeutic Area")
    #[arg(long, global = true)]
    pub extra_fields: Option<String>,

    /// Directory the spreadsheet is written to
    #[arg(long, global = true)]
    pub output_dir: Option<String>,

    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Completion endpoint override
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Skip TLS certificate verification for the completion endpoint
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Delay between consecutive API calls in batch extraction
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    /// Access password (falls back to COMPANY_INTEL_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Look up every company in the COMPANY column of a spreadsheet
    Extract {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Search the global market for companies matching a description
    Search {
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Search, then keep only companies missing from an existing list
    Diff {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        filter: Option<String>,
    },
}

impl CliConfig {
    /// 將命令列參數覆蓋到檔案配置上
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(extra) = &self.extra_fields {
            config.fields.extra = parse_extra_fields(extra);
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(endpoint) = &self.endpoint {
            config.api.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.api.model = model.clone();
        }
        if self.insecure {
            config.api.accept_invalid_certs = true;
        }
        if let Some(delay) = self.delay_ms {
            config.workflow.request_delay_ms = delay;
        }
        match &self.command {
            Command::Search {
                filter: Some(filter),
            }
            | Command::Diff {
                filter: Some(filter),
                ..
            } => {
                config.workflow.market_filter = filter.clone();
            }
            _ => {}
        }
    }
}

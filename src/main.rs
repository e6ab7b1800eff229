use anyhow::Context;
use clap::Parser;
use company_intel::core::Pipeline;
use company_intel::domain::model::RunReport;
use company_intel::utils::error::ErrorSeverity;
use company_intel::utils::{logger, validation::Validate};
use company_intel::{
    AccessGate, BatchPipeline, CliConfig, Command, DiffPipeline, IntelError, LocalStorage,
    PerplexityClient, SearchPipeline, Session, TomlConfig, WorkflowEngine, WorkflowOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting company-intel");

    // 載入配置：檔案 -> 環境變數 -> 命令列覆蓋
    let mut config = match &cli.config {
        Some(path) => TomlConfig::from_file(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        None => TomlConfig::default(),
    };
    config.apply_env_fallbacks();
    cli.apply_overrides(&mut config);

    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", redacted(&config));
    }

    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    // 密碼檢查，取得本次執行的 session
    let gate = AccessGate::new(config.access.password.clone());
    let session = match gate.authenticate(cli.password.as_deref()) {
        Ok(session) => session,
        Err(e) => exit_with(&e),
    };

    let client = match PerplexityClient::new(&config.api) {
        Ok(client) => client,
        Err(e) => exit_with(&e),
    };
    let storage = LocalStorage::new(config.output.directory.clone());
    let options = WorkflowOptions::from_config(&config);
    let market_filter = config.workflow.market_filter.clone();

    let outcome = match cli.command {
        Command::Extract { input } => {
            run(
                BatchPipeline::new(storage, client, options, input),
                &session,
            )
            .await
        }
        Command::Search { .. } => {
            run(
                SearchPipeline::new(storage, client, options, market_filter),
                &session,
            )
            .await
        }
        Command::Diff { input, .. } => {
            run(
                DiffPipeline::new(storage, client, options, input, market_filter),
                &session,
            )
            .await
        }
    };

    match outcome {
        Ok(report) => print_report(&report),
        Err(e) => exit_with(&e),
    }

    Ok(())
}

async fn run<P: Pipeline>(pipeline: P, session: &Session) -> company_intel::Result<RunReport> {
    WorkflowEngine::new(pipeline, session).run().await
}

fn print_report(report: &RunReport) {
    for skipped in &report.skipped {
        eprintln!("⚠️ Skipping {}: {}", skipped.company, skipped.reason);
    }

    match &report.output_path {
        Some(path) => {
            println!(
                "✅ {} completed: {} rows",
                report.workflow, report.rows_written
            );
            println!("📁 Output saved to: {}", path);
        }
        None => println!("No new companies found."),
    }
}

fn exit_with(e: &IntelError) -> ! {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn redacted(config: &TomlConfig) -> TomlConfig {
    let mut copy = config.clone();
    if !copy.api.api_key.is_empty() {
        copy.api.api_key = "***".to_string();
    }
    if copy.access.password.is_some() {
        copy.access.password = Some("***".to_string());
    }
    copy
}

//! shopinsight - ask natural-language questions about e-commerce metrics.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use shopinsight::cli::{Cli, Command};
use shopinsight::config::Config;
use shopinsight::db::seed::{self, SeedOutcome};
use shopinsight::db::{self, Database, DatabaseClient};
use shopinsight::llm::{client_from_config, LlmClient};
use shopinsight::logging;
use shopinsight::pipeline::{Answer, Pipeline, PipelineSettings};
use shopinsight::server::{self, AppState};
use shopinsight::stats;

#[tokio::main]
async fn main() -> ExitCode {
    // A .env file is optional.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.logging.file.as_deref());

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    info!("Database: {}", config.database.display_string());
    let database = db::connect(&config.database)
        .await
        .context("Failed to connect to the metrics store")?;

    match cli.command {
        Command::Seed => {
            report_seed(seed::prepare(database.seed_target()).await?);
            database.into_client().close().await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Stats => {
            let client = database.into_client();
            let stats = stats::collect(client.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            client.close().await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve {
            seed: load_sample, ..
        } => {
            if load_sample {
                report_seed(seed::prepare(database.seed_target()).await?);
            }
            let addr = config.server.socket_addr()?;
            let (state, _) = build_state(&config, database).await;
            server::serve(addr, state).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask { json, .. } => {
            let question = cli.command.question().unwrap_or_default();
            let (state, db) = build_state(&config, database).await;
            let answer = state.pipeline.ask(&question).await;
            print_answer(&answer, json)?;
            db.close().await?;
            Ok(if answer.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Wires the pipeline and runs the startup health probe.
async fn build_state(config: &Config, database: Database) -> (AppState, Arc<dyn DatabaseClient>) {
    let db = database.into_client();
    let llm: Arc<dyn LlmClient> = client_from_config(&config.llm);

    match db.ping().await {
        Ok(()) => info!(backend = %db.backend(), "Metrics store reachable"),
        Err(e) => warn!("Metrics store ping failed: {e}"),
    }
    if !llm.is_configured() {
        warn!("No language model configured; questions will fail at generation");
    }

    let pipeline = Pipeline::new(
        &config.catalog(),
        Arc::clone(&db),
        Arc::clone(&llm),
        PipelineSettings::from_config(config),
    );
    let state = AppState {
        pipeline,
        db: Arc::clone(&db),
        llm_configured: llm.is_configured(),
    };
    (state, db)
}

fn report_seed(outcome: SeedOutcome) {
    match outcome {
        SeedOutcome::Seeded { rows } => println!("Loaded {rows} sample rows"),
        SeedOutcome::AlreadyPopulated => println!("Tables already contain data; nothing loaded"),
    }
}

fn print_answer(answer: &Answer, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(answer)?);
        return Ok(());
    }

    match answer.error() {
        None => {
            if let Some(sql) = &answer.sql {
                println!("SQL: {sql}\n");
            }
            println!("{}", answer.summary.as_deref().unwrap_or_default());
            println!("\n{}", serde_json::to_string_pretty(&answer.rows)?);
        }
        Some(e) => {
            if let Some(sql) = &answer.sql {
                eprintln!("SQL: {sql}");
            }
            eprintln!("Failed while {}: {e}", e.stage());
        }
    }
    Ok(())
}

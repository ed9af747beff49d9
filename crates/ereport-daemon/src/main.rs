mod commands;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use commands::Command;
use ereport_core::config::ReporterConfig;
use ereport_delivery::{GrafanaClient, SmtpMailer};
use ereport_scheduler::{ReportEngine, SqliteStore};

/// Emails scheduled Excel reports built from Grafana panel queries.
#[derive(Parser, Debug)]
#[command(name = "ereport-daemon")]
#[command(version)]
struct Args {
    /// Config file path. Defaults to `ereport.toml` in the working directory.
    #[arg(short, long, env = "EREPORT_CONFIG")]
    config: Option<String>,

    /// Process overdue schedules once and exit.
    #[arg(long)]
    once: bool,

    /// Run one command and exit instead of starting the scheduler.
    #[command(subcommand)]
    command: Option<Command>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ereport_daemon=info,ereport_scheduler=info".into()),
        )
        .init();

    let config = ReporterConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        ReporterConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    let store = Arc::new(SqliteStore::new(db)?);

    let command = match args.command {
        Some(Command::Schedule { command }) => {
            return print(commands::schedule(command, &store, &chrono::Local::now()));
        }
        Some(Command::Group { command }) => return print(commands::group(command, &store)),
        Some(Command::Variable { command }) => return print(commands::variable(command, &store)),
        other => other,
    };

    std::fs::create_dir_all(&config.scheduler.data_dir)?;
    info!(
        data_dir = %config.scheduler.data_dir,
        template = %config.scheduler.template_path().display(),
        "report directory ready"
    );

    let queries = Arc::new(GrafanaClient::new(&config.grafana));
    let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

    let engine = ReportEngine::new(
        store,
        queries,
        mailer,
        config.scheduler.clone(),
        config.grafana.datasource_id,
    );

    match command {
        Some(Command::Export(export)) => return print(commands::export(&export, &engine).await),
        Some(Command::TestEmail { schedule_id, to }) => {
            return print(commands::test_email(&schedule_id, to.as_deref(), &engine).await);
        }
        _ => {}
    }

    if args.once {
        let summary = engine.tick().await;
        info!(
            overdue = summary.overdue,
            completed = summary.completed,
            failed = summary.failed,
            "single pass finished"
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(engine.run(shutdown_rx));
    info!(tick_secs = config.scheduler.tick_secs, "report scheduler started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    handle.await?;

    Ok(())
}

fn print(output: anyhow::Result<String>) -> anyhow::Result<()> {
    println!("{}", output?);
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

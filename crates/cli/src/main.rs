use anyhow::{Context, Result};
use cadop_core::config::{self, AppConfig};
use cadop_core::engine;
use cadop_core::format::Envelope;
use clap::{Parser, Subcommand};
use cli::{output, server, watch};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use storage::{CsvOptions, DatasetStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cli::init_tracing();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command {
        Commands::Serve { bind, watch } => run_serve(cfg, bind, watch).await,
        Commands::Search {
            query,
            fields,
            compact,
        } => run_search(&cfg, &query, &fields, compact),
        Commands::Check { json } => run_check(&cfg, json),
    }
}

#[derive(Parser)]
#[command(name = "cadop-search")]
#[command(about = "Relevance search over the ANS operator registry", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the search API over HTTP
    Serve {
        /// Address to bind, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
        /// Reload the dataset when the file changes
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Run one query against the dataset and print the JSON response
    Search {
        /// Search term (at least 2 characters)
        query: String,
        /// Restrict output fields (comma-separated), e.g. Registro_ANS,Razao_Social,relevance
        #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = Vec::<String>::new())]
        fields: Vec<String>,
        /// Print on a single line
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
    /// Load the dataset and report its status
    Check {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_store(cfg: &AppConfig) -> DatasetStore {
    let options = CsvOptions {
        delimiter: cfg.dataset.delimiter_byte(),
    };
    DatasetStore::open(&cfg.dataset.path, options)
}

async fn run_serve(cfg: AppConfig, bind: Option<String>, watch_file: bool) -> Result<ExitCode> {
    let store = Arc::new(open_store(&cfg));
    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());

    // Dropping the watcher stops it, so hold it until the server exits.
    let _watcher = if watch_file || cfg.watch.enabled {
        let poll = Duration::from_secs(cfg.watch.poll_interval_secs.max(1));
        let settle = Duration::from_millis(cfg.watch.settle_millis);
        Some(
            watch::watch_dataset(Arc::clone(&store), poll, settle)
                .context("start dataset watcher")?,
        )
    } else {
        None
    };

    server::serve(store, &bind, cfg.server.cors).await?;
    Ok(ExitCode::SUCCESS)
}

fn run_search(cfg: &AppConfig, query: &str, fields: &[String], compact: bool) -> Result<ExitCode> {
    let store = open_store(cfg);
    let snapshot = store.snapshot();
    info!(
        "Searching for '{}' in {} records",
        query,
        snapshot.dataset().len()
    );
    let outcome = engine::search(snapshot.dataset(), query);
    let envelope = output::restrict_envelope(Envelope::from_outcome(&outcome), fields);
    println!("{}", output::render(&envelope, compact)?);

    Ok(match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_client_error() => ExitCode::from(2),
        Err(_) => ExitCode::FAILURE,
    })
}

fn run_check(cfg: &AppConfig, json: bool) -> Result<ExitCode> {
    let store = open_store(cfg);
    let report = store.snapshot().status();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}: {} ({} records)",
            report.source, report.csv_status, report.records_count
        );
        if let Some(fp) = &report.fingerprint {
            println!("fingerprint: {}", fp);
        }
    }
    Ok(if report.records_count > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

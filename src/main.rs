//! CLI entry point for subconv.

use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use subconv_core::user_agent::resolve_user_agent;
use subconv_core::{
    CacheOptions, ConversionArtifact, ConversionService, DatabaseOptions, ServiceOptions, Source,
};
use tracing::{debug, info};

mod app_config;
mod cli;

use app_config::{FileConfig, VerbositySetting};
use cli::{Args, Command, ConvertArgs};

/// State directory used when neither `--db` nor `db_path` is set.
const DEFAULT_STATE_DIR: &str = ".subconv";
const DEFAULT_DB_FILE: &str = "subconv.db";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = app_config::load_config(args.config.as_deref())?;

    init_tracing(default_level(&args, loaded.config.verbosity));
    debug!(
        ?args,
        config = ?loaded.path,
        from_file = loaded.loaded_from_file,
        "CLI arguments parsed"
    );

    let options = service_options(&args, &loaded.config)?;
    let service = ConversionService::open(&options)
        .await
        .context("Failed to open artifact store")?;

    let result = run(&service, args.command).await;

    // Serving schedules detached refreshes; let them land before exiting.
    service.wait_for_refreshes().await;
    result
}

/// Priority: `RUST_LOG` > quiet flag > verbose flag > config verbosity > info.
fn default_level(args: &Args, configured: Option<VerbositySetting>) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => configured.map_or("info", VerbositySetting::filter),
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

/// Merges CLI flags over file config over built-in defaults.
fn service_options(args: &Args, file: &FileConfig) -> Result<ServiceOptions> {
    let db_path = args
        .db
        .clone()
        .or_else(|| file.db_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR).join(DEFAULT_DB_FILE));
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }

    let mut database = DatabaseOptions::default();
    if let Some(max_connections) = file.db_max_connections {
        database.max_connections = max_connections;
    }
    if let Some(busy_timeout_ms) = file.db_busy_timeout_ms {
        database.busy_timeout_ms = busy_timeout_ms;
    }

    let mut cache = CacheOptions::default();
    if let Some(secs) = args.timeout.or(file.fetch_timeout_secs) {
        cache.fetch_timeout = Duration::from_secs(secs);
    }
    if let Some(concurrency) = file.refresh_concurrency {
        cache.refresh_concurrency = concurrency;
    }

    Ok(ServiceOptions {
        db_path: Some(db_path),
        database,
        cache,
        user_agent: resolve_user_agent(file.user_agent.as_deref()),
    })
}

async fn run(service: &ConversionService, command: Command) -> Result<()> {
    match command {
        Command::Convert(convert) => {
            let print = convert.print;
            let artifact = service.convert(read_source(convert)?).await?;
            emit_artifact(&artifact, print)
        }
        Command::ToStructured(convert) => {
            let print = convert.print;
            let artifact = service.to_structured(read_source(convert)?).await?;
            emit_artifact(&artifact, print)
        }
        Command::ServeFeed { id } => match service.serve_feed(&id).await? {
            Some(payload) => emit(&payload),
            None => bail!("No feed artifact with id '{id}'"),
        },
        Command::ServeDocument { id } => match service.serve_document(&id).await? {
            Some(payload) => emit(&payload),
            None => bail!("No document artifact with id '{id}'"),
        },
        Command::List => {
            let artifacts = service.list_artifacts().await?;
            let mut stdout = io::stdout().lock();
            for artifact in &artifacts {
                writeln!(
                    stdout,
                    "{}\t{}\t{}\t{}\t{}",
                    artifact.id,
                    artifact.kind.as_str(),
                    artifact.proxy_count,
                    artifact.updated_at.to_rfc3339(),
                    artifact.source
                )?;
            }
            info!(count = artifacts.len(), "Listed artifacts");
            Ok(())
        }
        Command::Prune => {
            let removed = service.prune_orphans().await?;
            let mut stdout = io::stdout().lock();
            for id in &removed {
                writeln!(stdout, "{id}")?;
            }
            Ok(())
        }
    }
}

/// Resolves the source from flags, falling back to piped stdin.
fn read_source(args: ConvertArgs) -> Result<Source> {
    if let Some(url) = args.url {
        return Ok(Source::Url(url));
    }
    if let Some(text) = args.text {
        return Ok(Source::Text(text));
    }
    if let Some(path) = args.file {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read source file '{}'", path.display()))?;
        return Ok(Source::Text(text));
    }
    if io::stdin().is_terminal() {
        bail!("No input provided. Pass --url, --text or --file, or pipe content via stdin.");
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(Source::Text(buffer))
}

fn emit_artifact(artifact: &ConversionArtifact, print_payload: bool) -> Result<()> {
    if print_payload {
        emit(&artifact.payload)
    } else {
        emit(artifact.id.as_str())
    }
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

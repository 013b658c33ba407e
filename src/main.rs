//! Entry point for the lexileaf terminal reader.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Import the article into the record store and open a reading session.
//! - Hand the session to the terminal front end.

mod app;
mod article_loader;
mod cancellation;
mod narrator;

use crate::app::run_app;
use crate::article_loader::load_article;
use crate::narrator::PacedNarrator;
use anyhow::{Context, Result, anyhow};
use lexileaf_core::config::load_config;
use lexileaf_core::store::FileStore;
use lexileaf_core::suggest::HttpSuggestionService;
use lexileaf_core::{ReadingSession, SessionSettings, import_article};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const CONFIG_PATH: &str = "conf/config.toml";

struct Args {
    path: PathBuf,
    language: Option<String>,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let config_path = PathBuf::from(CONFIG_PATH);
    let config = load_config(&config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    let language = args.language.unwrap_or_else(|| config.language.clone());
    info!(
        path = %args.path.display(),
        %language,
        level = %config.log_level,
        "Starting lexileaf"
    );

    let loaded = load_article(&args.path)?;
    let mut store = FileStore::open(Path::new(&config.data_dir))
        .with_context(|| format!("Failed to open data directory {}", config.data_dir))?;
    let article = import_article(&mut store, &loaded.title, &language, &loaded.text)
        .context("Failed to import article")?;
    info!(article = %article.id, last_page = article.last_page, "Article ready");

    let narrator = PacedNarrator::new(config.words_per_minute);
    let suggestions =
        HttpSuggestionService::new(&config.suggestion_endpoint, config.suggestion_timeout())
            .context("Failed to build the suggestion client")?;
    let (session, effects) = ReadingSession::open(
        store,
        narrator,
        &article.id,
        &config,
        SessionSettings::from(&config),
    )
    .context("Failed to open reading session")?;

    run_app(session, effects, suggestions, config, config_path)
        .context("Reader stopped unexpectedly")?;
    Ok(())
}

fn parse_args() -> Result<Args> {
    let usage = || anyhow!("Usage: lexileaf <article.txt|.html|.epub> [--lang CODE]");
    let mut path = None;
    let mut language = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--lang" | "-l" => language = Some(args.next().ok_or_else(usage)?),
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }

    let path = path.ok_or_else(usage)?;
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    Ok(Args { path, language })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shelf admin CLI.
//!
//! Reads and writes UI settings, default sort preferences, and raw metadata
//! records, either against the metadata API or, with `--offline`, against the
//! local filesystem store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use shelf_config_fs::FsMetadataGateway;
use shelf_metadata::MetadataStore;
use shelf_metadata_http::{HttpConfig, HttpMetadataGateway};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod client_prefs;
mod commands;

use client_prefs::ClientPrefs;
use commands::{Command, FilterCmd};

#[derive(Parser, Debug)]
#[command(author, version, about = "Shelf admin: UI settings, default sorts, metadata")]
struct Args {
    /// Metadata API root (e.g. http://localhost:3000/api)
    #[arg(long, env = "SHELF_API_URL")]
    api_url: Option<String>,
    /// Request timeout in seconds
    #[arg(long, env = "SHELF_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    /// Use the local filesystem store instead of the API
    #[arg(long)]
    offline: bool,
    /// Directory for the local store (defaults to the platform config dir)
    #[arg(long, env = "SHELF_STORE_DIR")]
    store_dir: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Command,
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(level),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))
}

fn open_local(dir: Option<&PathBuf>) -> Result<FsMetadataGateway> {
    let gw = match dir {
        Some(dir) => FsMetadataGateway::with_root(dir),
        None => FsMetadataGateway::new(),
    };
    gw.context("open local store")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    // Local store (best-effort unless the command needs it)
    let local = open_local(args.store_dir.as_ref()).map(Arc::new);
    let local_store = local.as_ref().ok().cloned().map(MetadataStore::from_shared);

    let prefs = match &local_store {
        Some(store) => client_prefs::load_or_init(store).await,
        None => ClientPrefs::default(),
    };

    let output = if let Command::Filter { action } = &args.cmd {
        let store = local_store.context("filter needs the local store")?;
        filter(action, &store, &prefs).await?
    } else if args.offline {
        let gw = local?;
        info!(root = %gw.root().display(), "using local store");
        commands::execute(&args.cmd, MetadataStore::from_shared(gw)).await?
    } else {
        let (url, timeout) = prefs.resolve(args.api_url.as_deref(), args.timeout_secs);
        debug!(%url, ?timeout, "using metadata api");
        let config = HttpConfig::new(&url)?.with_timeout(timeout);
        let gw = HttpMetadataGateway::new(config)?;
        commands::execute(&args.cmd, MetadataStore::new(gw)).await?
    };

    println!("{output}");
    Ok(())
}

async fn filter(
    action: &FilterCmd,
    store: &MetadataStore<FsMetadataGateway>,
    prefs: &ClientPrefs,
) -> Result<String> {
    match action {
        FilterCmd::Show => Ok(prefs.filter.clone().unwrap_or_default()),
        FilterCmd::Set { text } => {
            if !client_prefs::save_filter(store, Some(text.clone())).await {
                anyhow::bail!("failed to save filter");
            }
            Ok(text.clone())
        }
        FilterCmd::Clear => {
            if !client_prefs::save_filter(store, None).await {
                anyhow::bail!("failed to clear filter");
            }
            Ok(String::new())
        }
    }
}

//! CLI command implementations

pub mod error;

pub use error::CliError;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::catalog::{self, Catalog};
use crate::client::{ReqwestTransport, ShipStationClient};
use crate::config::Config;
use crate::output::MessageWriter;
use crate::shutdown::SharedShutdown;
use crate::state::SyncState;
use crate::streams::{all_streams, StreamDef};
use crate::sync::SyncRunner;

/// ShipStation extraction tap CLI
#[derive(Parser, Debug)]
#[command(name = "tap-shipstation")]
#[command(about = "Extract ShipStation data as singer-style JSON messages", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a sync, emitting SCHEMA/RECORD/STATE messages to stdout
    Sync(SyncArgs),

    /// Print a catalog of available streams to stdout
    Discover(DiscoverArgs),
}

/// Arguments for the sync command
#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Path to the JSON configuration file
    #[arg(long)]
    pub config: PathBuf,

    /// Path to the bookmark state file; created on first run, updated after
    /// every completed window
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Path to a catalog limiting which streams are extracted; all streams
    /// when omitted
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

/// Arguments for the discover command
#[derive(clap::Args, Debug)]
pub struct DiscoverArgs {
    /// Path to the JSON configuration file
    #[arg(long)]
    pub config: PathBuf,
}

impl SyncArgs {
    /// Run a sync over the selected streams
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<(), CliError> {
        let config = Config::from_file(&self.config)?;

        let streams: Vec<&'static StreamDef> = match &self.catalog {
            Some(path) => {
                let catalog = Catalog::from_file(path)?;
                catalog.selected_streams()
            }
            None => all_streams().iter().collect(),
        };
        info!(streams = streams.len(), "starting sync run");

        let state = match &self.state {
            Some(path) => SyncState::load_or_default(path)?,
            None => SyncState::new(),
        };

        let client = ShipStationClient::new(Arc::new(ReqwestTransport::new(&config)?));
        let mut runner = SyncRunner::new(client, config, state, MessageWriter::stdout())
            .with_shutdown(shutdown);
        if let Some(path) = &self.state {
            runner = runner.with_state_path(path.clone());
        }

        runner.sync(streams).await?;
        info!("sync run complete");
        Ok(())
    }
}

impl DiscoverArgs {
    /// Print the discovered catalog as pretty JSON
    pub async fn execute(&self) -> Result<(), CliError> {
        // Validates credentials and the default start timestamp up front.
        Config::from_file(&self.config)?;

        let catalog = catalog::discover()?;
        let json = serde_json::to_string_pretty(&catalog)
            .map_err(|e| CliError::InvalidArgument(format!("failed to render catalog: {e}")))?;
        println!("{json}");
        Ok(())
    }
}

//! `ob` command line
//!
//! ## Commands
//!
//! - `ob upgrade <REF>` - move the project's pinned ob to REF and list migrations
//! - `ob migrate <FROM_HASH>` - list migrations from FROM_HASH to the pinned ob
//! - `ob decide-handoff` - print whether this ob hands off to the project's ob
//! - `ob internal hash|verify-graphs` - release tooling
//!
//! ## Exit Codes
//!
//! - 0: Success
//! - 1: Graph error (missing, malformed, unknown vertex, no path)
//! - 2: Precondition failed (dirty tree, no pinned copy, bad config, usage)
//! - 3: Infrastructure error (git, hash procedure, I/O, exec)

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};

use ob_upgrade::{ObConfig, UpgradeError};

pub mod handoff_cmd;
pub mod internal_cmd;
pub mod logging;
pub mod migrate_cmd;
pub mod upgrade_cmd;

use handoff_cmd::DecideHandoffCli;
use internal_cmd::InternalCli;
use migrate_cmd::MigrateCli;
use upgrade_cmd::UpgradeCli;

/// ob: self-upgrade and migration discovery for projects pinning ob
#[derive(Debug, Parser)]
#[command(name = "ob", version)]
pub struct ObCli {
    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: $OB_CONFIG or ~/.config/ob/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ObCommand,
}

#[derive(Debug, Subcommand)]
pub enum ObCommand {
    /// Move the project's pinned ob to REF, then list the manual migrations
    Upgrade(UpgradeCli),

    /// List the manual migrations from FROM_HASH to the pinned ob
    Migrate(MigrateCli),

    /// Print `handoff` or `retain` for the project
    DecideHandoff(DecideHandoffCli),

    /// Release tooling
    #[command(subcommand)]
    Internal(InternalCli),
}

impl ObCli {
    pub fn run(self) -> anyhow::Result<()> {
        logging::init(self.verbose);

        let config = match &self.config {
            Some(path) => ObConfig::load_from_path(path)?,
            None => ObConfig::load()?,
        };
        let layout = config.layout()?;
        tracing::debug!(tool_dir = %layout.tool_dir.display(), "Resolved ob installation");

        match self.command {
            ObCommand::Upgrade(cmd) => cmd.run(layout),
            ObCommand::Migrate(cmd) => cmd.run(layout),
            ObCommand::DecideHandoff(cmd) => cmd.run(layout),
            ObCommand::Internal(cmd) => cmd.run(layout),
        }
    }
}

/// Process exit code for an error returned by [`ObCli::run`]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<UpgradeError>() {
        Some(err) => {
            let category = err.category();
            tracing::debug!(category = category.as_str(), "Command failed");
            category.exit_code()
        }
        None => 1,
    }
}

/// Absolute project directory, defaulting to the current directory
pub(crate) fn project_dir(project: Option<PathBuf>) -> Result<PathBuf, UpgradeError> {
    let dir = match project {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(|source| UpgradeError::Io {
            path: PathBuf::from("."),
            source,
        })?,
    };
    canonical(&dir)
}

pub(crate) fn canonical(dir: &Path) -> Result<PathBuf, UpgradeError> {
    std::fs::canonicalize(dir).map_err(|source| UpgradeError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

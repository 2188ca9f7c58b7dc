//! `ob internal`: release tooling
//!
//! - `hash` prints the hash of a directory under one graph, using this ob's
//!   hash procedures
//! - `verify-graphs` checks a release checkout before it is tagged: both
//!   graphs well formed, both ends designated, and the checkout's own hash
//!   registered as the last vertex

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ob_migration::{GraphName, ScriptHashOracle};
use ob_upgrade::{Layout, MIGRATION_SUBDIR, Orchestrator, verify_all};

#[derive(Debug, Subcommand)]
pub enum InternalCli {
    /// Print the hash of DIR under a graph's versioning scheme
    Hash(HashArgs),

    /// Check the migration graphs of an ob checkout (default: this ob)
    VerifyGraphs(VerifyGraphsArgs),
}

#[derive(Debug, Parser)]
pub struct HashArgs {
    /// obelisk-handoff or obelisk-upgrade
    #[arg(long, value_name = "GRAPH")]
    pub graph: GraphName,

    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
}

#[derive(Debug, Parser)]
pub struct VerifyGraphsArgs {
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

impl InternalCli {
    pub fn run(self, layout: Layout) -> anyhow::Result<()> {
        match self {
            Self::Hash(args) => {
                let dir = crate::canonical(&args.dir)?;
                let hash = Orchestrator::from_layout(layout).compute_hash(args.graph, &dir)?;
                println!("{hash}");
            }
            Self::VerifyGraphs(args) => {
                let root = crate::canonical(args.dir.as_deref().unwrap_or(&layout.tool_dir))?;
                let oracle = ScriptHashOracle::new(root.join(MIGRATION_SUBDIR));
                for report in verify_all(&root, &oracle)? {
                    println!(
                        "{}: ok ({} vertices, {} edges, last {})",
                        report.graph, report.vertices, report.edges, report.head
                    );
                }
            }
        }
        Ok(())
    }
}

//! `ob migrate`

use clap::Parser;
use std::path::PathBuf;

use ob_migration::VersionHash;
use ob_upgrade::{Layout, MigrateOutcome, Orchestrator};

#[derive(Debug, Parser)]
pub struct MigrateCli {
    /// Project directory (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Upgrade-graph hash of the pinned ob before the upgrade
    #[arg(value_name = "FROM_HASH")]
    pub from_hash: String,
}

impl MigrateCli {
    pub fn run(self, layout: Layout) -> anyhow::Result<()> {
        let project = crate::project_dir(self.project)?;
        let orchestrator = Orchestrator::from_layout(layout);

        let outcome = orchestrator.migrate(&project, &VersionHash::new(self.from_hash))?;
        print!("{}", render(&outcome));
        Ok(())
    }
}

fn render(outcome: &MigrateOutcome) -> String {
    match outcome {
        MigrateOutcome::UpToDate { hash } => {
            format!("No migration necessary: already at {hash}.\n")
        }
        MigrateOutcome::Required { steps, .. } => {
            let mut out = String::new();
            for step in steps {
                out.push_str(&format!("{}: {}\n", step.hash, step.action.trim_end()));
            }
            out.push_str(&format!(
                "{} migration step(s) to apply manually.\n",
                steps.len()
            ));
            out
        }
    }
}

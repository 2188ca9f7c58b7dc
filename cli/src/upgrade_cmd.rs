//! `ob upgrade`
//!
//! Runs the handoff decision first: when the project's pinned ob should be in
//! charge, the whole command is re-executed by it with `--no-handoff`.

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use ob_upgrade::{Layout, Orchestrator};

#[derive(Debug, Parser)]
pub struct UpgradeCli {
    /// Project directory (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Do not hand off to the project's pinned ob
    #[arg(long)]
    pub no_handoff: bool,

    /// Branch, tag or commit to move the pinned ob to
    #[arg(value_name = "REF")]
    pub reference: String,
}

impl UpgradeCli {
    pub fn run(self, layout: Layout) -> anyhow::Result<()> {
        let project = crate::project_dir(self.project)?;
        let orchestrator = Orchestrator::from_layout(layout);

        if !self.no_handoff {
            let decision = orchestrator.decide_handoff(&project)?;
            if decision.should_hand_off() {
                let args = handoff_args(std::env::args_os().skip(1));
                match orchestrator.hand_off_to_project(&project, &args)? {}
            }
            tracing::info!("Keeping control of the upgrade");
        }

        match orchestrator.upgrade(&project, &self.reference)? {}
    }
}

/// Arguments for the receiving ob: ours, plus `--no-handoff`
fn handoff_args(args: impl Iterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.collect();
    args.push(OsString::from("--no-handoff"));
    args
}

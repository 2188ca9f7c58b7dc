//! `ob decide-handoff`

use clap::Parser;
use std::path::PathBuf;

use ob_upgrade::{HandoffDecision, Layout, Orchestrator};

#[derive(Debug, Parser)]
pub struct DecideHandoffCli {
    /// Project directory (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,
}

impl DecideHandoffCli {
    pub fn run(self, layout: Layout) -> anyhow::Result<()> {
        let project = crate::project_dir(self.project)?;
        let decision = Orchestrator::from_layout(layout).decide_handoff(&project)?;

        if let HandoffDecision::Retain { blocking_edges } = &decision {
            for edge in blocking_edges {
                tracing::info!(from = %edge.from, to = %edge.to, "Blocking edge");
            }
        }
        println!("{}", verdict(&decision));
        Ok(())
    }
}

fn verdict(decision: &HandoffDecision) -> &'static str {
    if decision.should_hand_off() {
        "handoff"
    } else {
        "retain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ob_upgrade::HandoffReason;

    #[test]
    fn test_verdict() {
        assert_eq!(
            verdict(&HandoffDecision::Perform(HandoffReason::NoEquivalencePath)),
            "handoff"
        );
        assert_eq!(
            verdict(&HandoffDecision::Retain {
                blocking_edges: Vec::new()
            }),
            "retain"
        );
    }
}

//! Self-upgrade protocols for `ob`
//!
//! - **Handoff decision**: should the ambient `ob` hand control to the copy
//!   pinned inside a project?
//! - **Upgrade**: move the pinned copy to a new revision, then hand off to it
//!   so it can list the migrations.
//! - **Migrate**: list the manual steps between two pinned versions.
//!
//! The graph engine lives in `ob-migration`; this crate adds the project
//! side: git, the pinned copy and process replacement, each behind a trait
//! so tests can substitute them.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod error;
pub mod git;
pub mod handoff;
pub mod migrate;
pub mod orchestrator;
pub mod pinned;
pub mod process;
pub mod verify;

pub use config::{Layout, MIGRATION_SUBDIR, ObConfig};
pub use error::{ErrorCategory, Result, UpgradeError};
pub use git::{Git, VersionControl};
pub use handoff::{
    ActionDecodeError, HandoffDecision, HandoffReason, classify_handoff_action, decide,
};
pub use migrate::{MigrateOutcome, plan};
pub use orchestrator::Orchestrator;
pub use pinned::{GitPinnedUpdater, PinnedMutator, PinnedUpdater};
pub use process::{ExecHandoff, ProcessHandoff};
pub use verify::{GraphReport, verify_all, verify_graph};

//! Upgrade/handoff orchestration
//!
//! Wires the graph engine to the collaborators: version control, the pinned
//! copy updater, the hash procedures and the process handoff. Every protocol
//! starts by requiring a clean working tree in the project.
//!
//! A hash is always computed by the procedures shipped next to the graph it
//! is looked up in: the ambient tool's for the handoff graph, the pinned
//! copy's for the upgrade graph.

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ob_migration::{
    GraphName, HashProcedures, MigrationGraph, ScriptHashProcedures, VersionHash, VertexRole,
    load_graph,
};

use crate::config::Layout;
use crate::error::{Result, UpgradeError};
use crate::git::{Git, VersionControl};
use crate::handoff::{self, HandoffDecision, classify_handoff_action};
use crate::migrate::{self, MigrateOutcome};
use crate::pinned::{GitPinnedUpdater, PinnedUpdater};
use crate::process::{ExecHandoff, ProcessHandoff};

pub struct Orchestrator {
    layout: Layout,
    hashes: Box<dyn HashProcedures>,
    vcs: Box<dyn VersionControl>,
    updater: Box<dyn PinnedUpdater>,
    handoff: Box<dyn ProcessHandoff>,
}

impl Orchestrator {
    pub fn new(
        layout: Layout,
        hashes: Box<dyn HashProcedures>,
        vcs: Box<dyn VersionControl>,
        updater: Box<dyn PinnedUpdater>,
        handoff: Box<dyn ProcessHandoff>,
    ) -> Self {
        Self {
            layout,
            hashes,
            vcs,
            updater,
            handoff,
        }
    }

    /// Production wiring: `git` on `PATH`, `<graph>.hash.sh` scripts,
    /// `exec(2)` handoff.
    pub fn from_layout(layout: Layout) -> Self {
        let updater = GitPinnedUpdater::new(Git, layout.pinned_subdir.clone());
        let handoff = ExecHandoff::new(layout.clone());
        Self::new(
            layout,
            Box::new(ScriptHashProcedures),
            Box::new(Git),
            Box::new(updater),
            Box::new(handoff),
        )
    }

    /// Hash of `target` under this ob's own hash procedures.
    pub fn compute_hash(&self, graph: GraphName, target: &Path) -> Result<VersionHash> {
        self.hash_with(&self.layout.migration_dir(), graph, target)
    }

    pub fn ensure_clean(&self, project: &Path) -> Result<()> {
        let changes = self.vcs.uncommitted_changes(project)?;
        if changes > 0 {
            return Err(UpgradeError::DirtyWorkingTree {
                path: project.to_path_buf(),
                changes,
            });
        }
        Ok(())
    }

    /// Decide whether this ob should hand control to the project's pinned copy.
    pub fn decide_handoff(&self, project: &Path) -> Result<HandoffDecision> {
        self.ensure_clean(project)?;

        let graph = self.load_required(GraphName::Handoff, &self.layout.migration_dir())?;
        let ambient = graph
            .last_vertex()
            .cloned()
            .ok_or(UpgradeError::MissingDesignatedVertex {
                graph: GraphName::Handoff,
                role: VertexRole::Last,
            })?;
        if !graph.has_vertex(&ambient) {
            return Err(UpgradeError::AmbientHashNotInOwnGraph {
                graph: GraphName::Handoff,
                hash: ambient,
            });
        }

        let pinned = self.require_pinned_dir(project)?;
        let project_hash = self.compute_hash(GraphName::Handoff, &pinned)?;
        tracing::debug!(
            project = %project.display(),
            hash = %project_hash,
            ambient = %ambient,
            "Deciding handoff"
        );

        handoff::decide(&graph, &project_hash, &ambient, classify_handoff_action)
    }

    /// Move the pinned copy to `reference`, then become the new pinned ob
    /// running `migrate` from the previous version.
    pub fn upgrade(&self, project: &Path, reference: &str) -> Result<Infallible> {
        self.ensure_clean(project)?;

        // The receiving ob looks this hash up in its own upgrade graph, so it
        // is taken under the pinned lineage's scheme, not the ambient one.
        let pinned = self.require_pinned_dir(project)?;
        let pinned_migration = self.layout.pinned_migration_dir(project);
        let from_hash = self.hash_with(&pinned_migration, GraphName::Upgrade, &pinned)?;
        tracing::info!(
            project = %project.display(),
            from = %from_hash,
            reference,
            "Upgrading pinned ob"
        );

        let vcs = &self.vcs;
        self.updater.update_pinned(project, &mut |dir: &Path| {
            vcs.fetch(dir)?;
            vcs.checkout(dir, reference)?;
            match vcs.current_branch(dir)? {
                Some(branch) => {
                    tracing::debug!(branch = %branch, "Pulling pinned ob");
                    vcs.pull(dir)
                }
                None => Ok(()),
            }
        })?;

        let args = vec![
            OsString::from("migrate"),
            OsString::from("--project"),
            project.as_os_str().to_os_string(),
            OsString::from(from_hash.as_str()),
        ];
        self.hand_off_to_project(project, &args)
    }

    /// List the manual steps between `from_hash` and the pinned copy's
    /// current version. Never touches project files.
    pub fn migrate(&self, project: &Path, from_hash: &VersionHash) -> Result<MigrateOutcome> {
        self.ensure_clean(project)?;

        let pinned = self.require_pinned_dir(project)?;
        let pinned_migration = self.layout.pinned_migration_dir(project);
        let graph = self.load_required(GraphName::Upgrade, &pinned_migration)?;
        let to_hash = self.hash_with(&pinned_migration, GraphName::Upgrade, &pinned)?;

        migrate::plan(&graph, from_hash, &to_hash)
    }

    /// Replace this process with the project's pinned ob.
    pub fn hand_off_to_project(&self, project: &Path, args: &[OsString]) -> Result<Infallible> {
        let executable =
            self.handoff
                .locate(project)
                .ok_or_else(|| UpgradeError::ExecutableNotFound {
                    project: project.to_path_buf(),
                    expected: self.layout.pinned_executable_path(project),
                })?;
        self.handoff.replace(&executable, args)
    }

    fn hash_with(
        &self,
        migration_dir: &Path,
        graph: GraphName,
        target: &Path,
    ) -> Result<VersionHash> {
        Ok(self.hashes.oracle(migration_dir).compute_hash(graph, target)?)
    }

    fn require_pinned_dir(&self, project: &Path) -> Result<PathBuf> {
        let pinned = self.layout.pinned_dir(project);
        if !pinned.is_dir() {
            return Err(UpgradeError::PinnedCopyNotFound { path: pinned });
        }
        Ok(pinned)
    }

    fn load_required(&self, graph: GraphName, migration_dir: &Path) -> Result<MigrationGraph> {
        load_graph(graph, migration_dir)?.ok_or_else(|| UpgradeError::MissingGraph {
            graph,
            location: migration_dir.to_path_buf(),
        })
    }
}

//! Pinned-copy updates
//!
//! The pinned copy is a git checkout (usually a submodule) inside the project.
//! Updating it means running a mutator on that checkout and then recording the
//! new revision in the project.

use std::path::{Path, PathBuf};

use crate::error::{Result, UpgradeError};
use crate::git::VersionControl;

/// Mutator run against the materialized pinned copy
pub type PinnedMutator<'a> = dyn FnMut(&Path) -> Result<()> + 'a;

pub trait PinnedUpdater {
    /// Run `mutator` on the pinned copy of `project` and record the result as
    /// the new pin. An error from `mutator` aborts before anything is recorded.
    fn update_pinned(&self, project: &Path, mutator: &mut PinnedMutator<'_>) -> Result<()>;
}

pub struct GitPinnedUpdater<V> {
    vcs: V,
    pinned_subdir: PathBuf,
}

impl<V: VersionControl> GitPinnedUpdater<V> {
    pub fn new(vcs: V, pinned_subdir: impl Into<PathBuf>) -> Self {
        Self {
            vcs,
            pinned_subdir: pinned_subdir.into(),
        }
    }
}

impl<V: VersionControl> PinnedUpdater for GitPinnedUpdater<V> {
    fn update_pinned(&self, project: &Path, mutator: &mut PinnedMutator<'_>) -> Result<()> {
        let pinned = project.join(&self.pinned_subdir);
        if !pinned.is_dir() {
            return Err(UpgradeError::PinnedCopyNotFound { path: pinned });
        }

        let before = self.vcs.head_rev(&pinned)?;
        mutator(&pinned)?;
        let after = self.vcs.head_rev(&pinned)?;

        if before == after {
            tracing::info!(rev = %after, "Pinned ob already at the requested revision");
        } else {
            tracing::info!(from = %before, to = %after, "Updated pinned ob");
        }

        self.vcs.stage(project, &self.pinned_subdir)?;
        if !self.vcs.has_staged_changes(project)? {
            tracing::debug!("Pin unchanged, nothing to commit");
            return Ok(());
        }

        let short: String = after.chars().take(12).collect();
        self.vcs
            .commit(project, &format!("Upgrade pinned ob to {short}"))?;
        tracing::info!(rev = %short, "Committed new ob pin");
        Ok(())
    }
}

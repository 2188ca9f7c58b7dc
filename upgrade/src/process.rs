//! Handing the process over to a project's own ob
//!
//! [`ProcessHandoff::replace`] only returns on failure: its success type is
//! [`Infallible`], so nothing can be written to run "after" a handoff.

use std::convert::Infallible;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{Layout, ObConfig};
use crate::error::UpgradeError;

pub trait ProcessHandoff {
    /// Path of the project's pinned ob executable, if it exists
    fn locate(&self, project: &Path) -> Option<PathBuf>;

    /// Replace the running process with `executable args...`
    fn replace(&self, executable: &Path, args: &[OsString]) -> Result<Infallible, UpgradeError>;
}

/// Replaces the process image with `exec(2)`.
#[derive(Debug, Clone)]
pub struct ExecHandoff {
    layout: Layout,
}

impl ExecHandoff {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
}

impl ProcessHandoff for ExecHandoff {
    fn locate(&self, project: &Path) -> Option<PathBuf> {
        let executable = self.layout.pinned_executable_path(project);
        executable.is_file().then_some(executable)
    }

    fn replace(&self, executable: &Path, args: &[OsString]) -> Result<Infallible, UpgradeError> {
        tracing::info!(executable = %executable.display(), ?args, "Handing off to project ob");

        // Nothing buffered on this side survives the exec.
        flush_or_warn(std::io::stdout(), "stdout");
        flush_or_warn(std::io::stderr(), "stderr");

        // The receiver is a different installation and finds its own root.
        let mut command = Command::new(executable);
        command.args(args).env_remove(ObConfig::ENV_TOOL_DIR);
        exec(command, executable)
    }
}

/// Returns false, after logging, when `stream` could not be flushed.
fn flush_or_warn<W: Write>(mut out: W, stream: &'static str) -> bool {
    match out.flush() {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(stream, error = %err, "Output may be lost: flush before handoff failed");
            false
        }
    }
}

#[cfg(unix)]
fn exec(mut command: Command, executable: &Path) -> Result<Infallible, UpgradeError> {
    use std::os::unix::process::CommandExt;

    let source = command.exec();
    Err(UpgradeError::HandoffFailed {
        executable: executable.to_path_buf(),
        source,
    })
}

#[cfg(not(unix))]
fn exec(mut command: Command, executable: &Path) -> Result<Infallible, UpgradeError> {
    // No exec(2): run the child to completion and exit with its status.
    let status = command
        .status()
        .map_err(|source| UpgradeError::HandoffFailed {
            executable: executable.to_path_buf(),
            source,
        })?;
    std::process::exit(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate_requires_a_file() -> anyhow::Result<()> {
        let project = TempDir::new()?;
        let handoff = ExecHandoff::new(Layout::new("/opt/ob"));
        assert_eq!(handoff.locate(project.path()), None);

        let bin = project.path().join(".obelisk/impl/bin");
        std::fs::create_dir_all(&bin)?;
        assert_eq!(handoff.locate(project.path()), None);

        std::fs::write(bin.join("ob"), "")?;
        assert_eq!(handoff.locate(project.path()), Some(bin.join("ob")));
        Ok(())
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_flush_failure_is_reported() {
        assert!(flush_or_warn(Vec::new(), "stdout"));
        assert!(!flush_or_warn(BrokenPipe, "stdout"));
    }

    #[test]
    fn test_replace_reports_missing_executable() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let missing = dir.path().join("does-not-exist");
        let handoff = ExecHandoff::new(Layout::new(dir.path()));

        let err = handoff.replace(&missing, &[]).unwrap_err();
        match err {
            UpgradeError::HandoffFailed { executable, .. } => assert_eq!(executable, missing),
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }
}

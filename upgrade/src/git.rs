//! Version control operations used by the upgrade protocols
//!
//! Every command runs synchronously with both streams captured; a non-zero
//! exit becomes [`UpgradeError::ExternalToolFailure`] carrying the command
//! line and stderr verbatim.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Output};

use crate::error::{Result, UpgradeError};

pub trait VersionControl {
    /// Number of entries `git status --porcelain` reports
    fn uncommitted_changes(&self, repo: &Path) -> Result<usize>;

    fn fetch(&self, repo: &Path) -> Result<()>;

    fn checkout(&self, repo: &Path, reference: &str) -> Result<()>;

    fn pull(&self, repo: &Path) -> Result<()>;

    /// Branch HEAD points to, or `None` when detached
    fn current_branch(&self, repo: &Path) -> Result<Option<String>>;

    fn head_rev(&self, repo: &Path) -> Result<String>;

    fn stage(&self, repo: &Path, path: &Path) -> Result<()>;

    fn has_staged_changes(&self, repo: &Path) -> Result<bool>;

    fn commit(&self, repo: &Path, message: &str) -> Result<()>;
}

/// The `git` executable on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct Git;

impl Git {
    fn command_line<S: AsRef<OsStr>>(args: &[S]) -> String {
        let mut line = String::from("git");
        for arg in args {
            line.push(' ');
            line.push_str(&arg.as_ref().to_string_lossy());
        }
        line
    }

    fn output<S: AsRef<OsStr>>(&self, repo: &Path, args: &[S]) -> Result<Output> {
        tracing::debug!(repo = %repo.display(), command = %Self::command_line(args), "Running git");
        Command::new("git")
            .args(args)
            .current_dir(repo)
            .output()
            .map_err(|e| UpgradeError::ExternalToolFailure {
                command: Self::command_line(args),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })
    }

    fn failure<S: AsRef<OsStr>>(args: &[S], output: &Output) -> UpgradeError {
        UpgradeError::ExternalToolFailure {
            command: Self::command_line(args),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        }
    }

    /// Run and require success; returns trimmed stdout.
    fn run<S: AsRef<OsStr>>(&self, repo: &Path, args: &[S]) -> Result<String> {
        let output = self.output(repo, args)?;
        if !output.status.success() {
            return Err(Self::failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl VersionControl for Git {
    fn uncommitted_changes(&self, repo: &Path) -> Result<usize> {
        let status = self.run(repo, &["status", "--porcelain"])?;
        Ok(status.lines().filter(|line| !line.trim().is_empty()).count())
    }

    fn fetch(&self, repo: &Path) -> Result<()> {
        self.run(repo, &["fetch", "--quiet"]).map(drop)
    }

    fn checkout(&self, repo: &Path, reference: &str) -> Result<()> {
        self.run(repo, &["checkout", "--quiet", reference]).map(drop)
    }

    fn pull(&self, repo: &Path) -> Result<()> {
        self.run(repo, &["pull", "--quiet", "--ff-only"]).map(drop)
    }

    fn current_branch(&self, repo: &Path) -> Result<Option<String>> {
        let args = ["symbolic-ref", "--quiet", "--short", "HEAD"];
        let output = self.output(repo, &args)?;

        // Exit code 1 without output means HEAD is detached
        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            )),
            Some(1) if output.stdout.is_empty() => Ok(None),
            _ => Err(Self::failure(&args, &output)),
        }
    }

    fn head_rev(&self, repo: &Path) -> Result<String> {
        self.run(repo, &["rev-parse", "HEAD"])
    }

    fn stage(&self, repo: &Path, path: &Path) -> Result<()> {
        self.run(repo, &[OsStr::new("add"), OsStr::new("--"), path.as_os_str()])
            .map(drop)
    }

    fn has_staged_changes(&self, repo: &Path) -> Result<bool> {
        let args = ["diff", "--cached", "--quiet"];
        let output = self.output(repo, &args)?;

        // Exit code 1 means the index differs from HEAD
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Self::failure(&args, &output)),
        }
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.run(repo, &["commit", "--quiet", "-m", message]).map(drop)
    }
}

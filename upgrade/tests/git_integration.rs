//! `Git` against a real repository. Skipped when `git` is not installed.

use std::path::Path;
use std::process::Command;

use ob_upgrade::{Git, UpgradeError, VersionControl};
use tempfile::TempDir;

fn git(repo: &Path, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new("git").args(args).current_dir(repo).status()?;
    anyhow::ensure!(status.success(), "git {args:?} failed: {status}");
    Ok(())
}

fn repo() -> anyhow::Result<Option<TempDir>> {
    if which::which("git").is_err() {
        return Ok(None);
    }
    let dir = TempDir::new()?;
    git(dir.path(), &["init", "--quiet", "--initial-branch=main"])?;
    git(dir.path(), &["config", "user.name", "ob tests"])?;
    git(dir.path(), &["config", "user.email", "ob@example.invalid"])?;
    git(dir.path(), &["config", "commit.gpgsign", "false"])?;
    std::fs::write(dir.path().join("README"), "ob\n")?;
    git(dir.path(), &["add", "README"])?;
    git(dir.path(), &["commit", "--quiet", "-m", "initial"])?;
    Ok(Some(dir))
}

#[test]
fn test_clean_tree_detection() -> anyhow::Result<()> {
    let Some(dir) = repo()? else {
        return Ok(());
    };
    let git = Git;
    assert_eq!(git.uncommitted_changes(dir.path())?, 0);

    std::fs::write(dir.path().join("README"), "changed\n")?;
    std::fs::write(dir.path().join("NEW"), "new\n")?;
    assert_eq!(git.uncommitted_changes(dir.path())?, 2);
    Ok(())
}

#[test]
fn test_stage_and_commit() -> anyhow::Result<()> {
    let Some(dir) = repo()? else {
        return Ok(());
    };
    let git = Git;
    let before = git.head_rev(dir.path())?;
    assert_eq!(before.len(), 40);
    assert!(!git.has_staged_changes(dir.path())?);

    std::fs::write(dir.path().join("pin"), "v2\n")?;
    git.stage(dir.path(), Path::new("pin"))?;
    assert!(git.has_staged_changes(dir.path())?);

    git.commit(dir.path(), "Upgrade pinned ob")?;
    assert_eq!(git.uncommitted_changes(dir.path())?, 0);
    assert_ne!(git.head_rev(dir.path())?, before);
    Ok(())
}

#[test]
fn test_branch_and_detached_head() -> anyhow::Result<()> {
    let Some(dir) = repo()? else {
        return Ok(());
    };
    let git = Git;
    assert_eq!(git.current_branch(dir.path())?, Some("main".to_string()));

    let rev = git.head_rev(dir.path())?;
    git.checkout(dir.path(), &rev)?;
    assert_eq!(git.current_branch(dir.path())?, None);

    git.checkout(dir.path(), "main")?;
    assert_eq!(git.current_branch(dir.path())?, Some("main".to_string()));
    Ok(())
}

#[test]
fn test_failure_carries_stderr() -> anyhow::Result<()> {
    let Some(dir) = repo()? else {
        return Ok(());
    };
    let err = Git
        .checkout(dir.path(), "no-such-ref")
        .expect_err("checkout of a missing ref must fail");
    match err {
        UpgradeError::ExternalToolFailure {
            command, stderr, ..
        } => {
            assert_eq!(command, "git checkout --quiet no-such-ref");
            assert!(stderr.contains("no-such-ref"), "stderr: {stderr}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

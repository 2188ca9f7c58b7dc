//! Version hashes and the hash procedures that compute them
//!
//! A hash procedure is an executable `<graph>.hash.sh` in a `migration/`
//! directory. It receives the directory to hash as its only argument and
//! prints exactly one line: the hash of that directory under the graph's
//! versioning scheme.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::HashError;
use crate::name::GraphName;

/// Opaque identifier of one version of `ob` under one graph's scheme.
///
/// Hashes of different graphs must never be compared with each other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionHash(String);

impl VersionHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VersionHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Computes the hash of a directory under a graph's versioning scheme.
pub trait HashOracle {
    fn compute_hash(&self, graph: GraphName, target: &Path) -> Result<VersionHash, HashError>;
}

/// Selects the hash procedures shipped in a given `migration/` directory.
///
/// A hash is only meaningful under the scheme of the graph it is looked up
/// in, so callers pick the procedures next to the graph they loaded.
pub trait HashProcedures {
    fn oracle(&self, migration_dir: &Path) -> Box<dyn HashOracle>;
}

/// [`ScriptHashOracle`] for whichever directory is asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptHashProcedures;

impl HashProcedures for ScriptHashProcedures {
    fn oracle(&self, migration_dir: &Path) -> Box<dyn HashOracle> {
        Box::new(ScriptHashOracle::new(migration_dir))
    }
}

/// Runs the hash procedures found in one `migration/` directory.
#[derive(Debug, Clone)]
pub struct ScriptHashOracle {
    migration_dir: PathBuf,
}

impl ScriptHashOracle {
    pub fn new(migration_dir: impl Into<PathBuf>) -> Self {
        Self {
            migration_dir: migration_dir.into(),
        }
    }

    pub fn script_path(&self, graph: GraphName) -> PathBuf {
        self.migration_dir.join(graph.hash_script_name())
    }
}

impl HashOracle for ScriptHashOracle {
    fn compute_hash(&self, graph: GraphName, target: &Path) -> Result<VersionHash, HashError> {
        let script = self.script_path(graph);
        tracing::debug!(
            graph = %graph,
            script = %script.display(),
            target = %target.display(),
            "Running hash procedure"
        );

        let output = Command::new(&script)
            .arg(target)
            .output()
            .map_err(|source| HashError::Spawn {
                script: script.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        if !output.status.success() {
            return Err(HashError::NonZeroExit {
                script,
                target: target.to_path_buf(),
                status: output.status,
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let hash = parse_hash_output(&stdout).map_err(|lines| match lines {
            0 => HashError::EmptyOutput {
                script: script.clone(),
                target: target.to_path_buf(),
                stderr,
            },
            lines => HashError::UnexpectedOutput {
                script: script.clone(),
                target: target.to_path_buf(),
                lines,
                stdout: stdout.trim_end().to_string(),
            },
        })?;

        tracing::debug!(graph = %graph, hash = %hash, "Hash procedure succeeded");
        Ok(hash)
    }
}

/// Extract the single hash line; on failure returns the number of non-empty lines seen.
fn parse_hash_output(stdout: &str) -> Result<VersionHash, usize> {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [hash] => Ok(VersionHash::new(*hash)),
        other => Err(other.len()),
    }
}

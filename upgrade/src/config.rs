//! ob configuration loading
//!
//! Loads configuration from `~/.config/ob/config.toml` (or `OB_CONFIG` env).
//! Every field has a default, so a missing file is not an error.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, UpgradeError};

/// Directory, relative to an ob checkout, holding graphs and hash procedures
pub const MIGRATION_SUBDIR: &str = "migration";

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ObConfig {
    /// Root of the ambient installation; derived from the running executable when unset
    #[serde(default)]
    pub tool_dir: Option<PathBuf>,

    /// Location of the pinned copy inside a project
    #[serde(default = "default_pinned_subdir")]
    pub pinned_subdir: PathBuf,

    /// Executable inside the pinned copy
    #[serde(default = "default_pinned_executable")]
    pub pinned_executable: PathBuf,
}

fn default_pinned_subdir() -> PathBuf {
    PathBuf::from(".obelisk/impl")
}

fn default_pinned_executable() -> PathBuf {
    PathBuf::from("bin/ob")
}

impl Default for ObConfig {
    fn default() -> Self {
        Self {
            tool_dir: None,
            pinned_subdir: default_pinned_subdir(),
            pinned_executable: default_pinned_executable(),
        }
    }
}

impl ObConfig {
    /// Environment variable for config file path override
    pub const ENV_CONFIG_PATH: &'static str = "OB_CONFIG";

    /// Environment variable overriding `tool_dir`
    pub const ENV_TOOL_DIR: &'static str = "OB_TOOL_DIR";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "config.toml";

    /// Load configuration from file
    ///
    /// Resolution order:
    /// 1. `OB_CONFIG` environment variable
    /// 2. `~/.config/ob/config.toml`
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::resolve_config_path() else {
            return Ok(Self::default());
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "ob config not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path. The file must exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UpgradeError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: ObConfig = toml::from_str(contents)
            .map_err(|e| UpgradeError::config_with_source("failed to parse config", e))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return Some(PathBuf::from(path));
        }

        dirs::config_dir().map(|dir| dir.join("ob").join(Self::DEFAULT_CONFIG_FILENAME))
    }

    pub fn validate(&self) -> Result<()> {
        for (field, path) in [
            ("pinned_subdir", &self.pinned_subdir),
            ("pinned_executable", &self.pinned_executable),
        ] {
            if path.as_os_str().is_empty() {
                return Err(UpgradeError::config(format!("{field} must not be empty")));
            }
            if path.is_absolute() {
                return Err(UpgradeError::config(format!(
                    "{field} must be relative, got {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Root of the ambient installation.
    ///
    /// `OB_TOOL_DIR` wins over `tool_dir`; without either the root is derived
    /// from the running executable: `<root>/bin/ob` gives `<root>`.
    pub fn resolve_tool_dir(&self) -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(Self::ENV_TOOL_DIR) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(dir) = &self.tool_dir {
            return Ok(dir.clone());
        }

        let exe = std::env::current_exe()
            .and_then(std::fs::canonicalize)
            .map_err(|e| {
                UpgradeError::config_with_source("cannot locate the running ob executable", e)
            })?;
        tool_dir_for_executable(&exe).ok_or_else(|| {
            UpgradeError::config(format!(
                "cannot derive the ob installation root from {}",
                exe.display()
            ))
        })
    }

    pub fn layout(&self) -> Result<Layout> {
        Ok(Layout {
            tool_dir: self.resolve_tool_dir()?,
            pinned_subdir: self.pinned_subdir.clone(),
            pinned_executable: self.pinned_executable.clone(),
        })
    }
}

fn tool_dir_for_executable(exe: &Path) -> Option<PathBuf> {
    let bin = exe.parent()?;
    if bin.file_name().is_some_and(|name| name == "bin") {
        bin.parent().map(Path::to_path_buf)
    } else {
        Some(bin.to_path_buf())
    }
}

/// Resolved filesystem layout of the ambient tool and of pinned copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub tool_dir: PathBuf,
    pub pinned_subdir: PathBuf,
    pub pinned_executable: PathBuf,
}

impl Layout {
    pub fn new(tool_dir: impl Into<PathBuf>) -> Self {
        let defaults = ObConfig::default();
        Self {
            tool_dir: tool_dir.into(),
            pinned_subdir: defaults.pinned_subdir,
            pinned_executable: defaults.pinned_executable,
        }
    }

    /// Graphs and hash procedures of the ambient tool
    pub fn migration_dir(&self) -> PathBuf {
        self.tool_dir.join(MIGRATION_SUBDIR)
    }

    pub fn pinned_dir(&self, project: &Path) -> PathBuf {
        project.join(&self.pinned_subdir)
    }

    /// Graphs shipped with a project's pinned copy
    pub fn pinned_migration_dir(&self, project: &Path) -> PathBuf {
        self.pinned_dir(project).join(MIGRATION_SUBDIR)
    }

    pub fn pinned_executable_path(&self, project: &Path) -> PathBuf {
        self.pinned_dir(project).join(&self.pinned_executable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let cfg = ObConfig::default();
        assert_eq!(cfg.tool_dir, None);
        assert_eq!(cfg.pinned_subdir, PathBuf::from(".obelisk/impl"));
        assert_eq!(cfg.pinned_executable, PathBuf::from("bin/ob"));
    }

    #[test]
    fn test_parse_partial_config() {
        let cfg =
            ObConfig::parse("pinned_subdir = \"dep/ob\"\npinned_executable = \"ob\"\n").unwrap();
        assert_eq!(cfg.pinned_subdir, PathBuf::from("dep/ob"));
        assert_eq!(cfg.pinned_executable, PathBuf::from("ob"));
        assert_eq!(cfg.tool_dir, None);
    }

    #[test]
    fn test_parse_rejects_unknown_and_absolute() {
        assert!(ObConfig::parse("pinned_dir = \"x\"\n").is_err());
        let err = ObConfig::parse("pinned_executable = \"/usr/bin/ob\"\n").unwrap_err();
        assert!(err.to_string().contains("must be relative"));
        assert!(ObConfig::parse("pinned_subdir = \"\"\n").is_err());
    }

    #[test]
    fn test_layout_paths() {
        let layout = Layout::new("/opt/ob");
        let project = Path::new("/work/app");
        assert_eq!(layout.migration_dir(), PathBuf::from("/opt/ob/migration"));
        assert_eq!(layout.pinned_dir(project), PathBuf::from("/work/app/.obelisk/impl"));
        assert_eq!(
            layout.pinned_migration_dir(project),
            PathBuf::from("/work/app/.obelisk/impl/migration")
        );
        assert_eq!(
            layout.pinned_executable_path(project),
            PathBuf::from("/work/app/.obelisk/impl/bin/ob")
        );
    }

    #[test]
    fn test_tool_dir_for_executable() {
        assert_eq!(
            tool_dir_for_executable(Path::new("/opt/ob/bin/ob")),
            Some(PathBuf::from("/opt/ob"))
        );
        assert_eq!(
            tool_dir_for_executable(Path::new("/opt/ob/ob")),
            Some(PathBuf::from("/opt/ob"))
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "tool_dir = \"/from/config\"\n")?;

        unsafe {
            std::env::set_var(ObConfig::ENV_CONFIG_PATH, &config_path);
            std::env::remove_var(ObConfig::ENV_TOOL_DIR);
        }
        let cfg = ObConfig::load()?;
        assert_eq!(cfg.resolve_tool_dir()?, PathBuf::from("/from/config"));

        unsafe {
            std::env::set_var(ObConfig::ENV_TOOL_DIR, "/from/env");
        }
        assert_eq!(cfg.resolve_tool_dir()?, PathBuf::from("/from/env"));

        unsafe {
            std::env::set_var(ObConfig::ENV_CONFIG_PATH, dir.path().join("missing.toml"));
            std::env::remove_var(ObConfig::ENV_TOOL_DIR);
        }
        let cfg = ObConfig::load()?;
        assert_eq!(cfg.tool_dir, None);

        unsafe {
            std::env::remove_var(ObConfig::ENV_CONFIG_PATH);
        }
        Ok(())
    }
}

//! Defaults file (`buildrt/config.toml`) loading.
//!
//! System directories from `XDG_CONFIG_DIRS` are read first, then the user's
//! config home; later files win key by key. Command-line flags are applied on
//! top by the caller.

use super::Config;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "buildrt";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub pretend: Option<bool>,
    pub verbose: Option<bool>,
    pub quiet: Option<bool>,
    pub force: Option<bool>,
    pub presume_connectivity: Option<bool>,
}

impl ConfigFile {
    fn merge(&mut self, other: ConfigFile) {
        if other.pretend.is_some() {
            self.pretend = other.pretend;
        }
        if other.verbose.is_some() {
            self.verbose = other.verbose;
        }
        if other.quiet.is_some() {
            self.quiet = other.quiet;
        }
        if other.force.is_some() {
            self.force = other.force;
        }
        if other.presume_connectivity.is_some() {
            self.presume_connectivity = other.presume_connectivity;
        }
    }

    /// Parse a single file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid TOML in {}", path.display()))
    }

    /// Merge every existing file in `paths`, in order.
    pub fn load_from(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = ConfigFile::default();
        for path in paths {
            if !path.exists() {
                continue;
            }
            tracing::debug!(path = %path.display(), "loading config file");
            merged.merge(Self::read(path)?);
        }
        Ok(merged)
    }

    /// Merge the files found in the standard XDG locations.
    pub fn load() -> Result<Self> {
        Self::load_from(&search_paths())
    }

    /// Use the file's values as defaults for `config`.
    ///
    /// Flags already set on `config` are kept, so command-line switches
    /// (which can only turn a mode on) always win.
    pub fn apply_to(&self, config: Config) -> Config {
        let pretend = config.pretend || self.pretend.unwrap_or(false);
        let force = config.force || self.force.unwrap_or(false);
        let presume = config.presume_connectivity || self.presume_connectivity.unwrap_or(false);

        // An explicit --verbose or --quiet replaces the file's choice of either.
        let (verbose, quiet) = if config.verbose || config.quiet {
            (config.verbose, config.quiet)
        } else {
            (self.verbose.unwrap_or(false), self.quiet.unwrap_or(false))
        };

        config
            .pretend(pretend)
            .force(force)
            .presume_connectivity(presume)
            .verbose(verbose)
            .quiet(quiet)
    }
}

fn split_xdg_config_dirs() -> Vec<PathBuf> {
    let raw = std::env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc/xdg".to_owned());
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn xdg_config_home() -> PathBuf {
    if let Ok(raw) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

/// Candidate config files, lowest priority first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = split_xdg_config_dirs()
        .into_iter()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .collect();
    paths.push(xdg_config_home().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_later_files_override_earlier() {
        let dir = TempDir::new().unwrap();
        let system = write(&dir, "system.toml", "force = true\nquiet = true\n");
        let user = write(&dir, "user.toml", "quiet = false\n");

        let merged = ConfigFile::load_from(&[system, user]).unwrap();
        assert_eq!(merged.force, Some(true));
        assert_eq!(merged.quiet, Some(false));
        assert_eq!(merged.pretend, None);
    }

    #[test]
    fn test_missing_files_skipped() {
        let dir = TempDir::new().unwrap();
        let merged = ConfigFile::load_from(&[dir.path().join("nope.toml")]).unwrap();
        assert_eq!(merged, ConfigFile::default());
    }

    #[test]
    fn test_invalid_toml_names_path() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.toml", "pretend = maybe\n");
        let err = ConfigFile::load_from(&[path]).unwrap_err();
        assert!(format!("{err}").contains("bad.toml"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "extra.toml", "colour = true\n");
        assert!(ConfigFile::read(&path).is_err());
    }

    #[test]
    fn test_flag_overrides_file() {
        let file = ConfigFile {
            quiet: Some(true),
            presume_connectivity: Some(true),
            ..Default::default()
        };
        let config = file.apply_to(Config::new().verbose(true));
        assert!(config.verbose);
        assert!(!config.quiet);
        assert!(config.presume_connectivity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_supplies_defaults() {
        let file = ConfigFile {
            pretend: Some(true),
            verbose: Some(true),
            ..Default::default()
        };
        let config = file.apply_to(Config::new());
        assert!(config.pretend);
        assert!(config.verbose);
        assert!(!config.force);
    }
}

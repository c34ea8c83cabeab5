//! Optional indexing configuration.
//!
//! Read from `--config`, or discovered as `stmt-facts.yaml` /
//! `.stmt-facts.yaml` in the working directory.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// File names searched for when no `--config` is given.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["stmt-facts.yaml", ".stmt-facts.yaml"];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Files outside this directory are not indexed.
    #[serde(default)]
    pub project_root: Option<PathBuf>,
    /// Glob patterns for files treated as external (e.g. "**/third_party/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Also keep literals and initializer lists out of the statement facts.
    #[serde(default = "default_strict")]
    pub strict_statements: bool,
    /// Directory receiving the fact files.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_strict() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: None,
            excluded_paths: Vec::new(),
            strict_statements: true,
            output_dir: None,
        }
    }
}

impl Config {
    /// Parse a configuration file. Relative paths in it are resolved
    /// against the file's directory.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_yaml::from_str(&content).map_err(|source| IndexError::Config {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.project_root = config.project_root.map(|p| base.join(p));
        config.output_dir = config.output_dir.map(|p| base.join(p));
        Ok(config)
    }

    /// Load `explicit` if given, else the first config file found in `dir`,
    /// else the defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(IndexError::MissingInput(path.to_path_buf()));
            }
            return Self::parse_file(path);
        }
        match Self::discover(dir) {
            Some(path) => Self::parse_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Find a configuration file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Compile `excluded_paths` into a matcher.
    pub fn excluded_matcher(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|source| IndexError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| IndexError::Pattern {
            pattern: self.excluded_paths.join(", "),
            source,
        })
    }
}

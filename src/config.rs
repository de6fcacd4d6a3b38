//! Configuration schema for declcheck.
//!
//! A config file tunes which files are analyzed and the thresholds the
//! analyzers apply. Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file names searched in the target directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["declcheck.yaml", ".declcheck.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    /// Whether `_test.go` files are analyzed (default: false)
    #[serde(default)]
    pub include_test_files: Option<bool>,
    /// Glob patterns for paths to exclude from analysis (e.g., "**/mocks/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    #[serde(default)]
    pub severity: SeverityPolicy,
    #[serde(default)]
    pub naming: NamingConfig,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Look for a default config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    /// Returns whether to include test files (defaults to false).
    pub fn should_include_test_files(&self) -> bool {
        self.include_test_files.unwrap_or(false)
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy().replace('\\', "/");

        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(&path_str) {
                    return true;
                }
            }
        }
        false
    }
}

/// Severity thresholds for duplicate-type clusters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeverityPolicy {
    /// A same-package cluster with more members than this is `medium` (default: 3)
    #[serde(default = "default_medium_threshold")]
    pub same_package_medium_threshold: usize,
}

fn default_medium_threshold() -> usize {
    3
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            same_package_medium_threshold: default_medium_threshold(),
        }
    }
}

/// Naming-convention checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Words that must be written in a single case (e.g. "ID", not "Id")
    #[serde(default = "default_initialisms")]
    pub initialisms: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_initialisms() -> Vec<String> {
    ["API", "HTML", "HTTP", "ID", "JSON", "SQL", "URI", "URL", "XML"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initialisms: default_initialisms(),
        }
    }
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    if config.severity.same_package_medium_threshold == 0 {
        anyhow::bail!("severity.same_package_medium_threshold must be at least 1");
    }

    for word in &config.naming.initialisms {
        if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!("invalid naming initialism {:?}", word);
        }
    }

    Ok(())
}

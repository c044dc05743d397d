//! Configuration file support for nullfix
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.nullfixrc.json` in the scan root
//! 3. `nullfix.config.json` in the scan root
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::rewrite::RewriteStyle;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions scanned when none are configured
const DEFAULT_EXTENSIONS: &[&str] = &["php"];

/// Backup suffix used when none is configured
pub const DEFAULT_SUFFIX: &str = ".phpscan_fix_nullable.bak";

/// Directories that are never scanned
pub const ALWAYS_SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

/// nullfix configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NullfixConfig {
    /// File extensions to scan, without the leading dot (default: php)
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Path substrings or glob patterns to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Backup file suffix used by apply and restore
    #[serde(default)]
    pub suffix: Option<String>,

    /// Rewrite style (mark or union)
    #[serde(default)]
    pub style: Option<RewriteStyle>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Replaces the configured extensions when present
    pub extensions: Option<Vec<String>>,
    /// Appended to the configured excludes
    pub exclude: Vec<String>,
    pub suffix: Option<String>,
    pub style: Option<RewriteStyle>,
}

/// Resolved configuration with compiled exclude patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Lowercased extensions without leading dots
    pub extensions: Vec<String>,
    /// Plain excludes, matched as `/<pattern>/` within the full path
    pub exclude_substrings: Vec<String>,
    /// Excludes containing glob metacharacters
    pub exclude_globs: GlobSet,
    pub suffix: String,
    pub style: RewriteStyle,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

impl NullfixConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref suffix) = self.suffix {
            if suffix.is_empty() {
                anyhow::bail!("suffix must not be empty");
            }
            if suffix.contains(['/', '\\']) {
                anyhow::bail!("suffix must not contain path separators (got {})", suffix);
            }
        }

        for ext in &self.extensions {
            if normalize_extension(ext).is_empty() {
                anyhow::bail!("extensions must not contain empty entries");
            }
        }

        // Validate glob patterns compile
        for pattern in self.exclude.iter().filter(|p| is_glob_pattern(p)) {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Layer command-line values over the file values
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(extensions) = overrides.extensions {
            self.extensions = extensions;
        }
        self.exclude.extend(overrides.exclude);
        if overrides.suffix.is_some() {
            self.suffix = overrides.suffix;
        }
        if overrides.style.is_some() {
            self.style = overrides.style;
        }
        self
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let extensions = if self.extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
        } else {
            self.extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect()
        };

        let mut exclude_substrings = Vec::new();
        let mut builder = GlobSetBuilder::new();
        for pattern in self.exclude.iter().map(|p| p.trim()) {
            if pattern.is_empty() {
                continue;
            }
            if is_glob_pattern(pattern) {
                builder.add(Glob::new(pattern)?);
            } else {
                exclude_substrings.push(pattern.trim_matches('/').to_string());
            }
        }

        Ok(ResolvedConfig {
            extensions,
            exclude_substrings,
            exclude_globs: builder.build()?,
            suffix: self
                .suffix
                .clone()
                .unwrap_or_else(|| DEFAULT_SUFFIX.to_string()),
            style: self.style.unwrap_or_default(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        NullfixConfig::default().resolve()
    }

    /// Check whether a file's extension is one of the configured ones
    pub fn has_scanned_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.extensions.contains(&e))
    }

    /// Check if a file path should be scanned based on extension and excludes
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.has_scanned_extension(path) {
            return false;
        }

        let path_str = path.to_string_lossy().replace('\\', "/");

        if ALWAYS_SKIPPED_DIRS
            .iter()
            .any(|dir| path_str.contains(&format!("/{}/", dir)))
        {
            return false;
        }

        if self
            .exclude_substrings
            .iter()
            .any(|pattern| path_str.contains(&format!("/{}/", pattern)))
        {
            return false;
        }

        !self.exclude_globs.is_match(path_str.as_str())
    }
}

/// Discover and load a config file from the scan root
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(NullfixConfig, PathBuf)>> {
    for name in [".nullfixrc.json", "nullfix.config.json"] {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<NullfixConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: NullfixConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load, override and resolve config for a scan root
///
/// If `config_path` is provided, loads from that file. Otherwise discovers
/// config in `root`, falling back to defaults.
pub fn load_and_resolve(
    root: &Path,
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        (load_config_file(path)?, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (NullfixConfig::default(), None),
        }
    };

    let mut resolved = config
        .with_overrides(overrides)
        .resolve()
        .context("invalid configuration")?;
    resolved.config_path = source_path;
    Ok(resolved)
}

//! File and directory exclusion for the render walk.
//! Combines the always-excluded names (version control metadata and the
//! template's own configuration file) with the template's ignore patterns.

use crate::config::{TemplateSettings, CONFIG_FILES, VCS_DIR};
use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Why an entry is left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Version control directory or template configuration file
    SelfFile,
    /// Matched one of the configured ignore patterns
    Pattern,
}

/// Compiled exclusion rules.
#[derive(Debug)]
pub struct IgnoreMatcher {
    globs: GlobSet,
    patterns: Vec<String>,
}

impl IgnoreMatcher {
    /// Compiles the ignore patterns from the template settings.
    ///
    /// `*` never crosses a path separator, so `*.tmp` only matches at the
    /// level it is tested against.
    ///
    /// # Errors
    /// * `Error::ConfigError` if a pattern is not a valid glob
    pub fn new(settings: &TemplateSettings) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &settings.ignore_patterns {
            let glob = GlobBuilder::new(pattern).literal_separator(true).build().map_err(|e| {
                Error::ConfigError(format!("invalid ignore pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| Error::ConfigError(format!("ignore patterns loading failed: {e}")))?;

        Ok(Self { globs, patterns: settings.ignore_patterns.clone() })
    }

    /// Decides whether an entry is excluded.
    ///
    /// `relative_path` uses `/` as separator. Excluded directories are not
    /// descended into by the caller.
    pub fn check(&self, relative_path: &str, is_dir: bool) -> Option<Exclusion> {
        let base_name = relative_path.rsplit('/').next().unwrap_or(relative_path);

        if base_name == VCS_DIR || CONFIG_FILES.contains(&base_name) {
            return Some(Exclusion::SelfFile);
        }

        if self.globs.is_match(base_name) || self.globs.is_match(relative_path) {
            return Some(Exclusion::Pattern);
        }
        if is_dir && self.patterns.iter().any(|p| p == base_name) {
            return Some(Exclusion::Pattern);
        }
        None
    }
}

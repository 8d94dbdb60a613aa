//! Exclusion globs from configuration.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct CompiledPattern {
    pattern: Pattern,
    /// Absolute patterns match absolute paths; the rest match workspace-relative ones.
    absolute: bool,
}

/// Compiled exclusion patterns for one workspace root.
///
/// A path is excluded if it, or any ancestor below the root, matches a
/// pattern. Absolute patterns are tested against the absolute path, all
/// others against the path relative to the workspace root.
#[derive(Debug, Clone)]
pub struct Excluder {
    root: PathBuf,
    patterns: Vec<CompiledPattern>,
}

impl Excluder {
    /// Compile patterns; invalid ones are logged and skipped.
    pub fn new(root: &Path, patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(pattern) => Some(CompiledPattern {
                    pattern,
                    absolute: Path::new(raw).is_absolute(),
                }),
                Err(e) => {
                    tracing::warn!("[exclude] invalid pattern '{raw}': {e}");
                    None
                }
            })
            .collect();

        Self {
            root: root.to_path_buf(),
            patterns,
        }
    }

    /// Excluder that matches nothing.
    pub fn empty() -> Self {
        Self {
            root: PathBuf::new(),
            patterns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check a resolved absolute path.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.is_empty() {
            return false;
        }

        // Inside the workspace, only segments below the root are tested
        let inside = !self.root.as_os_str().is_empty() && path.starts_with(&self.root);
        path.ancestors()
            .take_while(|ancestor| {
                !ancestor.as_os_str().is_empty()
                    && (!inside || (*ancestor != self.root && ancestor.starts_with(&self.root)))
            })
            .any(|ancestor| self.matches(ancestor))
    }

    fn matches(&self, path: &Path) -> bool {
        // Outside the workspace there is no relative form; fall back to absolute
        let relative = path
            .strip_prefix(&self.root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or(path);

        self.patterns.iter().any(|compiled| {
            let candidate = if compiled.absolute { path } else { relative };
            compiled.pattern.matches_path_with(candidate, MATCH_OPTIONS)
        })
    }
}

use std::path::PathBuf;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Option values
// ---------------------------------------------------------------------------

/// Which entries a query returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryTypes {
    /// Regular files (and links to them) only.
    #[default]
    Files,
    /// Directories (and links to them) only. Files are not even evaluated.
    Dirs,
    /// Both.
    All,
}

/// How symbolic links are treated during traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkPolicy {
    /// Treat links exactly like their targets.
    #[default]
    Follow,
    /// Skip linked entries entirely.
    Ignore,
    /// Report linked entries, but never descend through a linked directory.
    Match,
}

/// Whether a query reads through the engine's cached snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Reuse and update the cached snapshot; starts a new generation.
    #[default]
    Normal,
    /// A throwaway traversal that neither reads nor updates the snapshot.
    None,
}

// ---------------------------------------------------------------------------
// GlobOptions
// ---------------------------------------------------------------------------

/// Per-query options.
///
/// Configure with chained builder methods, or deserialize from configuration
/// (camelCase keys, lowercase enum values):
///
/// ```rust
/// use lazyglob::{EntryTypes, GlobOptions};
///
/// let opts = GlobOptions::new()
///     .cwd("/srv/app")
///     .types(EntryTypes::All)
///     .ignore(["target/**"]);
/// assert_eq!(opts.types, EntryTypes::All);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobOptions {
    /// Base directory for relative patterns. Defaults to the engine's cwd.
    pub cwd: Option<PathBuf>,
    pub cache: CacheMode,
    /// Let wildcards match names starting with `.`.
    pub dot: bool,
    pub types: EntryTypes,
    /// A fully matched directory pulls in everything below it.
    pub expand_directories: bool,
    pub symbolic_links: SymlinkPolicy,
    /// Extra exclusion patterns, applied after all positive patterns.
    pub ignore: Vec<String>,
}

impl GlobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    pub fn dot(mut self, yes: bool) -> Self {
        self.dot = yes;
        self
    }

    pub fn types(mut self, types: EntryTypes) -> Self {
        self.types = types;
        self
    }

    pub fn expand_directories(mut self, yes: bool) -> Self {
        self.expand_directories = yes;
        self
    }

    pub fn symbolic_links(mut self, policy: SymlinkPolicy) -> Self {
        self.symbolic_links = policy;
        self
    }

    pub fn ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(patterns.into_iter().map(Into::into));
        self
    }
}

// ---------------------------------------------------------------------------
// MatchOptions
// ---------------------------------------------------------------------------

/// Resolved options handed to the compiler and the traversal engine.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Absolute, normalized query cwd.
    pub cwd: PathBuf,
    pub dot: bool,
    pub types: EntryTypes,
    pub expand_directories: bool,
    pub symbolic_links: SymlinkPolicy,
}

impl MatchOptions {
    pub(crate) fn resolve(opts: &GlobOptions, cwd: PathBuf) -> Self {
        Self {
            cwd,
            dot: opts.dot,
            types: opts.types,
            expand_directories: opts.expand_directories,
            symbolic_links: opts.symbolic_links,
        }
    }
}

//! The query facade: one [`LazyGlob`] owns a logical clock, a filesystem and
//! the cached snapshot for every root it has scanned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::clock::LogicalClock;
use crate::compile::compile_matchers;
use crate::engine::{match_in_dir, match_in_dir_async};
use crate::error::GlobError;
use crate::lazy::LazyDir;
use crate::matcher::Matcher;
use crate::options::{CacheMode, GlobOptions, MatchOptions};
use crate::os::OsFileSystem;
use crate::paths;
use crate::stream::{match_in_dir_stream, GlobStream};
use crate::traits::FileSystem;

/// A glob engine with a lazily refreshed filesystem snapshot.
///
/// Every [`CacheMode::Normal`] query starts a new generation: a cached
/// directory is stat'ed at most once per generation and only re-read when its
/// modification time changed. Queries that never reach a directory never touch it.
///
/// ```rust,no_run
/// use lazyglob::{GlobOptions, LazyGlob};
///
/// let glob = LazyGlob::new();
/// let sources = glob.sync(&["src/**/*.rs"], &GlobOptions::new())?;
/// for path in sources {
///     println!("{}", path.display());
/// }
/// # Ok::<(), lazyglob::GlobError>(())
/// ```
pub struct LazyGlob {
    clock: LogicalClock,
    fs: Arc<dyn FileSystem>,
    roots: Mutex<HashMap<PathBuf, Arc<LazyDir>>>,
    cwd: Option<PathBuf>,
}

/// Everything a driver needs to run one query.
struct Query {
    root: Arc<LazyDir>,
    options: MatchOptions,
    matchers: Vec<Arc<Matcher>>,
}

impl Default for LazyGlob {
    fn default() -> Self {
        Self::new()
    }
}

impl LazyGlob {
    /// An engine over the real filesystem.
    pub fn new() -> Self {
        Self::with_filesystem(Arc::new(OsFileSystem))
    }

    pub fn with_filesystem(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            clock: LogicalClock::new(),
            fs,
            roots: Mutex::new(HashMap::new()),
            cwd: None,
        }
    }

    /// Resolve relative `cwd` options (and queries without one) against
    /// `cwd` instead of the process working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Match `patterns`, blocking on filesystem I/O.
    ///
    /// Results come back depth first in name order: an entry, then its
    /// subtree's matches, then its next sibling.
    pub fn sync<S: AsRef<str>>(
        &self,
        patterns: &[S],
        options: &GlobOptions,
    ) -> Result<Vec<PathBuf>, GlobError> {
        let query = self.prepare(patterns, options)?;
        let mut out = Vec::new();
        match_in_dir(
            self.fs.as_ref(),
            &query.root,
            &query.options,
            &query.matchers,
            &mut out,
        );
        debug!(matches = out.len(), "sync query finished");
        Ok(out)
    }

    /// Match `patterns` with async I/O, reading sibling directories
    /// concurrently. Same results, same order as [`LazyGlob::sync`].
    pub async fn collect<S: AsRef<str>>(
        &self,
        patterns: &[S],
        options: &GlobOptions,
    ) -> Result<Vec<PathBuf>, GlobError> {
        let query = self.prepare(patterns, options)?;
        let out = match_in_dir_async(
            self.fs.as_ref(),
            query.root,
            &query.options,
            query.matchers,
        )
        .await;
        debug!(matches = out.len(), "async query finished");
        Ok(out)
    }

    /// Match `patterns` incrementally. Directories are read only as the
    /// stream is polled past them; dropping it abandons the rest of the walk.
    ///
    /// The generation starts when this is called, not when the stream is first polled.
    pub fn stream<S: AsRef<str>>(
        &self,
        patterns: &[S],
        options: &GlobOptions,
    ) -> Result<GlobStream, GlobError> {
        let query = self.prepare(patterns, options)?;
        Ok(match_in_dir_stream(
            Arc::clone(&self.fs),
            query.root,
            query.options,
            query.matchers,
        ))
    }

    /// Start a new generation without running a query, so the next one
    /// re-checks every directory it reaches.
    pub fn invalidate(&self) {
        let now = self.clock.advance();
        debug!(generation = now, "snapshot invalidated");
    }

    fn prepare<S: AsRef<str>>(
        &self,
        patterns: &[S],
        options: &GlobOptions,
    ) -> Result<Query, GlobError> {
        let cwd = self.resolve_cwd(options.cwd.as_deref())?;
        let root_dir = paths::root_dir(&cwd);
        let match_options = MatchOptions::resolve(options, cwd);

        let all: Vec<String> = patterns
            .iter()
            .map(|p| p.as_ref().to_string())
            .chain(options.ignore.iter().map(|p| format!("!{p}")))
            .collect();
        let matchers = compile_matchers(&match_options, &all, &root_dir)?;

        let root = match options.cache {
            CacheMode::Normal => {
                let generation = self.clock.advance();
                debug!(
                    generation,
                    patterns = all.len(),
                    cwd = %match_options.cwd.display(),
                    "query"
                );
                self.cached_root(root_dir)
            }
            CacheMode::None => {
                debug!(
                    patterns = all.len(),
                    cwd = %match_options.cwd.display(),
                    "uncached query"
                );
                Arc::new(LazyDir::root(self.clock.clone(), root_dir, true))
            }
        };

        Ok(Query {
            root,
            options: match_options,
            matchers,
        })
    }

    fn resolve_cwd(&self, requested: Option<&Path>) -> Result<PathBuf, GlobError> {
        let base = match &self.cwd {
            Some(cwd) if cwd.is_absolute() => cwd.clone(),
            _ => {
                let process = std::env::current_dir().map_err(GlobError::CurrentDir)?;
                match &self.cwd {
                    Some(cwd) => process.join(cwd),
                    None => process,
                }
            }
        };
        Ok(match requested {
            Some(cwd) => paths::resolve(&base, cwd),
            None => paths::resolve(&base, Path::new("")),
        })
    }

    fn cached_root(&self, root_dir: PathBuf) -> Arc<LazyDir> {
        let mut roots = self.roots.lock();
        let root = roots
            .entry(root_dir)
            .or_insert_with_key(|path| {
                Arc::new(LazyDir::root(self.clock.clone(), path.clone(), false))
            });
        Arc::clone(root)
    }
}

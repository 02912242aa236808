//! # lazyglob
//!
//! Glob matching backed by a lazily refreshed snapshot of the filesystem.
//!
//! Patterns are compiled into a tree of per-segment matchers and walked
//! against a cached directory tree. Only directories a pattern can reach are
//! read, and a cached directory is re-read only when its modification time
//! has changed since the last query that looked at it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lazyglob::{EntryTypes, GlobOptions};
//!
//! // Everything under src/ except the generated code, directories included
//! let opts = GlobOptions::new()
//!     .types(EntryTypes::All)
//!     .ignore(["src/generated/**"]);
//! let paths = lazyglob::glob_sync(&["src/**"], &opts)?;
//! println!("{} matches", paths.len());
//! # Ok::<(), lazyglob::GlobError>(())
//! ```
//!
//! # Pattern syntax
//!
//! - `*`, `?` and `[a-z]` / `[!a-z]` match within one path segment
//! - `**` matches any number of directory levels
//! - `{a,b}` expands to one pattern per alternative
//! - a leading `!` negates; later patterns take precedence over earlier ones
//! - a trailing `/` matches directories only
//! - relative patterns resolve against the query's `cwd`, `/`-prefixed ones
//!   against the filesystem root
//!
//! Wildcards skip names starting with `.` unless [`GlobOptions::dot`] is set.
//!
//! # Drivers
//!
//! The same query can run blocking ([`LazyGlob::sync`]), async with
//! concurrent sibling reads ([`LazyGlob::collect`]) or as an incremental
//! [`GlobStream`] ([`LazyGlob::stream`]). All three report identical paths in
//! identical order.
//!
//! Any [`FileSystem`] can sit under the engine:
//!
//! ```rust
//! use std::sync::Arc;
//! use lazyglob::{LazyGlob, OsFileSystem};
//!
//! let glob = LazyGlob::with_filesystem(Arc::new(OsFileSystem)).with_cwd("/tmp");
//! glob.invalidate();
//! ```

#![forbid(unsafe_code)]

pub mod paths;

mod clock;
mod compile;
mod engine;
mod entry;
mod error;
mod glob;
mod lazy;
mod matcher;
mod options;
mod os;
mod stream;
mod traits;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::OnceLock;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use clock::LogicalClock;
pub use compile::{compile_matchers, expand_braces, SegmentGlob};
pub use entry::{DirEntry, EntryKind, Metadata};
pub use error::GlobError;
pub use glob::LazyGlob;
pub use lazy::{LazyDir, LazyEntry, LazyFile, Listing};
pub use matcher::{recursive_wildcard, MatchOutcome, Matcher, Segment};
pub use options::{CacheMode, EntryTypes, GlobOptions, MatchOptions, SymlinkPolicy};
pub use os::OsFileSystem;
pub use stream::GlobStream;
pub use traits::FileSystem;

// ── Process-wide engine ───────────────────────────────────────────────────────

/// The engine behind the free functions: real filesystem, process cwd.
pub fn default_glob() -> &'static LazyGlob {
    static DEFAULT: OnceLock<LazyGlob> = OnceLock::new();
    DEFAULT.get_or_init(LazyGlob::new)
}

/// [`LazyGlob::collect`] on the [`default_glob`].
pub async fn glob<S: AsRef<str>>(
    patterns: &[S],
    options: &GlobOptions,
) -> Result<Vec<PathBuf>, GlobError> {
    default_glob().collect(patterns, options).await
}

/// [`LazyGlob::sync`] on the [`default_glob`].
pub fn glob_sync<S: AsRef<str>>(
    patterns: &[S],
    options: &GlobOptions,
) -> Result<Vec<PathBuf>, GlobError> {
    default_glob().sync(patterns, options)
}

/// [`LazyGlob::stream`] on the [`default_glob`].
pub fn glob_stream<S: AsRef<str>>(
    patterns: &[S],
    options: &GlobOptions,
) -> Result<GlobStream, GlobError> {
    default_glob().stream(patterns, options)
}

/// [`LazyGlob::invalidate`] on the [`default_glob`].
pub fn invalidate() {
    default_glob().invalidate()
}

//! The traversal core.
//!
//! [`evaluate`] decides, for one entry and the active matcher set, whether the
//! entry is a result and which matchers its children inherit. The drivers
//! below only differ in how they read listings and deliver paths; the
//! incremental driver lives in [`crate::stream`].

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

use crate::lazy::{LazyDir, LazyEntry};
use crate::matcher::{recursive_wildcard, MatchOutcome, Matcher};
use crate::options::{EntryTypes, MatchOptions, SymlinkPolicy};
use crate::traits::FileSystem;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// What to do with one entry.
#[derive(Debug)]
pub(crate) struct Verdict {
    /// Report the entry's path.
    pub include: bool,
    /// Traverse into this directory with these matchers.
    pub descend: Option<(Arc<LazyDir>, Vec<Arc<Matcher>>)>,
}

/// Entries the query filters out before any matcher sees them.
pub(crate) fn admits(entry: &LazyEntry, options: &MatchOptions) -> bool {
    if options.types == EntryTypes::Dirs && !entry.is_dir() {
        return false;
    }
    if entry.is_symlink() && options.symbolic_links == SymlinkPolicy::Ignore {
        return false;
    }
    true
}

fn wanted(entry: &LazyEntry, types: EntryTypes) -> bool {
    match types {
        EntryTypes::All => true,
        EntryTypes::Dirs => entry.is_dir(),
        EntryTypes::Files => !entry.is_dir(),
    }
}

/// Run the active matchers (highest priority first) against `entry`.
///
/// Continuations produced by `TryNext` and `Recur` go through a one-slot stash
/// and are evaluated against the same entry before the next matcher in the
/// set. A negating `Terminal` stops evaluation outright, so nothing of lower
/// priority can include the entry or pass matchers down to its children.
pub(crate) fn evaluate(
    entry: &LazyEntry,
    options: &MatchOptions,
    active: &[Arc<Matcher>],
) -> Verdict {
    let mut include = false;
    let mut next_level: Vec<Arc<Matcher>> = Vec::new();
    let mut pending = active.iter();
    let mut stashed: Option<Arc<Matcher>> = None;

    loop {
        let matcher = match stashed.take() {
            Some(m) => m,
            None => match pending.next() {
                Some(m) => Arc::clone(m),
                None => break,
            },
        };

        match matcher.match_entry(entry, options) {
            MatchOutcome::None => {}
            MatchOutcome::Next(next) => next_level.push(next),
            MatchOutcome::Terminal => {
                if matcher.negating() {
                    break;
                }
                if entry.is_dir() && options.expand_directories {
                    next_level.push(recursive_wildcard());
                }
                if wanted(entry, options.types) {
                    include = true;
                }
            }
            MatchOutcome::Recur => {
                next_level.push(Arc::clone(&matcher));
                match matcher.next() {
                    Some(next) => stashed = Some(Arc::clone(next)),
                    None => {
                        // `**` with nothing after it matches the directory itself
                        if options.types != EntryTypes::Files && !matcher.negating() {
                            include = true;
                        }
                    }
                }
            }
            MatchOutcome::TryNext => stashed = matcher.next().cloned(),
            MatchOutcome::Directory => {
                if matcher.next().is_none()
                    && entry.is_dir()
                    && options.types != EntryTypes::Files
                {
                    include = true;
                }
            }
        }
    }

    let descend = match entry {
        LazyEntry::Dir(dir)
            if (!dir.is_symlink() || options.symbolic_links == SymlinkPolicy::Follow)
                && next_level.iter().any(|m| !m.negating()) =>
        {
            Some((Arc::clone(dir), next_level))
        }
        _ => None,
    };

    Verdict { include, descend }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Blocking traversal. Appends each matched path, then its subtree's matches.
pub(crate) fn match_in_dir(
    fs: &dyn FileSystem,
    dir: &LazyDir,
    options: &MatchOptions,
    matchers: &[Arc<Matcher>],
    out: &mut Vec<PathBuf>,
) {
    let listing = dir.listing(fs);
    for entry in listing.entries() {
        if !admits(entry, options) {
            continue;
        }
        let verdict = evaluate(entry, options, matchers);
        if verdict.include {
            out.push(entry.path().to_path_buf());
        }
        if let Some((child, next)) = verdict.descend {
            match_in_dir(fs, &child, options, &next, out);
        }
    }
}

/// Suspending traversal. Every admitted child of `dir` is processed
/// concurrently; the returned paths are in the same order the blocking driver
/// produces.
pub(crate) fn match_in_dir_async<'a>(
    fs: &'a dyn FileSystem,
    dir: Arc<LazyDir>,
    options: &'a MatchOptions,
    matchers: Vec<Arc<Matcher>>,
) -> BoxFuture<'a, Vec<PathBuf>> {
    async move {
        let listing = dir.listing_async(fs).await;
        let branches = listing
            .entries()
            .iter()
            .filter(|entry| admits(entry, options))
            .map(|entry| {
                let verdict = evaluate(entry, options, &matchers);
                async move {
                    let mut out = Vec::new();
                    if verdict.include {
                        out.push(entry.path().to_path_buf());
                    }
                    if let Some((child, next)) = verdict.descend {
                        out.extend(match_in_dir_async(fs, child, options, next).await);
                    }
                    out
                }
            });
        join_all(branches).await.into_iter().flatten().collect()
    }
    .boxed()
}

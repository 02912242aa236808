use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clock::LogicalClock;
use crate::entry::{DirEntry, EntryKind, Metadata};
use crate::paths::basename;
use crate::traits::FileSystem;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A cached view of one filesystem path.
///
/// Cloning is cheap: both variants are reference-counted, and a listing hands
/// out the same node on every generation for as long as the entry keeps its type.
#[derive(Debug, Clone)]
pub enum LazyEntry {
    Dir(Arc<LazyDir>),
    File(Arc<LazyFile>),
}

impl LazyEntry {
    pub fn path(&self) -> &Path {
        match self {
            Self::Dir(d) => &d.path,
            Self::File(f) => &f.path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Dir(d) => &d.name,
            Self::File(f) => &f.name,
        }
    }

    pub fn is_symlink(&self) -> bool {
        match self {
            Self::Dir(d) => d.is_symlink,
            Self::File(f) => f.is_symlink,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir(_))
    }

    pub fn as_dir(&self) -> Option<&Arc<LazyDir>> {
        match self {
            Self::Dir(d) => Some(d),
            Self::File(_) => None,
        }
    }
}

/// A file (or a symbolic link resolving to one). Carries no cached state.
#[derive(Debug)]
pub struct LazyFile {
    path: PathBuf,
    name: String,
    is_symlink: bool,
}

impl LazyFile {
    pub fn new(path: PathBuf, is_symlink: bool) -> Self {
        Self {
            name: basename(&path),
            path,
            is_symlink,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// The children of a directory as of one generation, ordered by name.
#[derive(Debug, Default)]
pub struct Listing {
    entries: Vec<LazyEntry>,
    by_name: HashMap<String, usize>,
}

impl Listing {
    fn new(entries: Vec<LazyEntry>) -> Self {
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name().to_string(), i))
            .collect();
        Self { entries, by_name }
    }

    pub fn entries(&self) -> &[LazyEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&LazyEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LazyDir
// ---------------------------------------------------------------------------

/// A directory whose listing is read on demand and reused across generations
/// for as long as its modification time does not change.
#[derive(Debug)]
pub struct LazyDir {
    clock: LogicalClock,
    path: PathBuf,
    name: String,
    is_symlink: bool,
    no_cache: bool,
    state: Mutex<DirState>,
}

#[derive(Debug)]
struct DirState {
    mtime: Option<SystemTime>,
    /// `None` until the first stat.
    last_stat_time: Option<u64>,
    last_list_time: Option<u64>,
    listing: Option<Arc<Listing>>,
}

/// What a listing request has to do before it can answer.
enum Begin {
    Fresh(Arc<Listing>),
    Stat,
    Rebuild,
}

/// How to turn one raw directory record into a node.
enum Plan {
    Ready(LazyEntry),
    Resolve { path: PathBuf, is_symlink: bool },
    Skip,
}

impl LazyDir {
    /// A directory whose `mtime` was observed in the current generation.
    pub fn new(
        clock: LogicalClock,
        path: PathBuf,
        mtime: Option<SystemTime>,
        is_symlink: bool,
        no_cache: bool,
    ) -> Self {
        let now = clock.now();
        Self::build(clock, path, mtime, Some(now), is_symlink, no_cache)
    }

    /// A scan root. Nothing is known about it yet, so its first listing stats
    /// it before reading it and later generations can compare mtimes.
    pub fn root(clock: LogicalClock, path: PathBuf, no_cache: bool) -> Self {
        Self::build(clock, path, None, None, false, no_cache)
    }

    fn build(
        clock: LogicalClock,
        path: PathBuf,
        mtime: Option<SystemTime>,
        last_stat_time: Option<u64>,
        is_symlink: bool,
        no_cache: bool,
    ) -> Self {
        Self {
            name: basename(&path),
            clock,
            path,
            is_symlink,
            no_cache,
            state: Mutex::new(DirState {
                mtime,
                last_stat_time,
                last_list_time: None,
                listing: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    /// The current children, reading the directory only when it may have changed.
    pub fn listing(&self, fs: &dyn FileSystem) -> Arc<Listing> {
        let now = self.clock.now();
        let restat = match self.begin(now) {
            Begin::Fresh(listing) => return listing,
            Begin::Stat => match self.record_stat(now, fs.stat(&self.path)) {
                Ok(listing) => return listing,
                Err(mtime) => Some(mtime),
            },
            Begin::Rebuild => None,
        };

        let raw = self.read(fs.read_dir(&self.path));
        let prev = self.previous();
        let mut children = Vec::with_capacity(raw.len());
        for entry in &raw {
            let child = match self.plan(prev.as_deref(), entry) {
                Plan::Ready(child) => Some(child),
                Plan::Resolve { path, is_symlink } => {
                    let stat = fs.stat(&path);
                    self.resolve(prev.as_deref(), path, is_symlink, stat)
                }
                Plan::Skip => None,
            };
            children.extend(child);
        }
        self.store(now, children, restat)
    }

    /// Suspending variant of [`listing`](LazyDir::listing). Same freshness rules;
    /// the node lock is never held across an I/O call.
    pub async fn listing_async(&self, fs: &dyn FileSystem) -> Arc<Listing> {
        let now = self.clock.now();
        let restat = match self.begin(now) {
            Begin::Fresh(listing) => return listing,
            Begin::Stat => match self.record_stat(now, fs.stat_async(&self.path).await) {
                Ok(listing) => return listing,
                Err(mtime) => Some(mtime),
            },
            Begin::Rebuild => None,
        };

        let raw = self.read(fs.read_dir_async(&self.path).await);
        let prev = self.previous();
        let mut children = Vec::with_capacity(raw.len());
        for entry in &raw {
            let child = match self.plan(prev.as_deref(), entry) {
                Plan::Ready(child) => Some(child),
                Plan::Resolve { path, is_symlink } => {
                    let stat = fs.stat_async(&path).await;
                    self.resolve(prev.as_deref(), path, is_symlink, stat)
                }
                Plan::Skip => None,
            };
            children.extend(child);
        }
        self.store(now, children, restat)
    }

    fn begin(&self, now: u64) -> Begin {
        let mut state = self.state.lock();
        if state.last_list_time == Some(now) {
            if let Some(listing) = &state.listing {
                trace!(path = %self.path.display(), generation = now, "listing fresh");
                return Begin::Fresh(Arc::clone(listing));
            }
        }
        // Disposable traversals never come back to a directory, so there is
        // nothing to compare a fresh stat against.
        if !self.no_cache && state.last_stat_time != Some(now) {
            return Begin::Stat;
        }
        match state.listing.clone() {
            Some(listing) => {
                state.last_list_time = Some(now);
                Begin::Fresh(listing)
            }
            None => Begin::Rebuild,
        }
    }

    /// Compare a fresh stat with the last observation. `Ok` carries the reusable
    /// listing; `Err` carries the new mtime to record once the rebuild lands.
    fn record_stat(
        &self,
        now: u64,
        stat: io::Result<Metadata>,
    ) -> Result<Arc<Listing>, Option<SystemTime>> {
        let mtime = match stat {
            Ok(meta) => meta.modified,
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "stat failed");
                return Err(None);
            }
        };
        let mut state = self.state.lock();
        let unchanged = mtime.is_some() && mtime == state.mtime;
        match state.listing.clone() {
            Some(listing) if unchanged => {
                trace!(
                    path = %self.path.display(),
                    generation = now,
                    "mtime unchanged, reusing listing"
                );
                state.last_stat_time = Some(now);
                state.last_list_time = Some(now);
                Ok(listing)
            }
            _ => Err(mtime),
        }
    }

    fn read(&self, result: io::Result<Vec<DirEntry>>) -> Vec<DirEntry> {
        match result {
            Ok(mut raw) => {
                raw.sort_by(|a, b| a.name.cmp(&b.name));
                raw
            }
            Err(err) => {
                debug!(
                    path = %self.path.display(),
                    error = %err,
                    "read_dir failed, treating as empty"
                );
                Vec::new()
            }
        }
    }

    fn previous(&self) -> Option<Arc<Listing>> {
        self.state.lock().listing.clone()
    }

    fn child_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    fn plan(&self, prev: Option<&Listing>, entry: &DirEntry) -> Plan {
        let previous = prev.and_then(|l| l.get(&entry.name));
        match entry.kind {
            EntryKind::Dir => match previous {
                Some(LazyEntry::Dir(d)) if !d.is_symlink => {
                    Plan::Ready(LazyEntry::Dir(Arc::clone(d)))
                }
                _ if self.no_cache => Plan::Ready(LazyEntry::Dir(Arc::new(self.child_dir(
                    self.child_path(&entry.name),
                    None,
                    false,
                )))),
                _ => Plan::Resolve {
                    path: self.child_path(&entry.name),
                    is_symlink: false,
                },
            },
            EntryKind::File => match previous {
                Some(LazyEntry::File(f)) if !f.is_symlink => {
                    Plan::Ready(LazyEntry::File(Arc::clone(f)))
                }
                _ => Plan::Ready(LazyEntry::File(Arc::new(LazyFile::new(
                    self.child_path(&entry.name),
                    false,
                )))),
            },
            EntryKind::Symlink => Plan::Resolve {
                path: self.child_path(&entry.name),
                is_symlink: true,
            },
            EntryKind::Other => Plan::Skip,
        }
    }

    fn resolve(
        &self,
        prev: Option<&Listing>,
        path: PathBuf,
        is_symlink: bool,
        stat: io::Result<Metadata>,
    ) -> Option<LazyEntry> {
        let meta = match stat {
            Ok(meta) => meta,
            Err(err) => {
                // Removed, dangling or unreadable since the listing was taken
                trace!(path = %path.display(), error = %err, "skipping entry");
                return None;
            }
        };
        let previous = prev.and_then(|l| l.get(&basename(&path)));
        match meta.kind {
            EntryKind::Dir => match previous {
                Some(LazyEntry::Dir(d)) if d.is_symlink == is_symlink => {
                    Some(LazyEntry::Dir(Arc::clone(d)))
                }
                _ => Some(LazyEntry::Dir(Arc::new(
                    self.child_dir(path, meta.modified, is_symlink),
                ))),
            },
            EntryKind::File => match previous {
                Some(LazyEntry::File(f)) if f.is_symlink == is_symlink => {
                    Some(LazyEntry::File(Arc::clone(f)))
                }
                _ => Some(LazyEntry::File(Arc::new(LazyFile::new(path, is_symlink)))),
            },
            EntryKind::Symlink | EntryKind::Other => None,
        }
    }

    fn child_dir(&self, path: PathBuf, mtime: Option<SystemTime>, is_symlink: bool) -> LazyDir {
        LazyDir::new(self.clock.clone(), path, mtime, is_symlink, self.no_cache)
    }

    fn store(
        &self,
        now: u64,
        children: Vec<LazyEntry>,
        restat: Option<Option<SystemTime>>,
    ) -> Arc<Listing> {
        let listing = Arc::new(Listing::new(children));
        debug!(
            path = %self.path.display(),
            generation = now,
            entries = listing.len(),
            "relisted directory"
        );
        let mut state = self.state.lock();
        if let Some(mtime) = restat {
            state.mtime = mtime;
            state.last_stat_time = Some(now);
        }
        state.listing = Some(Arc::clone(&listing));
        state.last_list_time = Some(now);
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryFs;

    fn names(listing: &Listing) -> Vec<&str> {
        listing.entries().iter().map(|e| e.name()).collect()
    }

    fn tree() -> MemoryFs {
        let fs = MemoryFs::new();
        fs.add_file("/src/b.txt");
        fs.add_file("/src/a.txt");
        fs.add_dir("/src/sub");
        fs.add_file("/src/sub/c.txt");
        fs
    }

    #[test]
    fn lists_children_in_name_order() {
        let fs = tree();
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/src".into(), false);
        clock.advance();

        let listing = dir.listing(&fs);
        assert_eq!(names(&listing), vec!["a.txt", "b.txt", "sub"]);
        assert!(listing.get("sub").unwrap().is_dir());
        assert!(!listing.get("a.txt").unwrap().is_dir());
    }

    #[test]
    fn same_generation_costs_no_syscalls() {
        let fs = tree();
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/src".into(), false);
        clock.advance();

        let first = dir.listing(&fs);
        let (stats, reads) = (fs.stat_count("/src"), fs.read_dir_count("/src"));
        let second = dir.listing(&fs);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.stat_count("/src"), stats);
        assert_eq!(fs.read_dir_count("/src"), reads);
    }

    #[test]
    fn unchanged_mtime_skips_read_dir() {
        let fs = tree();
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/src".into(), false);
        clock.advance();
        let first = dir.listing(&fs);
        assert_eq!(fs.read_dir_count("/src"), 1);

        clock.advance();
        let second = dir.listing(&fs);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.read_dir_count("/src"), 1);
        assert_eq!(fs.stat_count("/src"), 2);
    }

    #[test]
    fn root_records_mtime_on_first_listing() {
        let fs = tree();
        let clock = LogicalClock::new();
        clock.advance();
        let root = LazyDir::root(clock.clone(), "/".into(), false);

        root.listing(&fs);
        assert_eq!(fs.stat_count("/"), 1);
        assert_eq!(fs.read_dir_count("/"), 1);

        clock.advance();
        root.listing(&fs);
        assert_eq!(fs.stat_count("/"), 2);
        assert_eq!(fs.read_dir_count("/"), 1);
    }

    #[test]
    fn changed_mtime_relists_and_reuses_children() {
        let fs = tree();
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/src".into(), false);
        clock.advance();
        let first = dir.listing(&fs);

        fs.add_file("/src/d.txt");
        clock.advance();
        let second = dir.listing(&fs);
        assert_eq!(fs.read_dir_count("/src"), 2);
        assert_eq!(names(&second), vec!["a.txt", "b.txt", "d.txt", "sub"]);

        let (LazyEntry::Dir(old), LazyEntry::Dir(new)) =
            (first.get("sub").unwrap(), second.get("sub").unwrap())
        else {
            panic!("sub should stay a directory");
        };
        assert!(Arc::ptr_eq(old, new));
    }

    #[test]
    fn type_change_replaces_child() {
        let fs = tree();
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/src".into(), false);
        clock.advance();
        dir.listing(&fs);

        fs.remove("/src/a.txt");
        fs.add_dir("/src/a.txt");
        clock.advance();
        let listing = dir.listing(&fs);
        assert!(listing.get("a.txt").unwrap().is_dir());
    }

    #[test]
    fn missing_directory_lists_empty() {
        let fs = tree();
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/nowhere".into(), false);
        clock.advance();
        assert!(dir.listing(&fs).is_empty());
    }

    #[test]
    fn dangling_symlink_is_skipped() {
        let fs = tree();
        fs.symlink("/src/broken", "/does/not/exist");
        fs.symlink("/src/link", "/src/sub");
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/src".into(), false);
        clock.advance();

        let listing = dir.listing(&fs);
        assert!(listing.get("broken").is_none());
        let link = listing.get("link").unwrap();
        assert!(link.is_dir());
        assert!(link.is_symlink());
    }

    #[test]
    fn no_cache_children_skip_stat() {
        let fs = tree();
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/src".into(), true);

        let listing = dir.listing(&fs);
        assert_eq!(fs.stat_count("/src"), 0);
        assert_eq!(fs.stat_count("/src/sub"), 0);
        let sub = listing.get("sub").and_then(LazyEntry::as_dir).unwrap();
        assert!(sub.no_cache());
        assert_eq!(names(&sub.listing(&fs)), vec!["c.txt"]);
        assert_eq!(fs.stat_count("/src/sub"), 0);
    }

    #[tokio::test]
    async fn async_listing_shares_the_cache() {
        let fs = tree();
        let clock = LogicalClock::new();
        let dir = LazyDir::root(clock.clone(), "/src".into(), false);
        clock.advance();

        let first = dir.listing_async(&fs).await;
        clock.advance();
        let second = dir.listing(&fs);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.read_dir_count("/src"), 1);
    }
}

use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::entry::{DirEntry, Metadata};

/// The filesystem primitives the lazy snapshot is built from.
///
/// Implement this to glob over something other than the host filesystem,
/// or to wrap [`OsFileSystem`](crate::OsFileSystem) with instrumentation.
///
/// # Error Handling
///
/// Errors are never fatal to a query. A failing `read_dir` on a directory
/// makes it look empty for the current generation; a failing `stat` on an
/// entry drops that entry from its parent's listing. Return whatever
/// `io::Error` the underlying layer produced.
///
/// # Thread Safety
///
/// `Send + Sync` are required: the async drivers read sibling directories
/// concurrently and the engine may be shared across threads.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Metadata for `path`, following symbolic links.
    fn stat(&self, path: &Path) -> io::Result<Metadata>;

    /// Entries of the directory at `path`, in any order, without following links.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Suspending variant of [`stat`](FileSystem::stat).
    async fn stat_async(&self, path: &Path) -> io::Result<Metadata>;

    /// Suspending variant of [`read_dir`](FileSystem::read_dir).
    async fn read_dir_async(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::entry::{DirEntry, EntryKind, Metadata};
use crate::traits::FileSystem;

/// [`FileSystem`] backed by `std::fs`, with `tokio::fs` for the async calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

fn metadata(meta: std::fs::Metadata) -> Metadata {
    Metadata {
        kind: EntryKind::from(meta.file_type()),
        modified: meta.modified().ok(),
    }
}

#[async_trait]
impl FileSystem for OsFileSystem {
    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        std::fs::metadata(path).map(metadata)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            // A single unreadable record does not spoil the rest of the listing
            let Ok(entry) = entry else {
                continue;
            };
            // Non-UTF-8 names cannot be expressed in a pattern
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let kind = match entry.file_type() {
                Ok(ft) => EntryKind::from(ft),
                Err(_) => EntryKind::Other,
            };
            entries.push(DirEntry { name, kind });
        }
        Ok(entries)
    }

    async fn stat_async(&self, path: &Path) -> io::Result<Metadata> {
        tokio::fs::metadata(path).await.map(metadata)
    }

    async fn read_dir_async(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(path).await?;
        // Keep what was read before a failing record
        while let Ok(Some(entry)) = dir.next_entry().await {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let kind = match entry.file_type().await {
                Ok(ft) => EntryKind::from(ft),
                Err(_) => EntryKind::Other,
            };
            entries.push(DirEntry { name, kind });
        }
        Ok(entries)
    }
}

use std::time::SystemTime;

/// A single record produced by [`FileSystem::read_dir`](crate::traits::FileSystem::read_dir).
///
/// Only the name and the kind reported by the directory listing itself are
/// carried. Symbolic links are reported as [`EntryKind::Symlink`]; resolving
/// what they point at is a separate `stat` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// The entry's final path segment.
    pub name: String,

    /// What the listing says this entry is.
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The result of a [`FileSystem::stat`](crate::traits::FileSystem::stat) call.
///
/// `stat` follows symbolic links, so `kind` is never [`EntryKind::Symlink`]
/// for a well-behaved implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryKind,

    /// Last modification time. `None` when the platform cannot report it,
    /// in which case the directory is re-listed on every generation.
    pub modified: Option<SystemTime>,
}

/// The kind of a filesystem entry.
///
/// Filesystem implementations map native file types to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Dir,

    /// A symbolic link.
    Symlink,

    /// Anything else (device files, pipes, sockets, etc.).
    Other,
}

impl From<std::fs::FileType> for EntryKind {
    fn from(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }
}

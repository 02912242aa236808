//! In-memory [`FileSystem`] for unit tests: explicit mtimes and syscall counters.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::entry::{DirEntry, EntryKind, Metadata};
use crate::traits::FileSystem;

#[derive(Debug, Clone)]
enum Node {
    Dir { mtime: u64 },
    File,
    Symlink(PathBuf),
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<PathBuf, Node>,
    tick: u64,
    stats: HashMap<PathBuf, usize>,
    reads: HashMap<PathBuf, usize>,
}

pub(crate) struct MemoryFs {
    inner: Mutex<Inner>,
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.nodes.insert(PathBuf::from("/"), Node::Dir { mtime: 0 });
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn add_dir(&self, path: &str) {
        self.insert(Path::new(path), |tick| Node::Dir { mtime: tick });
    }

    pub fn add_file(&self, path: &str) {
        self.insert(Path::new(path), |_| Node::File);
    }

    pub fn symlink(&self, link: &str, target: &str) {
        let target = PathBuf::from(target);
        self.insert(Path::new(link), move |_| Node::Symlink(target.clone()));
    }

    pub fn remove(&self, path: &str) {
        let path = Path::new(path);
        let mut inner = self.inner.lock();
        inner.nodes.retain(|p, _| !p.starts_with(path));
        if let Some(parent) = path.parent() {
            Self::bump(&mut inner, parent);
        }
    }

    pub fn stat_count(&self, path: &str) -> usize {
        self.inner.lock().stats.get(Path::new(path)).copied().unwrap_or(0)
    }

    pub fn read_dir_count(&self, path: &str) -> usize {
        self.inner.lock().reads.get(Path::new(path)).copied().unwrap_or(0)
    }

    pub fn total_read_dirs(&self) -> usize {
        self.inner.lock().reads.values().sum()
    }

    fn insert(&self, path: &Path, node: impl Fn(u64) -> Node) {
        let mut inner = self.inner.lock();
        let mut current = PathBuf::new();
        let components: Vec<_> = path.components().collect();
        for (i, component) in components.iter().enumerate() {
            current.push(component);
            if i + 1 == components.len() {
                inner.tick += 1;
                let made = node(inner.tick);
                inner.nodes.insert(current.clone(), made);
            } else if !inner.nodes.contains_key(&current) {
                inner.tick += 1;
                let tick = inner.tick;
                inner.nodes.insert(current.clone(), Node::Dir { mtime: tick });
                if let Some(parent) = current.parent() {
                    Self::bump(&mut inner, parent);
                }
            }
        }
        if let Some(parent) = path.parent() {
            Self::bump(&mut inner, parent);
        }
    }

    fn bump(inner: &mut Inner, dir: &Path) {
        inner.tick += 1;
        let tick = inner.tick;
        if let Some(Node::Dir { mtime }) = inner.nodes.get_mut(dir) {
            *mtime = tick;
        }
    }

    /// Resolve symbolic links in every prefix of `path`.
    fn resolve(nodes: &HashMap<PathBuf, Node>, path: &Path) -> Option<PathBuf> {
        let mut resolved = PathBuf::new();
        for component in path.components() {
            resolved.push(component);
            let mut hops = 0;
            while let Some(Node::Symlink(target)) = nodes.get(&resolved) {
                hops += 1;
                if hops > 16 {
                    return None;
                }
                resolved = target.clone();
            }
        }
        Some(resolved)
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, path.display().to_string())
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let mut inner = self.inner.lock();
        *inner.stats.entry(path.to_path_buf()).or_default() += 1;
        let resolved = Self::resolve(&inner.nodes, path).ok_or_else(|| Self::not_found(path))?;
        match inner.nodes.get(&resolved) {
            Some(Node::Dir { mtime }) => Ok(Metadata {
                kind: EntryKind::Dir,
                modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(*mtime)),
            }),
            Some(Node::File) => Ok(Metadata {
                kind: EntryKind::File,
                modified: Some(SystemTime::UNIX_EPOCH),
            }),
            _ => Err(Self::not_found(path)),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut inner = self.inner.lock();
        *inner.reads.entry(path.to_path_buf()).or_default() += 1;
        let resolved = Self::resolve(&inner.nodes, path).ok_or_else(|| Self::not_found(path))?;
        if !matches!(inner.nodes.get(&resolved), Some(Node::Dir { .. })) {
            return Err(Self::not_found(path));
        }
        let entries = inner
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(resolved.as_path()))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_str()?.to_string();
                let kind = match node {
                    Node::Dir { .. } => EntryKind::Dir,
                    Node::File => EntryKind::File,
                    Node::Symlink(_) => EntryKind::Symlink,
                };
                Some(DirEntry { name, kind })
            })
            .collect();
        Ok(entries)
    }

    async fn stat_async(&self, path: &Path) -> io::Result<Metadata> {
        self.stat(path)
    }

    async fn read_dir_async(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.read_dir(path)
    }
}

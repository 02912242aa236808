//! Lexical path helpers used by the query facade and the pattern compiler.
//!
//! Nothing here touches the filesystem: `..` is resolved textually, the same
//! way the patterns themselves are.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base`, normalizing `.` and `..` components.
///
/// An absolute `path` ignores `base`. `..` never climbs above the root.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    let joined = base.join(path);
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // pop() refuses to remove the root, which is what we want
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// The directory a scan for `cwd` starts from: the filesystem root `cwd` lives
/// under (`/` on Unix, the drive root on Windows).
///
/// Every query below the same root shares one cached snapshot.
pub fn root_dir(cwd: &Path) -> PathBuf {
    let mut root = PathBuf::new();
    for component in cwd.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => root.push(component.as_os_str()),
            _ => break,
        }
    }
    root
}

/// The final segment of `path`, or the whole path when it has none (a root).
pub fn basename(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

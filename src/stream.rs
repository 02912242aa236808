//! Incremental traversal: paths are produced one at a time, depth first,
//! and each directory is only read when the consumer pulls past its parent's
//! entry. Dropping the stream stops all further I/O.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, Stream};

use crate::engine::{admits, evaluate};
use crate::lazy::{LazyDir, Listing};
use crate::matcher::Matcher;
use crate::options::MatchOptions;
use crate::traits::FileSystem;

/// Lazily produced glob results.
pub type GlobStream = Pin<Box<dyn Stream<Item = PathBuf> + Send>>;

struct Frame {
    dir: Arc<LazyDir>,
    matchers: Vec<Arc<Matcher>>,
    listing: Option<Arc<Listing>>,
    cursor: usize,
}

impl Frame {
    fn new(dir: Arc<LazyDir>, matchers: Vec<Arc<Matcher>>) -> Self {
        Self {
            dir,
            matchers,
            listing: None,
            cursor: 0,
        }
    }
}

struct Walk {
    fs: Arc<dyn FileSystem>,
    options: MatchOptions,
    stack: Vec<Frame>,
}

impl Walk {
    async fn next_path(&mut self) -> Option<PathBuf> {
        loop {
            let frame = self.stack.last_mut()?;
            let listing = match &frame.listing {
                Some(listing) => Arc::clone(listing),
                None => {
                    let listing = frame.dir.listing_async(self.fs.as_ref()).await;
                    frame.listing = Some(Arc::clone(&listing));
                    listing
                }
            };

            let Some(entry) = listing.entries().get(frame.cursor).cloned() else {
                self.stack.pop();
                continue;
            };
            frame.cursor += 1;

            if !admits(&entry, &self.options) {
                continue;
            }
            let verdict = evaluate(&entry, &self.options, &frame.matchers);
            // Queued now, read on the next pull: the entry itself is reported first
            if let Some((dir, matchers)) = verdict.descend {
                self.stack.push(Frame::new(dir, matchers));
            }
            if verdict.include {
                return Some(entry.path().to_path_buf());
            }
        }
    }
}

pub(crate) fn match_in_dir_stream(
    fs: Arc<dyn FileSystem>,
    root: Arc<LazyDir>,
    options: MatchOptions,
    matchers: Vec<Arc<Matcher>>,
) -> GlobStream {
    let walk = Walk {
        fs,
        options,
        stack: vec![Frame::new(root, matchers)],
    };
    Box::pin(stream::unfold(walk, |mut walk| async move {
        let path = walk.next_path().await?;
        Some((path, walk))
    }))
}

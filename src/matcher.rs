//! The compiled form of a pattern list: one [`Matcher`] per path segment,
//! chained through `next`.

use std::sync::{Arc, OnceLock};

use crate::compile::SegmentGlob;
use crate::lazy::LazyEntry;
use crate::options::MatchOptions;

/// What one matcher says about one entry at one depth.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// Not a match; drop this matcher for the branch.
    None,
    /// The segment matched. The carried continuation applies to the entry's children.
    Next(Arc<Matcher>),
    /// The whole pattern is consumed by this entry.
    Terminal,
    /// Recursive wildcard: stays active one level deeper, and its continuation
    /// (if any) is tried against this same entry.
    Recur,
    /// The segment may be skipped here; try the continuation against this same entry.
    TryNext,
    /// The entry matched as a whole directory without consuming the pattern further.
    Directory,
}

/// How a single path segment is matched.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Exact name.
    Literal(String),
    /// Single-segment glob such as `*.rs` or `file[0-9]`.
    Wildcard(SegmentGlob),
    /// `**`: zero or more directory levels.
    Globstar,
    /// Final `**/`: every directory at any depth, never a file.
    DirGlobstar,
    /// Final segment written with a trailing `/`: directories only.
    DirOnly(SegmentGlob),
}

/// One node of the matcher tree.
#[derive(Debug)]
pub struct Matcher {
    segment: Segment,
    negating: bool,
    next: Option<Arc<Matcher>>,
}

impl Matcher {
    pub fn new(segment: Segment, negating: bool, next: Option<Arc<Matcher>>) -> Self {
        Self {
            segment,
            negating,
            next,
        }
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn negating(&self) -> bool {
        self.negating
    }

    pub fn next(&self) -> Option<&Arc<Matcher>> {
        self.next.as_ref()
    }

    /// Evaluate this matcher against `entry`.
    pub fn match_entry(&self, entry: &LazyEntry, options: &MatchOptions) -> MatchOutcome {
        match &self.segment {
            Segment::Literal(name) => {
                if entry.name() == name {
                    self.consumed()
                } else {
                    MatchOutcome::None
                }
            }
            Segment::Wildcard(glob) => {
                if glob.matches(entry.name(), options.dot) {
                    self.consumed()
                } else {
                    MatchOutcome::None
                }
            }
            Segment::Globstar => self.match_globstar(entry, options),
            Segment::DirGlobstar if !entry.is_dir() => MatchOutcome::None,
            Segment::DirGlobstar => self.match_globstar(entry, options),
            Segment::DirOnly(glob) => {
                if !entry.is_dir() || !glob.matches(entry.name(), options.dot) {
                    MatchOutcome::None
                } else if self.negating {
                    MatchOutcome::Terminal
                } else {
                    MatchOutcome::Directory
                }
            }
        }
    }

    fn consumed(&self) -> MatchOutcome {
        match &self.next {
            Some(next) => MatchOutcome::Next(Arc::clone(next)),
            None => MatchOutcome::Terminal,
        }
    }

    fn match_globstar(&self, entry: &LazyEntry, options: &MatchOptions) -> MatchOutcome {
        // `**` never wanders into dot-named entries unless asked to, but
        // whatever follows it may still name one explicitly.
        if !options.dot && entry.name().starts_with('.') {
            return match self.next {
                Some(_) => MatchOutcome::TryNext,
                None => MatchOutcome::None,
            };
        }
        match (&self.next, entry.is_dir()) {
            (_, true) if self.negating && self.next.is_none() => MatchOutcome::Terminal,
            (_, true) => MatchOutcome::Recur,
            (Some(_), false) => MatchOutcome::TryNext,
            (None, false) => MatchOutcome::Terminal,
        }
    }
}

/// The shared `**` used to pull in everything below an expanded directory.
pub fn recursive_wildcard() -> Arc<Matcher> {
    static RECURSE: OnceLock<Arc<Matcher>> = OnceLock::new();
    Arc::clone(RECURSE.get_or_init(|| Arc::new(Matcher::new(Segment::Globstar, false, None))))
}

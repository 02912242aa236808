//! Pattern compiler: turns pattern strings into the matcher list the
//! traversal engine consumes.
//!
//! Supported syntax, per `/`-separated segment:
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]`, `[!abc]` / `[^abc]` character classes
//! - `\x` matches `x` literally
//! - `**` as a whole segment matches zero or more directory levels
//! - `{a,b}` brace alternatives, expanded before splitting (may span segments)
//! - a leading `!` negates the pattern, a trailing `/` selects directories only
//!
//! Relative patterns are anchored at the query's cwd, `/`-prefixed ones at the
//! scan root. `.` segments are dropped and `..` removes the literal segment
//! before it.

use std::path::Path;
use std::sync::Arc;

use crate::error::GlobError;
use crate::matcher::{Matcher, Segment};
use crate::options::MatchOptions;

// ---------------------------------------------------------------------------
// compile_matchers()
// ---------------------------------------------------------------------------

/// Compile `patterns` into the active matcher set for `root_dir`.
///
/// The returned list is ordered highest priority first: the last pattern
/// comes first, so a later negation is seen before the inclusions it overrides.
pub fn compile_matchers(
    options: &MatchOptions,
    patterns: &[String],
    root_dir: &Path,
) -> Result<Vec<Arc<Matcher>>, GlobError> {
    let mut matchers = Vec::new();
    for pattern in patterns {
        let (negating, body) = strip_negation(pattern);
        if body.is_empty() {
            return Err(GlobError::EmptyPattern);
        }
        for expanded in expand_braces(body) {
            let segments = segments(pattern, &expanded, &options.cwd, root_dir)?;
            let mut next = None;
            for segment in segments.into_iter().rev() {
                next = Some(Arc::new(Matcher::new(segment, negating, next)));
            }
            // A pattern naming the root itself has nothing to match below it
            matchers.extend(next);
        }
    }
    matchers.reverse();
    Ok(matchers)
}

/// Leading `!`s toggle negation.
fn strip_negation(pattern: &str) -> (bool, &str) {
    let body = pattern.trim_start_matches('!');
    let bangs = pattern.len() - body.len();
    (bangs % 2 == 1, body)
}

fn segments(
    original: &str,
    pattern: &str,
    cwd: &Path,
    root_dir: &Path,
) -> Result<Vec<Segment>, GlobError> {
    let (anchor, rest) = match pattern.strip_prefix('/') {
        Some(rest) => (root_dir, rest),
        None => (cwd, pattern),
    };
    let base = anchor
        .strip_prefix(root_dir)
        .map_err(|_| GlobError::invalid(original, "outside the scan root"))?;

    let mut segments: Vec<Segment> = base
        .components()
        .map(|c| Segment::Literal(c.as_os_str().to_string_lossy().into_owned()))
        .collect();

    let dir_only = rest.ends_with('/');
    for part in rest.split('/') {
        match part {
            "" | "." => {}
            ".." => match segments.last() {
                Some(Segment::Literal(_)) => {
                    segments.pop();
                }
                // `..` at the root stays at the root
                None => {}
                Some(_) => return Err(GlobError::invalid(original, "`..` after a wildcard")),
            },
            "**" => {
                if !matches!(segments.last(), Some(Segment::Globstar)) {
                    segments.push(Segment::Globstar);
                }
            }
            _ => {
                let glob = SegmentGlob::parse(part)
                    .map_err(|reason| GlobError::invalid(original, reason))?;
                segments.push(match glob.as_literal() {
                    Some(name) => Segment::Literal(name),
                    None => Segment::Wildcard(glob),
                });
            }
        }
    }

    if dir_only {
        let last = segments.pop();
        segments.extend(last.map(|segment| match segment {
            Segment::Literal(name) => Segment::DirOnly(SegmentGlob::literal(&name)),
            Segment::Wildcard(glob) => Segment::DirOnly(glob),
            Segment::Globstar => Segment::DirGlobstar,
            other => other,
        }));
    }

    Ok(segments)
}

// ---------------------------------------------------------------------------
// Brace expansion
// ---------------------------------------------------------------------------

/// Expand `{a,b}` groups into separate patterns. Nested groups expand
/// recursively; an unbalanced brace is kept as a literal character.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();

    // First top-level group
    let mut depth = 0usize;
    let mut start = None;
    let mut end = None;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
        i += 1;
    }

    let (Some(start), Some(end)) = (start, end) else {
        return vec![pattern.to_string()];
    };

    let prefix: String = chars[..start].iter().collect();
    let suffix: String = chars[end + 1..].iter().collect();
    let inner: String = chars[start + 1..end].iter().collect();

    split_alternatives(&inner)
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
        .collect()
}

/// Split brace content on top-level commas.
fn split_alternatives(content: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut escaped = false;

    for c in content.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                current.push(c);
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => alternatives.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    alternatives.push(current);
    alternatives
}

// ---------------------------------------------------------------------------
// SegmentGlob
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Char(char),
    AnyChar,
    AnyRun,
    Class { negated: bool, items: Vec<ClassItem> },
}

#[derive(Debug, Clone, PartialEq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

impl ClassItem {
    fn contains(&self, c: char) -> bool {
        match *self {
            ClassItem::Single(s) => s == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
        }
    }
}

/// A glob for one path segment, parsed once at compile time.
#[derive(Debug, Clone)]
pub struct SegmentGlob {
    source: String,
    tokens: Vec<Token>,
}

impl SegmentGlob {
    /// Parse one segment. The error is a human-readable reason.
    pub fn parse(segment: &str) -> Result<Self, String> {
        let chars: Vec<char> = segment.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '*' => {
                    // Runs of stars collapse
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                }
                '?' => tokens.push(Token::AnyChar),
                '\\' => {
                    i += 1;
                    tokens.push(Token::Char(chars.get(i).copied().unwrap_or('\\')));
                }
                '[' => {
                    let (token, consumed) = parse_class(&chars[i..])
                        .ok_or_else(|| format!("unterminated character class in `{segment}`"))?;
                    tokens.push(token);
                    i += consumed;
                    continue;
                }
                c => tokens.push(Token::Char(c)),
            }
            i += 1;
        }
        Ok(Self {
            source: segment.to_string(),
            tokens,
        })
    }

    /// A glob that matches exactly `name`.
    pub fn literal(name: &str) -> Self {
        Self {
            source: name.to_string(),
            tokens: name.chars().map(Token::Char).collect(),
        }
    }

    /// The unescaped text, when the segment contains no wildcards.
    pub fn as_literal(&self) -> Option<String> {
        self.tokens
            .iter()
            .map(|t| match t {
                Token::Char(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a whole entry name. Names starting with `.` only match when `dot`
    /// is set or the glob itself starts with a literal `.`.
    pub fn matches(&self, name: &str, dot: bool) -> bool {
        if name.starts_with('.') && !dot && self.tokens.first() != Some(&Token::Char('.')) {
            return false;
        }
        let name: Vec<char> = name.chars().collect();
        let tokens = &self.tokens;

        // Greedy with a single backtrack point: the most recent `*`.
        let (mut t, mut n) = (0, 0);
        let mut star: Option<(usize, usize)> = None;
        while n < name.len() {
            let step = match tokens.get(t) {
                Some(Token::AnyRun) => {
                    star = Some((t, n));
                    t += 1;
                    continue;
                }
                Some(Token::AnyChar) => true,
                Some(Token::Char(c)) => *c == name[n],
                Some(Token::Class { negated, items }) => {
                    items.iter().any(|item| item.contains(name[n])) != *negated
                }
                None => false,
            };
            if step {
                t += 1;
                n += 1;
            } else if let Some((st, sn)) = star {
                t = st + 1;
                n = sn + 1;
                star = Some((st, sn + 1));
            } else {
                return false;
            }
        }
        tokens[t..].iter().all(|tok| *tok == Token::AnyRun)
    }
}

/// Parse `[...]` at the start of `chars`. Returns the token and how many
/// characters it spans, or `None` when the class is never closed.
fn parse_class(chars: &[char]) -> Option<(Token, usize)> {
    let mut i = 1;
    let negated = matches!(chars.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }
    let first = i;
    let mut items = Vec::new();
    loop {
        let c = *chars.get(i)?;
        // `]` right after the opening is a literal member
        if c == ']' && i > first {
            return Some((Token::Class { negated, items }, i + 1));
        }
        if chars.get(i + 1) == Some(&'-') && chars.get(i + 2).is_some_and(|&e| e != ']') {
            items.push(ClassItem::Range(c, chars[i + 2]));
            i += 3;
        } else {
            items.push(ClassItem::Single(c));
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn glob(pattern: &str, name: &str) -> bool {
        SegmentGlob::parse(pattern).unwrap().matches(name, false)
    }

    #[test]
    fn star_and_question() {
        assert!(glob("*", "anything"));
        assert!(glob("*.rs", "main.rs"));
        assert!(!glob("*.rs", "main.txt"));
        assert!(glob("a*b*c", "aXXXbYYYc"));
        assert!(glob("test?", "test1"));
        assert!(!glob("?", "ab"));
        assert!(glob("*.tar.gz", "archive.tar.gz"));
        assert!(!glob("*.*.txt", "file.txt"));
    }

    #[test]
    fn character_classes() {
        assert!(glob("[abc]", "b"));
        assert!(!glob("[abc]", "d"));
        assert!(glob("file[0-9].txt", "file5.txt"));
        assert!(glob("[!a-z]", "5"));
        assert!(glob("[^abc]", "d"));
        assert!(glob("[]abc]", "]"));
        assert!(glob("[-a]", "-"));
        assert!(SegmentGlob::parse("[abc").is_err());
    }

    #[test]
    fn escapes_are_literal() {
        assert!(glob("\\*", "*"));
        assert!(!glob("\\*", "a"));
        assert_eq!(SegmentGlob::parse("a\\[1\\]").unwrap().as_literal().as_deref(), Some("a[1]"));
        assert_eq!(SegmentGlob::parse("a*").unwrap().as_literal(), None);
    }

    #[test]
    fn dotfiles_need_dot_or_explicit_dot() {
        assert!(!glob("*", ".env"));
        assert!(glob(".*", ".env"));
        assert!(SegmentGlob::parse("*").unwrap().matches(".env", true));
    }

    #[test]
    fn pathological_patterns_finish() {
        let pattern = format!("{}b", "*a".repeat(50));
        assert!(!glob(&pattern, &"a".repeat(200)));
    }

    #[test]
    fn brace_expansion() {
        assert_eq!(expand_braces("simple"), vec!["simple"]);
        assert_eq!(expand_braces("x{a,b}y"), vec!["xay", "xby"]);
        assert_eq!(expand_braces("{a,{b,c}}"), vec!["a", "b", "c"]);
        assert_eq!(expand_braces("src/{lib,bin}/*.rs"), vec!["src/lib/*.rs", "src/bin/*.rs"]);
        assert_eq!(expand_braces("test{,s}"), vec!["test", "tests"]);
        assert_eq!(expand_braces("{abc"), vec!["{abc"]);
        assert_eq!(expand_braces("abc}"), vec!["abc}"]);
    }

    fn opts(cwd: &str) -> MatchOptions {
        MatchOptions {
            cwd: PathBuf::from(cwd),
            ..MatchOptions::default()
        }
    }

    fn describe(m: &Arc<Matcher>) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = Some(m);
        while let Some(node) = current {
            out.push(match node.segment() {
                Segment::Literal(s) => s.clone(),
                Segment::Wildcard(g) => format!("~{}", g.as_str()),
                Segment::Globstar => "**".into(),
                Segment::DirGlobstar => "**/".into(),
                Segment::DirOnly(g) => format!("{}/", g.as_str()),
            });
            current = node.next();
        }
        out
    }

    #[cfg(unix)]
    #[test]
    fn relative_patterns_are_anchored_at_cwd() {
        let matchers =
            compile_matchers(&opts("/work/app"), &["src/**/*.rs".to_string()], Path::new("/"))
                .unwrap();
        assert_eq!(matchers.len(), 1);
        assert_eq!(describe(&matchers[0]), vec!["work", "app", "src", "**", "~*.rs"]);
    }

    #[cfg(unix)]
    #[test]
    fn dot_segments_resolve_lexically() {
        let pats = vec!["./a/../b/./c".to_string(), "../x".to_string(), "/etc/*.conf".to_string()];
        let matchers = compile_matchers(&opts("/work/app"), &pats, Path::new("/")).unwrap();
        assert_eq!(describe(&matchers[2]), vec!["work", "app", "b", "c"]);
        assert_eq!(describe(&matchers[1]), vec!["work", "x"]);
        assert_eq!(describe(&matchers[0]), vec!["etc", "~*.conf"]);
    }

    #[cfg(unix)]
    #[test]
    fn later_patterns_come_first_and_keep_negation() {
        let pats = vec!["**".to_string(), "!**/b.txt".to_string()];
        let matchers = compile_matchers(&opts("/src"), &pats, Path::new("/")).unwrap();
        assert!(matchers[0].negating());
        assert!(!matchers[1].negating());
        assert!(matchers[0].next().unwrap().negating());
        assert_eq!(describe(&matchers[0]), vec!["src", "**", "b.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn trailing_slash_selects_directories() {
        let pats = vec!["lib/".to_string(), "lib/**/".to_string()];
        let matchers = compile_matchers(&opts("/src"), &pats, Path::new("/")).unwrap();
        assert_eq!(describe(&matchers[1]), vec!["src", "lib/"]);
        assert_eq!(describe(&matchers[0]), vec!["src", "lib", "**/"]);
    }

    #[cfg(unix)]
    #[test]
    fn invalid_patterns_are_reported() {
        let err = compile_matchers(&opts("/src"), &["".to_string()], Path::new("/")).unwrap_err();
        assert!(matches!(err, GlobError::EmptyPattern));

        let err = compile_matchers(&opts("/src"), &["*/../x".to_string()], Path::new("/"))
            .unwrap_err();
        assert_eq!(err.pattern(), Some("*/../x"));

        let err =
            compile_matchers(&opts("/src"), &["[a-".to_string()], Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn double_negation_cancels() {
        assert_eq!(strip_negation("!!a"), (false, "a"));
        assert_eq!(strip_negation("!a"), (true, "a"));
    }
}

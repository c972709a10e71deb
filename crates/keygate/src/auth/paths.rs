//! Public-path allowlist matching.
//!
//! Patterns use Ant-style glob semantics: `*` matches exactly one path
//! segment (or a run of characters inside a literal segment), `**` matches
//! any number of segments including none. The set is compiled once at
//! startup and is read-only afterwards.

use thiserror::Error;

/// Errors raised while compiling the public-path allowlist.
///
/// These are fatal at startup: a gateway with a half-parsed allowlist must
/// not come up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("public path pattern is empty")]
    Empty,

    #[error("public path pattern '{0}' must start with '/'")]
    NotAbsolute(String),

    #[error("public path pattern '{0}': '**' must be a whole segment")]
    MisplacedDoubleStar(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Exact segment text.
    Literal(String),
    /// `*`: exactly one segment, any content.
    AnySingle,
    /// `**`: zero or more segments.
    AnyMany,
    /// Segment with embedded `*` wildcards, e.g. `*.png`.
    Wildcard(String),
}

#[derive(Debug, Clone)]
struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    fn compile(raw: &str) -> Result<Self, PatternError> {
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute(raw.to_string()));
        }

        let mut segments = Vec::new();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            let segment = if part == "**" {
                Segment::AnyMany
            } else if part == "*" {
                Segment::AnySingle
            } else if part.contains("**") {
                return Err(PatternError::MisplacedDoubleStar(raw.to_string()));
            } else if part.contains('*') {
                Segment::Wildcard(part.to_string())
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    fn matches(&self, path: &[&str]) -> bool {
        match_segments(&self.segments, path)
    }
}

/// Match pattern segments against path segments.
///
/// Iterative two-pointer match with backtracking to the last `**`, the same
/// shape [`wildcard_matches`] uses at the character level. Request paths are
/// attacker-controlled, so this must not recurse per segment.
fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_t = 0usize;

    while t < path.len() {
        if p < pattern.len() && pattern[p] == Segment::AnyMany {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if p < pattern.len() && segment_matches(&pattern[p], path[t]) {
            p += 1;
            t += 1;
        } else if let Some(sp) = star {
            // Widen the last `**` by one segment and retry.
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == Segment::AnyMany {
        p += 1;
    }
    p == pattern.len()
}

fn segment_matches(pattern: &Segment, segment: &str) -> bool {
    match pattern {
        Segment::Literal(text) => text == segment,
        Segment::AnySingle => true,
        Segment::AnyMany => unreachable!("handled in match_segments"),
        Segment::Wildcard(glob) => wildcard_matches(glob, segment),
    }
}

/// Match a single segment against a glob with `*` wildcards.
///
/// Iterative two-pointer match with backtracking to the last `*`.
fn wildcard_matches(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_t = 0usize;

    while t < txt.len() {
        if p < pat.len() && (pat[p] == '*' ) {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if p < pat.len() && pat[p] == txt[t] {
            p += 1;
            t += 1;
        } else if let Some(sp) = star {
            // Widen the last `*` by one character and retry.
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}

/// The compiled public-path allowlist.
///
/// Write-once at startup, read-many per request. Pattern order is preserved
/// from configuration but has no semantic effect; any match allows.
#[derive(Debug, Clone, Default)]
pub struct PublicPathSet {
    patterns: Vec<PathPattern>,
}

impl PublicPathSet {
    /// Compile the configured pattern list. Any malformed pattern fails the
    /// whole set.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| PathPattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether the given request path is exempt from authentication.
    pub fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.patterns.iter().any(|p| p.matches(&segments))
    }

    /// Raw pattern strings, for startup logging.
    pub fn raw_patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.raw.as_str())
    }
}

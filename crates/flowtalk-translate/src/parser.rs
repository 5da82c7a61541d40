//! Content parsing: protected spans and masking.
//!
//! A message is split into translatable prose and protected spans (code
//! fences, inline code, URLs, mentions, hashtags). For translation each
//! protected span is replaced by an opaque token `⟪P{i}⟫` that the external
//! translator passes through unchanged; [`ContentParser::unmask`] restores
//! the original spans byte-for-byte afterwards.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use flowtalk_shared::constants::MAX_CONTENT_CODEPOINTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    CodeFence,
    InlineCode,
    Url,
    Mention,
    Hashtag,
    /// Literal text in the input that happens to look like one of our own
    /// mask tokens. Protected so `unmask` never confuses it with a real one.
    PlaceholderMarker,
}

/// A protected span lifted out of the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub raw: String,
}

/// The masked form of a message plus the spans needed to invert it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Masked {
    pub text: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentViolation {
    #[error("content is empty")]
    Empty,

    #[error("content exceeds {max} code points (got {len})")]
    TooLong { len: usize, max: usize },

    #[error("content contains forbidden pattern '{0}'")]
    Forbidden(&'static str),
}

/// Patterns that are rejected outright rather than protected.
const FORBIDDEN_PATTERNS: [&str; 4] = ["<script", "</script>", "javascript:", "data:text/html"];

#[derive(Debug, Clone)]
pub struct ContentParser {
    max_codepoints: usize,
}

impl ContentParser {
    pub fn new() -> Self {
        Self {
            max_codepoints: MAX_CONTENT_CODEPOINTS,
        }
    }

    pub fn with_max_codepoints(max_codepoints: usize) -> Self {
        Self { max_codepoints }
    }

    /// Check a message against the structural rules. An empty vec means the
    /// content is acceptable. Prose-level issues (unbalanced emphasis and the
    /// like) are a rendering concern and pass through untouched.
    pub fn validate(&self, content: &str) -> Vec<ContentViolation> {
        let mut violations = Vec::new();

        if content.trim().is_empty() {
            violations.push(ContentViolation::Empty);
        }

        let len = content.chars().count();
        if len > self.max_codepoints {
            violations.push(ContentViolation::TooLong {
                len,
                max: self.max_codepoints,
            });
        }

        let lowered = content.to_lowercase();
        for pattern in FORBIDDEN_PATTERNS {
            if lowered.contains(pattern) {
                violations.push(ContentViolation::Forbidden(pattern));
            }
        }

        violations
    }

    /// Replace every protected span with `⟪P{i}⟫` and return the spans in
    /// document order so [`unmask`](Self::unmask) can invert the operation.
    pub fn mask(&self, content: &str) -> Masked {
        let spans = protected_spans(content);

        let mut text = String::with_capacity(content.len());
        let mut segments = Vec::with_capacity(spans.len());
        let mut cursor = 0;

        for (start, end, kind) in spans {
            text.push_str(&content[cursor..start]);
            text.push_str(&format!("\u{27ea}P{}\u{27eb}", segments.len()));
            segments.push(Segment {
                kind,
                raw: content[start..end].to_string(),
            });
            cursor = end;
        }
        text.push_str(&content[cursor..]);

        Masked { text, segments }
    }

    /// Put the protected spans back. Given the unmodified masked text this
    /// reproduces the original content byte-for-byte; after translation it
    /// reinstates the spans wherever their tokens ended up.
    pub fn unmask(&self, masked: &str, segments: &[Segment]) -> String {
        let re = token_regex();
        let mut out = String::with_capacity(masked.len());
        let mut cursor = 0;

        for caps in re.captures_iter(masked) {
            let m = caps.get(0).expect("whole-token match");
            out.push_str(&masked[cursor..m.start()]);

            match caps[1].parse::<usize>().ok().and_then(|i| segments.get(i)) {
                Some(segment) => out.push_str(&segment.raw),
                // A token with no matching segment is left as-is rather than
                // silently dropped.
                None => out.push_str(m.as_str()),
            }
            cursor = m.end();
        }
        out.push_str(&masked[cursor..]);
        out
    }

    /// Whether anything translatable remains once tokens are stripped (the
    /// "message is entirely code" edge).
    pub fn translatable_is_empty(&self, masked: &Masked) -> bool {
        token_regex().replace_all(&masked.text, "").trim().is_empty()
    }
}

impl Default for ContentParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect non-overlapping protected spans. Code fences are found first, then
/// anything already shaped like a mask token (so `mask` never emits a token
/// that collides with literal input), then inline code, URLs, mentions, and
/// hashtags; a lower-priority candidate that overlaps an accepted span is
/// dropped (so a URL inside a fence stays part of the fence).
fn protected_spans(content: &str) -> Vec<(usize, usize, SegmentKind)> {
    let mut spans: Vec<(usize, usize, SegmentKind)> = Vec::new();

    let passes: [(&Regex, SegmentKind); 6] = [
        (fence_regex(), SegmentKind::CodeFence),
        (marker_regex(), SegmentKind::PlaceholderMarker),
        (inline_code_regex(), SegmentKind::InlineCode),
        (url_regex(), SegmentKind::Url),
        (mention_regex(), SegmentKind::Mention),
        (hashtag_regex(), SegmentKind::Hashtag),
    ];

    for (re, kind) in passes {
        for m in re.find_iter(content) {
            let overlapping = spans
                .iter()
                .any(|&(start, end, _)| m.start() < end && start < m.end());
            if !overlapping {
                spans.push((m.start(), m.end(), kind));
            }
        }
    }

    spans.sort_by_key(|&(start, _, _)| start);
    spans
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Non-nesting: the first closing fence terminates the block. Inner single
    // backticks are allowed.
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+\-]*\n?.*?```").expect("fence regex"))
}

fn inline_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`[^`\n]+`").expect("inline code regex"))
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("url regex"))
}

fn mention_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@\w+").expect("mention regex"))
}

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\w+").expect("hashtag regex"))
}

pub(crate) fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\u{27ea}P(\d+)\u{27eb}").expect("token regex"))
}

/// Anything shaped like a mask or glossary token in raw input. Both shapes
/// are lifted out before masking so neither this parser nor the glossary
/// protector can mistake literal text for a marker of its own.
fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\u{27ea}[PG]\d+\u{27eb}").expect("marker regex"))
}

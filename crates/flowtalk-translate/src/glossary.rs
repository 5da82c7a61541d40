//! Glossary protection.
//!
//! Protected terms (brands, acronyms, product names) are swapped for opaque
//! `⟪G{j}⟫` placeholders before the text reaches the external translator and
//! swapped back afterwards. Restoration reinstates the *matched surface
//! form*, so "flowtalk" in the input comes back as "flowtalk" even though the
//! dictionary spells it "FlowTalk".

use std::sync::OnceLock;

use regex::Regex;

use flowtalk_store::{GlossaryCategory, GlossaryTermRecord};

/// A term to keep verbatim through translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryTerm {
    pub term: String,
    pub preserve_case: bool,
}

impl GlossaryTerm {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            preserve_case: true,
        }
    }

    pub fn from_record(record: &GlossaryTermRecord) -> Self {
        Self {
            term: record.term.clone(),
            preserve_case: record.preserve_case,
        }
    }
}

/// One protected occurrence, remembered for restoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryMatch {
    /// The exact substring that was matched.
    surface: String,
    /// The dictionary spelling of the term.
    canonical: String,
    preserve_case: bool,
}

pub struct GlossaryProtector;

impl GlossaryProtector {
    /// Replace whole-word occurrences of the given terms with `⟪G{j}⟫`
    /// placeholders. Terms are applied longest first so "GitHub API" wins
    /// over "API". Matching is ASCII case-insensitive on ASCII word
    /// boundaries.
    pub fn protect(text: &str, terms: &[GlossaryTerm]) -> (String, Vec<GlossaryMatch>) {
        let mut ordered: Vec<&GlossaryTerm> = terms.iter().filter(|t| !t.term.is_empty()).collect();
        ordered.sort_by(|a, b| b.term.chars().count().cmp(&a.term.chars().count()));

        // Spans of accepted matches: (start, end, term index).
        let mut spans: Vec<(usize, usize, usize)> = Vec::new();
        for (idx, term) in ordered.iter().enumerate() {
            for (start, end) in whole_word_occurrences(text, &term.term) {
                let overlapping = spans.iter().any(|&(s, e, _)| start < e && s < end);
                if !overlapping {
                    spans.push((start, end, idx));
                }
            }
        }
        spans.sort_by_key(|&(start, _, _)| start);

        let mut masked = String::with_capacity(text.len());
        let mut matches = Vec::with_capacity(spans.len());
        let mut cursor = 0;

        for (start, end, idx) in spans {
            masked.push_str(&text[cursor..start]);
            masked.push_str(&format!("\u{27ea}G{}\u{27eb}", matches.len()));
            matches.push(GlossaryMatch {
                surface: text[start..end].to_string(),
                canonical: ordered[idx].term.clone(),
                preserve_case: ordered[idx].preserve_case,
            });
            cursor = end;
        }
        masked.push_str(&text[cursor..]);

        (masked, matches)
    }

    /// Replace the placeholders with the protected terms again, wherever the
    /// translator left them.
    pub fn restore(text: &str, matches: &[GlossaryMatch]) -> String {
        let re = glossary_token_regex();
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        for caps in re.captures_iter(text) {
            let m = caps.get(0).expect("whole-token match");
            out.push_str(&text[cursor..m.start()]);

            match caps[1].parse::<usize>().ok().and_then(|j| matches.get(j)) {
                Some(entry) if entry.preserve_case => out.push_str(&entry.surface),
                Some(entry) => out.push_str(&entry.canonical),
                None => out.push_str(m.as_str()),
            }
            cursor = m.end();
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// Layer community terms over a base set. On case-insensitive equality
    /// the overlay wins; a term is never present twice.
    pub fn merge(base: Vec<GlossaryTerm>, overlay: Vec<GlossaryTerm>) -> Vec<GlossaryTerm> {
        let mut merged = overlay;
        for term in base {
            let shadowed = merged
                .iter()
                .any(|t| t.term.eq_ignore_ascii_case(&term.term));
            if !shadowed {
                merged.push(term);
            }
        }
        merged
    }
}

/// Find case-insensitive whole-word occurrences of `term` in `text`. The
/// characters adjacent to a match must not be ASCII word characters.
fn whole_word_occurrences(text: &str, term: &str) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let term_len = term.len();
    if term_len == 0 || term_len > text.len() {
        return found;
    }

    let bytes = text.as_bytes();
    let mut i = 0;
    while i + term_len <= text.len() {
        if !text.is_char_boundary(i) {
            i += 1;
            continue;
        }
        let Some(window) = text.get(i..i + term_len) else {
            i += 1;
            continue;
        };
        if window.eq_ignore_ascii_case(term) {
            let before_ok = i == 0 || !is_ascii_word_byte(bytes[i - 1]);
            let after_ok =
                i + term_len == text.len() || !is_ascii_word_byte(bytes[i + term_len]);
            if before_ok && after_ok {
                found.push((i, i + term_len));
                i += term_len;
                continue;
            }
        }
        i += 1;
    }
    found
}

fn is_ascii_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn glossary_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\u{27ea}G(\d+)\u{27eb}").expect("glossary token regex"))
}

/// The bundled default glossary: technology acronyms, brands and products,
/// frameworks and tools, programming language names.
pub fn default_terms() -> Vec<GlossaryTerm> {
    DEFAULT_GLOSSARY
        .iter()
        .map(|(term, _)| GlossaryTerm::new(term))
        .collect()
}

pub const DEFAULT_GLOSSARY: &[(&str, GlossaryCategory)] = &[
    // Acronyms
    ("API", GlossaryCategory::Technical),
    ("REST", GlossaryCategory::Technical),
    ("GraphQL", GlossaryCategory::Technical),
    ("HTTP", GlossaryCategory::Technical),
    ("HTTPS", GlossaryCategory::Technical),
    ("JSON", GlossaryCategory::Technical),
    ("SQL", GlossaryCategory::Technical),
    ("HTML", GlossaryCategory::Technical),
    ("CSS", GlossaryCategory::Technical),
    ("CLI", GlossaryCategory::Technical),
    ("SDK", GlossaryCategory::Technical),
    ("JWT", GlossaryCategory::Technical),
    ("URL", GlossaryCategory::Technical),
    ("CPU", GlossaryCategory::Technical),
    ("GPU", GlossaryCategory::Technical),
    ("AI", GlossaryCategory::Technical),
    ("ML", GlossaryCategory::Technical),
    // Brands and products
    ("FlowTalk", GlossaryCategory::Brand),
    ("GitHub", GlossaryCategory::Brand),
    ("GitLab", GlossaryCategory::Brand),
    ("Docker", GlossaryCategory::Brand),
    ("Kubernetes", GlossaryCategory::Brand),
    ("Linux", GlossaryCategory::Brand),
    ("Windows", GlossaryCategory::Brand),
    ("macOS", GlossaryCategory::Brand),
    ("PostgreSQL", GlossaryCategory::Brand),
    ("MongoDB", GlossaryCategory::Brand),
    ("Redis", GlossaryCategory::Brand),
    ("SQLite", GlossaryCategory::Brand),
    // Frameworks and tools
    ("React", GlossaryCategory::Technical),
    ("Vue", GlossaryCategory::Technical),
    ("Angular", GlossaryCategory::Technical),
    ("Django", GlossaryCategory::Technical),
    ("Flask", GlossaryCategory::Technical),
    ("Rails", GlossaryCategory::Technical),
    ("Node.js", GlossaryCategory::Technical),
    ("Tokio", GlossaryCategory::Technical),
    ("Cargo", GlossaryCategory::Technical),
    // Programming languages
    ("Rust", GlossaryCategory::ProperNoun),
    ("Python", GlossaryCategory::ProperNoun),
    ("JavaScript", GlossaryCategory::ProperNoun),
    ("TypeScript", GlossaryCategory::ProperNoun),
    ("Java", GlossaryCategory::ProperNoun),
    ("Kotlin", GlossaryCategory::ProperNoun),
    ("Swift", GlossaryCategory::ProperNoun),
    ("Go", GlossaryCategory::ProperNoun),
    ("Ruby", GlossaryCategory::ProperNoun),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(names: &[&str]) -> Vec<GlossaryTerm> {
        names.iter().map(|n| GlossaryTerm::new(n)).collect()
    }

    #[test]
    fn protect_and_restore_round_trip() {
        let list = terms(&["FlowTalk"]);
        let (masked, matches) = GlossaryProtector::protect("FlowTalk is great", &list);

        assert_eq!(masked, "\u{27ea}G0\u{27eb} is great");
        assert_eq!(GlossaryProtector::restore(&masked, &matches), "FlowTalk is great");
    }

    #[test]
    fn surface_case_is_preserved() {
        let list = terms(&["FlowTalk"]);
        let (masked, matches) = GlossaryProtector::protect("i love flowtalk a lot", &list);

        assert!(!masked.contains("flowtalk"));
        assert_eq!(
            GlossaryProtector::restore(&masked, &matches),
            "i love flowtalk a lot"
        );
    }

    #[test]
    fn canonical_spelling_when_case_is_not_preserved() {
        let list = vec![GlossaryTerm {
            term: "FlowTalk".to_string(),
            preserve_case: false,
        }];
        let (masked, matches) = GlossaryProtector::protect("try flowtalk now", &list);
        assert_eq!(
            GlossaryProtector::restore(&masked, &matches),
            "try FlowTalk now"
        );
    }

    #[test]
    fn longer_terms_win() {
        let list = terms(&["API", "GitHub API"]);
        let (masked, matches) = GlossaryProtector::protect("use the GitHub API here", &list);

        assert_eq!(matches.len(), 1);
        assert_eq!(masked, "use the \u{27ea}G0\u{27eb} here");
        assert_eq!(
            GlossaryProtector::restore(&masked, &matches),
            "use the GitHub API here"
        );
    }

    #[test]
    fn whole_word_boundaries() {
        let list = terms(&["Go"]);
        let (masked, matches) = GlossaryProtector::protect("Google is not Go, gone is not Go", &list);

        assert_eq!(matches.len(), 2);
        assert!(masked.starts_with("Google is not"));
        assert_eq!(
            GlossaryProtector::restore(&masked, &matches),
            "Google is not Go, gone is not Go"
        );
    }

    #[test]
    fn multiple_occurrences_each_get_a_placeholder() {
        let list = terms(&["Rust"]);
        let (masked, matches) = GlossaryProtector::protect("Rust here, rust there", &list);

        assert_eq!(matches.len(), 2);
        assert_eq!(masked, "\u{27ea}G0\u{27eb} here, \u{27ea}G1\u{27eb} there");
        assert_eq!(
            GlossaryProtector::restore(&masked, &matches),
            "Rust here, rust there"
        );
    }

    #[test]
    fn merge_overlay_wins_case_insensitively() {
        let base = terms(&["Redis", "API"]);
        let overlay = vec![GlossaryTerm {
            term: "redis".to_string(),
            preserve_case: false,
        }];

        let merged = GlossaryProtector::merge(base, overlay);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].term, "redis");
        assert!(!merged[0].preserve_case);
    }

    #[test]
    fn default_glossary_protects_brands() {
        let list = default_terms();
        let (masked, matches) =
            GlossaryProtector::protect("Deploy the Docker image to Kubernetes", &list);
        assert_eq!(matches.len(), 2);
        assert!(!masked.contains("Docker"));
        assert!(!masked.contains("Kubernetes"));
    }

    #[test]
    fn unknown_placeholder_left_untouched() {
        let out = GlossaryProtector::restore("hello \u{27ea}G9\u{27eb}", &[]);
        assert_eq!(out, "hello \u{27ea}G9\u{27eb}");
    }
}

//! Meeting-request classifier — ordered regex pattern list.
//!
//! Pure keyword matching rather than LLM classification: deterministic,
//! injection-resistant, and cheap enough to run on every message. The
//! pattern list is evaluated in priority order with first-match-wins
//! semantics so precedence stays auditable.

use std::sync::LazyLock;

use regex::Regex;

/// Phrase patterns that mark a text as a scheduling request, in priority
/// order. Matched against the lowercased text as substring searches.
///
/// Known limitation: negation is not handled — "don't schedule a meeting"
/// still matches. Accepted heuristic behavior, pinned by test.
const MEETING_PATTERNS: &[&str] = &[
    // verb + optional article + meeting/call
    r"schedule\s+(?:a\s+)?(?:meeting|call)",
    r"set\s+up\s+(?:a\s+)?(?:meeting|call)",
    r"book\s+(?:a\s+)?(?:meeting|call)",
    r"organize\s+(?:a\s+)?(?:meeting|call)",
    r"plan\s+(?:a\s+)?(?:meeting|call)",
    // polite-request phrasings
    r"can you book",
    r"please book",
    // standalone phrase
    r"calendar\s+invite",
];

static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    MEETING_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Decide whether `text` is a request to schedule something.
///
/// Case-insensitive, total, side-effect free. Returns `true` if any pattern
/// in [`MEETING_PATTERNS`] matches anywhere in the text.
pub fn is_meeting_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    COMPILED.iter().any(|re| re.is_match(&lower))
}

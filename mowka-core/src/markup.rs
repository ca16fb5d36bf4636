//! Scanner for the bracket-tag control sideband in generated replies.
//!
//! The reply generator is instructed to embed control directives inline:
//! the exact literal `[DONE]` marks quest completion, and short tags like
//! `[sadly]` or `[excited]` carry voice expression hints. All recognized
//! tags are stripped from the player-visible text.
//!
//! There is no escaping rule upstream, so the scanner is deliberately
//! strict about tag shape: only bracketed segments of at most two
//! alphabetic words are treated as tags. Anything else inside brackets
//! (citations, math, stray punctuation) is left in the text untouched.

/// The completion marker emitted by a target NPC.
pub const DONE_MARKER: &str = "DONE";

/// Longest bracketed segment the scanner will consider a tag.
const MAX_TAG_LEN: usize = 24;

/// A generated reply with control tags separated from display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// Player-visible text with all recognized tags removed.
    pub text: String,
    /// Whether the reply carried the completion marker.
    pub completed: bool,
    /// Expression hints, in order of appearance.
    pub expressions: Vec<String>,
}

/// Scan a raw generated reply for control tags.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let mut text = String::with_capacity(raw.len());
    let mut completed = false;
    let mut expressions = Vec::new();

    let mut rest = raw;
    while let Some(open) = rest.find('[') {
        let (before, bracketed) = rest.split_at(open);
        text.push_str(before);

        match bracketed[1..].find(']') {
            Some(close) => {
                let inner = &bracketed[1..close + 1];
                if inner == DONE_MARKER {
                    completed = true;
                } else if is_expression_tag(inner) {
                    expressions.push(inner.to_string());
                } else {
                    // Not a tag; keep the brackets verbatim.
                    text.push_str(&bracketed[..close + 2]);
                }
                rest = &bracketed[close + 2..];
            }
            None => {
                // Unterminated bracket: plain text.
                text.push_str(bracketed);
                rest = "";
            }
        }
    }
    text.push_str(rest);

    ParsedReply {
        text: collapse_spaces(&text),
        completed,
        expressions,
    }
}

/// Whether a bracketed segment looks like an expression tag:
/// one or two purely alphabetic words, short, not the completion marker.
fn is_expression_tag(inner: &str) -> bool {
    if inner.is_empty() || inner.len() > MAX_TAG_LEN {
        return false;
    }
    let words: Vec<&str> = inner.split(' ').collect();
    if words.is_empty() || words.len() > 2 {
        return false;
    }
    words
        .iter()
        .all(|w| !w.is_empty() && w.chars().all(|c| c.is_alphabetic()))
}

/// Collapse runs of spaces left behind by tag removal and trim the ends.
fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = c == '\n';
        }
    }
    out.trim().to_string()
}

//! Link extraction from note text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One link occurrence in a line or document.
///
/// `start..end` is a half-open byte range into the parsed text and
/// `raw == text[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInfo {
    pub start: usize,
    pub end: usize,
    /// Exact matched text, including any `!` prefix
    pub raw: String,
    /// Display text: the `[name]` of a markdown link or the alias of a wikilink
    pub name: String,
    /// Percent-decoded link target
    pub path: String,
}

impl LinkInfo {
    /// Whether the link is an embed (`![..](..)` or `![[..]]`)
    pub fn is_embed(&self) -> bool {
        self.raw.starts_with('!')
    }

    pub fn is_wikilink(&self) -> bool {
        self.raw.trim_start_matches('!').starts_with("[[")
    }
}

// Markdown `!?[name](target)` or wiki `!?[[target|name]]`
const LINK_PATTERN: &str =
    r"(?:!?\[([^\]\n]*)\]\(([^)\n]*)\))|(?:!?\[\[([^|\]\n]+?)(?:\|([^\]\n]*))?\]\])";

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LINK_PATTERN).expect("Invalid regex"))
}

fn decode(target: &str) -> String {
    urlencoding::decode(target)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| target.to_string())
}

/// Find every link in `text`.
///
/// Matches are non-overlapping, leftmost-first. The result is in **reverse
/// document order** (largest `start` first) so callers can splice
/// replacements from the back of the text without invalidating the offsets of
/// links they have not reached yet.
pub fn match_links(text: &str) -> Vec<LinkInfo> {
    let mut links: Vec<LinkInfo> = link_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (name, target) = match caps.get(3) {
                Some(wiki_target) => (
                    caps.get(4).map(|m| m.as_str()).unwrap_or(""),
                    wiki_target.as_str(),
                ),
                None => (
                    caps.get(1).map(|m| m.as_str()).unwrap_or(""),
                    caps.get(2).map(|m| m.as_str()).unwrap_or(""),
                ),
            };
            let target = target.trim();
            let target = target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(target);

            Some(LinkInfo {
                start: whole.start(),
                end: whole.end(),
                raw: whole.as_str().to_string(),
                name: name.to_string(),
                path: decode(target),
            })
        })
        .collect();

    links.reverse();
    links
}

/// The link whose span contains byte offset `pos` (`start <= pos <= end`).
///
/// When `pos` sits on the boundary between two adjacent links the earlier one
/// wins.
pub fn link_at(text: &str, pos: usize) -> Option<LinkInfo> {
    match_links(text)
        .into_iter()
        .rev()
        .find(|link| link.start <= pos && pos <= link.end)
}

/// Replace the span of `link` in `text` with `replacement`
pub fn splice(text: &str, link: &LinkInfo, replacement: &str) -> String {
    let mut result = String::with_capacity(text.len() + replacement.len());
    result.push_str(&text[..link.start]);
    result.push_str(replacement);
    result.push_str(&text[link.end..]);
    result
}

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());
static DOUBLE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>\s*<br\s*/?>").unwrap());

/// Promotional footer appended to many entries. Flattening drops the space
/// at whichever link edge the page used, so any word gap may be missing.
static FACEBOOK_FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Follow\s*us\s*on\s*Facebook\s*for\s*additional\s*updates").unwrap()
});

/// Plain text of a markup fragment.
///
/// Every text run between tags is decoded and trimmed, empty runs are
/// dropped, and the rest are joined with no separator. Adjacent inline
/// elements therefore run together: `<b>Theft</b> A bike` becomes
/// `TheftA bike`.
pub fn flatten(markup: &str) -> String {
    // Hidden content still ends a text run, so it is swapped for an empty tag.
    let without_comments = COMMENT_RE.replace_all(markup, "<>");
    let visible = SCRIPT_STYLE_RE.replace_all(&without_comments, "<>");
    TAG_RE
        .split(&visible)
        .map(|run| decode_entities(run).trim().to_string())
        .filter(|run| !run.is_empty())
        .collect()
}

pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let entity = &caps[1];
        let hex = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X"));
        let decoded = if let Some(hex) = hex {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = entity.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            named_entity(entity)
        };
        decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
    })
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "hellip" => '…',
        _ => return None,
    };
    Some(c)
}

/// Split a description container's markup on double line breaks.
pub fn split_segments(markup: &str) -> impl Iterator<Item = &str> {
    DOUBLE_BREAK_RE.split(markup)
}

/// Description text for one segment, or `None` when the segment is empty
/// after boilerplate removal or still carries list markup.
pub fn segment_text(segment: &str) -> Option<String> {
    let text = flatten(segment);
    let text = FACEBOOK_FOOTER_RE.replace_all(&text, "");
    let text = text.trim();
    if text.is_empty() || segment.to_ascii_lowercase().contains("<ul") {
        return None;
    }
    Some(text.to_string())
}

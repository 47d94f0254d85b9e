use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{
    Block, Inline, collapse_whitespace, decode_entities, fallback_paragraph, parse_inline,
    strip_tags,
};

static SEGMENT_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<p\b[^>]*>|<h[1-6]\b[^>]*>|<iframe\b|<ul\b[^>]*>|<ol\b[^>]*>")
        .expect("valid segment pattern")
});
static IFRAME_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<iframe\b").expect("valid iframe pattern"));
static IFRAME_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)src=["']([^"']+)["']"#).expect("valid src pattern"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]>").expect("valid heading pattern")
});
static ANCHOR_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<a\s").expect("valid anchor pattern"));
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*href=["']([^"']+)["'][^>]*>(.*?)</a>"#)
        .expect("valid anchor pattern")
});
static BOLD_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:strong|b)(?:\s[^>]*)?>").expect("valid bold tag pattern")
});
static ITALIC_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:em|i)(?:\s[^>]*)?>").expect("valid italic tag pattern")
});
static CODE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?code(?:\s[^>]*)?>").expect("valid code tag pattern"));
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break pattern"));

const NBSP: &str = "\u{a0}";

pub(super) fn parse_html(raw: &str) -> Vec<Block> {
    // Entities go first: a decoded `&lt;p&gt;` must be able to open a segment.
    let normalized = decode_entities(raw);

    let mut blocks = split_segments(&normalized)
        .into_iter()
        .filter_map(classify_segment)
        .collect::<Vec<_>>();

    if blocks.is_empty() {
        blocks.extend(fallback_paragraph(&normalized));
    }
    blocks
}

/// Cuts the input right before every block-level opening tag, keeping the tag
/// with the segment it opens. Blank segments are dropped.
fn split_segments(input: &str) -> Vec<&str> {
    let mut cuts = vec![0];
    cuts.extend(
        SEGMENT_START
            .find_iter(input)
            .map(|m| m.start())
            .filter(|start| *start > 0),
    );
    cuts.push(input.len());

    cuts.windows(2)
        .map(|pair| input[pair[0]..pair[1]].trim())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Classifies one segment; the first matching rule wins, in this order:
/// embed, heading, paragraph with links, plain paragraph.
fn classify_segment(segment: &str) -> Option<Block> {
    if IFRAME_OPEN.is_match(segment) {
        return embed_block(segment);
    }
    if let Some(caps) = HEADING.captures(segment) {
        return heading_block(&caps);
    }
    if ANCHOR_OPEN.is_match(segment) {
        return linked_paragraph_block(segment);
    }
    paragraph_block(segment)
}

fn embed_block(segment: &str) -> Option<Block> {
    let caps = IFRAME_SRC.captures(segment)?;
    Some(Block::EmbedPlaceholder {
        source_url: caps[1].to_owned(),
    })
}

fn heading_block(caps: &Captures<'_>) -> Option<Block> {
    let level = caps[1].parse::<u8>().ok()?;
    let text = collapse_whitespace(&strip_tags(&caps[2]));
    if text.is_empty() {
        return None;
    }
    Some(Block::heading(level, vec![Inline::plain(text)]))
}

fn linked_paragraph_block(segment: &str) -> Option<Block> {
    let with_markers = emphasis_to_markers(segment);
    let inlined = ANCHOR.replace_all(&with_markers, |caps: &Captures<'_>| {
        let label = strip_tags(&caps[2]);
        format!("{} ({})", label.trim(), &caps[1])
    });
    let text = collapse_whitespace(&strip_tags(&inlined));
    if text.is_empty() {
        return None;
    }
    Some(Block::paragraph(parse_inline(&text)))
}

fn paragraph_block(segment: &str) -> Option<Block> {
    let text = collapse_whitespace(&strip_tags(&emphasis_to_markers(segment)));
    if text.is_empty() || text == NBSP {
        return None;
    }
    Some(Block::paragraph(parse_inline(&text)))
}

/// Rewrites inline emphasis tags into the markers the inline parser knows, and
/// line breaks into spaces.
fn emphasis_to_markers(segment: &str) -> String {
    let text = LINE_BREAK.replace_all(segment, " ");
    let text = BOLD_TAG.replace_all(&text, "**");
    let text = ITALIC_TAG.replace_all(&text, "*");
    CODE_TAG.replace_all(&text, "`").into_owned()
}

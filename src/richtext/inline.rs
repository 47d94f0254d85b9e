use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::{Inline, Mark};

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold pattern"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("valid italic pattern"));
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.*?)`").expect("valid code pattern"));

/// Splits flat text into inline nodes on `**bold**`, `*italic*` and `` `code` ``.
///
/// Spans never nest or overlap. When two markers start at the same index, bold
/// wins over italic and italic over code. Text without any marker comes back
/// as a single untouched node.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut nodes = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let Some((mark, whole, inner)) = next_span(remaining) else {
            if !remaining.trim().is_empty() {
                nodes.push(Inline::plain(remaining));
            }
            break;
        };

        let before = &remaining[..whole.start];
        if !before.trim().is_empty() {
            nodes.push(Inline::plain(before));
        }

        let inner = &remaining[inner];
        if !inner.trim().is_empty() {
            nodes.push(Inline::marked(inner, mark));
        }

        remaining = &remaining[whole.end..];
    }

    if nodes.is_empty() {
        return vec![Inline::plain(text)];
    }
    nodes
}

/// Earliest marker span in `text`: its mark, the full match and the inner text.
fn next_span(text: &str) -> Option<(Mark, Range<usize>, Range<usize>)> {
    [
        (Mark::Bold, &*BOLD),
        (Mark::Italic, &*ITALIC),
        (Mark::Code, &*CODE),
    ]
    .into_iter()
    .filter_map(|(mark, pattern)| {
        let caps = pattern.captures(text)?;
        let whole = caps.get(0)?.range();
        let inner = caps.get(1)?.range();
        Some((mark, whole, inner))
    })
    .min_by_key(|(_, whole, _)| whole.start)
}

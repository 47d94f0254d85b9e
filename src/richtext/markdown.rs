use std::sync::LazyLock;

use regex::Regex;

use super::{Block, ListItem, fallback_paragraph, parse_inline};

static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s").expect("valid ordered item pattern"));
static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*]\s").expect("valid bullet item pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Bullet,
}

/// Only `#` and `##` headings are recognized; `###` and deeper stay as
/// paragraphs with their hashes. Consecutive list lines of the same kind form
/// one list; blank lines separate blocks but are never blocks themselves.
pub(super) fn parse_markdown(raw: &str) -> Vec<Block> {
    let lines = raw.lines().map(str::trim).collect::<Vec<_>>();
    let mut blocks = Vec::new();
    let mut idx = 0usize;

    while idx < lines.len() {
        let line = lines[idx];

        if line.is_empty() {
            idx += 1;
            continue;
        }

        if let Some(kind) = list_kind(line) {
            let mut items = Vec::new();
            while let Some(text) = lines.get(idx).and_then(|l| list_item_text(l, kind)) {
                items.push(ListItem {
                    paragraph: parse_inline(text),
                });
                idx += 1;
            }
            blocks.push(match kind {
                ListKind::Ordered => Block::OrderedList { items },
                ListKind::Bullet => Block::BulletList { items },
            });
            continue;
        }

        idx += 1;

        if let Some((level, text)) = heading(line) {
            if !text.is_empty() {
                blocks.push(Block::heading(level, parse_inline(text)));
            }
            continue;
        }

        blocks.push(Block::paragraph(parse_inline(line)));
    }

    if blocks.is_empty() {
        blocks.extend(fallback_paragraph(raw));
    }
    blocks
}

fn heading(line: &str) -> Option<(u8, &str)> {
    if let Some(rest) = line.strip_prefix("##") {
        if rest.starts_with('#') {
            return None;
        }
        return Some((2, rest.trim()));
    }
    let rest = line.strip_prefix('#')?;
    Some((1, rest.trim()))
}

fn list_kind(line: &str) -> Option<ListKind> {
    if ORDERED_ITEM.is_match(line) {
        Some(ListKind::Ordered)
    } else if BULLET_ITEM.is_match(line) {
        Some(ListKind::Bullet)
    } else {
        None
    }
}

fn list_item_text(line: &str, kind: ListKind) -> Option<&str> {
    let pattern = match kind {
        ListKind::Ordered => &*ORDERED_ITEM,
        ListKind::Bullet => &*BULLET_ITEM,
    };
    let marker = pattern.find(line)?;
    Some(line[marker.end()..].trim())
}

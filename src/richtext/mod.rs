//! Regex-driven markup conversion. Nested block tags and unbalanced markup
//! flatten into paragraphs.

mod entities;
mod html;
mod inline;
mod markdown;
mod storyblok;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use entities::decode_entities;
pub use inline::parse_inline;
pub use storyblok::to_storyblok_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Html,
    Markdown,
}

/// Never fails; empty content yields an empty document.
pub fn parse(raw: &str, kind: SourceKind) -> StructuredDocument {
    let blocks = match kind {
        SourceKind::Html => html::parse_html(raw),
        SourceKind::Markdown => markdown::parse_markdown(raw),
    };
    StructuredDocument { blocks }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "document")]
pub struct StructuredDocument {
    #[serde(rename = "children")]
    pub blocks: Vec<Block>,
}

impl StructuredDocument {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, children: Vec<Inline> },
    Paragraph { children: Vec<Inline> },
    OrderedList {
        #[serde(rename = "children")]
        items: Vec<ListItem>,
    },
    BulletList {
        #[serde(rename = "children")]
        items: Vec<ListItem>,
    },
    EmbedPlaceholder {
        #[serde(rename = "sourceUrl")]
        source_url: String,
    },
}

impl Block {
    pub fn heading(level: u8, children: Vec<Inline>) -> Self {
        Self::Heading {
            level: level.clamp(1, 3),
            children,
        }
    }

    pub fn paragraph(children: Vec<Inline>) -> Self {
        Self::Paragraph { children }
    }
}

/// Serializes as its single paragraph block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "paragraph")]
pub struct ListItem {
    #[serde(rename = "children")]
    pub paragraph: Vec<Inline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "text")]
pub struct Inline {
    #[serde(rename = "value")]
    pub text: String,
    pub marks: BTreeSet<Mark>,
}

impl Inline {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: BTreeSet::new(),
        }
    }

    pub fn marked(text: impl Into<String>, mark: Mark) -> Self {
        Self {
            text: text.into(),
            marks: BTreeSet::from([mark]),
        }
    }
}

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

pub(crate) fn strip_tags(input: &str) -> String {
    TAG.replace_all(input, "").into_owned()
}

pub(crate) fn strip_tags_spaced(input: &str) -> String {
    TAG.replace_all(input, " ").into_owned()
}

pub(crate) fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn fallback_paragraph(input: &str) -> Option<Block> {
    let text = collapse_whitespace(&strip_tags_spaced(input));
    if text.is_empty() {
        return None;
    }
    Some(Block::paragraph(parse_inline(&text)))
}

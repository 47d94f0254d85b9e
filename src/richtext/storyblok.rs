use serde_json::{Value, json};

use super::{Block, Inline, ListItem, Mark, StructuredDocument};

/// Renders a document in the store's rich-text (TipTap) JSON shape.
///
/// The schema has no embed node, so embeds render as an italic placeholder
/// paragraph naming the source URL.
pub fn to_storyblok_json(doc: &StructuredDocument) -> Value {
    json!({
        "type": "doc",
        "content": doc.blocks.iter().map(block_json).collect::<Vec<_>>(),
    })
}

fn block_json(block: &Block) -> Value {
    match block {
        Block::Heading { level, children } => json!({
            "type": "heading",
            "attrs": { "level": level },
            "content": inlines_json(children),
        }),
        Block::Paragraph { children } => paragraph_json(children),
        Block::OrderedList { items } => json!({
            "type": "ordered_list",
            "content": items.iter().map(list_item_json).collect::<Vec<_>>(),
        }),
        Block::BulletList { items } => json!({
            "type": "bullet_list",
            "content": items.iter().map(list_item_json).collect::<Vec<_>>(),
        }),
        Block::EmbedPlaceholder { source_url } => paragraph_json(&[Inline::marked(
            format!("[Embedded Content: {source_url}]"),
            Mark::Italic,
        )]),
    }
}

fn paragraph_json(children: &[Inline]) -> Value {
    json!({
        "type": "paragraph",
        "content": inlines_json(children),
    })
}

fn list_item_json(item: &ListItem) -> Value {
    json!({
        "type": "list_item",
        "content": [paragraph_json(&item.paragraph)],
    })
}

fn inlines_json(children: &[Inline]) -> Vec<Value> {
    children.iter().map(inline_json).collect()
}

fn inline_json(inline: &Inline) -> Value {
    let mut node = json!({
        "type": "text",
        "text": inline.text,
    });
    if !inline.marks.is_empty()
        && let Some(obj) = node.as_object_mut()
    {
        let marks = inline
            .marks
            .iter()
            .map(|mark| json!({ "type": mark_name(*mark) }))
            .collect::<Vec<_>>();
        obj.insert("marks".to_owned(), Value::Array(marks));
    }
    node
}

fn mark_name(mark: Mark) -> &'static str {
    match mark {
        Mark::Bold => "bold",
        Mark::Italic => "italic",
        Mark::Code => "code",
    }
}

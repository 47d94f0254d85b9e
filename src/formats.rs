use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::richtext::{collapse_whitespace, decode_entities, strip_tags};

/// WordPress REST `{ "rendered": "..." }` wrapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WpPost {
    pub id: u64,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub featured_media: u64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub date_modified: Option<String>,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WpMedia {
    pub id: u64,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub media_details: WpMediaDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WpMediaDetails {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRecord {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub featured_media: Option<u64>,
    pub published_at: Option<String>,
    pub modified_at: Option<String>,
    pub slug: String,
}

impl LegacyRecord {
    pub fn plain_title(&self) -> String {
        collapse_whitespace(&strip_tags(&decode_entities(&self.title)))
    }

    /// Modification timestamp, falling back to the publication timestamp.
    pub fn effective_date(&self) -> Option<&str> {
        [self.modified_at.as_deref(), self.published_at.as_deref()]
            .into_iter()
            .flatten()
            .find(|date| !date.trim().is_empty())
    }
}

impl From<WpPost> for LegacyRecord {
    fn from(post: WpPost) -> Self {
        Self {
            id: post.id,
            title: post.title.rendered,
            body: post.content.rendered,
            featured_media: (post.featured_media > 0).then_some(post.featured_media),
            published_at: post.date,
            modified_at: post.date_modified.or(post.modified),
            slug: post.slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: u64,
    pub binary_url: String,
    pub title: String,
    pub alt_text: String,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<WpMedia> for MediaInfo {
    fn from(media: WpMedia) -> Self {
        Self {
            id: media.id,
            binary_url: media.source_url,
            title: media.title.rendered,
            alt_text: media.alt_text,
            mime_type: media.mime_type,
            width: media.media_details.width,
            height: media.media_details.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRecord {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(rename = "wordpressId")]
    pub wordpress_id: u64,
}

impl From<&LegacyRecord> for DateRecord {
    fn from(record: &LegacyRecord) -> Self {
        Self {
            slug: record.slug.clone(),
            title: if record.title.trim().is_empty() {
                "Untitled".to_owned()
            } else {
                record.title.clone()
            },
            date: record.published_at.clone(),
            modified: record.modified_at.clone(),
            wordpress_id: record.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub full_slug: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub content: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFolder {
    pub id: u64,
    pub name: String,
}

/// Signed upload target returned by the first step of the asset handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSlot {
    pub id: u64,
    pub post_url: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetHandle {
    pub id: u64,
    pub filename: String,
}

/// Asset field value as stored on a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub fieldtype: String,
    pub id: Option<u64>,
    pub filename: String,
    pub alt: String,
    pub name: String,
    pub title: Option<String>,
    pub focus: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleContent {
    pub component: String,
    pub title: String,
    pub body: Value,
    #[serde(rename = "dateModified")]
    pub date_modified: Option<String>,
    pub image: Option<AssetRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(rename = "articleTags", skip_serializing_if = "Option::is_none")]
    pub article_tags: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wordpress_post_maps_to_legacy_record() -> anyhow::Result<()> {
        let post: WpPost = serde_json::from_str(
            r#"{
                "id": 42,
                "title": { "rendered": "Hot &#8211; runner" },
                "content": { "rendered": "<p>Body</p>" },
                "featured_media": 0,
                "date": "2024-01-02T03:04:05",
                "modified": "2024-02-03T04:05:06",
                "slug": "hot-runner"
            }"#,
        )?;
        let record = LegacyRecord::from(post);
        assert_eq!(record.id, 42);
        assert_eq!(record.featured_media, None);
        assert_eq!(record.modified_at.as_deref(), Some("2024-02-03T04:05:06"));
        assert_eq!(record.plain_title(), "Hot - runner");
        assert_eq!(record.effective_date(), Some("2024-02-03T04:05:06"));
        Ok(())
    }

    #[test]
    fn effective_date_falls_back_to_publication() {
        let record = LegacyRecord {
            id: 1,
            title: "t".to_owned(),
            body: "b".to_owned(),
            featured_media: Some(7),
            published_at: Some("2023-05-06T07:08:09".to_owned()),
            modified_at: Some(" ".to_owned()),
            slug: "s".to_owned(),
        };
        assert_eq!(record.effective_date(), Some("2023-05-06T07:08:09"));
    }

    #[test]
    fn article_content_omits_absent_optional_fields() -> anyhow::Result<()> {
        let content = ArticleContent {
            component: "article".to_owned(),
            title: "T".to_owned(),
            body: serde_json::json!({ "type": "doc", "content": [] }),
            date_modified: None,
            image: None,
            excerpt: None,
            article_tags: None,
        };
        let value = serde_json::to_value(&content)?;
        assert!(value.get("excerpt").is_none());
        assert!(value.get("articleTags").is_none());
        assert!(value["image"].is_null());
        assert!(value["dateModified"].is_null());
        Ok(())
    }
}

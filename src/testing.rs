//! In-memory collaborators for orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::formats::{AssetFolder, AssetHandle, LegacyRecord, MediaInfo, Story, UploadSlot};
use crate::generate::TextGenerator;
use crate::storyblok::TargetStore;
use crate::wordpress::LegacySource;

pub fn record(id: u64, slug: &str) -> LegacyRecord {
    LegacyRecord {
        id,
        title: format!("Post number {id}"),
        body: format!("<p>Body of post {id}</p>"),
        featured_media: None,
        published_at: Some("2024-03-01T09:15:00".to_owned()),
        modified_at: Some("2024-04-02T10:30:45".to_owned()),
        slug: slug.to_owned(),
    }
}

pub fn story(id: u64, slug: &str) -> Story {
    Story {
        id,
        name: format!("Story {id}"),
        slug: slug.to_owned(),
        full_slug: format!("articles/{slug}"),
        is_folder: false,
        published: true,
        content: None,
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub records: Vec<LegacyRecord>,
    pub media: HashMap<u64, MediaInfo>,
    pub binaries: HashMap<String, Vec<u8>>,
    pub unreachable: bool,
    pub list_calls: Mutex<Vec<(u32, u32)>>,
}

#[async_trait]
impl LegacySource for FakeSource {
    async fn check_connection(&self) -> anyhow::Result<()> {
        if self.unreachable {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }

    async fn record_count(&self) -> anyhow::Result<u64> {
        Ok(self.records.len() as u64)
    }

    async fn list_records(&self, page_size: u32, offset: u32) -> anyhow::Result<Vec<LegacyRecord>> {
        self.list_calls.lock().unwrap().push((page_size, offset));
        Ok(self
            .records
            .iter()
            .skip(offset as usize)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn get_media(&self, media_id: u64) -> anyhow::Result<MediaInfo> {
        self.media
            .get(&media_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("media {media_id} not found"))
    }

    async fn fetch_binary(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.binaries
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 for {url}"))
    }
}

#[derive(Debug, Clone)]
pub struct CreatedStory {
    pub name: String,
    pub slug: String,
    pub content: Value,
    pub parent_id: Option<u64>,
}

#[derive(Default)]
pub struct FakeStore {
    pub taken: Mutex<HashSet<String>>,
    pub always_taken: bool,
    pub fail_probes: bool,
    pub probes: Mutex<Vec<String>>,
    /// Creates under these slugs fail.
    pub reject_slugs: HashSet<String>,
    pub reject_all_creates: bool,
    pub created: Mutex<Vec<CreatedStory>>,
    pub stories: Vec<Story>,
    pub contents: HashMap<u64, Value>,
    pub fail_updates_for: HashSet<u64>,
    pub updates: Mutex<Vec<(u64, Value, bool)>>,
    pub folder: Option<Story>,
    pub asset_folder: Option<AssetFolder>,
    pub fail_upload: bool,
    pub upload_steps: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn with_taken(slugs: &[&str]) -> Self {
        Self {
            taken: Mutex::new(slugs.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<CreatedStory> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetStore for FakeStore {
    async fn story_exists(&self, slug_path: &str) -> anyhow::Result<bool> {
        self.probes.lock().unwrap().push(slug_path.to_owned());
        if self.fail_probes {
            anyhow::bail!("store unavailable");
        }
        Ok(self.always_taken || self.taken.lock().unwrap().contains(slug_path))
    }

    async fn create_story(
        &self,
        name: &str,
        slug: &str,
        content: &Value,
        parent_id: Option<u64>,
    ) -> anyhow::Result<Story> {
        if self.reject_all_creates || self.reject_slugs.contains(slug) {
            anyhow::bail!("422 slug already taken: {slug}");
        }
        let mut created = self.created.lock().unwrap();
        created.push(CreatedStory {
            name: name.to_owned(),
            slug: slug.to_owned(),
            content: content.clone(),
            parent_id,
        });
        self.taken.lock().unwrap().insert(slug.to_owned());
        Ok(Story {
            name: name.to_owned(),
            ..story(1000 + created.len() as u64, slug)
        })
    }

    async fn update_story(&self, story: &Story, content: &Value, publish: bool) -> anyhow::Result<()> {
        if self.fail_updates_for.contains(&story.id) {
            anyhow::bail!("500 update failed");
        }
        self.updates
            .lock()
            .unwrap()
            .push((story.id, content.clone(), publish));
        Ok(())
    }

    async fn story_content(&self, story_id: u64) -> anyhow::Result<Option<Value>> {
        Ok(self.contents.get(&story_id).cloned())
    }

    async fn stories_in_folder(&self, _folder_slug: &str) -> anyhow::Result<Vec<Story>> {
        Ok(self.stories.clone())
    }

    async fn find_folder(&self, _name: &str) -> anyhow::Result<Option<Story>> {
        Ok(self.folder.clone())
    }

    async fn find_asset_folder(&self, _name: &str) -> anyhow::Result<Option<AssetFolder>> {
        Ok(self.asset_folder.clone())
    }

    async fn request_upload_slot(
        &self,
        filename: &str,
        size_hint: &str,
        asset_folder_id: Option<u64>,
    ) -> anyhow::Result<UploadSlot> {
        self.upload_steps
            .lock()
            .unwrap()
            .push(format!("slot {filename} {size_hint} {asset_folder_id:?}"));
        Ok(UploadSlot {
            id: 555,
            post_url: "https://s3.example.test/upload".to_owned(),
            fields: serde_json::Map::new(),
        })
    }

    async fn upload_bytes(&self, slot: &UploadSlot, _filename: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.upload_steps
            .lock()
            .unwrap()
            .push(format!("upload {} {}", slot.id, bytes.len()));
        if self.fail_upload {
            anyhow::bail!("403 signature mismatch");
        }
        Ok(())
    }

    async fn finalize_upload(&self, slot_id: u64) -> anyhow::Result<AssetHandle> {
        self.upload_steps
            .lock()
            .unwrap()
            .push(format!("finalize {slot_id}"));
        Ok(AssetHandle {
            id: slot_id,
            filename: format!("https://a.storyblok.test/f/{slot_id}.jpg"),
        })
    }
}

#[derive(Default)]
pub struct ScriptedGenerator {
    pub content: String,
    pub title: String,
    pub summary: String,
    pub fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _system_prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        if self.fail {
            anyhow::bail!("rate limited");
        }
        if prompt.starts_with("Rewrite the following article") {
            Ok(self.content.clone())
        } else if prompt.starts_with("Write a clearer") {
            Ok(self.title.clone())
        } else {
            Ok(self.summary.clone())
        }
    }
}

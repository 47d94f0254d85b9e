use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::formats::{AssetFolder, AssetHandle, Story, UploadSlot};
use crate::http;
use crate::retry::{RetryPolicy, with_retry};

pub const DEFAULT_BASE_URL: &str = "https://mapi.storyblok.com/v1";

const STORIES_PAGE_SIZE: usize = 100;

#[async_trait]
pub trait TargetStore: Send + Sync {
    /// `slug_path` may be folder-qualified (`articles/foo`); the bare last
    /// segment is probed as well.
    async fn story_exists(&self, slug_path: &str) -> anyhow::Result<bool>;
    async fn create_story(
        &self,
        name: &str,
        slug: &str,
        content: &Value,
        parent_id: Option<u64>,
    ) -> anyhow::Result<Story>;
    /// Replaces the content of an existing story; other story attributes are
    /// sent back unchanged.
    async fn update_story(&self, story: &Story, content: &Value, publish: bool) -> anyhow::Result<()>;
    async fn story_content(&self, story_id: u64) -> anyhow::Result<Option<Value>>;
    async fn stories_in_folder(&self, folder_slug: &str) -> anyhow::Result<Vec<Story>>;
    async fn find_folder(&self, name: &str) -> anyhow::Result<Option<Story>>;
    async fn find_asset_folder(&self, name: &str) -> anyhow::Result<Option<AssetFolder>>;
    async fn request_upload_slot(
        &self,
        filename: &str,
        size_hint: &str,
        asset_folder_id: Option<u64>,
    ) -> anyhow::Result<UploadSlot>;
    async fn upload_bytes(&self, slot: &UploadSlot, filename: &str, bytes: Vec<u8>) -> anyhow::Result<()>;
    async fn finalize_upload(&self, slot_id: u64) -> anyhow::Result<AssetHandle>;
}

#[derive(Debug, Clone)]
pub struct StoryblokConfig {
    pub base_url: String,
    pub space_id: String,
    pub management_token: String,
}

impl StoryblokConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let management_token = std::env::var("STORYBLOK_MANAGEMENT_TOKEN")
            .context("STORYBLOK_MANAGEMENT_TOKEN is required")?;
        if management_token.trim().is_empty() {
            anyhow::bail!("STORYBLOK_MANAGEMENT_TOKEN is empty");
        }
        let space_id =
            std::env::var("STORYBLOK_SPACE_ID").context("STORYBLOK_SPACE_ID is required")?;
        if space_id.trim().is_empty() {
            anyhow::bail!("STORYBLOK_SPACE_ID is empty");
        }
        let base_url = std::env::var("WPMIGRATE_STORYBLOK_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            base_url,
            space_id: space_id.trim().to_string(),
            management_token: management_token.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StoriesEnvelope {
    #[serde(default)]
    stories: Vec<Story>,
}

#[derive(Debug, Deserialize)]
struct StoryEnvelope {
    story: Story,
}

#[derive(Debug, Deserialize)]
struct AssetFoldersEnvelope {
    #[serde(default)]
    asset_folders: Vec<AssetFolder>,
}

#[derive(Debug, Clone)]
pub struct StoryblokClient {
    client: reqwest::Client,
    space_url: url::Url,
    token: String,
    retry: RetryPolicy,
}

impl StoryblokClient {
    pub fn new(config: StoryblokConfig, retry: RetryPolicy) -> anyhow::Result<Self> {
        let base = format!(
            "{}/spaces/{}/",
            config.base_url.trim_end_matches('/'),
            config.space_id
        );
        let space_url =
            url::Url::parse(&base).with_context(|| format!("invalid Storyblok base url: {base}"))?;
        let client = http::build_client(Duration::from_secs(60), false)
            .context("build Storyblok http client")?;
        Ok(Self {
            client,
            space_url,
            token: config.management_token,
            retry,
        })
    }

    pub fn from_env(retry: RetryPolicy) -> anyhow::Result<Self> {
        let config = StoryblokConfig::from_env().context("load Storyblok credentials")?;
        Self::new(config, retry)
    }

    fn endpoint(&self, path: &str) -> anyhow::Result<url::Url> {
        self.space_url
            .join(path)
            .with_context(|| format!("build Storyblok url for {path}"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        with_retry(&self.retry, what, || async {
            let response = self
                .client
                .get(url.clone())
                .header(AUTHORIZATION, &self.token)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;
            http::read_json(response, what).await
        })
        .await
    }

    pub async fn check_connection(&self) -> anyhow::Result<usize> {
        let envelope: AssetFoldersEnvelope = self
            .get_json("Storyblok connection test", "asset_folders", &[])
            .await?;
        Ok(envelope.asset_folders.len())
    }

    async fn slug_taken(&self, slug: &str) -> anyhow::Result<bool> {
        let envelope: StoriesEnvelope = self
            .get_json(
                "probe Storyblok slug",
                "stories",
                &[("by_slugs", slug.to_string())],
            )
            .await?;
        Ok(!envelope.stories.is_empty())
    }
}

#[async_trait]
impl TargetStore for StoryblokClient {
    async fn story_exists(&self, slug_path: &str) -> anyhow::Result<bool> {
        if self.slug_taken(slug_path).await? {
            return Ok(true);
        }
        match slug_path.rsplit_once('/') {
            Some((_, bare)) if !bare.is_empty() => self.slug_taken(bare).await,
            _ => Ok(false),
        }
    }

    async fn create_story(
        &self,
        name: &str,
        slug: &str,
        content: &Value,
        parent_id: Option<u64>,
    ) -> anyhow::Result<Story> {
        let url = self.endpoint("stories")?;
        let body = json!({
            "story": {
                "name": name,
                "slug": slug,
                "content": content,
                "parent_id": parent_id.unwrap_or(0),
            }
        });
        let response = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, &self.token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        let envelope: StoryEnvelope = http::read_json(response, "Storyblok create story").await?;
        Ok(envelope.story)
    }

    async fn update_story(&self, story: &Story, content: &Value, publish: bool) -> anyhow::Result<()> {
        let url = self.endpoint(&format!("stories/{}", story.id))?;
        let body = json!({
            "story": {
                "name": story.name,
                "slug": story.slug,
                "content": content,
            }
        });
        with_retry(&self.retry, "update Storyblok story", || async {
            let response = self
                .client
                .put(url.clone())
                .header(AUTHORIZATION, &self.token)
                .json(&body)
                .send()
                .await
                .with_context(|| format!("PUT {url}"))?;
            http::read_text(response, "Storyblok update story").await
        })
        .await?;

        if publish {
            let url = self.endpoint(&format!("stories/{}/publish", story.id))?;
            with_retry(&self.retry, "publish Storyblok story", || async {
                let response = self
                    .client
                    .put(url.clone())
                    .header(AUTHORIZATION, &self.token)
                    .send()
                    .await
                    .with_context(|| format!("PUT {url}"))?;
                http::read_text(response, "Storyblok publish story").await
            })
            .await?;
        }
        Ok(())
    }

    async fn story_content(&self, story_id: u64) -> anyhow::Result<Option<Value>> {
        let envelope: StoryEnvelope = self
            .get_json("fetch Storyblok story", &format!("stories/{story_id}"), &[])
            .await?;
        Ok(envelope.story.content)
    }

    async fn stories_in_folder(&self, folder_slug: &str) -> anyhow::Result<Vec<Story>> {
        let prefix = format!("{}/", folder_slug.trim_matches('/'));
        let mut stories = Vec::new();
        for page in 1.. {
            let envelope: StoriesEnvelope = self
                .get_json(
                    "list Storyblok stories",
                    "stories",
                    &[
                        ("starts_with", prefix.clone()),
                        ("per_page", STORIES_PAGE_SIZE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let fetched = envelope.stories.len();
            stories.extend(envelope.stories.into_iter().filter(|story| !story.is_folder));
            if fetched < STORIES_PAGE_SIZE {
                break;
            }
        }
        Ok(stories)
    }

    async fn find_folder(&self, name: &str) -> anyhow::Result<Option<Story>> {
        let envelope: StoriesEnvelope = self
            .get_json(
                "list Storyblok folders",
                "stories",
                &[
                    ("folder_only", "1".to_string()),
                    ("per_page", STORIES_PAGE_SIZE.to_string()),
                ],
            )
            .await?;
        Ok(envelope
            .stories
            .into_iter()
            .find(|story| story.is_folder && story.name.eq_ignore_ascii_case(name)))
    }

    async fn find_asset_folder(&self, name: &str) -> anyhow::Result<Option<AssetFolder>> {
        let envelope: AssetFoldersEnvelope = self
            .get_json("list Storyblok asset folders", "asset_folders", &[])
            .await?;
        Ok(envelope
            .asset_folders
            .into_iter()
            .find(|folder| folder.name.eq_ignore_ascii_case(name)))
    }

    async fn request_upload_slot(
        &self,
        filename: &str,
        size_hint: &str,
        asset_folder_id: Option<u64>,
    ) -> anyhow::Result<UploadSlot> {
        let url = self.endpoint("assets")?;
        let mut body = json!({
            "filename": filename,
            "size": size_hint,
            "validate_upload": 1,
        });
        if let Some(folder_id) = asset_folder_id
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("asset_folder_id".to_string(), json!(folder_id));
        }
        with_retry(&self.retry, "request Storyblok upload slot", || async {
            let response = self
                .client
                .post(url.clone())
                .header(AUTHORIZATION, &self.token)
                .json(&body)
                .send()
                .await
                .with_context(|| format!("POST {url}"))?;
            http::read_json(response, "Storyblok upload slot").await
        })
        .await
    }

    async fn upload_bytes(&self, slot: &UploadSlot, filename: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        // The signed form fields must precede the file part.
        let mut form = reqwest::multipart::Form::new();
        for (key, value) in &slot.fields {
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), value);
        }
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        form = form.part("file", part);

        let response = self
            .client
            .post(&slot.post_url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {}", slot.post_url))?;
        http::read_text(response, "signed asset upload").await?;
        Ok(())
    }

    async fn finalize_upload(&self, slot_id: u64) -> anyhow::Result<AssetHandle> {
        self.get_json(
            "finalize Storyblok upload",
            &format!("assets/{slot_id}/finish_upload"),
            &[],
        )
        .await
    }
}

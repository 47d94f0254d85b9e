use std::time::Duration;

use anyhow::Context as _;
use serde::Serialize;

use crate::assets::{AssetMode, transfer_featured_media};
use crate::cli::MigrateArgs;
use crate::config::MigrationConfig;
use crate::dates::format_store_date;
use crate::formats::{ArticleContent, AssetRef, LegacyRecord};
use crate::generate::{TextGenerator, build_generator};
use crate::improve::{RewritePrompts, rewrite_record};
use crate::output::write_json_atomic;
use crate::richtext::{SourceKind, parse, to_storyblok_json};
use crate::slug::{fallback_slug, resolve_unique_slug};
use crate::storyblok::{StoryblokClient, TargetStore};
use crate::validate::{seo_warnings, validate_record};
use crate::wordpress::{LegacySource, WordPressClient};

/// Last pipeline step a task completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Fetched,
    Improved,
    AssetUploaded,
    Written,
    Failed,
}

#[derive(Debug, Clone)]
pub struct MigrationTask {
    pub record: LegacyRecord,
    pub parent_id: Option<u64>,
    pub status: TaskStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub story_id: Option<u64>,
}

impl MigrationTask {
    pub fn new(record: LegacyRecord, parent_id: Option<u64>) -> Self {
        Self {
            record,
            parent_id,
            status: TaskStatus::Pending,
            errors: Vec::new(),
            warnings: Vec::new(),
            story_id: None,
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(record_id = self.record.id, "{message}");
        self.warnings.push(message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub record_id: u64,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordWarning {
    pub record_id: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<RecordFailure>,
    pub warnings: Vec<RecordWarning>,
}

impl BatchReport {
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, record_id: u64, title: &str, reason: String) {
        self.failed += 1;
        self.failures.push(RecordFailure {
            record_id,
            title: title.to_owned(),
            reason,
        });
    }

    pub fn record_task(&mut self, task: &MigrationTask) {
        self.warnings
            .extend(task.warnings.iter().map(|message| RecordWarning {
                record_id: task.record.id,
                message: message.clone(),
            }));
        if task.status == TaskStatus::Failed {
            let reason = task.errors.join("; ");
            self.record_failure(task.record.id, &task.record.plain_title(), reason);
        } else {
            self.record_success();
        }
    }

    pub fn log_summary(&self, what: &str) {
        tracing::info!(
            succeeded = self.succeeded,
            failed = self.failed,
            warnings = self.warnings.len(),
            "{what} summary"
        );
        for failure in &self.failures {
            tracing::error!(
                record_id = failure.record_id,
                title = %failure.title,
                reason = %failure.reason,
                "record failed"
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub between_records: Duration,
    pub between_steps: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_records: Duration::from_millis(1000),
            between_steps: Duration::from_millis(250),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            between_records: Duration::ZERO,
            between_steps: Duration::ZERO,
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFolder {
    pub id: u64,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub folder: Option<TargetFolder>,
    pub asset_mode: AssetMode,
    pub prompts: RewritePrompts,
    pub pacing: Pacing,
}

pub struct Migrator<'a> {
    source: &'a dyn LegacySource,
    store: &'a dyn TargetStore,
    generator: Option<&'a dyn TextGenerator>,
    settings: BatchSettings,
}

impl<'a> Migrator<'a> {
    pub fn new(
        source: &'a dyn LegacySource,
        store: &'a dyn TargetStore,
        generator: Option<&'a dyn TextGenerator>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            source,
            store,
            generator,
            settings,
        }
    }

    /// Processes `records` in input order. Record failures are collected in
    /// the report and never stop the batch.
    pub async fn run_batch(&self, records: Vec<LegacyRecord>) -> BatchReport {
        let total = records.len();
        let parent_id = self.settings.folder.as_ref().map(|folder| folder.id);
        let mut report = BatchReport::default();

        for (idx, record) in records.into_iter().enumerate() {
            if idx > 0 {
                pause(self.settings.pacing.between_records).await;
            }
            let current = idx + 1;
            let percent = (current * 100 + total / 2) / total;
            tracing::info!(
                record_id = record.id,
                title = %record.plain_title(),
                "[{percent}%] processing ({current}/{total})"
            );

            let mut task = MigrationTask::new(record, parent_id);
            self.process(&mut task).await;
            report.record_task(&task);
        }
        report
    }

    pub async fn process(&self, task: &mut MigrationTask) {
        match self.pipeline(task).await {
            Ok(()) => tracing::info!(
                record_id = task.record.id,
                story_id = task.story_id,
                warnings = task.warnings.len(),
                "record migrated"
            ),
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::error!(record_id = task.record.id, error = %reason, "record failed");
                task.errors.push(reason);
                task.status = TaskStatus::Failed;
            }
        }
    }

    async fn pipeline(&self, task: &mut MigrationTask) -> anyhow::Result<()> {
        let problems = validate_record(&task.record);
        if !problems.is_empty() {
            anyhow::bail!("invalid record: {}", problems.join(", "));
        }
        task.status = TaskStatus::Fetched;

        let base_slug = task.record.slug.trim().to_owned();
        let folder_slug = self.settings.folder.as_ref().map(|f| f.slug.as_str());
        let slug = resolve_unique_slug(self.store, &base_slug, folder_slug)
            .await
            .context("resolve slug")?;
        pause(self.settings.pacing.between_steps).await;

        let mut title = task.record.plain_title();
        let mut body = task.record.body.clone();
        let mut body_kind = SourceKind::Html;
        let mut summary = None;
        let mut tags = None;
        if let Some(generator) = self.generator {
            match rewrite_record(generator, &self.settings.prompts, &title, &body).await {
                Ok(rewrite) => {
                    tracing::info!(record_id = task.record.id, tags = %rewrite.tags, "content rewritten");
                    title = rewrite.title;
                    body = rewrite.content;
                    body_kind = SourceKind::Markdown;
                    summary = Some(rewrite.summary).filter(|s| !s.is_empty());
                    tags = Some(rewrite.tags).filter(|t| !t.is_empty());
                }
                Err(err) => {
                    task.warn(format!("rewrite failed, keeping original content: {err:#}"));
                }
            }
            pause(self.settings.pacing.between_steps).await;
        }
        task.status = TaskStatus::Improved;

        let image = self.featured_image(task).await;
        task.status = TaskStatus::AssetUploaded;

        let document = parse(&body, body_kind);
        let content = ArticleContent {
            component: "article".to_owned(),
            title: title.clone(),
            body: to_storyblok_json(&document),
            date_modified: task.record.effective_date().map(format_store_date),
            image,
            excerpt: summary.clone(),
            article_tags: tags.clone(),
        };
        let content = serde_json::to_value(&content).context("serialize article content")?;

        let story = match self
            .store
            .create_story(&title, &slug, &content, task.parent_id)
            .await
        {
            Ok(story) => story,
            Err(first) => {
                let fallback = fallback_slug(&base_slug, chrono::Utc::now().timestamp_millis());
                task.warn(format!(
                    "create under {slug:?} failed ({first:#}); retrying as {fallback:?}"
                ));
                self.store
                    .create_story(&title, &fallback, &content, task.parent_id)
                    .await
                    .with_context(|| format!("create story (first attempt: {first:#})"))?
            }
        };
        task.story_id = Some(story.id);
        task.status = TaskStatus::Written;

        for warning in seo_warnings(&title, &body, summary.as_deref(), tags.as_deref()) {
            task.warn(format!("seo: {warning}"));
        }
        Ok(())
    }

    async fn featured_image(&self, task: &mut MigrationTask) -> Option<AssetRef> {
        task.record.featured_media?;
        let result = transfer_featured_media(
            self.source,
            self.store,
            task.record.featured_media,
            self.settings.asset_mode,
            chrono::Utc::now().timestamp_millis(),
        )
        .await;
        pause(self.settings.pacing.between_steps).await;
        match result {
            Ok(image) => image,
            Err(err) => {
                task.warn(format!("featured image skipped: {err:#}"));
                None
            }
        }
    }
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    let config = MigrationConfig::from(&args);
    config.validate().context("validate migration config")?;
    tracing::info!("configuration validated");

    let retry = config.retry_policy();
    let store = StoryblokClient::from_env(retry)?;
    let generator = build_generator(config.engine, retry)?;
    let source = WordPressClient::new(config.wordpress_options())?;

    source
        .check_connection()
        .await
        .context("cannot connect to WordPress API")?;
    let total = source.record_count().await.context("count WordPress posts")?;
    tracing::info!(
        total,
        per_page = config.per_page,
        offset = config.offset,
        "migration will process {} of {total} records",
        config.per_page
    );

    let folder = store
        .find_folder(&config.target_folder)
        .await
        .context("look up target folder")?;
    let folder = match folder {
        Some(folder) => {
            tracing::info!(folder_id = folder.id, slug = %folder.slug, "found target folder");
            Some(TargetFolder {
                id: folder.id,
                slug: folder.slug,
            })
        }
        None => {
            tracing::warn!(name = %config.target_folder, "target folder not found; stories go to the root");
            None
        }
    };

    let asset_mode = if config.enable_asset_upload {
        let asset_folder = store
            .find_asset_folder(&config.asset_folder)
            .await
            .context("look up asset folder")?;
        match &asset_folder {
            Some(found) => tracing::info!(asset_folder_id = found.id, "found asset folder"),
            None => tracing::warn!(name = %config.asset_folder, "asset folder not found; images go to the root"),
        }
        AssetMode::Upload {
            asset_folder_id: asset_folder.map(|found| found.id),
        }
    } else {
        AssetMode::LinkOnly
    };

    let records = source
        .list_records(config.per_page, config.offset)
        .await
        .context("fetch WordPress posts")?;
    if records.is_empty() {
        tracing::warn!("no records found to migrate");
    } else {
        tracing::info!(count = records.len(), "records to migrate");
    }

    let settings = BatchSettings {
        folder,
        asset_mode,
        prompts: RewritePrompts {
            brand_context: config.brand_context.clone(),
        },
        pacing: Pacing {
            between_records: config.record_delay,
            between_steps: config.step_delay,
        },
    };
    let migrator = Migrator::new(&source, &store, generator.as_deref(), settings);
    let report = migrator.run_batch(records).await;
    report.log_summary("migration");

    if let Some(path) = &args.report {
        write_json_atomic(path, &report, true)
            .await
            .with_context(|| format!("write report: {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote report");
    }
    Ok(())
}

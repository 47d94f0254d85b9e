use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::Context as _;
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

use crate::cli::{DatesBackfillArgs, DatesExtractArgs};
use crate::formats::{DateRecord, Story};
use crate::migrate::BatchReport;
use crate::output::write_json_atomic;
use crate::retry::RetryPolicy;
use crate::storyblok::{StoryblokClient, TargetStore};
use crate::wordpress::{LegacySource, WordPressClient, WordPressOptions};

pub const EXTRACT_PAGE_SIZE: u32 = 100;

const UNMATCHED_SAMPLE: usize = 5;
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Formats a legacy timestamp as the store's `YYYY-MM-DD HH:MM`.
///
/// The wall-clock time is kept as written; offsets are not applied.
/// Unparseable input is returned unchanged.
pub fn format_store_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|date| date.naive_local())
        });
    match parsed {
        Some(date) => date.format("%Y-%m-%d %H:%M").to_string(),
        None => {
            tracing::warn!(raw, "unrecognized date; passing through");
            raw.to_owned()
        }
    }
}

pub fn merge_date_modified(content: Value, date: &str) -> anyhow::Result<Value> {
    let Value::Object(mut fields) = content else {
        anyhow::bail!("story content is not an object");
    };
    fields.insert("dateModified".to_owned(), Value::String(date.to_owned()));
    Ok(Value::Object(fields))
}

#[derive(Debug, Default)]
pub struct SlugMatches {
    pub matched: Vec<(DateRecord, Story)>,
    pub unmatched_rows: Vec<String>,
    pub unmatched_stories: Vec<String>,
}

/// Pairs date rows with stories of the same slug, in row order.
pub fn match_by_slug(rows: Vec<DateRecord>, stories: Vec<Story>) -> SlugMatches {
    let row_slugs: HashSet<String> = rows.iter().map(|row| row.slug.clone()).collect();
    let unmatched_stories = stories
        .iter()
        .filter(|story| !row_slugs.contains(&story.slug))
        .map(|story| story.slug.clone())
        .collect();

    let by_slug: HashMap<String, Story> = stories
        .into_iter()
        .map(|story| (story.slug.clone(), story))
        .collect();
    let mut matches = SlugMatches {
        unmatched_stories,
        ..SlugMatches::default()
    };
    for row in rows {
        match by_slug.get(&row.slug) {
            Some(story) => matches.matched.push((row, story.clone())),
            None => matches.unmatched_rows.push(row.slug),
        }
    }
    matches
}

fn sample(slugs: &[String]) -> String {
    let mut listed = slugs
        .iter()
        .take(UNMATCHED_SAMPLE)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if slugs.len() > UNMATCHED_SAMPLE {
        listed.push_str(", ...");
    }
    listed
}

pub async fn extract_dates(
    source: &dyn LegacySource,
    page_delay: Duration,
) -> anyhow::Result<Vec<DateRecord>> {
    let total = source.record_count().await.context("count WordPress posts")?;
    if total == 0 {
        anyhow::bail!("no WordPress posts found");
    }
    tracing::info!(total, "extracting dates");

    let mut rows = Vec::new();
    let mut offset = 0u64;
    while offset < total {
        let (page_size, page_offset) = page_window(total, offset)?;
        tracing::info!(offset, page_size, "fetching page ({}/{total})", offset + 1);
        let records = source
            .list_records(page_size, page_offset)
            .await
            .with_context(|| format!("fetch posts at offset {offset}"))?;
        rows.extend(records.iter().map(DateRecord::from));
        offset += u64::from(EXTRACT_PAGE_SIZE);
        if offset < total && !page_delay.is_zero() {
            tokio::time::sleep(page_delay).await;
        }
    }
    Ok(rows)
}

fn page_window(total: u64, offset: u64) -> anyhow::Result<(u32, u32)> {
    let remaining = u32::try_from(total.saturating_sub(offset)).unwrap_or(u32::MAX);
    let page_offset = u32::try_from(offset)
        .with_context(|| format!("offset {offset} is out of range for the posts API"))?;
    Ok((EXTRACT_PAGE_SIZE.min(remaining), page_offset))
}

pub async fn backfill_dates(
    store: &dyn TargetStore,
    rows: Vec<DateRecord>,
    folder_slug: &str,
    update_delay: Duration,
) -> anyhow::Result<BatchReport> {
    let stories = store
        .stories_in_folder(folder_slug)
        .await
        .with_context(|| format!("list stories under {folder_slug}"))?;
    tracing::info!(stories = stories.len(), folder_slug, "listed stories");

    let matches = match_by_slug(rows, stories);
    tracing::info!(matched = matches.matched.len(), "matched stories by slug");
    if !matches.unmatched_rows.is_empty() {
        tracing::warn!(
            count = matches.unmatched_rows.len(),
            "unmatched WordPress posts: {}",
            sample(&matches.unmatched_rows)
        );
    }
    if !matches.unmatched_stories.is_empty() {
        tracing::warn!(
            count = matches.unmatched_stories.len(),
            "unmatched Storyblok stories: {}",
            sample(&matches.unmatched_stories)
        );
    }

    let mut report = BatchReport::default();
    let total = matches.matched.len();
    for (idx, (row, story)) in matches.matched.into_iter().enumerate() {
        if idx > 0 && !update_delay.is_zero() {
            tokio::time::sleep(update_delay).await;
        }
        tracing::info!(story_id = story.id, slug = %story.slug, "updating ({}/{total})", idx + 1);
        match backfill_one(store, &row, &story).await {
            Ok(date) => {
                tracing::info!(story_id = story.id, date = %date, "date updated");
                report.record_success();
            }
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::error!(story_id = story.id, error = %reason, "date update failed");
                report.record_failure(row.wordpress_id, &story.name, reason);
            }
        }
    }
    Ok(report)
}

async fn backfill_one(store: &dyn TargetStore, row: &DateRecord, story: &Story) -> anyhow::Result<String> {
    let raw = [row.modified.as_deref(), row.date.as_deref()]
        .into_iter()
        .flatten()
        .find(|raw| !raw.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("no date recorded for {}", row.slug))?;
    let date = format_store_date(raw);

    let content = store
        .story_content(story.id)
        .await
        .context("read story content")?
        .ok_or_else(|| anyhow::anyhow!("story {} has no content", story.id))?;
    let content = merge_date_modified(content, &date)?;
    store
        .update_story(story, &content, false)
        .await
        .context("save story")?;
    Ok(date)
}

pub async fn run_extract(args: DatesExtractArgs) -> anyhow::Result<()> {
    if !args.force && tokio::fs::try_exists(&args.out).await.unwrap_or(false) {
        anyhow::bail!("output already exists: {} (use --force)", args.out.display());
    }
    let source = WordPressClient::new(WordPressOptions {
        api_base: args.wordpress.wp_api.clone(),
        host_header: args.wordpress.wp_host.clone(),
        accept_invalid_certs: args.wordpress.wp_insecure,
        retry: RetryPolicy::new(args.max_retries, Duration::from_secs(1)),
    })?;
    source
        .check_connection()
        .await
        .context("cannot connect to WordPress API")?;

    let rows = extract_dates(&source, Duration::from_millis(args.page_delay_ms)).await?;
    write_json_atomic(&args.out, &rows, args.force)
        .await
        .with_context(|| format!("write {}", args.out.display()))?;
    tracing::info!(rows = rows.len(), path = %args.out.display(), "saved dates");
    Ok(())
}

pub async fn run_backfill(args: DatesBackfillArgs) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("read dates file: {}", args.input.display()))?;
    let rows: Vec<DateRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parse dates file: {}", args.input.display()))?;
    tracing::info!(rows = rows.len(), "loaded dates");

    let store = StoryblokClient::from_env(RetryPolicy::new(args.max_retries, Duration::from_secs(1)))?;
    let report = backfill_dates(
        &store,
        rows,
        &args.folder_slug,
        Duration::from_millis(args.update_delay_ms),
    )
    .await?;
    report.log_summary("date backfill");

    if let Some(path) = &args.report {
        write_json_atomic(path, &report, true)
            .await
            .with_context(|| format!("write report: {}", path.display()))?;
    }
    Ok(())
}

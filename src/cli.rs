use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::generate::RewriteEngine;
use crate::richtext::SourceKind;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Migrate one page of WordPress posts into Storyblok.
    Migrate(MigrateArgs),
    /// Convert a local HTML or Markdown file to rich-text JSON.
    Convert(ConvertArgs),
    /// Check that the WordPress API (and optionally Storyblok) is reachable.
    CheckConnection(CheckConnectionArgs),
    Dates {
        #[command(subcommand)]
        command: DatesCommand,
    },
}

#[derive(Debug, Clone, Args)]
pub struct WordPressArgs {
    /// WordPress REST base, e.g. `https://example.com/wp-json/wp/v2`.
    #[arg(long)]
    pub wp_api: String,

    /// Host header to send (for reaching the server by IP).
    #[arg(long)]
    pub wp_host: Option<String>,

    /// Accept invalid TLS certificates from the WordPress server.
    #[arg(long)]
    pub wp_insecure: bool,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub wordpress: WordPressArgs,

    /// Posts to fetch (1-100).
    #[arg(long, default_value_t = 10)]
    pub per_page: u32,

    /// Posts to skip before the page starts.
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Reference featured images by their WordPress URL instead of uploading them.
    #[arg(long)]
    pub no_asset_upload: bool,

    /// Generative service used to rewrite titles and bodies.
    #[arg(long, value_enum, default_value_t = RewriteEngine::None)]
    pub engine: RewriteEngine,

    /// Company description appended to the rewrite system prompt.
    #[arg(long)]
    pub brand_context: Option<String>,

    /// Attempts per network call (first attempt included).
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Delay between records.
    #[arg(long, default_value_t = 1000)]
    pub record_delay_ms: u64,

    /// Delay between pipeline steps of one record.
    #[arg(long, default_value_t = 250)]
    pub step_delay_ms: u64,

    /// Storyblok folder (by name) receiving the stories.
    #[arg(long, default_value = "Articles")]
    pub folder: String,

    /// Storyblok asset folder (by name) receiving the images.
    #[arg(long, default_value = "Articles")]
    pub asset_folder: String,

    /// Write the batch report as JSON to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConvertFormat {
    /// Storyblok rich-text (TipTap) JSON.
    Storyblok,
    /// The internal block/inline document.
    Document,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input file.
    #[arg(long)]
    pub input: PathBuf,

    /// How to read the input.
    #[arg(long, value_enum, default_value_t = SourceKind::Html)]
    pub from: SourceKind,

    #[arg(long, value_enum, default_value_t = ConvertFormat::Storyblok)]
    pub format: ConvertFormat,

    /// Output file (default: stdout).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Overwrite `--out` if it exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct CheckConnectionArgs {
    #[command(flatten)]
    pub wordpress: WordPressArgs,

    /// Also check Storyblok credentials by listing asset folders.
    #[arg(long)]
    pub storyblok: bool,
}

#[derive(Debug, Subcommand)]
pub enum DatesCommand {
    /// Save slug and dates of every WordPress post to a JSON file.
    Extract(DatesExtractArgs),
    /// Write saved dates into the matching Storyblok stories.
    Backfill(DatesBackfillArgs),
}

#[derive(Debug, Args)]
pub struct DatesExtractArgs {
    #[command(flatten)]
    pub wordpress: WordPressArgs,

    /// Output JSON file.
    #[arg(long, default_value = "wordpress-dates.json")]
    pub out: PathBuf,

    /// Overwrite `--out` if it exists.
    #[arg(long)]
    pub force: bool,

    /// Delay between pages.
    #[arg(long, default_value_t = 500)]
    pub page_delay_ms: u64,

    /// Attempts per network call (first attempt included).
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,
}

#[derive(Debug, Args)]
pub struct DatesBackfillArgs {
    /// JSON file written by `dates extract`.
    #[arg(long, default_value = "wordpress-dates.json")]
    pub input: PathBuf,

    /// Slug of the Storyblok folder holding the stories.
    #[arg(long, default_value = "articles")]
    pub folder_slug: String,

    /// Delay between story updates.
    #[arg(long, default_value_t = 300)]
    pub update_delay_ms: u64,

    /// Attempts per network call (first attempt included).
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Write the batch report as JSON to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

use std::time::Duration;

use crate::cli::MigrateArgs;
use crate::generate::RewriteEngine;
use crate::retry::RetryPolicy;
use crate::wordpress::WordPressOptions;

pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub wp_api_base: String,
    pub wp_host_header: Option<String>,
    pub wp_accept_invalid_certs: bool,
    pub per_page: u32,
    pub offset: u32,
    pub enable_asset_upload: bool,
    pub engine: RewriteEngine,
    pub brand_context: Option<String>,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub record_delay: Duration,
    pub step_delay: Duration,
    pub target_folder: String,
    pub asset_folder: String,
}

impl From<&MigrateArgs> for MigrationConfig {
    fn from(args: &MigrateArgs) -> Self {
        Self {
            wp_api_base: args.wordpress.wp_api.clone(),
            wp_host_header: args.wordpress.wp_host.clone(),
            wp_accept_invalid_certs: args.wordpress.wp_insecure,
            per_page: args.per_page,
            offset: args.offset,
            enable_asset_upload: !args.no_asset_upload,
            engine: args.engine,
            brand_context: args.brand_context.clone(),
            max_retries: args.max_retries,
            retry_base_delay: Duration::from_secs(1),
            record_delay: Duration::from_millis(args.record_delay_ms),
            step_delay: Duration::from_millis(args.step_delay_ms),
            target_folder: args.folder.clone(),
            asset_folder: args.asset_folder.clone(),
        }
    }
}

impl MigrationConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let base = self.wp_api_base.trim();
        if !base.starts_with("http") {
            anyhow::bail!("invalid WordPress API base URL: {base:?} (must start with http)");
        }
        url::Url::parse(base)
            .map_err(|err| anyhow::anyhow!("invalid WordPress API base URL {base:?}: {err}"))?;
        if !(1..=MAX_PER_PAGE).contains(&self.per_page) {
            anyhow::bail!(
                "per-page must be between 1 and {MAX_PER_PAGE} (got {})",
                self.per_page
            );
        }
        if self.max_retries < 1 {
            anyhow::bail!("max-retries must be at least 1");
        }
        if self.target_folder.trim().is_empty() {
            anyhow::bail!("target folder name is empty");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay)
    }

    pub fn wordpress_options(&self) -> WordPressOptions {
        WordPressOptions {
            api_base: self.wp_api_base.trim().to_owned(),
            host_header: self.wp_host_header.clone(),
            accept_invalid_certs: self.wp_accept_invalid_certs,
            retry: self.retry_policy(),
        }
    }
}

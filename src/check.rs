use std::time::Duration;

use anyhow::Context as _;

use crate::cli::CheckConnectionArgs;
use crate::retry::RetryPolicy;
use crate::storyblok::StoryblokClient;
use crate::wordpress::{LegacySource, WordPressClient, WordPressOptions};

pub async fn run(args: CheckConnectionArgs) -> anyhow::Result<()> {
    let retry = RetryPolicy::new(1, Duration::ZERO);
    let source = WordPressClient::new(WordPressOptions {
        api_base: args.wordpress.wp_api.clone(),
        host_header: args.wordpress.wp_host.clone(),
        accept_invalid_certs: args.wordpress.wp_insecure,
        retry,
    })?;
    source
        .check_connection()
        .await
        .context("cannot connect to WordPress API")?;
    let total = source.record_count().await.context("count WordPress posts")?;
    tracing::info!(total, "WordPress posts available");

    if args.storyblok {
        let store = StoryblokClient::from_env(retry)?;
        let asset_folders = store
            .check_connection()
            .await
            .context("cannot reach Storyblok management API")?;
        tracing::info!(asset_folders, "Storyblok connection ok");
    }
    Ok(())
}

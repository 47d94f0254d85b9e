use std::io::Write as _;

use anyhow::Context as _;

use crate::cli::{ConvertArgs, ConvertFormat};
use crate::output::write_json_atomic;
use crate::richtext::{parse, to_storyblok_json};

pub async fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("read input: {}", args.input.display()))?;

    let document = parse(&raw, args.from);
    if document.is_empty() {
        tracing::warn!(input = %args.input.display(), "input produced an empty document");
    }
    let value = match args.format {
        ConvertFormat::Storyblok => to_storyblok_json(&document),
        ConvertFormat::Document => {
            serde_json::to_value(&document).context("serialize document")?
        }
    };

    match &args.out {
        Some(path) => {
            write_json_atomic(path, &value, args.force)
                .await
                .with_context(|| format!("write output: {}", path.display()))?;
            tracing::info!(blocks = document.blocks.len(), out = %path.display(), "converted");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &value).context("write stdout")?;
            writeln!(stdout).context("write stdout")?;
        }
    }
    Ok(())
}

use std::path::Path;

use anyhow::Context as _;
use tokio::fs;

/// An existing file at `path` is only replaced with `force`.
pub async fn write_json_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
    force: bool,
) -> anyhow::Result<()> {
    if !force && fs::try_exists(path).await.unwrap_or(false) {
        anyhow::bail!("output already exists: {} (use --force)", path.display());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create parent dir: {}", parent.display()))?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let mut data = serde_json::to_vec_pretty(value).context("serialize json")?;
    data.push(b'\n');
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

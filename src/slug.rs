use anyhow::Context as _;

use crate::storyblok::TargetStore;

/// Probe ceiling: the natural slug plus suffixes `-1` ..= `-99`.
pub const MAX_SLUG_PROBES: u32 = 100;

/// Probes `base`, then `base-1`, `base-2`, ... and gives up after
/// [`MAX_SLUG_PROBES`] probes. With a `folder_slug` the probe is made against
/// the folder-qualified path; the returned slug is always the bare one.
pub async fn resolve_unique_slug(
    store: &dyn TargetStore,
    base: &str,
    folder_slug: Option<&str>,
) -> anyhow::Result<String> {
    for probe in 0..MAX_SLUG_PROBES {
        let candidate = if probe == 0 {
            base.to_owned()
        } else {
            format!("{base}-{probe}")
        };
        let path = match folder_slug {
            Some(folder) => format!("{}/{candidate}", folder.trim_matches('/')),
            None => candidate.clone(),
        };
        let taken = store
            .story_exists(&path)
            .await
            .with_context(|| format!("probe slug {path}"))?;
        if !taken {
            if probe > 0 {
                tracing::info!(base, slug = %candidate, probes = probe + 1, "slug collision resolved");
            }
            return Ok(candidate);
        }
    }
    anyhow::bail!("could not find a free slug for {base:?} after {MAX_SLUG_PROBES} probes")
}

/// Slug used when creating under the resolved slug fails.
pub fn fallback_slug(base: &str, unix_millis: i64) -> String {
    format!("{base}-{unix_millis}")
}

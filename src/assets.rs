use anyhow::Context as _;

use crate::formats::{AssetHandle, AssetRef, MediaInfo};
use crate::richtext::decode_entities;
use crate::storyblok::TargetStore;
use crate::wordpress::LegacySource;

const DEFAULT_IMAGE_NAME: &str = "WordPress Image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetMode {
    Upload { asset_folder_id: Option<u64> },
    LinkOnly,
}

/// Returns `Ok(None)` when the record has no featured media.
pub async fn transfer_featured_media(
    source: &dyn LegacySource,
    store: &dyn TargetStore,
    media_id: Option<u64>,
    mode: AssetMode,
    unix_millis: i64,
) -> anyhow::Result<Option<AssetRef>> {
    let Some(media_id) = media_id else {
        return Ok(None);
    };
    let media = source
        .get_media(media_id)
        .await
        .with_context(|| format!("fetch media {media_id}"))?;

    let asset_folder_id = match mode {
        AssetMode::LinkOnly => return Ok(Some(linked_asset(&media))),
        AssetMode::Upload { asset_folder_id } => asset_folder_id,
    };

    let bytes = source
        .fetch_binary(&media.binary_url)
        .await
        .with_context(|| format!("download {}", media.binary_url))?;
    tracing::info!(media_id, bytes = bytes.len(), "fetched featured image");

    let filename = upload_filename(&media.mime_type, unix_millis);
    let size_hint = size_hint(&media);

    let slot = store
        .request_upload_slot(&filename, &size_hint, asset_folder_id)
        .await
        .context("request upload slot")?;
    store
        .upload_bytes(&slot, &filename, bytes)
        .await
        .context("upload asset bytes")?;
    let handle = store
        .finalize_upload(slot.id)
        .await
        .context("finalize asset upload")?;
    tracing::info!(asset_id = handle.id, filename = %handle.filename, "uploaded featured image");

    Ok(Some(uploaded_asset(&handle, &media)))
}

pub fn uploaded_asset(handle: &AssetHandle, media: &MediaInfo) -> AssetRef {
    AssetRef {
        id: Some(handle.id),
        filename: handle.filename.clone(),
        ..linked_asset(media)
    }
}

pub fn linked_asset(media: &MediaInfo) -> AssetRef {
    let title = decode_entities(media.title.trim());
    let alt = if !media.alt_text.trim().is_empty() {
        media.alt_text.trim().to_owned()
    } else {
        title.clone()
    };
    AssetRef {
        fieldtype: "asset".to_owned(),
        id: None,
        filename: media.binary_url.clone(),
        alt,
        name: if title.is_empty() {
            DEFAULT_IMAGE_NAME.to_owned()
        } else {
            title.clone()
        },
        title: (!title.is_empty()).then_some(title),
        focus: None,
        width: media.width.filter(|w| *w > 0),
        height: media.height.filter(|h| *h > 0),
        content_type: (!media.mime_type.is_empty()).then(|| media.mime_type.clone()),
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let mime = mime_type.to_ascii_lowercase();
    if mime.contains("png") {
        ".png"
    } else if mime.contains("gif") {
        ".gif"
    } else if mime.contains("webp") {
        ".webp"
    } else {
        ".jpg"
    }
}

pub fn upload_filename(mime_type: &str, unix_millis: i64) -> String {
    format!("image-{unix_millis}{}", extension_for_mime(mime_type))
}

pub fn size_hint(media: &MediaInfo) -> String {
    match (media.width, media.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => format!("{w}x{h}"),
        _ => String::new(),
    }
}

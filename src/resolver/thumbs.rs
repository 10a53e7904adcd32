// Thumbnail fetch - retrieves preview bytes for a resolved link

use std::time::Duration;

use super::models::ThumbnailRef;

/// Fetch the thumbnail bytes behind `thumbnail`. Any failure is a `None`:
/// a missing preview image is cosmetic, never an error the user sees.
pub async fn fetch_thumbnail(thumbnail: &ThumbnailRef, timeout_secs: u64) -> Option<Vec<u8>> {
    if thumbnail.is_empty() {
        return None;
    }

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            log::warn!("[Thumbs] failed to build HTTP client: {}", e);
            return None;
        }
    };

    match client.get(&thumbnail.0).send().await {
        Ok(response) if response.status().is_success() => match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                log::debug!("[Thumbs] body read failed: {}", e);
                None
            }
        },
        Ok(response) => {
            log::debug!("[Thumbs] fetch returned {}", response.status());
            None
        }
        Err(e) => {
            log::debug!("[Thumbs] fetch failed: {}", e);
            None
        }
    }
}

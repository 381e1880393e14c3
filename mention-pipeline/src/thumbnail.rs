//! Author thumbnails
//!
//! Photos are fetched, scaled so the longer side matches the configured bound,
//! re-encoded as PNG at best compression and stored under the hash of the
//! encoded bytes. Identical photos collapse to one record.

use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use std::sync::Arc;
use tracing::debug;

use mention_core::{MentionError, Store, Thumbnail};
use mention_net::Fetcher;

/// Dimensions for a `width` x `height` image bounded by `bound`.
///
/// The longer side becomes `bound`; the other is derived from the aspect ratio.
pub fn target_dimensions(width: u32, height: u32, bound: u32) -> (u32, u32) {
    let (w, h) = if width > height { (bound, 0) } else { (0, bound) };

    // A zero side is derived from the fixed one
    let derive = |fixed: u32, side: u32, other: u32| -> u32 {
        if side == 0 {
            return fixed;
        }
        let scaled = (f64::from(other) * f64::from(fixed) / f64::from(side)).round() as u32;
        scaled.max(1)
    };

    if w == 0 {
        (derive(h, height, width), h)
    } else {
        (w, derive(w, width, height))
    }
}

/// Decode, resize and re-encode an image
pub fn render_thumbnail(bytes: &[u8], bound: u32) -> Result<Vec<u8>, MentionError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| MentionError::Encoding(format!("Failed to decode image: {e}")))?;

    let (width, height) = target_dimensions(img.width(), img.height(), bound);
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);

    let mut encoded = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, PngFilterType::Adaptive);
    resized
        .write_with_encoder(encoder)
        .map_err(|e| MentionError::Encoding(format!("Failed to encode thumbnail: {e}")))?;

    Ok(encoded)
}

/// Derives and stores author thumbnails
pub struct ThumbnailService {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn Fetcher>,
    size: u32,
}

impl ThumbnailService {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>, size: u32) -> Self {
        Self {
            store,
            fetcher,
            size,
        }
    }

    /// Fetch the photo at `photo_url` and store its thumbnail, returning the id
    pub async fn derive(&self, photo_url: &str) -> Result<String, MentionError> {
        let bytes = self.fetcher.fetch(photo_url).await?;
        let thumbnail = Thumbnail::new(render_thumbnail(&bytes, self.size)?);
        let id = thumbnail.id();

        self.store.put_thumbnail(&id, &thumbnail)?;
        debug!("Stored thumbnail {} for {}", id, photo_url);
        Ok(id)
    }
}

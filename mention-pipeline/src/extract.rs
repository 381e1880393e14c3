//! Attribution metadata extraction
//!
//! Walks every `h-entry` in a source document, in preorder, and copies its
//! title, publish time and author onto the mention. Later entries overwrite
//! earlier ones. Extraction is best effort: nothing here fails the mention.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::microformats::{self, Document, Item};
use crate::ThumbnailService;
use mention_core::Mention;

const ENTRY_TYPE: &str = "h-entry";
const TWITTER_TAG_PREFIX: &str = "tag:twitter";

/// Fills enrichment fields on mentions that passed slow validation
pub struct Extractor {
    thumbnails: ThumbnailService,
}

impl Extractor {
    pub fn new(thumbnails: ThumbnailService) -> Self {
        Self { thumbnails }
    }

    /// Enrich `mention` from `body`, the fetched source document
    pub async fn extract(&self, mention: &mut Mention, body: &str) {
        let document = microformats::parse(body, &mention.source);

        let mut entries = Vec::new();
        for item in &document.items {
            collect_entries(item, &mut entries);
        }
        debug!("Found {} entries in {}", entries.len(), mention.source);

        for entry in entries {
            self.apply_entry(mention, entry, &document).await;
        }
    }

    async fn apply_entry(&self, mention: &mut Mention, entry: &Item, document: &Document) {
        mention.title = entry.first_text("name").map(|name| {
            if name.starts_with(TWITTER_TAG_PREFIX) {
                twitter_title(entry)
            } else {
                name.to_string()
            }
        });

        if let Some(published) = entry
            .first_text("published")
            .and_then(|p| DateTime::parse_from_rfc3339(p.trim()).ok())
        {
            mention.published_at = Some(published.with_timezone(&Utc));
        }

        for author in entry.nodes("author") {
            self.apply_author(mention, author, document).await;
        }
    }

    async fn apply_author(&self, mention: &mut Mention, author: &Item, document: &Document) {
        mention.author = author.value.clone();
        mention.author_url = document.first_rel("author").map(str::to_string);

        let Some(photo) = author.first_text("photo") else {
            return;
        };

        match self.thumbnails.derive(photo).await {
            Ok(id) => mention.thumbnail_id = Some(id),
            Err(e) => warn!("Failed to make thumbnail from {}: {}", photo, e),
        }
    }
}

/// Preorder collection of entry items across the child tree
fn collect_entries<'a>(item: &'a Item, entries: &mut Vec<&'a Item>) {
    if item.has_type(ENTRY_TYPE) {
        entries.push(item);
    }
    for child in &item.children {
        collect_entries(child, entries);
    }
}

/// Label for tweets, whose names are opaque tag URIs.
/// Only plain string `like-of`/`repost-of` values count.
fn twitter_title(entry: &Item) -> String {
    let has_text = |property: &str| entry.first_text(property).is_some_and(|s| !s.is_empty());

    let mut title = String::from("Twitter");
    if has_text("like-of") {
        title.push_str(" Like");
    }
    if has_text("repost-of") {
        title.push_str(" Repost");
    }
    title
}

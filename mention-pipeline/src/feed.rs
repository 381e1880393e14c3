//! Feed parsing
//!
//! Each feed entry becomes a `MentionSource`: its canonical link, the links
//! found in its content, and its update time.

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use std::collections::HashMap;
use tracing::{debug, warn};

use mention_core::{MentionError, MentionSource};
use mention_net::discover_links;

/// Result of parsing a feed
#[derive(Debug, Default)]
pub struct FeedParse {
    /// Source URL -> entry. A repeated source keeps the last entry.
    pub sources: HashMap<String, MentionSource>,
    /// Per-entry problems recorded without aborting the batch
    pub errors: Vec<MentionError>,
}

/// Parse a feed document. Fails only when the document itself is unreadable.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedParse, MentionError> {
    let feed = feed_rs::parser::Builder::new()
        .timestamp_parser(strict_timestamp)
        .build()
        .parse(bytes)
        .map_err(|e| MentionError::Parse(format!("Failed to parse feed: {e}")))?;

    let mut parsed = FeedParse::default();

    for entry in &feed.entries {
        let Some(source) = canonical_link(entry) else {
            warn!("Feed entry {:?} has no link, skipping", entry.id);
            parsed
                .errors
                .push(MentionError::Parse(format!("entry {:?} has no link", entry.id)));
            continue;
        };

        let content = entry
            .content
            .as_ref()
            .and_then(|c| c.body.clone())
            .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
            .unwrap_or_default();

        let targets = discover_links(&content, &source);

        let updated_at = match entry.updated {
            Some(updated) => updated,
            None => {
                warn!("Failed to parse entry timestamp for {}", source);
                parsed.errors.push(MentionError::Parse(format!(
                    "entry {source} has a missing or malformed updated timestamp"
                )));
                DateTime::<Utc>::default()
            }
        };

        debug!("Entry {} has {} targets", source, targets.len());

        parsed.sources.insert(
            source.clone(),
            MentionSource {
                source,
                targets,
                updated_at,
            },
        );
    }

    Ok(parsed)
}

/// RFC 3339 only; anything else counts as malformed
fn strict_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// The entry's alternate link, or its first link of any relation
fn canonical_link(entry: &Entry) -> Option<String> {
    entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
   <title type="html">BitWorking</title>
   <link href="http://bitworking.org/" />
   <link href="http://bitworking.org/news/feed/" rel="self" />
   <updated>2016-09-12T07:21:48-04:00</updated>
   <author>
      <name>Joe Gregorio</name>
   </author>
   <id>http://bitworking.org/</id>
   <entry>
     <title type="html">Inertial Balance</title>
     <link href="http://bitworking.org/news/2016/08/interial_balance" />
     <id>http://bitworking.org/news/2016/08/content2</id>
     <updated>2016-08-16T22:42:54-04:00</updated>
     <content type="html">This is the content &lt;a href=&#34;http://example.com/&#34;&gt;</content>
   </entry>
   <entry>
     <updated>2016-08-16T14:30:50-04:00</updated>
     <id>http://bitworking.org/news/2016/08/stuff</id>
     <link href="http://bitworking.org/news/2016/08/stuff"/>
     <content type="html">This is stuff</content>
   </entry>
   <entry>
     <updated>2016-08-16T14:30:50-04:00</updated>
     <id>http://bitworking.org/news/2016/09/relative</id>
     <link href="http://bitworking.org/news/2016/08/relative"/>
     <content type="html">This is the content &lt;a href=&#34;sample.js&#34;&gt;</content>
   </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_three_entries() {
        let parsed = parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(parsed.sources.len(), 3);
        assert!(parsed.errors.is_empty());

        let balance = &parsed.sources["http://bitworking.org/news/2016/08/interial_balance"];
        assert_eq!(balance.targets, vec!["http://example.com/"]);
        assert_eq!(
            balance.updated_at,
            Utc.with_ymd_and_hms(2016, 8, 17, 2, 42, 54).unwrap()
        );

        let stuff = &parsed.sources["http://bitworking.org/news/2016/08/stuff"];
        assert!(stuff.targets.is_empty());

        let relative = &parsed.sources["http://bitworking.org/news/2016/08/relative"];
        assert_eq!(
            relative.targets,
            vec!["http://bitworking.org/news/2016/08/sample.js"]
        );
    }

    #[test]
    fn test_repeated_source_last_wins() {
        let feed = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:x</id><title>x</title><updated>2016-09-12T07:21:48-04:00</updated>
  <entry>
    <id>urn:1</id><title>a</title>
    <link href="http://bitworking.org/a"/>
    <updated>2016-08-16T14:30:50-04:00</updated>
    <content type="html">&lt;a href="https://one.example/"&gt;1&lt;/a&gt;</content>
  </entry>
  <entry>
    <id>urn:2</id><title>b</title>
    <link href="http://bitworking.org/a"/>
    <updated>2016-08-17T14:30:50-04:00</updated>
    <content type="html">&lt;a href="https://two.example/"&gt;2&lt;/a&gt;</content>
  </entry>
</feed>"#;

        let parsed = parse_feed(feed.as_bytes()).unwrap();
        assert_eq!(parsed.sources.len(), 1);
        assert_eq!(
            parsed.sources["http://bitworking.org/a"].targets,
            vec!["https://two.example/"]
        );
    }

    #[test]
    fn test_malformed_timestamp_is_recorded() {
        let feed = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:x</id><title>x</title><updated>2016-09-12T07:21:48-04:00</updated>
  <entry>
    <id>urn:1</id><title>a</title>
    <link href="http://bitworking.org/news/rfc2822"/>
    <updated>Tue, 16 Aug 2016 14:30:50 -0400</updated>
    <content type="html">&lt;a href="https://one.example/"&gt;1&lt;/a&gt;</content>
  </entry>
  <entry>
    <id>urn:2</id><title>b</title>
    <link href="http://bitworking.org/news/dated"/>
    <updated>2016-08-16T14:30:50-04:00</updated>
    <content type="html">fine</content>
  </entry>
</feed>"#;

        let parsed = parse_feed(feed.as_bytes()).unwrap();
        assert_eq!(parsed.sources.len(), 2);
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0]
            .to_string()
            .contains("http://bitworking.org/news/rfc2822"));

        let bad = &parsed.sources["http://bitworking.org/news/rfc2822"];
        assert_eq!(bad.updated_at, DateTime::<Utc>::default());
        assert_eq!(bad.targets, vec!["https://one.example/"]);

        let dated = &parsed.sources["http://bitworking.org/news/dated"];
        assert_eq!(
            dated.updated_at,
            Utc.with_ymd_and_hms(2016, 8, 16, 18, 30, 50).unwrap()
        );
    }

    #[test]
    fn test_strict_timestamp() {
        assert!(strict_timestamp(" 2016-08-16T22:42:54-04:00\n").is_some());
        assert!(strict_timestamp("2016-08-16").is_none());
        assert!(strict_timestamp("Tue, 16 Aug 2016 14:30:50 -0400").is_none());
    }

    #[test]
    fn test_unparseable_document_is_parse_error() {
        assert!(matches!(
            parse_feed(b"this is not a feed"),
            Err(MentionError::Parse(_))
        ));
    }
}

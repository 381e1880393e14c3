//! Webmention endpoint discovery and delivery
//!
//! Discovery order: HTTP `Link` headers first, then the first `<link>` or `<a>`
//! in the document whose `rel` includes `webmention`. The endpoint is resolved
//! against the final (post-redirect) URL of the target.

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, Client};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

use crate::{create_client, NetError};
use mention_core::HttpConfig;

const WEBMENTION_REL: &str = "webmention";

static LINK_VALUE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]*)>([^,]*)").unwrap());

static REL_PARAM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\brel\s*=\s*(?:"([^"]*)"|([^\s";,]+))"#).unwrap());

static REL_ELEMENT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel][href], a[rel][href]").unwrap());

/// Outbound half of the protocol
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Find the endpoint accepting mentions for `target`, if it advertises one
    async fn discover_endpoint(&self, target: &str) -> Result<Option<String>, NetError>;

    /// Deliver a source/target pair to `endpoint`
    async fn send(&self, endpoint: &str, source: &str, target: &str) -> Result<(), NetError>;
}

/// `Notifier` speaking HTTP via reqwest
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: Client,
}

impl HttpNotifier {
    pub fn new(config: &HttpConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn discover_endpoint(&self, target: &str) -> Result<Option<String>, NetError> {
        Url::parse(target).map_err(|_| NetError::InvalidUrl(target.to_string()))?;

        let response = self.client.get(target).send().await?;

        if !response.status().is_success() {
            return Err(NetError::Status {
                url: target.to_string(),
                status: response.status(),
            });
        }

        let final_url = response.url().clone();

        for value in response.headers().get_all(header::LINK) {
            let Ok(value) = value.to_str() else { continue };
            if let Some(href) = parse_link_header(value, WEBMENTION_REL) {
                debug!("Endpoint for {} found in Link header", target);
                return Ok(final_url.join(&href).ok().map(|u| u.to_string()));
            }
        }

        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.contains("html"));

        if !is_html {
            return Ok(None);
        }

        let body = response.text().await?;
        Ok(find_endpoint_in_html(&body, &final_url))
    }

    async fn send(&self, endpoint: &str, source: &str, target: &str) -> Result<(), NetError> {
        let response = self
            .client
            .post(endpoint)
            .form(&[("source", source), ("target", target)])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Endpoint {} rejected mention: {}", endpoint, response.status());
            return Err(NetError::Status {
                url: endpoint.to_string(),
                status: response.status(),
            });
        }

        Ok(())
    }
}

/// Extract the first URI whose `rel` parameter includes `rel` from a `Link` header
pub fn parse_link_header(value: &str, rel: &str) -> Option<String> {
    LINK_VALUE_REGEX.captures_iter(value).find_map(|cap| {
        let href = cap.get(1)?.as_str();
        let params = cap.get(2)?.as_str();
        let rels = REL_PARAM_REGEX.captures(params)?;
        let rel_value = rels.get(1).or_else(|| rels.get(2))?.as_str();

        rel_value
            .split_whitespace()
            .any(|r| r.eq_ignore_ascii_case(rel))
            .then(|| href.trim().to_string())
    })
}

/// First webmention endpoint declared in an HTML document, resolved against `base`
pub fn find_endpoint_in_html(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    document.select(&REL_ELEMENT_SELECTOR).find_map(|element| {
        let el = element.value();
        let declares = el
            .attr("rel")?
            .split_whitespace()
            .any(|r| r.eq_ignore_ascii_case(WEBMENTION_REL));
        if !declares {
            return None;
        }
        base.join(el.attr("href")?.trim()).ok().map(|u| u.to_string())
    })
}

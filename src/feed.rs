use async_trait::async_trait;
use chrono::Utc;
use feed_rs::model::Entry;
use feed_rs::parser;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FolioError, Result};
use crate::models::{Enclosure, FeedDocument, RawFeedItem};

/// How a list reaches its feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Through the hosted feed-to-JSON converter.
    #[default]
    Converter,
    /// Fetch the RSS/Atom document and parse it locally.
    Direct,
}

/// Anything that can turn a feed URL into raw items.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, feed_url: &str) -> Result<Vec<RawFeedItem>>;
}

pub struct FeedClient {
    client: Client,
    converter_url: String,
    kind: SourceKind,
}

impl FeedClient {
    pub fn new(converter_url: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            client: Client::new(),
            converter_url: converter_url.into(),
            kind,
        }
    }

    /// Converter request URL for `feed_url`, with a millisecond timestamp so
    /// intermediate caches never answer for the converter.
    pub fn converter_request(&self, feed_url: &str) -> Result<Url> {
        let buster = Utc::now().timestamp_millis().to_string();
        Url::parse_with_params(&self.converter_url, &[("rss_url", feed_url), ("_", buster.as_str())])
            .map_err(|e| FolioError::Config(format!("converter url '{}': {}", self.converter_url, e)))
    }

    async fn fetch_converted(&self, feed_url: &str) -> Result<Vec<RawFeedItem>> {
        let url = self.converter_request(feed_url)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FolioError::Network(format!("HTTP error! status: {}", status.as_u16())));
        }

        let bytes = response.bytes().await?;
        let document: FeedDocument = serde_json::from_slice(&bytes)?;
        if !document.is_ok() {
            let reason = document.message.unwrap_or_else(|| document.status.clone());
            return Err(FolioError::Network(format!("feed converter reported failure: {}", reason)));
        }

        info!("Fetched {} items for {}", document.items.len(), feed_url);
        Ok(document.items)
    }

    async fn fetch_direct(&self, feed_url: &str) -> Result<Vec<RawFeedItem>> {
        debug!("GET {}", feed_url);

        let response = self.client.get(feed_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FolioError::Network(format!("HTTP error! status: {}", status.as_u16())));
        }

        let bytes = response.bytes().await?;
        let feed = parser::parse(&bytes[..])?;

        info!("Parsed {} entries from {}", feed.entries.len(), feed_url);
        Ok(feed.entries.into_iter().map(raw_from_entry).collect())
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self, feed_url: &str) -> Result<Vec<RawFeedItem>> {
        if feed_url.trim().is_empty() {
            return Err(FolioError::Config("no feed URL configured".to_string()));
        }
        match self.kind {
            SourceKind::Converter => self.fetch_converted(feed_url).await,
            SourceKind::Direct => self.fetch_direct(feed_url).await,
        }
    }
}

/// Flatten a parsed feed entry into the converter's item shape.
fn raw_from_entry(entry: Entry) -> RawFeedItem {
    let description = entry
        .summary
        .map(|text| text.content)
        .or_else(|| entry.content.and_then(|content| content.body));

    let enclosure = entry
        .media
        .iter()
        .flat_map(|media| media.content.iter())
        .find_map(|content| {
            let url = content.url.as_ref()?;
            Some(Enclosure {
                link: url.to_string(),
                mime_type: content
                    .content_type
                    .as_ref()
                    .map(|mime| mime.to_string())
                    .unwrap_or_default(),
            })
        });

    RawFeedItem {
        title: entry.title.map(|text| text.content),
        link: entry.links.first().map(|link| link.href.clone()),
        pub_date: entry.published.or(entry.updated).map(|dt| dt.to_rfc2822()),
        description,
        enclosure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converter_request_carries_feed_and_buster() {
        let client = FeedClient::new("https://api.example.com/v1/api.json", SourceKind::Converter);
        let url = client.converter_request("https://blog.example.com/feed").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs[0], ("rss_url".into(), "https://blog.example.com/feed".into()));
        assert_eq!(pairs[1].0, "_");
        assert!(pairs[1].1.parse::<i64>().is_ok());
    }

    #[test]
    fn bad_converter_url_is_config_error() {
        let client = FeedClient::new("not a url", SourceKind::Converter);
        assert!(matches!(
            client.converter_request("https://blog.example.com/feed"),
            Err(FolioError::Config(_))
        ));
    }

    #[test]
    fn rss_entry_maps_to_raw_item() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Show</title>
<item>
  <title>Episode 1</title>
  <link>https://show.example.com/1</link>
  <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
  <description>&lt;p&gt;Notes&lt;/p&gt;</description>
  <enclosure url="https://cdn.example.com/1.mp3" length="100" type="audio/mpeg"/>
</item>
</channel></rss>"#;
        let feed = parser::parse(xml.as_bytes()).unwrap();
        let raw = raw_from_entry(feed.entries.into_iter().next().unwrap());

        assert_eq!(raw.title.as_deref(), Some("Episode 1"));
        assert_eq!(raw.link.as_deref(), Some("https://show.example.com/1"));
        assert_eq!(raw.description.as_deref(), Some("<p>Notes</p>"));
        let enclosure = raw.enclosure.unwrap();
        assert_eq!(enclosure.link, "https://cdn.example.com/1.mp3");
        assert!(enclosure.is_audio());
        assert_eq!(
            crate::date::week_label(raw.pub_date.as_deref().unwrap()).as_deref(),
            Some("Week 1/52 | 2024")
        );
    }
}

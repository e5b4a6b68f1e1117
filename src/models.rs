use serde::{Deserialize, Deserializer, Serialize};

/// Body returned by the feed-to-JSON converter.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedDocument {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub items: Vec<RawFeedItem>,
}

impl FeedDocument {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// One feed entry as the converter hands it over. Any field may be absent.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawFeedItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_enclosure")]
    pub enclosure: Option<Enclosure>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Enclosure {
    #[serde(default)]
    pub link: String,
    #[serde(default, rename = "type")]
    pub mime_type: String,
}

impl Enclosure {
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

// Converters emit `{}` or `[]` for entries without an attachment.
fn lenient_enclosure<'de, D>(deserializer: D) -> Result<Option<Enclosure>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let enclosure = match value {
        serde_json::Value::Object(map) if !map.is_empty() => {
            serde_json::from_value::<Enclosure>(serde_json::Value::Object(map)).ok()
        }
        _ => None,
    };
    Ok(enclosure)
}

/// A writing-list entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub link: String,
    pub pub_date: String,
}

/// A podcast-list entry. `description` is the feed's raw HTML.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
    pub audio_url: String,
}

/// Common view over the records a list card shows.
pub trait Listed {
    fn title(&self) -> &str;
    fn link(&self) -> &str;
    fn pub_date(&self) -> &str;
}

impl Listed for Article {
    fn title(&self) -> &str {
        &self.title
    }

    fn link(&self) -> &str {
        &self.link
    }

    fn pub_date(&self) -> &str {
        &self.pub_date
    }
}

impl Listed for Episode {
    fn title(&self) -> &str {
        &self.title
    }

    fn link(&self) -> &str {
        &self.link
    }

    fn pub_date(&self) -> &str {
        &self.pub_date
    }
}

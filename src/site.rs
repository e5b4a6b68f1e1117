use std::sync::Arc;

use anyhow::Result;
use log::info;

use crate::assistant::{AssistantClient, ChatSession};
use crate::cache::CachedList;
use crate::config::{Config, ListConfig};
use crate::feed::FeedClient;
use crate::models::{Article, Episode};
use crate::normalize;
use crate::profile::Profile;
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};

/// Everything the views need, wired from one [`Config`].
pub struct Site {
    pub config: Config,
    pub profile: Profile,
    store: Arc<dyn KeyValueStore>,
}

impl Site {
    pub async fn open(config: Config) -> Result<Self> {
        let profile = Profile::load(config.profile_path.as_deref())?;
        let store: Arc<dyn KeyValueStore> = match &config.store_path {
            Some(path) => {
                info!("Opening snapshot store at {}", path);
                Arc::new(SqliteStore::open(path).await?)
            }
            None => {
                info!("No store path configured, snapshots live in memory");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::with_store(config, profile, store))
    }

    pub fn with_store(config: Config, profile: Profile, store: Arc<dyn KeyValueStore>) -> Self {
        Self { config, profile, store }
    }

    fn list<T>(&self, list: &ListConfig, normalize: normalize::Normalizer<T>) -> Arc<CachedList<T>>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let source = Arc::new(FeedClient::new(self.config.converter_url.clone(), list.source));
        Arc::new(CachedList::new(list.spec(), Arc::clone(&self.store), source, normalize))
    }

    pub fn writing(&self) -> Arc<CachedList<Article>> {
        self.list(&self.config.writing, normalize::articles)
    }

    pub fn podcast(&self) -> Arc<CachedList<Episode>> {
        self.list(&self.config.podcast, normalize::episodes)
    }

    /// A fresh assistant conversation. Without an API key the session is
    /// created in its unavailable state.
    pub fn chat(&self, api_key: Option<&str>) -> ChatSession {
        let settings = &self.config.assistant;
        let client = api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| AssistantClient::new(settings.base_url.clone(), settings.model.clone(), key));
        ChatSession::new(&self.profile, client).with_streaming(settings.streaming)
    }
}

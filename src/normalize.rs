use std::cmp::Reverse;
use std::collections::HashSet;

use crate::date::parse_pub_date;
use crate::models::{Article, Episode, RawFeedItem};

/// Maps a raw feed payload into the records one list displays.
pub type Normalizer<T> = fn(&[RawFeedItem]) -> Vec<T>;

/// Writing list: every item is kept, newest first, one entry per link.
/// Items without a link are never collapsed.
/// Items with unparseable dates sink to the end in feed order.
pub fn articles(items: &[RawFeedItem]) -> Vec<Article> {
    let mut seen = HashSet::new();
    let mut articles: Vec<Article> = items
        .iter()
        .map(|item| Article {
            title: item.title.clone().unwrap_or_default(),
            link: item.link.clone().unwrap_or_default(),
            pub_date: item.pub_date.clone().unwrap_or_default(),
        })
        .filter(|article| article.link.is_empty() || seen.insert(article.link.clone()))
        .collect();

    // sort_by_key is stable, so equal keys keep feed order
    articles.sort_by_key(|article| Reverse(parse_pub_date(&article.pub_date)));
    articles
}

/// Podcast list: only items carrying an audio enclosure, in feed order.
pub fn episodes(items: &[RawFeedItem]) -> Vec<Episode> {
    items
        .iter()
        .filter_map(|item| {
            let enclosure = item.enclosure.as_ref().filter(|e| e.is_audio())?;
            Some(Episode {
                title: item.title.clone().unwrap_or_default(),
                link: item.link.clone().unwrap_or_default(),
                pub_date: item.pub_date.clone().unwrap_or_default(),
                description: item.description.clone().unwrap_or_default(),
                audio_url: enclosure.link.clone(),
            })
        })
        .collect()
}

use crate::commands::{Event, EventSender};
use crate::sources::icons::{self, Icon};
use cached::{Cached, UnboundCache};
use log::*;
use std::sync::Arc;

/// Decoded icons keyed by the exact URL they were loaded from.
///
/// Entries are never updated or evicted; a failed load leaves no entry behind, so the next
/// lookup of that URL misses again and triggers a fresh fetch.
pub struct ImageCache {
    images: UnboundCache<String, Arc<Icon>>,
}

impl ImageCache {
    pub fn new() -> ImageCache {
        ImageCache { images: UnboundCache::new() }
    }

    pub fn lookup(&mut self, url: &str) -> Option<Arc<Icon>> {
        self.images.cache_get(&url.to_string()).cloned()
    }

    pub fn insert(&mut self, url: String, icon: Arc<Icon>) {
        self.images.cache_set(url, icon);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.images.cache_size()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches icons in the background and reports every outcome as [`Event::IconLoaded`].
///
/// Requests for the same URL are not merged, each call issues its own fetch.
#[derive(Clone)]
pub struct IconLoader {
    client: reqwest::Client,
    events: EventSender,
}

impl IconLoader {
    pub fn new(client: reqwest::Client, events: EventSender) -> IconLoader {
        IconLoader { client, events }
    }

    pub fn request(&self, url: String) {
        let client = self.client.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let icon = match icons::fetch_icon(&client, &url).await {
                Ok(icon) => Some(Arc::new(icon)),
                Err(e) => {
                    debug!("Failed to load icon {}: {}", url, e);
                    None
                },
            };

            // the receiver is gone once the shell has shut down
            let _ = events.send(Event::IconLoaded { url, icon });
        });
    }
}

//! Stream resolver: watch requests → catalog item → playable server list

use crate::catalog::{Catalog, Item};
use crate::errors::ResolveError;
use crate::models::StreamLink;

/// What the watch view was asked to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Event or channel id, exact and case-sensitive
    ById(String),
    /// Channel name, case-insensitive
    ByChannelName(String),
}

/// Parsed watch navigation (`?event=`/`?id=`, `?channel=`/`?channelName=`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchRequest {
    pub id: Option<String>,
    /// Already decoded, trimmed and lower-cased
    pub channel: Option<String>,
}

impl WatchRequest {
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut event = None;
        let mut id = None;
        let mut channel = None;
        let mut channel_name = None;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match &*key {
                "event" => &mut event,
                "id" => &mut id,
                "channel" => &mut channel,
                "channelName" => &mut channel_name,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }

        let channel = channel.or(channel_name).and_then(|raw| {
            // names may arrive encoded twice
            let decoded = urlencoding::decode(&raw)
                .map(|d| d.into_owned())
                .unwrap_or(raw);
            let needle = decoded.trim().to_lowercase();
            (!needle.is_empty()).then_some(needle)
        });

        Self {
            id: event.or(id),
            channel,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.channel.is_none()
    }

    /// Targets in resolution order
    pub fn targets(&self) -> Vec<Target> {
        let mut targets = Vec::new();
        if let Some(id) = &self.id {
            targets.push(Target::ById(id.clone()));
        }
        if let Some(name) = &self.channel {
            targets.push(Target::ByChannelName(name.clone()));
        }
        targets
    }
}

pub fn resolve<'a>(target: &Target, catalog: &'a Catalog) -> Result<Item<'a>, ResolveError> {
    match target {
        Target::ById(id) => catalog
            .event(id)
            .map(Item::Event)
            .or_else(|| catalog.channel(id).map(Item::Channel))
            .ok_or(ResolveError::NoMatch),
        Target::ByChannelName(name) => {
            let needle = name.trim().to_lowercase();
            if needle.is_empty() {
                return Err(ResolveError::NoMatch);
            }
            catalog
                .channels
                .iter()
                .find(|c| c.name.to_lowercase() == needle)
                .or_else(|| {
                    catalog
                        .channels
                        .iter()
                        .find(|c| c.name.to_lowercase().contains(&needle))
                })
                .map(Item::Channel)
                .ok_or(ResolveError::NoMatch)
        }
    }
}

/// Try the id first, then the channel name
pub fn resolve_request<'a>(
    request: &WatchRequest,
    catalog: &'a Catalog,
) -> Result<Item<'a>, ResolveError> {
    let item = request
        .targets()
        .iter()
        .find_map(|target| resolve(target, catalog).ok());
    match item {
        Some(item) => {
            log::info!("Resolved watch request to '{}'", item.id());
            Ok(item)
        }
        None => {
            log::info!("No item matches watch request {:?}", request);
            Err(ResolveError::NoMatch)
        }
    }
}

/// Links with a non-blank URL, trimmed, in source order
pub fn playable_links(item: &Item<'_>) -> Result<Vec<StreamLink>, ResolveError> {
    let links: Vec<StreamLink> = item
        .streaming_links()
        .iter()
        .filter(|l| !l.server_link.trim().is_empty())
        .map(|l| StreamLink {
            server_name: l.server_name.clone(),
            server_link: l.server_link.trim().to_string(),
        })
        .collect();
    if links.is_empty() {
        Err(ResolveError::NoPlayableLinks)
    } else {
        Ok(links)
    }
}

pub fn event_watch_query(id: &str) -> String {
    format!("?event={}", urlencoding::encode(id))
}

pub fn channel_watch_query(name: &str) -> String {
    format!("?channel={}", urlencoding::encode(name))
}

/// Entry of the chooser shown when a watch request matches nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChoice {
    pub label: String,
    pub query: String,
}

pub fn fallback_choices(catalog: &Catalog) -> Vec<FallbackChoice> {
    catalog
        .events
        .iter()
        .map(|e| {
            let name = match (&e.home, &e.away) {
                (Some(home), Some(away)) if !away.name.is_empty() => {
                    format!("{} vs {}", home.name, away.name)
                }
                (Some(home), _) => home.name.clone(),
                _ => e.title.clone().unwrap_or_default(),
            };
            FallbackChoice {
                label: format!("{} — {}", name, e.league),
                query: event_watch_query(&e.id),
            }
        })
        .collect()
}

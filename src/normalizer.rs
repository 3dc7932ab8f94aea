//! Source document normalizer
//!
//! The data document uses loosely typed, inconsistently named fields. Each
//! record is first read into an intake struct through the alias table below,
//! then turned into the strict models. Normalization never fails: a missing or
//! malformed collection yields `None` for that half of the document.

use serde_json::{Map, Value};

use crate::models::{Channel, Event, League, StreamLink, Team};

/// Logical fields read from source records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    EventsCollection,
    ChannelsCollection,
    EventId,
    HomeName,
    HomeBadge,
    AwayName,
    AwayBadge,
    EventTime,
    EventCategory,
    EventTitle,
    LiveFlag,
    Links,
    ChannelId,
    ChannelName,
    ChannelCategory,
    ChannelImage,
    ServerName,
    ServerLink,
}

/// Accepted source keys per logical field, in priority order
const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::EventsCollection, &["LiveEvents"]),
    (Field::ChannelsCollection, &["LiveChannels"]),
    (Field::EventId, &["id"]),
    (Field::HomeName, &["Tim1Name"]),
    (Field::HomeBadge, &["Tim1Image"]),
    (Field::AwayName, &["Tim2Name"]),
    (Field::AwayBadge, &["Tim2Image"]),
    (Field::EventTime, &["EventTime"]),
    (Field::EventCategory, &["CategoryName"]),
    (Field::EventTitle, &["Title", "EventTitle"]),
    (Field::LiveFlag, &["IsLive", "isLive"]),
    (Field::Links, &["StreamingLinks"]),
    (Field::ChannelId, &["id"]),
    (Field::ChannelName, &["ChannelName", "name", "Channel"]),
    (Field::ChannelCategory, &["CategoryName", "Category"]),
    (Field::ChannelImage, &["ChannelImage", "image"]),
    (Field::ServerName, &["ServerName"]),
    (Field::ServerLink, &["ServerLink", "link"]),
];

pub fn aliases(field: Field) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
}

/// First value present for `field`: exact key match first, then case-insensitive
fn lookup<'a>(obj: &'a Map<String, Value>, field: Field) -> Option<&'a Value> {
    let keys = aliases(field);
    for key in keys {
        if let Some(v) = obj.get(*key) {
            if !v.is_null() {
                return Some(v);
            }
        }
    }
    for key in keys {
        let found = obj
            .iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_null())
            .map(|(_, v)| v);
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Loosely typed scalar as a non-empty string
fn text_value(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn text(obj: &Map<String, Value>, field: Field) -> Option<String> {
    lookup(obj, field).and_then(text_value)
}

/// Boolean-ish source flag
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            !(s.is_empty() || s == "0" || s == "false" || s == "no")
        }
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

/// Link record after alias lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkIntake {
    pub server_name: Option<String>,
    pub server_link: Option<String>,
}

impl LinkIntake {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            server_name: text(obj, Field::ServerName),
            server_link: text(obj, Field::ServerLink),
        }
    }

    fn into_link(self) -> StreamLink {
        StreamLink {
            server_name: self.server_name,
            server_link: self.server_link.unwrap_or_default(),
        }
    }
}

/// Event record after alias lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventIntake {
    pub id: Option<String>,
    pub home_name: Option<String>,
    pub home_badge: Option<String>,
    pub away_name: Option<String>,
    pub away_badge: Option<String>,
    pub time: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub live: bool,
    pub links: Vec<LinkIntake>,
}

impl EventIntake {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let live_keys = aliases(Field::LiveFlag);
        let live = obj
            .iter()
            .any(|(k, v)| live_keys.iter().any(|a| k.eq_ignore_ascii_case(a)) && truthy(v));
        Self {
            id: text(obj, Field::EventId),
            home_name: text(obj, Field::HomeName),
            home_badge: text(obj, Field::HomeBadge),
            away_name: text(obj, Field::AwayName),
            away_badge: text(obj, Field::AwayBadge),
            time: text(obj, Field::EventTime),
            category: text(obj, Field::EventCategory),
            title: text(obj, Field::EventTitle),
            live,
            links: links(obj),
        }
    }

    /// Strict event; `index` is 0-based and only used for the synthetic id
    pub fn into_event(self, index: usize) -> Event {
        let has_teams = self.home_name.is_some() || self.away_name.is_some();
        let league_id = league_id(self.category.as_deref());
        let league = self
            .category
            .as_deref()
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| league_id.clone());

        let (home, away) = if has_teams {
            (
                Some(Team {
                    name: self.home_name.unwrap_or_default(),
                    badge: self.home_badge.unwrap_or_default(),
                }),
                Some(Team {
                    name: self.away_name.unwrap_or_default(),
                    badge: self.away_badge.unwrap_or_default(),
                }),
            )
        } else {
            (None, None)
        };

        let title = match self.title {
            Some(t) => Some(t),
            None if !has_teams => Some(self.time.clone().unwrap_or_else(|| "Event".to_string())),
            None => None,
        };

        Event {
            id: self.id.unwrap_or_else(|| format!("J{}", index + 1)),
            league_id,
            league,
            time: self.time.unwrap_or_default(),
            home,
            away,
            title,
            is_live: self.live,
            streaming_links: self.links.into_iter().map(LinkIntake::into_link).collect(),
        }
    }
}

/// Channel record after alias lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelIntake {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub links: Vec<LinkIntake>,
}

impl ChannelIntake {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: text(obj, Field::ChannelId),
            name: text(obj, Field::ChannelName),
            category: text(obj, Field::ChannelCategory),
            image: text(obj, Field::ChannelImage),
            links: links(obj),
        }
    }

    pub fn into_channel(self, index: usize) -> Channel {
        Channel {
            id: self.id.unwrap_or_else(|| format!("CH{}", index + 1)),
            name: self.name.unwrap_or_else(|| format!("Channel {}", index + 1)),
            category: self.category.unwrap_or_else(|| "General".to_string()),
            image: self.image,
            streaming_links: self.links.into_iter().map(LinkIntake::into_link).collect(),
        }
    }
}

fn links(obj: &Map<String, Value>) -> Vec<LinkIntake> {
    match lookup(obj, Field::Links) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(LinkIntake::from_object)
            .collect(),
        _ => Vec::new(),
    }
}

/// Category key: trimmed, lower-cased, whitespace runs collapsed to `-`
pub fn league_id(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => c
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-"),
        _ => "other".to_string(),
    }
}

/// Result of normalizing a source document. `None` means the collection was
/// absent or not an array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedDocument {
    pub events: Option<Vec<Event>>,
    pub channels: Option<Vec<Channel>>,
}

pub fn normalize(raw: &Value) -> NormalizedDocument {
    let Some(root) = raw.as_object() else {
        log::warn!("Source document is not an object, ignoring it");
        return NormalizedDocument::default();
    };

    let events = collection(root, Field::EventsCollection).map(|items| {
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                item.as_object()
                    .map(|obj| EventIntake::from_object(obj).into_event(i))
            })
            .collect::<Vec<_>>()
    });

    let channels = collection(root, Field::ChannelsCollection).map(|items| {
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                item.as_object()
                    .map(|obj| ChannelIntake::from_object(obj).into_channel(i))
            })
            .collect::<Vec<_>>()
    });

    log::debug!(
        "Normalized document: {} events, {} channels",
        events.as_ref().map_or(0, Vec::len),
        channels.as_ref().map_or(0, Vec::len)
    );

    NormalizedDocument { events, channels }
}

fn collection(root: &Map<String, Value>, field: Field) -> Option<&Vec<Value>> {
    match lookup(root, field) {
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            log::warn!("Collection {:?} is not an array, ignoring it", aliases(field));
            None
        }
        None => None,
    }
}

/// Ordered-unique leagues from events; first non-empty display name wins
pub fn derive_leagues(events: &[Event]) -> Vec<League> {
    merge_leagues(&[], events)
}

/// Extend `base` with leagues seen in `events` that it does not list yet
pub fn merge_leagues(base: &[League], events: &[Event]) -> Vec<League> {
    let mut leagues: Vec<League> = base.to_vec();
    // Entries synthesized from an id may still pick up a real name later
    let mut named: Vec<bool> = vec![true; leagues.len()];

    for event in events {
        if event.league_id.is_empty() {
            continue;
        }
        let name = event.league.trim();
        match leagues.iter().position(|l| l.id == event.league_id) {
            Some(pos) => {
                if !named[pos] && !name.is_empty() {
                    leagues[pos].name = name.to_string();
                    named[pos] = true;
                }
            }
            None => {
                if name.is_empty() {
                    leagues.push(League::new(&event.league_id, &event.league_id));
                    named.push(false);
                } else {
                    leagues.push(League::new(&event.league_id, name));
                    named.push(true);
                }
            }
        }
    }

    leagues
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;

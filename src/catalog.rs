//! Catalog store: events, channels and leagues plus directory queries

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::models::{Channel, Event, League, Team};
use crate::normalizer::{derive_leagues, merge_leagues, NormalizedDocument};

/// How long after its start an event still counts as live
const LIVE_WINDOW_SECS: i64 = 3 * 3600;

/// League chip selection
#[derive(Debug, Clone, PartialEq)]
pub enum LeagueFilter {
    All,
    League(String),
}

/// Directory status computed from the event time, independent of `Event::is_live`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Live,
    Scheduled,
    /// Unparseable time or long finished
    Unknown,
}

impl EventStatus {
    pub fn label(&self) -> &'static str {
        match self {
            EventStatus::Live => "LIVE",
            EventStatus::Scheduled | EventStatus::Unknown => "SCHEDULED",
        }
    }
}

/// A resolved playable item
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'a> {
    Event(&'a Event),
    Channel(&'a Channel),
}

impl<'a> Item<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Item::Event(e) => &e.id,
            Item::Channel(c) => &c.id,
        }
    }

    pub fn streaming_links(&self) -> &'a [crate::models::StreamLink] {
        match self {
            Item::Event(e) => &e.streaming_links,
            Item::Channel(c) => &c.streaming_links,
        }
    }

    /// Watch view title
    pub fn display_title(&self) -> String {
        match self {
            Item::Event(e) => {
                let mut parts: Vec<&str> = Vec::new();
                if let Some(home) = e.home.as_ref().filter(|t| !t.name.is_empty()) {
                    parts.push(&home.name);
                }
                if let Some(away) = e.away.as_ref().filter(|t| !t.name.is_empty()) {
                    parts.push("vs");
                    parts.push(&away.name);
                }
                if !parts.is_empty() {
                    return parts.join(" ");
                }
                e.title
                    .clone()
                    .filter(|t| !t.is_empty())
                    .or_else(|| Some(e.time.clone()).filter(|t| !t.is_empty()))
                    .unwrap_or_else(|| "Stream".to_string())
            }
            Item::Channel(c) => c.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub events: Vec<Event>,
    pub channels: Vec<Channel>,
    pub leagues: Vec<League>,
}

impl Catalog {
    /// Built-in sample catalog used when no document is available
    pub fn sample() -> Self {
        let leagues = vec![
            League::new("prem", "Premier League"),
            League::new("seriea", "Serie A"),
            League::new("bund", "Bundesliga"),
            League::new("laliga", "La Liga"),
            League::new("ucl", "UEFA Champions League"),
            League::new("f1", "Formula 1"),
        ];

        let team = |name: &str, badge: &str| Team {
            name: name.to_string(),
            badge: badge.to_string(),
        };
        let event = |id: &str, league_id: &str, league: &str, time: &str| Event {
            id: id.to_string(),
            league_id: league_id.to_string(),
            league: league.to_string(),
            time: time.to_string(),
            home: None,
            away: None,
            title: None,
            is_live: false,
            streaming_links: Vec::new(),
        };

        let events = vec![
            Event {
                home: Some(team("Leeds", "#2d6cdf")),
                away: Some(team("Tottenham", "#e7eaf0")),
                is_live: true,
                ..event("E1", "prem", "Premier League", "Oct 5, 14:00")
            },
            Event {
                home: Some(team("Hull City", "#f4a300")),
                away: Some(team("Sheffield Utd", "#e63946")),
                ..event("E2", "champ", "Championship", "Oct 5, 12:30")
            },
            Event {
                title: Some("Singapore Grand Prix".to_string()),
                is_live: true,
                ..event("E3", "f1", "Formula-1", "Oct 5, 14:00")
            },
            Event {
                home: Some(team("Wolves", "#e09600")),
                away: Some(team("Brighton", "#00a3ff")),
                ..event("E4", "prem", "Premier League", "Oct 4, 12:30")
            },
        ];

        let channels = [
            ("C1", "Sky Sports Main Event", "Sports"),
            ("C2", "BT Sport 1", "Sports"),
            ("C3", "ESPN", "Sports"),
            ("C4", "Fox Sports", "Sports"),
            ("C5", "DAZN 1", "Sports"),
            ("C6", "Eurosport 1", "Sports"),
            ("C7", "BBC One", "General"),
            ("C8", "ITV", "General"),
        ]
        .iter()
        .map(|(id, name, category)| Channel {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            image: None,
            streaming_links: Vec::new(),
        })
        .collect();

        let leagues = merge_leagues(&leagues, &events);
        Self {
            events,
            channels,
            leagues,
        }
    }

    /// Sample catalog with whatever the document supplies replacing it
    pub fn from_document(doc: NormalizedDocument) -> Self {
        let mut catalog = Self::sample();
        catalog.apply(doc);
        catalog
    }

    /// Replace each half independently; empty or absent collections keep the current data
    pub fn apply(&mut self, doc: NormalizedDocument) {
        let mut events_replaced = false;
        if let Some(events) = doc.events.filter(|e| !e.is_empty()) {
            log::info!("Catalog: {} events loaded", events.len());
            self.events = events;
            events_replaced = true;
        }
        if let Some(channels) = doc.channels.filter(|c| !c.is_empty()) {
            log::info!("Catalog: {} channels loaded", channels.len());
            self.channels = channels;
        }

        self.leagues = if events_replaced {
            derive_leagues(&self.events)
        } else {
            merge_leagues(&self.leagues, &self.events)
        };
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn filter_events(&self, filter: &LeagueFilter, query: &str) -> Vec<&Event> {
        let q = query.trim().to_lowercase();
        self.events
            .iter()
            .filter(|e| match filter {
                LeagueFilter::All => true,
                LeagueFilter::League(id) => &e.league_id == id,
            })
            .filter(|e| {
                q.is_empty()
                    || e.title.as_ref().is_some_and(|t| t.to_lowercase().contains(&q))
                    || e.home.as_ref().is_some_and(|t| t.name.to_lowercase().contains(&q))
                    || e.away.as_ref().is_some_and(|t| t.name.to_lowercase().contains(&q))
                    || e.league.to_lowercase().contains(&q)
            })
            .collect()
    }

    pub fn search_channels(&self, query: &str) -> Vec<&Channel> {
        let q = query.trim().to_lowercase();
        self.channels
            .iter()
            .filter(|c| q.is_empty() || c.name.to_lowercase().contains(&q))
            .collect()
    }
}

/// Parse an event time string as local time
pub fn parse_event_time(time: &str) -> Option<DateTime<Local>> {
    let time = time.trim();
    if time.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(time) {
        return Some(dt.with_timezone(&Local));
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(time, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

pub fn event_status(event: &Event, now: DateTime<Local>) -> EventStatus {
    let Some(start) = parse_event_time(&event.time) else {
        return EventStatus::Unknown;
    };
    let diff = (start - now).num_seconds();
    if diff > 0 {
        EventStatus::Scheduled
    } else if diff > -LIVE_WINDOW_SECS {
        EventStatus::Live
    } else {
        EventStatus::Unknown
    }
}

/// Long card display, e.g. "October 5, 2025, 2:00 PM"; raw text when unparseable
pub fn format_event_time(event: &Event) -> String {
    match parse_event_time(&event.time) {
        Some(dt) => dt.format("%B %-d, %Y, %-I:%M %p").to_string(),
        None => event.time.clone(),
    }
}

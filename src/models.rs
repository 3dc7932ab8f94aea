//! Data models for the FSTV directory and player

use serde::{Deserialize, Serialize};

/// Directory tab selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tab {
    Events,
    Channels,
    Console,
}

/// One candidate stream server for an event or channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamLink {
    pub server_name: Option<String>,
    pub server_link: String,
}

impl StreamLink {
    /// Display name, falling back to "Server N" (1-based)
    pub fn display_name(&self, index: usize) -> String {
        match self.server_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Server {}", index + 1),
        }
    }
}

/// One side of a team-based event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    /// CSS-style color or an image URL
    pub badge: String,
}

/// Badge rendering hint for a team
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BadgeKind<'a> {
    Image(&'a str),
    Color(&'a str),
    Empty,
}

impl Team {
    pub fn badge_kind(&self) -> BadgeKind<'_> {
        let v = self.badge.trim();
        if v.is_empty() {
            return BadgeKind::Empty;
        }
        let lower = v.to_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or("");
        let is_image_ext = [".png", ".jpg", ".jpeg", ".gif", ".svg"]
            .iter()
            .any(|ext| path.ends_with(ext));
        if lower.starts_with("http://") || lower.starts_with("https://") || is_image_ext {
            BadgeKind::Image(v)
        } else {
            BadgeKind::Color(v)
        }
    }
}

/// Live or scheduled sports event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub league_id: String,
    pub league: String,
    /// Display string, not guaranteed parseable
    pub time: String,
    pub home: Option<Team>,
    pub away: Option<Team>,
    pub title: Option<String>,
    /// Hint from the source document; independent of the computed live status
    pub is_live: bool,
    pub streaming_links: Vec<StreamLink>,
}

impl Event {
    /// Card title: "Home vs Away", else the title, else "Event"
    pub fn card_title(&self) -> String {
        match (&self.home, &self.away) {
            (Some(home), Some(away)) => format!("{} vs {}", home.name, away.name),
            _ => self.title.clone().unwrap_or_else(|| "Event".to_string()),
        }
    }
}

/// TV channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub category: String,
    pub image: Option<String>,
    pub streaming_links: Vec<StreamLink>,
}

/// League (event category)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: String,
    pub name: String,
}

impl League {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

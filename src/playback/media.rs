//! Media stack collaborator interface
//!
//! The controller never talks to a concrete player. The host provides a
//! [`MediaStack`] covering both the plain media element and the
//! adaptive-streaming helper used for HLS manifests.

use crate::errors::MediaError;

/// Generation of the attached source. Events and timers carry the token they
/// were issued for; anything with an older token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceToken(pub u64);

impl SourceToken {
    pub fn next(self) -> Self {
        SourceToken(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// HLS manifest (`.m3u8`)
    Manifest,
    /// Anything the media element plays directly
    Direct,
}

impl SourceKind {
    pub fn detect(url: &str) -> Self {
        if is_manifest_url(url) {
            SourceKind::Manifest
        } else {
            SourceKind::Direct
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            SourceKind::Manifest => "application/x-mpegURL",
            SourceKind::Direct => "video/mp4",
        }
    }
}

/// `.m3u8` (any case) followed by a query string or the end of the URL
pub fn is_manifest_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.match_indices(".m3u8").any(|(pos, m)| {
        let rest = &lower[pos + m.len()..];
        rest.is_empty() || rest.starts_with('?')
    })
}

/// A source handed to the media stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub token: SourceToken,
    pub url: String,
    pub kind: SourceKind,
    pub title: String,
}

impl SourceRequest {
    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }
}

/// Signals raised by the media element or the adaptive-streaming helper
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    ManifestParsed,
    CanPlay,
    Playing,
    Waiting,
    Paused,
    Ended,
    VolumeChanged { muted: bool },
    Error { reason: String },
    Stalled,
    AdaptiveError { fatal: bool, details: String },
}

impl MediaEvent {
    /// Failure reason when this event should trigger a retry
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            MediaEvent::Error { reason } => Some(reason.clone()),
            MediaEvent::Stalled => Some("stalled".to_string()),
            MediaEvent::AdaptiveError { fatal: true, details } => Some(details.clone()),
            _ => None,
        }
    }
}

/// Host-provided playback capability, exclusively owned by one controller
pub trait MediaStack {
    /// Whether manifests can be loaded through the adaptive-streaming helper
    fn supports_adaptive(&self) -> bool;

    /// Create the adaptive helper, load the manifest and attach it to the media element
    fn load_manifest(&mut self, source: &SourceRequest) -> Result<(), MediaError>;

    /// Set a directly playable source on the media element
    fn set_source(&mut self, source: &SourceRequest) -> Result<(), MediaError>;

    fn play(&mut self);

    fn set_muted(&mut self, muted: bool);

    /// Destroy the helper instance and detach listeners of the current source.
    /// Must complete before a new source is attached.
    fn release(&mut self);

    /// Drain pending events, tagged with the token of the source that raised them
    fn poll_events(&mut self) -> Vec<(SourceToken, MediaEvent)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_detection() {
        assert!(is_manifest_url("https://a/x.m3u8"));
        assert!(is_manifest_url("https://a/X.M3U8?token=abc"));
        assert!(is_manifest_url("https://a/x.m3u8/y.m3u8"));
        assert!(!is_manifest_url("https://a/x.m3u8/index"));
        assert!(!is_manifest_url("https://a/y.mp4"));
        assert!(!is_manifest_url("https://a/x.m3u8#frag"));
        assert!(!is_manifest_url(""));
    }

    #[test]
    fn test_failure_reason() {
        assert_eq!(MediaEvent::Stalled.failure_reason().as_deref(), Some("stalled"));
        assert_eq!(
            MediaEvent::AdaptiveError { fatal: true, details: "networkError:manifestLoadError".into() }
                .failure_reason()
                .as_deref(),
            Some("networkError:manifestLoadError")
        );
        assert_eq!(
            MediaEvent::AdaptiveError { fatal: false, details: "bufferStalledError".into() }.failure_reason(),
            None
        );
        assert_eq!(MediaEvent::Playing.failure_reason(), None);
    }
}

//! Playback session state machine
//!
//! Transitions are pure: [`Session::apply`] updates the session and returns the
//! effects to perform. Executing them against a media stack and the view is
//! the controller's job.

use std::time::Duration;

use super::media::{MediaEvent, SourceKind, SourceRequest, SourceToken};
use crate::models::StreamLink;

/// Attempts per server before failing over
pub const MAX_RETRY: u32 = 3;

/// Fixed delay before a retry fires
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

pub const MSG_ALL_FAILED: &str = "All servers failed. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Connecting { index: usize },
    Playing { index: usize },
    Retrying { index: usize, attempt: u32 },
    /// Transient; only ever seen in the history
    FailedOver { index: usize },
    Exhausted,
    Stopped,
}

impl PlaybackState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Exhausted | PlaybackState::Stopped)
    }
}

/// Why the session ran out of servers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The last candidate used up its retries
    RetriesExceeded,
    /// Selection or skipping went past the end of the list
    NoMoreServers,
}

impl ExhaustReason {
    pub fn message(&self) -> String {
        match self {
            ExhaustReason::RetriesExceeded => format!("Stream failed after {} retries.", MAX_RETRY),
            ExhaustReason::NoMoreServers => MSG_ALL_FAILED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Start,
    SelectServer(usize),
    Media { token: SourceToken, event: MediaEvent },
    RetryElapsed { token: SourceToken },
    Unmute,
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Destroy the helper and detach listeners of the current source
    Release,
    LoadManifest(SourceRequest),
    SetSource(SourceRequest),
    Play,
    SetMuted(bool),
    ScheduleRetry { token: SourceToken, delay: Duration },
    CancelRetry,
    Status { text: String, is_error: bool },
    Loading(bool),
    UnmuteVisible(bool),
    ActiveServer(Option<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub start_muted: bool,
    pub adaptive_supported: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            start_muted: true,
            adaptive_supported: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    streams: Vec<StreamLink>,
    title: String,
    options: SessionOptions,
    state: PlaybackState,
    current_index: Option<usize>,
    current_url: Option<String>,
    retry_count: u32,
    token: SourceToken,
    muted: bool,
    has_unmuted: bool,
    transitions: Vec<PlaybackState>,
}

impl Session {
    pub fn new(streams: Vec<StreamLink>, title: &str, options: SessionOptions) -> Self {
        Self {
            streams,
            title: title.to_string(),
            options,
            state: PlaybackState::Idle,
            current_index: None,
            current_url: None,
            retry_count: 0,
            token: SourceToken::default(),
            muted: false,
            has_unmuted: false,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn streams(&self) -> &[StreamLink] {
        &self.streams
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn token(&self) -> SourceToken {
        self.token
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn has_unmuted(&self) -> bool {
        self.has_unmuted
    }

    /// Every state entered since the last [`Session::take_transitions`]
    pub fn take_transitions(&mut self) -> Vec<PlaybackState> {
        std::mem::take(&mut self.transitions)
    }

    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.state == PlaybackState::Stopped {
            log::debug!("Session stopped, ignoring {:?}", input);
            return fx;
        }

        match input {
            Input::Start => self.start(&mut fx),
            Input::SelectServer(index) => self.select(index, &mut fx),
            Input::Media { token, event } => {
                if token != self.token {
                    log::debug!("Stale media event {:?} for {:?} (current {:?})", event, token, self.token);
                } else {
                    self.on_media(event, &mut fx);
                }
            }
            Input::RetryElapsed { token } => self.on_retry_elapsed(token, &mut fx),
            Input::Unmute => {
                self.muted = false;
                self.has_unmuted = true;
                fx.push(Effect::SetMuted(false));
                fx.push(Effect::Play);
                fx.push(Effect::UnmuteVisible(false));
            }
            Input::Teardown => {
                self.enter(PlaybackState::Stopped);
                self.token = self.token.next();
                self.current_url = None;
                fx.push(Effect::CancelRetry);
                fx.push(Effect::Release);
                fx.push(Effect::Loading(false));
                fx.push(Effect::UnmuteVisible(false));
            }
        }
        fx
    }

    fn enter(&mut self, state: PlaybackState) {
        log::debug!("Playback: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.transitions.push(state);
    }

    fn server_name(&self, index: usize) -> String {
        self.streams
            .get(index)
            .map(|s| s.display_name(index))
            .unwrap_or_else(|| format!("Server {}", index + 1))
    }

    fn start(&mut self, fx: &mut Vec<Effect>) {
        if self.state != PlaybackState::Idle {
            log::debug!("Session already started ({:?})", self.state);
            return;
        }
        if self.streams.is_empty() {
            fx.push(Effect::Status {
                text: "No valid stream URLs found for this item".to_string(),
                is_error: true,
            });
            return;
        }
        if self.options.start_muted {
            self.muted = true;
            fx.push(Effect::SetMuted(true));
        }
        self.connect(0, ExhaustReason::NoMoreServers, fx);
    }

    fn select(&mut self, index: usize, fx: &mut Vec<Effect>) {
        if self.streams.is_empty() {
            return;
        }
        if self.state == PlaybackState::Idle && self.options.start_muted && !self.has_unmuted {
            self.muted = true;
            fx.push(Effect::SetMuted(true));
        }
        // invalidates any pending retry timer
        fx.push(Effect::CancelRetry);
        self.connect(index, ExhaustReason::NoMoreServers, fx);
    }

    /// Enter Connecting at `index`, silently skipping blank URLs
    fn connect(&mut self, mut index: usize, reason: ExhaustReason, fx: &mut Vec<Effect>) {
        loop {
            let Some(stream) = self.streams.get(index) else {
                self.exhaust(reason, fx);
                return;
            };
            let url = stream.server_link.trim();
            if url.is_empty() {
                log::debug!("Server {} has no URL, skipping", index + 1);
                index += 1;
                continue;
            }

            let url = url.to_string();
            let name = self.server_name(index);
            self.current_index = Some(index);
            self.retry_count = 0;
            self.current_url = Some(url.clone());

            log::info!("Connecting to {} ({})", name, url);
            fx.push(Effect::ActiveServer(Some(index)));
            fx.push(Effect::Status {
                text: format!("Connecting to {}...", name),
                is_error: false,
            });
            self.attach(index, url, fx);
            return;
        }
    }

    /// Release the previous source and hand `url` to the media stack under a fresh token
    fn attach(&mut self, index: usize, url: String, fx: &mut Vec<Effect>) {
        self.token = self.token.next();
        self.enter(PlaybackState::Connecting { index });
        fx.push(Effect::Release);
        fx.push(Effect::Loading(true));

        let kind = SourceKind::detect(&url);
        let request = SourceRequest {
            token: self.token,
            url,
            kind,
            title: format!("{} - {}", self.title, self.server_name(index)),
        };
        if kind == SourceKind::Manifest && self.options.adaptive_supported {
            fx.push(Effect::LoadManifest(request));
        } else {
            fx.push(Effect::SetSource(request));
            fx.push(Effect::Play);
        }
    }

    fn exhaust(&mut self, reason: ExhaustReason, fx: &mut Vec<Effect>) {
        let text = reason.message();
        log::error!("Playback exhausted: {}", text);
        self.enter(PlaybackState::Exhausted);
        self.token = self.token.next();
        self.current_url = None;
        fx.push(Effect::Release);
        fx.push(Effect::Status { text, is_error: true });
        fx.push(Effect::Loading(false));
    }

    fn on_media(&mut self, event: MediaEvent, fx: &mut Vec<Effect>) {
        if let Some(reason) = event.failure_reason() {
            self.on_failure(&reason, fx);
            return;
        }

        match (event, self.state) {
            (MediaEvent::ManifestParsed | MediaEvent::CanPlay, PlaybackState::Connecting { .. }) => {
                fx.push(Effect::Play);
            }
            (
                MediaEvent::Playing,
                PlaybackState::Connecting { index } | PlaybackState::Playing { index },
            ) => {
                if self.state != (PlaybackState::Playing { index }) {
                    log::info!("Playing on {}", self.server_name(index));
                    self.enter(PlaybackState::Playing { index });
                }
                fx.push(Effect::Loading(false));
                fx.push(Effect::Status {
                    text: format!("Playing on {}", self.server_name(index)),
                    is_error: false,
                });
                fx.push(Effect::UnmuteVisible(self.muted && !self.has_unmuted));
            }
            (MediaEvent::Waiting, PlaybackState::Connecting { .. } | PlaybackState::Playing { .. }) => {
                fx.push(Effect::Loading(true));
            }
            (MediaEvent::Paused, _) => fx.push(Effect::Loading(false)),
            (MediaEvent::Ended, _) => {
                fx.push(Effect::Loading(false));
                fx.push(Effect::UnmuteVisible(false));
            }
            (MediaEvent::VolumeChanged { muted }, _) => {
                self.muted = muted;
                if !muted {
                    self.has_unmuted = true;
                    fx.push(Effect::UnmuteVisible(false));
                }
            }
            (MediaEvent::AdaptiveError { details, .. }, _) => {
                log::debug!("Ignoring non-fatal adaptive error: {}", details);
            }
            (event, state) => {
                log::debug!("Ignoring {:?} in {:?}", event, state);
            }
        }
    }

    fn on_failure(&mut self, reason: &str, fx: &mut Vec<Effect>) {
        match self.state {
            PlaybackState::Connecting { index } | PlaybackState::Playing { index } => {
                let attempt = (self.retry_count + 1).min(MAX_RETRY);
                self.retry_count = attempt;
                log::warn!(
                    "Stream error on {}: {} (retry {}/{})",
                    self.server_name(index),
                    reason,
                    attempt,
                    MAX_RETRY
                );
                self.token = self.token.next();
                self.enter(PlaybackState::Retrying { index, attempt });
                fx.push(Effect::Release);
                fx.push(Effect::Status {
                    text: format!("Retrying ({}/{})...", attempt, MAX_RETRY),
                    is_error: true,
                });
                fx.push(Effect::Loading(true));
                fx.push(Effect::ScheduleRetry {
                    token: self.token,
                    delay: RETRY_DELAY,
                });
            }
            PlaybackState::Idle if self.current_url.is_none() => {
                fx.push(Effect::Status {
                    text: format!("Stream error: {}", reason),
                    is_error: true,
                });
                fx.push(Effect::Loading(false));
            }
            state => log::debug!("Ignoring failure '{}' in {:?}", reason, state),
        }
    }

    fn on_retry_elapsed(&mut self, token: SourceToken, fx: &mut Vec<Effect>) {
        let PlaybackState::Retrying { index, attempt } = self.state else {
            log::debug!("Retry timer fired in {:?}, ignoring", self.state);
            return;
        };
        if token != self.token {
            log::debug!("Stale retry timer {:?} (current {:?})", token, self.token);
            return;
        }

        if attempt < MAX_RETRY {
            let Some(url) = self.current_url.clone() else {
                self.exhaust(ExhaustReason::NoMoreServers, fx);
                return;
            };
            log::info!("Retrying {} ({}/{})", self.server_name(index), attempt, MAX_RETRY);
            self.attach(index, url, fx);
        } else {
            log::warn!("{} failed after {} retries, failing over", self.server_name(index), MAX_RETRY);
            self.enter(PlaybackState::FailedOver { index });
            self.connect(index + 1, ExhaustReason::RetriesExceeded, fx);
        }
    }
}

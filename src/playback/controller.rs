//! Executes session effects against a media stack and keeps the player view

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::media::{MediaEvent, MediaStack, SourceRequest, SourceToken};
use super::session::{Effect, Input, PlaybackState, Session, SessionOptions};
use crate::models::StreamLink;

/// Transition history kept for diagnostics
const HISTORY_LIMIT: usize = 64;

/// Snapshot rendered by the watch view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerView {
    pub status_text: String,
    pub is_error: bool,
    pub loading_visible: bool,
    pub unmute_visible: bool,
    pub active_server: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    pub start_muted: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self { start_muted: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRetry {
    pub token: SourceToken,
    pub due: Instant,
}

pub struct PlaybackController<M: MediaStack> {
    session: Session,
    media: M,
    view: PlayerView,
    pending_retry: Option<PendingRetry>,
    history: VecDeque<PlaybackState>,
}

impl<M: MediaStack> PlaybackController<M> {
    pub fn new(streams: Vec<StreamLink>, title: &str, media: M, options: PlaybackOptions) -> Self {
        let session = Session::new(
            streams,
            title,
            SessionOptions {
                start_muted: options.start_muted,
                adaptive_supported: media.supports_adaptive(),
            },
        );
        let mut history = VecDeque::with_capacity(HISTORY_LIMIT);
        history.push_back(PlaybackState::Idle);
        Self {
            session,
            media,
            view: PlayerView::default(),
            pending_retry: None,
            history,
        }
    }

    pub fn start(&mut self) {
        self.dispatch(Input::Start);
    }

    pub fn select_server(&mut self, index: usize) {
        log::info!("Server {} selected", index + 1);
        self.dispatch(Input::SelectServer(index));
    }

    pub fn unmute(&mut self) {
        self.dispatch(Input::Unmute);
    }

    pub fn teardown(&mut self) {
        self.dispatch(Input::Teardown);
    }

    pub fn handle_media_event(&mut self, token: SourceToken, event: MediaEvent) {
        self.dispatch(Input::Media { token, event });
    }

    /// Fire the pending retry if it is due
    pub fn tick(&mut self, now: Instant) {
        match self.pending_retry {
            Some(retry) if now >= retry.due => {
                self.pending_retry = None;
                self.dispatch(Input::RetryElapsed { token: retry.token });
            }
            _ => {}
        }
    }

    /// Drain events raised by the media stack, then fire due timers
    pub fn pump(&mut self, now: Instant) {
        for (token, event) in self.media.poll_events() {
            self.handle_media_event(token, event);
        }
        self.tick(now);
    }

    pub fn view(&self) -> &PlayerView {
        &self.view
    }

    pub fn state(&self) -> PlaybackState {
        self.session.state()
    }

    pub fn history(&self) -> impl Iterator<Item = &PlaybackState> {
        self.history.iter()
    }

    pub fn streams(&self) -> &[StreamLink] {
        self.session.streams()
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn pending_retry(&self) -> Option<PendingRetry> {
        self.pending_retry
    }

    pub fn is_muted(&self) -> bool {
        self.session.is_muted()
    }

    fn dispatch(&mut self, input: Input) {
        let mut queue = VecDeque::from([input]);
        while let Some(input) = queue.pop_front() {
            let effects = self.session.apply(input);
            for state in self.session.take_transitions() {
                if self.history.len() == HISTORY_LIMIT {
                    self.history.pop_front();
                }
                self.history.push_back(state);
            }
            if let Some(failure) = self.execute(effects) {
                queue.push_back(failure);
            }
        }
    }

    /// Run a batch of effects. A source the stack rejects comes back as a
    /// media error for that source's token.
    fn execute(&mut self, effects: Vec<Effect>) -> Option<Input> {
        let mut rejected: Option<Input> = None;
        for effect in effects {
            match effect {
                Effect::Release => self.media.release(),
                Effect::LoadManifest(request) => {
                    if let Err(e) = self.media.load_manifest(&request) {
                        rejected = Some(Self::rejection(&request, e.to_string()));
                    }
                }
                Effect::SetSource(request) => {
                    if let Err(e) = self.media.set_source(&request) {
                        rejected = Some(Self::rejection(&request, e.to_string()));
                    }
                }
                Effect::Play => {
                    if rejected.is_none() {
                        self.media.play();
                    }
                }
                Effect::SetMuted(muted) => self.media.set_muted(muted),
                Effect::ScheduleRetry { token, delay } => self.schedule_retry(token, delay),
                Effect::CancelRetry => self.pending_retry = None,
                Effect::Status { text, is_error } => {
                    if is_error {
                        log::warn!("[player] {}", text);
                    } else {
                        log::info!("[player] {}", text);
                    }
                    self.view.status_text = text;
                    self.view.is_error = is_error;
                }
                Effect::Loading(visible) => self.view.loading_visible = visible,
                Effect::UnmuteVisible(visible) => self.view.unmute_visible = visible,
                Effect::ActiveServer(index) => self.view.active_server = index,
            }
        }
        rejected
    }

    fn rejection(request: &SourceRequest, reason: String) -> Input {
        log::warn!("Source rejected by media stack: {}", reason);
        Input::Media {
            token: request.token,
            event: MediaEvent::Error { reason },
        }
    }

    fn schedule_retry(&mut self, token: SourceToken, delay: Duration) {
        // a single timer; the newest one replaces any older
        self.pending_retry = Some(PendingRetry {
            token,
            due: Instant::now() + delay,
        });
    }
}

impl<M: MediaStack> Drop for PlaybackController<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;

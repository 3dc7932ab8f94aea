//! Tests for the playback failover/retry controller

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::{Duration, Instant};

    use crate::errors::MediaError;
    use crate::models::StreamLink;
    use crate::playback::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        LoadManifest(String),
        SetSource(String, &'static str),
        Play,
        SetMuted(bool),
        Release,
    }

    /// Records every call; rejects sources whose URL contains "reject"
    #[derive(Default)]
    struct FakeMedia {
        adaptive: bool,
        calls: Vec<Call>,
        last_token: Option<SourceToken>,
        queued: VecDeque<(SourceToken, MediaEvent)>,
    }

    impl FakeMedia {
        fn adaptive() -> Self {
            Self {
                adaptive: true,
                ..Default::default()
            }
        }

        fn attach(&mut self, source: &SourceRequest) -> Result<(), MediaError> {
            self.last_token = Some(source.token);
            if source.url.contains("reject") {
                Err(MediaError::Rejected(source.url.clone()))
            } else {
                Ok(())
            }
        }
    }

    impl MediaStack for FakeMedia {
        fn supports_adaptive(&self) -> bool {
            self.adaptive
        }

        fn load_manifest(&mut self, source: &SourceRequest) -> Result<(), MediaError> {
            self.calls.push(Call::LoadManifest(source.url.clone()));
            self.attach(source)
        }

        fn set_source(&mut self, source: &SourceRequest) -> Result<(), MediaError> {
            self.calls.push(Call::SetSource(source.url.clone(), source.mime()));
            self.attach(source)
        }

        fn play(&mut self) {
            self.calls.push(Call::Play);
        }

        fn set_muted(&mut self, muted: bool) {
            self.calls.push(Call::SetMuted(muted));
        }

        fn release(&mut self) {
            self.calls.push(Call::Release);
        }

        fn poll_events(&mut self) -> Vec<(SourceToken, MediaEvent)> {
            self.queued.drain(..).collect()
        }
    }

    fn links(urls: &[&str]) -> Vec<StreamLink> {
        urls.iter()
            .map(|u| StreamLink {
                server_name: None,
                server_link: u.to_string(),
            })
            .collect()
    }

    fn controller(urls: &[&str]) -> PlaybackController<FakeMedia> {
        PlaybackController::new(links(urls), "Leeds vs Tottenham", FakeMedia::adaptive(), PlaybackOptions::default())
    }

    fn token(c: &PlaybackController<FakeMedia>) -> SourceToken {
        c.media().last_token.expect("a source was attached")
    }

    fn fail(c: &mut PlaybackController<FakeMedia>) {
        let t = token(c);
        c.handle_media_event(t, MediaEvent::Error { reason: "network".to_string() });
    }

    fn later() -> Instant {
        Instant::now() + RETRY_DELAY + Duration::from_millis(50)
    }

    #[test]
    fn test_start_skips_empty_first_url() {
        let mut c = controller(&["", "https://a/x.m3u8", "https://b/y.mp4"]);
        c.start();
        assert_eq!(c.state(), PlaybackState::Connecting { index: 1 });
        assert_eq!(c.view().active_server, Some(1));
        assert_eq!(c.view().status_text, "Connecting to Server 2...");
        assert!(c.view().loading_visible);
        assert!(c.pending_retry().is_none());
        assert!(c.media().calls.contains(&Call::LoadManifest("https://a/x.m3u8".to_string())));
    }

    #[test]
    fn test_start_muted_before_attach() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        assert_eq!(c.media().calls[0], Call::SetMuted(true));
        assert!(c.is_muted());
    }

    #[test]
    fn test_three_failures_then_failover() {
        let mut c = controller(&["https://a/x.m3u8", "https://b/y.mp4"]);
        c.start();

        fail(&mut c);
        assert_eq!(c.state(), PlaybackState::Retrying { index: 0, attempt: 1 });
        assert_eq!(c.view().status_text, "Retrying (1/3)...");
        assert!(c.view().is_error);
        assert!(c.view().loading_visible);
        assert!(c.pending_retry().is_some());

        c.tick(later());
        assert_eq!(c.state(), PlaybackState::Connecting { index: 0 });
        assert_eq!(c.view().status_text, "Retrying (1/3)...");

        fail(&mut c);
        assert_eq!(c.state(), PlaybackState::Retrying { index: 0, attempt: 2 });
        c.tick(later());
        fail(&mut c);
        assert_eq!(c.state(), PlaybackState::Retrying { index: 0, attempt: 3 });

        c.tick(later());
        assert_eq!(c.state(), PlaybackState::Connecting { index: 1 });
        assert_eq!(c.view().active_server, Some(1));
        assert_eq!(c.view().status_text, "Connecting to Server 2...");
        assert!(c.history().any(|s| *s == PlaybackState::FailedOver { index: 0 }));

        // attempt count starts over on the new server
        fail(&mut c);
        assert_eq!(c.state(), PlaybackState::Retrying { index: 1, attempt: 1 });
    }

    #[test]
    fn test_retry_not_fired_early() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        fail(&mut c);
        c.tick(Instant::now());
        assert_eq!(c.state(), PlaybackState::Retrying { index: 0, attempt: 1 });
    }

    #[test]
    fn test_single_candidate_exhausts() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        for _ in 0..MAX_RETRY {
            fail(&mut c);
            c.tick(later());
        }
        assert_eq!(c.state(), PlaybackState::Exhausted);
        assert_eq!(c.view().status_text, "Stream failed after 3 retries.");
        assert!(c.view().is_error);
        assert!(!c.view().loading_visible);
        assert!(c.pending_retry().is_none());

        // nothing left to retry
        c.tick(later());
        assert_eq!(c.state(), PlaybackState::Exhausted);
    }

    #[test]
    fn test_playing_shows_unmute_prompt_until_latched() {
        let mut c = controller(&["https://a/x.m3u8", "https://b/y.m3u8"]);
        c.start();
        let t = token(&c);
        c.handle_media_event(t, MediaEvent::ManifestParsed);
        c.handle_media_event(t, MediaEvent::Playing);
        assert_eq!(c.state(), PlaybackState::Playing { index: 0 });
        assert_eq!(c.view().status_text, "Playing on Server 1");
        assert!(!c.view().loading_visible);
        assert!(c.view().unmute_visible);

        c.unmute();
        assert!(!c.view().unmute_visible);
        assert!(!c.is_muted());
        let n = c.media().calls.len();
        assert_eq!(&c.media().calls[n - 2..], &[Call::SetMuted(false), Call::Play]);

        // switching servers does not bring the prompt back
        c.select_server(1);
        let t = token(&c);
        c.handle_media_event(t, MediaEvent::Playing);
        assert_eq!(c.state(), PlaybackState::Playing { index: 1 });
        assert!(!c.view().unmute_visible);
    }

    #[test]
    fn test_volume_change_latches_unmute() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        let t = token(&c);
        c.handle_media_event(t, MediaEvent::VolumeChanged { muted: false });
        c.handle_media_event(t, MediaEvent::Playing);
        assert!(!c.view().unmute_visible);
    }

    #[test]
    fn test_buffering_pause_and_end_update_view() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        let t = token(&c);
        c.handle_media_event(t, MediaEvent::Playing);
        assert!(!c.view().loading_visible);
        assert!(c.view().unmute_visible);

        c.handle_media_event(t, MediaEvent::Waiting);
        assert!(c.view().loading_visible);
        assert_eq!(c.state(), PlaybackState::Playing { index: 0 });

        c.handle_media_event(t, MediaEvent::Paused);
        assert!(!c.view().loading_visible);
        assert!(c.view().unmute_visible);

        c.handle_media_event(t, MediaEvent::Waiting);
        c.handle_media_event(t, MediaEvent::Ended);
        assert!(!c.view().loading_visible);
        assert!(!c.view().unmute_visible);
        assert_eq!(c.view().status_text, "Playing on Server 1");
        assert!(c.pending_retry().is_none());
    }

    #[test]
    fn test_stale_buffering_events_ignored() {
        let mut c = controller(&["https://a/x.m3u8", "https://b/y.m3u8"]);
        c.start();
        let old = token(&c);
        c.select_server(1);
        let t = token(&c);
        assert_ne!(old, t);
        c.handle_media_event(t, MediaEvent::Playing);
        assert!(!c.view().loading_visible);
        assert!(c.view().unmute_visible);

        c.handle_media_event(old, MediaEvent::Waiting);
        assert!(!c.view().loading_visible);
        c.handle_media_event(old, MediaEvent::Ended);
        assert!(c.view().unmute_visible);

        c.handle_media_event(t, MediaEvent::Waiting);
        c.handle_media_event(old, MediaEvent::Paused);
        assert!(c.view().loading_visible);
        assert_eq!(c.state(), PlaybackState::Playing { index: 1 });
    }

    #[test]
    fn test_teardown_mid_retry() {
        let mut c = controller(&["https://a/x.m3u8", "https://b/y.mp4"]);
        c.start();
        fail(&mut c);
        let before = c.media().calls.len();

        c.teardown();
        assert_eq!(c.state(), PlaybackState::Stopped);
        assert!(c.pending_retry().is_none());
        assert!(!c.view().loading_visible);
        assert!(!c.view().unmute_visible);

        c.tick(later());
        c.teardown();
        c.select_server(1);
        assert_eq!(c.state(), PlaybackState::Stopped);
        let after: Vec<&Call> = c.media().calls[before..].iter().collect();
        assert_eq!(after, vec![&Call::Release]);

        let history: Vec<PlaybackState> = c.history().copied().collect();
        let stopped = history.iter().position(|s| *s == PlaybackState::Stopped).unwrap();
        assert!(!history[stopped..].iter().any(|s| matches!(s, PlaybackState::Connecting { .. })));
    }

    #[test]
    fn test_stale_events_ignored() {
        let mut c = controller(&["https://a/x.m3u8", "https://b/y.mp4"]);
        c.start();
        let old = token(&c);
        fail(&mut c);
        c.tick(later());
        assert_eq!(c.state(), PlaybackState::Connecting { index: 0 });

        // late events from the released source
        c.handle_media_event(old, MediaEvent::Error { reason: "late".to_string() });
        c.handle_media_event(old, MediaEvent::Playing);
        assert_eq!(c.state(), PlaybackState::Connecting { index: 0 });
        assert!(c.pending_retry().is_none());
    }

    #[test]
    fn test_stale_retry_after_manual_selection() {
        let mut c = controller(&["https://a/x.m3u8", "https://b/y.mp4"]);
        c.start();
        fail(&mut c);
        c.select_server(1);
        assert_eq!(c.state(), PlaybackState::Connecting { index: 1 });
        assert!(c.pending_retry().is_none());
        c.tick(later());
        assert_eq!(c.state(), PlaybackState::Connecting { index: 1 });
    }

    #[test]
    fn test_non_fatal_adaptive_error_ignored() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        let t = token(&c);
        c.handle_media_event(
            t,
            MediaEvent::AdaptiveError { fatal: false, details: "bufferStalledError".to_string() },
        );
        assert_eq!(c.state(), PlaybackState::Connecting { index: 0 });

        c.handle_media_event(
            t,
            MediaEvent::AdaptiveError { fatal: true, details: "manifestLoadError".to_string() },
        );
        assert_eq!(c.state(), PlaybackState::Retrying { index: 0, attempt: 1 });
    }

    #[test]
    fn test_stall_counts_as_failure() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        let t = token(&c);
        c.handle_media_event(t, MediaEvent::Playing);
        c.handle_media_event(t, MediaEvent::Stalled);
        assert_eq!(c.state(), PlaybackState::Retrying { index: 0, attempt: 1 });
    }

    #[test]
    fn test_manifest_and_direct_dispatch() {
        let mut c = controller(&["https://a/y.mp4"]);
        c.start();
        let calls = &c.media().calls;
        assert!(calls.contains(&Call::SetSource("https://a/y.mp4".to_string(), "video/mp4")));
        assert_eq!(calls.last(), Some(&Call::Play));

        let mut c = PlaybackController::new(
            links(&["https://a/x.m3u8?token=1"]),
            "x",
            FakeMedia::default(),
            PlaybackOptions::default(),
        );
        c.start();
        assert!(c
            .media()
            .calls
            .contains(&Call::SetSource("https://a/x.m3u8?token=1".to_string(), "application/x-mpegURL")));
    }

    #[test]
    fn test_release_before_attach() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        let calls = &c.media().calls;
        let release = calls.iter().position(|c| *c == Call::Release).unwrap();
        let load = calls.iter().position(|c| matches!(c, Call::LoadManifest(_))).unwrap();
        assert!(release < load);
    }

    #[test]
    fn test_select_server_out_of_range() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        c.select_server(5);
        assert_eq!(c.state(), PlaybackState::Exhausted);
        assert_eq!(c.view().status_text, "All servers failed. Please try again later.");
        assert!(c.pending_retry().is_none());
    }

    #[test]
    fn test_trailing_empty_urls_exhaust() {
        let mut c = controller(&["https://a/x.m3u8", "", "  "]);
        c.start();
        for _ in 0..MAX_RETRY {
            fail(&mut c);
            c.tick(later());
        }
        assert_eq!(c.state(), PlaybackState::Exhausted);
        assert_eq!(c.view().status_text, "Stream failed after 3 retries.");
    }

    #[test]
    fn test_rejected_source_enters_retry() {
        let mut c = controller(&["https://reject/y.mp4"]);
        c.start();
        assert_eq!(c.state(), PlaybackState::Retrying { index: 0, attempt: 1 });
        assert!(!c.media().calls.contains(&Call::Play));
    }

    #[test]
    fn test_pump_drains_media_events() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.start();
        let t = token(&c);
        c.media_mut().queued.push_back((t, MediaEvent::ManifestParsed));
        c.media_mut().queued.push_back((t, MediaEvent::Playing));
        c.pump(Instant::now());
        assert_eq!(c.state(), PlaybackState::Playing { index: 0 });
    }

    #[test]
    fn test_failure_before_start_reports_error() {
        let mut c = controller(&["https://a/x.m3u8"]);
        c.handle_media_event(SourceToken::default(), MediaEvent::Error { reason: "boom".to_string() });
        assert_eq!(c.state(), PlaybackState::Idle);
        assert_eq!(c.view().status_text, "Stream error: boom");
        assert!(c.view().is_error);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut c = controller(&["https://a/x.m3u8", "https://b/y.m3u8"]);
        c.start();
        for i in 0..100 {
            c.select_server(i % 2);
        }
        assert_eq!(c.history().count(), 64);
    }

    #[test]
    fn test_named_servers_in_status() {
        let mut streams = links(&["https://a/x.m3u8"]);
        streams[0].server_name = Some("HD".to_string());
        let mut c = PlaybackController::new(streams, "x", FakeMedia::adaptive(), PlaybackOptions::default());
        c.start();
        assert_eq!(c.view().status_text, "Connecting to HD...");
    }
}

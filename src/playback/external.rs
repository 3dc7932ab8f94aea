//! External player process as a media stack
//!
//! Launches ffplay, mpv, vlc or any other command-line player for each source
//! and turns its stderr output into media events.

use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use super::media::{MediaEvent, MediaStack, SourceKind, SourceRequest, SourceToken};
use crate::errors::MediaError;

pub const DEFAULT_PLAYER: &str = "ffplay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerFamily {
    Ffplay,
    Mpv,
    Vlc,
    Generic,
}

impl PlayerFamily {
    pub fn detect(command: &str) -> Self {
        let lower = command.to_lowercase();
        if lower.contains("ffplay") {
            PlayerFamily::Ffplay
        } else if lower.contains("mpv") {
            PlayerFamily::Mpv
        } else if lower.contains("vlc") {
            PlayerFamily::Vlc
        } else {
            PlayerFamily::Generic
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSettings {
    /// Player command or path; empty means ffplay
    pub command: String,
    pub user_agent: String,
    pub hw_accel: bool,
    pub buffer_secs: u32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            command: String::new(),
            user_agent: String::new(),
            hw_accel: true,
            buffer_secs: 5,
        }
    }
}

pub struct ExternalPlayer {
    program: String,
    family: PlayerFamily,
    settings: PlayerSettings,
    muted: bool,
    child: Option<Child>,
    events: Option<Receiver<(SourceToken, MediaEvent)>>,
    /// Failures raised outside the stderr reader, drained by `poll_events`
    pending: Vec<(SourceToken, MediaEvent)>,
    current: Option<SourceRequest>,
}

impl ExternalPlayer {
    pub fn new(settings: PlayerSettings) -> Result<Self, MediaError> {
        let requested = if settings.command.trim().is_empty() {
            DEFAULT_PLAYER.to_string()
        } else {
            settings.command.trim().to_string()
        };
        let program = platform_player_path(requested);

        if find_executable(&program).is_none() {
            log::error!("Player '{}' not found", program);
            return Err(MediaError::PlayerInit {
                player: program,
                reason: "executable not found on PATH".to_string(),
            });
        }

        let family = PlayerFamily::detect(&program);
        log::info!("Using external player '{}' ({:?})", program, family);
        Ok(Self {
            program,
            family,
            settings,
            muted: false,
            child: None,
            events: None,
            pending: Vec::new(),
            current: None,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn launch(&mut self, request: &SourceRequest) -> Result<(), MediaError> {
        self.kill_child();

        let args = build_args(self.family, request, &self.settings, self.muted);
        log::info!("[PLAY] {} | Player: {}", request.title, self.program);
        log::debug!("[PLAY] Args: {:?}", args);

        let mut cmd = Command::new(&self.program);
        cmd.args(&args);

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            if self.family == PlayerFamily::Ffplay {
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
        }

        if !self.settings.user_agent.is_empty() {
            cmd.env("USER_AGENT", &self.settings.user_agent);
        }
        cmd.stderr(Stdio::piped());
        cmd.stdout(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| MediaError::Spawn {
            player: self.program.clone(),
            source,
        })?;
        log::info!("[PLAY] Player launched (PID: {})", child.id());

        let (tx, rx) = mpsc::channel();
        if let Some(stderr) = child.stderr.take() {
            let token = request.token;
            let kind = request.kind;
            thread::spawn(move || forward_output(stderr, token, kind, &tx));
        }

        self.child = Some(child);
        self.events = Some(rx);
        self.current = Some(request.clone());
        Ok(())
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            log::debug!("Player process stopped");
        }
    }
}

impl MediaStack for ExternalPlayer {
    fn supports_adaptive(&self) -> bool {
        // every supported player reads HLS manifests natively
        self.family != PlayerFamily::Generic
    }

    fn load_manifest(&mut self, source: &SourceRequest) -> Result<(), MediaError> {
        self.launch(source)
    }

    fn set_source(&mut self, source: &SourceRequest) -> Result<(), MediaError> {
        self.launch(source)
    }

    fn play(&mut self) {
        // players start on launch
    }

    fn set_muted(&mut self, muted: bool) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        if self.child.is_none() {
            return;
        }
        if let Some(current) = self.current.clone() {
            log::info!("Relaunching player {}", if muted { "muted" } else { "with audio" });
            if let Err(e) = self.launch(&current) {
                log::warn!("Failed to relaunch player: {}", e);
                self.pending.push((current.token, MediaEvent::Error { reason: e.to_string() }));
            }
        }
    }

    fn release(&mut self) {
        self.kill_child();
        self.events = None;
        self.pending.clear();
        self.current = None;
    }

    fn poll_events(&mut self) -> Vec<(SourceToken, MediaEvent)> {
        let mut out: Vec<(SourceToken, MediaEvent)> = match &self.events {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        };
        out.append(&mut self.pending);

        let Some(token) = self.current.as_ref().map(|c| c.token) else {
            return out;
        };
        let exited = match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(Some(status))) => Some(status),
            Some(Err(e)) => {
                log::warn!("Failed to query player status: {}", e);
                None
            }
            _ => None,
        };
        if let Some(status) = exited {
            self.child = None;
            let event = if status.success() {
                MediaEvent::Ended
            } else {
                let reason = match status.code() {
                    Some(code) => format!("player exited with code {}", code),
                    None => "player terminated by signal".to_string(),
                };
                MediaEvent::Error { reason }
            };
            log::info!("Player exited: {}", status);
            out.push((token, event));
        }
        out
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        self.kill_child();
    }
}

/// Resolve well-known install locations for bare player names
#[cfg(target_os = "windows")]
fn platform_player_path(player: String) -> String {
    let candidates: &[&str] = match player.to_lowercase().as_str() {
        "vlc" | "vlc.exe" => &[
            r"C:\Program Files\VideoLAN\VLC\vlc.exe",
            r"C:\Program Files (x86)\VideoLAN\VLC\vlc.exe",
        ],
        "mpv" | "mpv.exe" => &[
            r"C:\Program Files\mpv\mpv.exe",
            r"C:\Program Files (x86)\mpv\mpv.exe",
            r"C:\mpv\mpv.exe",
        ],
        "ffplay" | "ffplay.exe" => &[
            r"C:\ffmpeg\bin\ffplay.exe",
            r"C:\Program Files\ffmpeg\bin\ffplay.exe",
        ],
        _ => &[],
    };
    candidates
        .iter()
        .find(|path| Path::new(path).exists())
        .map(|s| s.to_string())
        .unwrap_or(player)
}

#[cfg(not(target_os = "windows"))]
fn platform_player_path(player: String) -> String {
    player
}

/// Absolute or relative paths must exist; bare names are looked up on PATH
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 || path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }

    let dirs = std::env::var_os("PATH")?;
    std::env::split_paths(&dirs).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(target_os = "windows") {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Command line for one source
pub fn build_args(
    family: PlayerFamily,
    request: &SourceRequest,
    settings: &PlayerSettings,
    muted: bool,
) -> Vec<String> {
    let url = request.url.clone();
    let title = request.title.clone();
    let buffer_secs = settings.buffer_secs.max(1);
    let buffer_ms = u64::from(buffer_secs) * 1000;
    let probe_bytes = u64::from(buffer_secs) * 4 * 1024 * 1024;
    let user_agent = (!settings.user_agent.is_empty()).then(|| settings.user_agent.clone());

    match family {
        PlayerFamily::Ffplay => {
            let mut args = Vec::new();
            if settings.hw_accel && cfg!(target_os = "linux") {
                args.extend(["-hwaccel".to_string(), "auto".to_string()]);
            } else if settings.hw_accel && cfg!(target_os = "macos") {
                args.extend(["-hwaccel".to_string(), "videotoolbox".to_string()]);
            }
            args.extend([
                url.clone(),
                "-autoexit".to_string(),
                "-probesize".to_string(),
                probe_bytes.to_string(),
                "-analyzeduration".to_string(),
                (buffer_ms * 2000).to_string(),
                "-sync".to_string(),
                "audio".to_string(),
                "-framedrop".to_string(),
                "-window_title".to_string(),
                title,
            ]);
            if url.starts_with("http") {
                args.extend([
                    "-reconnect".to_string(),
                    "1".to_string(),
                    "-reconnect_streamed".to_string(),
                    "1".to_string(),
                    "-reconnect_delay_max".to_string(),
                    "10".to_string(),
                ]);
            }
            if let Some(ua) = user_agent {
                args.extend(["-user_agent".to_string(), ua]);
            }
            if muted {
                args.extend(["-volume".to_string(), "0".to_string()]);
            }
            args
        }
        PlayerFamily::Mpv => {
            let cache_secs = buffer_secs * 2;
            let cache_mb = buffer_secs * 4;
            let mut args = vec![
                url,
                format!("--title={}", title),
                "--cache=yes".to_string(),
                format!("--cache-secs={}", cache_secs),
                format!("--demuxer-readahead-secs={}", cache_secs),
                format!("--demuxer-max-bytes={}M", cache_mb),
                "--network-timeout=60".to_string(),
                "--stream-lavf-o=reconnect=1".to_string(),
                "--stream-lavf-o=reconnect_streamed=1".to_string(),
                "--demuxer-lavf-o=fflags=+genpts+discardcorrupt".to_string(),
                "--ytdl=no".to_string(),
            ];
            if settings.hw_accel {
                args.push("--hwdec=auto-safe".to_string());
            } else {
                args.push("--hwdec=no".to_string());
            }
            if let Some(ua) = user_agent {
                args.push(format!("--user-agent={}", ua));
            }
            if muted {
                args.push("--mute=yes".to_string());
            }
            args
        }
        PlayerFamily::Vlc => {
            let cache_ms = buffer_ms * 2;
            let mut args = vec![
                url,
                format!("--meta-title={}", title),
                format!("--network-caching={}", cache_ms),
                format!("--live-caching={}", cache_ms),
                "--http-reconnect".to_string(),
            ];
            if settings.hw_accel {
                args.push("--avcodec-hw=any".to_string());
            }
            if let Some(ua) = user_agent {
                args.push(format!("--http-user-agent={}", ua));
            }
            if muted {
                args.push("--no-audio".to_string());
            }
            args
        }
        PlayerFamily::Generic => vec![url],
    }
}

/// Classify player output until it closes or the receiver goes away.
/// Progress lines end in `\r`, so both `\r` and `\n` terminate a line.
fn forward_output<R: Read>(
    output: R,
    token: SourceToken,
    kind: SourceKind,
    tx: &Sender<(SourceToken, MediaEvent)>,
) {
    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();
    let mut playing = false;
    loop {
        buf.clear();
        match read_line_any(&mut reader, &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("Player output closed: {}", e);
                break;
            }
        }
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        log::debug!("[PLAYER] {}", line);
        let Some(event) = classify_line(&line, kind) else {
            continue;
        };
        if event == MediaEvent::Playing {
            if playing {
                continue;
            }
            playing = true;
        }
        // receiver dropped on release
        if tx.send((token, event)).is_err() {
            break;
        }
    }
}

/// Read up to the next `\r` or `\n`, which is consumed but not stored.
/// Returns the number of bytes consumed; zero means end of input.
fn read_line_any<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    let mut total = 0;
    loop {
        let (done, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(total);
            }
            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(i) => {
                    buf.extend_from_slice(&available[..i]);
                    (true, i + 1)
                }
                None => {
                    buf.extend_from_slice(available);
                    (false, available.len())
                }
            }
        };
        reader.consume(used);
        total += used;
        if done {
            return Ok(total);
        }
    }
}

/// Map one stderr line to a media event
pub fn classify_line(line: &str, kind: SourceKind) -> Option<MediaEvent> {
    let lower = line.to_lowercase();
    let details = line.trim().to_string();

    let is_open_failure = [
        "server returned 4",
        "server returned 5",
        "http error",
        "error opening",
        "failed to open",
        "failed to resolve",
        "connection refused",
        "invalid data found",
        "no such file",
    ]
    .iter()
    .any(|p| lower.contains(p));
    if is_open_failure {
        return Some(match kind {
            SourceKind::Manifest => MediaEvent::AdaptiveError { fatal: true, details },
            SourceKind::Direct => MediaEvent::Error { reason: details },
        });
    }

    if lower.contains("will reconnect") || lower.contains("reconnecting") {
        return Some(MediaEvent::AdaptiveError { fatal: false, details });
    }

    if lower.contains("timed out") || lower.contains("end of file") || lower.contains("premature") {
        return Some(MediaEvent::Stalled);
    }

    if lower.contains("(buffering)") {
        return Some(MediaEvent::Waiting);
    }
    if lower.contains("(paused)") {
        return Some(MediaEvent::Paused);
    }

    // ffplay "M-A:"/"A-V:", mpv "AV:"/"A:" status lines
    let trimmed = lower.trim_start();
    if lower.contains("a-v:") || lower.contains("m-a:") || lower.contains("m-v:")
        || trimmed.starts_with("av:") || trimmed.starts_with("a:") || trimmed.starts_with("v:")
    {
        return Some(MediaEvent::Playing);
    }

    if lower.starts_with("input #") {
        return Some(match kind {
            SourceKind::Manifest => MediaEvent::ManifestParsed,
            SourceKind::Direct => MediaEvent::CanPlay,
        });
    }
    if trimmed.starts_with("stream #") || trimmed.starts_with("(+) video") || trimmed.starts_with("(+) audio") {
        return Some(MediaEvent::CanPlay);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> SourceRequest {
        SourceRequest {
            token: SourceToken(1),
            url: url.to_string(),
            kind: SourceKind::detect(url),
            title: "Leeds vs Tottenham - HD".to_string(),
        }
    }

    #[test]
    fn test_family_detection() {
        assert_eq!(PlayerFamily::detect("ffplay"), PlayerFamily::Ffplay);
        assert_eq!(PlayerFamily::detect("/usr/bin/mpv"), PlayerFamily::Mpv);
        assert_eq!(PlayerFamily::detect(r"C:\Program Files\VideoLAN\VLC\vlc.exe"), PlayerFamily::Vlc);
        assert_eq!(PlayerFamily::detect("totem"), PlayerFamily::Generic);
    }

    #[test]
    fn test_mute_flags_per_player() {
        let settings = PlayerSettings::default();
        let req = request("https://a/x.m3u8");

        let ffplay = build_args(PlayerFamily::Ffplay, &req, &settings, true);
        assert!(ffplay.windows(2).any(|w| w[0] == "-volume" && w[1] == "0"));
        let ffplay = build_args(PlayerFamily::Ffplay, &req, &settings, false);
        assert!(!ffplay.iter().any(|a| a == "-volume"));

        assert!(build_args(PlayerFamily::Mpv, &req, &settings, true).contains(&"--mute=yes".to_string()));
        assert!(build_args(PlayerFamily::Vlc, &req, &settings, true).contains(&"--no-audio".to_string()));
        assert_eq!(build_args(PlayerFamily::Generic, &req, &settings, true), vec!["https://a/x.m3u8"]);
    }

    #[test]
    fn test_args_carry_user_agent_and_title() {
        let settings = PlayerSettings {
            user_agent: "VLC/3.0.20".to_string(),
            hw_accel: false,
            ..Default::default()
        };
        let req = request("https://a/x.mp4");

        let mpv = build_args(PlayerFamily::Mpv, &req, &settings, false);
        assert_eq!(mpv[0], "https://a/x.mp4");
        assert!(mpv.contains(&"--user-agent=VLC/3.0.20".to_string()));
        assert!(mpv.contains(&"--title=Leeds vs Tottenham - HD".to_string()));
        assert!(mpv.contains(&"--hwdec=no".to_string()));

        let ffplay = build_args(PlayerFamily::Ffplay, &req, &settings, false);
        assert_eq!(ffplay[0], "https://a/x.mp4");
        assert!(ffplay.windows(2).any(|w| w[0] == "-user_agent" && w[1] == "VLC/3.0.20"));
        assert!(ffplay.contains(&"-reconnect".to_string()));
    }

    #[test]
    fn test_classify_failures_by_source_kind() {
        let line = "[https @ 0x55] HTTP error 404 Not Found";
        assert_eq!(
            classify_line(line, SourceKind::Manifest),
            Some(MediaEvent::AdaptiveError { fatal: true, details: line.to_string() })
        );
        assert_eq!(
            classify_line(line, SourceKind::Direct),
            Some(MediaEvent::Error { reason: line.to_string() })
        );
        assert!(matches!(
            classify_line("Server returned 503 Service Unavailable", SourceKind::Direct),
            Some(MediaEvent::Error { .. })
        ));
    }

    #[test]
    fn test_classify_progress_and_banners() {
        assert_eq!(
            classify_line("Input #0, hls, from 'https://a/x.m3u8':", SourceKind::Manifest),
            Some(MediaEvent::ManifestParsed)
        );
        assert_eq!(
            classify_line("Input #0, mov,mp4, from 'https://a/x.mp4':", SourceKind::Direct),
            Some(MediaEvent::CanPlay)
        );
        assert_eq!(
            classify_line("    Stream #0:0: Video: h264", SourceKind::Direct),
            Some(MediaEvent::CanPlay)
        );
        assert_eq!(
            classify_line("  12.34 M-A:  0.001 fd=   0 aq=   12KB vq=  100KB", SourceKind::Manifest),
            Some(MediaEvent::Playing)
        );
        assert_eq!(classify_line("AV: 00:00:03 / 00:00:00", SourceKind::Manifest), Some(MediaEvent::Playing));
        assert_eq!(classify_line("(Buffering) AV: 00:00:03", SourceKind::Manifest), Some(MediaEvent::Waiting));
    }

    #[test]
    fn test_classify_reconnect_and_stall() {
        assert!(matches!(
            classify_line("Will reconnect at 1234 in 2 second(s)", SourceKind::Manifest),
            Some(MediaEvent::AdaptiveError { fatal: false, .. })
        ));
        assert_eq!(classify_line("Connection timed out", SourceKind::Direct), Some(MediaEvent::Stalled));
        assert_eq!(classify_line("some unrelated banner", SourceKind::Direct), None);
    }

    #[test]
    fn test_line_reader_splits_on_cr_and_lf() {
        let mut reader = io::Cursor::new(b"a\rb\r\nc".to_vec());
        let mut lines = Vec::new();
        loop {
            let mut buf = Vec::new();
            if read_line_any(&mut reader, &mut buf).unwrap() == 0 {
                break;
            }
            lines.push(String::from_utf8(buf).unwrap());
        }
        assert_eq!(lines, vec!["a", "b", "", "c"]);
    }

    #[test]
    fn test_ffplay_progress_reports_playing_once() {
        let output = concat!(
            "Input #0, hls, from 'https://a/x.m3u8':\n",
            "   1.00 M-A:  0.001 fd=   0 aq=    0KB vq=    0KB\r",
            "   2.00 M-A:  0.002 fd=   0 aq=    0KB vq=    0KB\r",
            "   3.00 M-A:  0.001 fd=   0 aq=    0KB vq=    0KB\r",
        );
        let (tx, rx) = mpsc::channel();
        forward_output(io::Cursor::new(output.as_bytes()), SourceToken(3), SourceKind::Manifest, &tx);
        drop(tx);

        let events: Vec<(SourceToken, MediaEvent)> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                (SourceToken(3), MediaEvent::ManifestParsed),
                (SourceToken(3), MediaEvent::Playing),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_relaunch_reports_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake-player");
        std::fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut player = ExternalPlayer::new(PlayerSettings {
            command: path.to_str().unwrap().to_string(),
            ..Default::default()
        })
        .unwrap();
        player.set_muted(true);
        let req = request("https://a/x.mp4");
        player.set_source(&req).unwrap();

        std::fs::remove_file(&path).unwrap();
        player.set_muted(false);
        assert!(player.child.is_none());

        let events = player.poll_events();
        assert!(matches!(
            events.as_slice(),
            [(SourceToken(1), MediaEvent::Error { .. })]
        ));
        assert!(player.poll_events().is_empty());
    }

    #[test]
    fn test_missing_player_fails_init() {
        let result = ExternalPlayer::new(PlayerSettings {
            command: "/definitely/not/installed/player".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(MediaError::PlayerInit { .. })));
    }

    #[test]
    fn test_find_executable_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player");
        std::fs::write(&path, b"").unwrap();
        let found = find_executable(path.to_str().unwrap());
        assert_eq!(found, Some(path));
        assert_eq!(find_executable("no-such-player-anywhere-xyz"), None);
    }
}

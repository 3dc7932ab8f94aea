//! FSTV - Rust Edition
//! Live sports events and channels directory with a failover stream player

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use eframe::egui;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

mod catalog;
mod config;
mod errors;
mod loader;
mod models;
mod normalizer;
mod playback;
mod resolver;

use catalog::{event_status, format_event_time, Catalog, EventStatus, LeagueFilter};
use config::{AppConfig, USER_AGENTS};
use loader::DocumentSource;
use models::{BadgeKind, StreamLink, Tab, Team};
use normalizer::NormalizedDocument;
use playback::{ExternalPlayer, PlaybackController, PlaybackOptions, PlayerSettings};
use resolver::{FallbackChoice, WatchRequest};

/// Console keeps the last 500 lines
const CONSOLE_LIMIT: usize = 500;
const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "fstv")]
#[command(about = "Live sports events and channels directory with a failover stream player")]
struct Args {
    /// Data document URL or path (overrides the saved setting for this run)
    data_source: Option<String>,

    /// Open the watch view once the document has loaded, e.g. "?channel=ESPN"
    #[arg(long)]
    watch: Option<String>,
}

fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Background task messages
enum TaskResult {
    DocumentLoaded { source: String, doc: NormalizedDocument },
    DocumentFailed { source: String, error: String },
}

#[derive(Debug, Clone, PartialEq)]
enum DocumentState {
    Loading,
    Loaded,
    Failed(String),
}

/// What the watch view is showing
enum WatchView {
    Player {
        title: String,
        controller: PlaybackController<ExternalPlayer>,
        last_status: String,
    },
    NoMatch { choices: Vec<FallbackChoice> },
    NoStreams { title: String },
    LoadFailed { error: String },
    InitFailed { title: String, error: String },
    /// A request queued behind a document load
    Waiting,
}

enum WatchAction {
    Back,
    SelectServer(usize),
    Unmute,
    Open(String),
}

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 700.0])
            .with_min_inner_size([800.0, 500.0]),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "FSTV - Rust Edition",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(FstvApp::new(args)))
        }),
    )
}

struct FstvApp {
    config: AppConfig,
    catalog: Catalog,
    document_state: DocumentState,

    // Directory
    current_tab: Tab,
    league_filter: LeagueFilter,
    event_search: String,
    channel_search: String,

    // Watch view
    watch: Option<WatchView>,
    pending_watch: Option<WatchRequest>,

    // Status
    status_message: String,
    loading: bool,
    console_log: Vec<String>,

    task_sender: Sender<TaskResult>,
    task_receiver: Receiver<TaskResult>,
}

impl FstvApp {
    fn new(args: Args) -> Self {
        let mut config = AppConfig::load();
        if let Some(source) = args.data_source {
            config.data_source = source;
        }
        let mut app = Self::with_config(config, args.watch.as_deref());
        app.load_document();
        app
    }

    /// App state before the first document load starts
    fn with_config(config: AppConfig, watch: Option<&str>) -> Self {
        let (task_sender, task_receiver) = channel();
        let pending_watch = watch.map(WatchRequest::from_query);

        Self {
            config,
            catalog: Catalog::sample(),
            document_state: DocumentState::Loading,
            current_tab: Tab::Events,
            league_filter: LeagueFilter::All,
            event_search: String::new(),
            channel_search: String::new(),
            watch: pending_watch.as_ref().map(|_| WatchView::Waiting),
            pending_watch,
            status_message: "Ready".to_string(),
            loading: false,
            console_log: vec![format!("[{}] [INFO] FSTV started", timestamp_now())],
            task_sender,
            task_receiver,
        }
    }

    fn log(&mut self, message: &str) {
        self.console_log.push(format!("[{}] {}", timestamp_now(), message));
        if self.console_log.len() > CONSOLE_LIMIT {
            self.console_log.remove(0);
        }
    }

    fn load_document(&mut self) {
        let input = self.config.data_source.trim().to_string();
        if input.is_empty() {
            self.status_message = "Enter a data source URL or file".to_string();
            return;
        }

        let source = DocumentSource::parse(&input);
        let user_agent = self.config.user_agent();
        let timeout = self.config.request_timeout();
        let sender = self.task_sender.clone();

        self.document_state = DocumentState::Loading;
        self.loading = true;
        self.status_message = format!("Loading {}...", source.describe());
        self.log(&format!("[INFO] Loading data document from {}", source.describe()));

        thread::spawn(move || {
            let described = source.describe();
            let result = match loader::fetch_document(&source, &user_agent, timeout) {
                Ok(raw) => TaskResult::DocumentLoaded {
                    source: described,
                    doc: normalizer::normalize(&raw),
                },
                Err(e) => TaskResult::DocumentFailed {
                    source: described,
                    error: e.to_string(),
                },
            };
            let _ = sender.send(result);
        });
    }

    fn handle_task(&mut self, result: TaskResult) {
        match result {
            TaskResult::DocumentLoaded { source, doc } => {
                let events = doc.events.as_ref().map_or(0, Vec::len);
                let channels = doc.channels.as_ref().map_or(0, Vec::len);
                self.catalog = Catalog::from_document(doc);
                if let LeagueFilter::League(id) = &self.league_filter {
                    if !self.catalog.leagues.iter().any(|l| &l.id == id) {
                        self.league_filter = LeagueFilter::All;
                    }
                }
                self.document_state = DocumentState::Loaded;
                self.loading = false;
                self.status_message = format!("Loaded {} events, {} channels", events, channels);
                self.log(&format!(
                    "[INFO] Loaded {} - {} events, {} channels",
                    source, events, channels
                ));

                if let Some(request) = self.pending_watch.take() {
                    self.open_request(request);
                }
            }
            TaskResult::DocumentFailed { source, error } => {
                self.document_state = DocumentState::Failed(error.clone());
                self.loading = false;
                self.status_message = format!("Could not load data document: {}", error);
                self.log(&format!("[ERROR] Failed to load {}: {}", source, error));

                if self.pending_watch.take().is_some() {
                    self.watch = Some(WatchView::LoadFailed { error });
                }
            }
        }
    }

    fn open_query(&mut self, query: &str) {
        self.open_request(WatchRequest::from_query(query));
    }

    fn open_request(&mut self, request: WatchRequest) {
        self.close_watch();
        if self.document_state == DocumentState::Loading {
            self.log("[INFO] Watch request queued until the data document loads");
            self.pending_watch = Some(request);
            self.watch = Some(WatchView::Waiting);
            return;
        }

        let view = match resolver::resolve_request(&request, &self.catalog) {
            Err(_) => WatchView::NoMatch {
                choices: resolver::fallback_choices(&self.catalog),
            },
            Ok(item) => {
                let title = item.display_title();
                match resolver::playable_links(&item) {
                    Err(_) => WatchView::NoStreams { title },
                    Ok(links) => Self::start_player(&self.config, title, links),
                }
            }
        };

        let message = match &view {
            WatchView::Player { title, controller, .. } => format!(
                "[PLAY] {} | {} server(s) | Player: {}",
                title,
                controller.streams().len(),
                controller.media().program()
            ),
            WatchView::NoMatch { .. } => format!("[WARN] No stream matches {:?}", request),
            WatchView::NoStreams { title } => format!("[WARN] No valid stream URLs for '{}'", title),
            WatchView::LoadFailed { error } => format!("[ERROR] {}", error),
            WatchView::InitFailed { error, .. } => format!("[ERROR] {}", error),
            WatchView::Waiting => "[INFO] Waiting for the data document".to_string(),
        };
        self.log(&message);
        self.watch = Some(view);
    }

    fn start_player(config: &AppConfig, title: String, links: Vec<StreamLink>) -> WatchView {
        let settings = PlayerSettings {
            command: config.external_player.clone(),
            user_agent: config.user_agent(),
            hw_accel: config.hw_accel,
            ..Default::default()
        };
        match ExternalPlayer::new(settings) {
            Ok(player) => {
                let options = PlaybackOptions {
                    start_muted: config.start_muted,
                };
                let mut controller = PlaybackController::new(links, &title, player, options);
                controller.start();
                WatchView::Player {
                    title,
                    controller,
                    last_status: String::new(),
                }
            }
            Err(e) => WatchView::InitFailed {
                title,
                error: format!("Player initialization failed: {}", e),
            },
        }
    }

    fn close_watch(&mut self) {
        if let Some(WatchView::Player { controller, .. }) = self.watch.as_mut() {
            controller.teardown();
        }
        self.watch = None;
        self.pending_watch = None;
    }

    fn save_settings(&mut self) {
        match self.config.save() {
            Ok(()) => {
                self.status_message = "Settings saved".to_string();
                self.log("[INFO] Settings saved");
            }
            Err(e) => {
                self.status_message = format!("Failed to save settings: {}", e);
                self.log(&format!("[ERROR] Failed to save settings: {}", e));
            }
        }
    }

    fn show_top_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_space(5.0);
        ui.horizontal(|ui| {
            ui.label("📄 Data:");
            ui.add(
                egui::TextEdit::singleline(&mut self.config.data_source)
                    .hint_text("https://... or data.json")
                    .desired_width(320.0),
            )
            .on_hover_text("URL or path of the events/channels JSON document (gzip allowed)");

            if ui.button("🔄 Reload").clicked() {
                self.load_document();
            }
            if ui.button("📁 Open file").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .set_title("Open data document")
                    .add_filter("JSON", &["json", "gz"])
                    .pick_file()
                {
                    self.config.data_source = path.display().to_string();
                    self.load_document();
                }
            }

            ui.separator();
            ui.checkbox(&mut self.config.dark_mode, "🌙 Dark");
            ui.checkbox(&mut self.config.start_muted, "🔇 Start muted");
            ui.checkbox(&mut self.config.hw_accel, "HW Accel");

            if ui.button("💾 Save").on_hover_text("Save current settings").clicked() {
                self.save_settings();
            }
        });

        ui.horizontal(|ui| {
            ui.label("🎬 Player:");
            ui.add(
                egui::TextEdit::singleline(&mut self.config.external_player)
                    .hint_text("mpv, vlc, ffplay...")
                    .desired_width(200.0),
            )
            .on_hover_text("Media player command or path. Leave empty for ffplay (default)");

            ui.separator();
            let selected = if self.config.use_custom_user_agent {
                "Custom"
            } else {
                USER_AGENTS
                    .get(self.config.selected_user_agent)
                    .map_or(USER_AGENTS[0].0, |ua| ua.0)
            };
            egui::ComboBox::from_label("🌐 User Agent")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    for (i, (name, _ua)) in USER_AGENTS.iter().enumerate() {
                        let is_selected =
                            !self.config.use_custom_user_agent && self.config.selected_user_agent == i;
                        if ui.selectable_label(is_selected, *name).clicked() {
                            self.config.selected_user_agent = i;
                            self.config.use_custom_user_agent = false;
                        }
                    }
                });
            ui.checkbox(&mut self.config.use_custom_user_agent, "Custom");
            if self.config.use_custom_user_agent {
                ui.add(egui::TextEdit::singleline(&mut self.config.custom_user_agent).desired_width(220.0));
            }
        });
        ui.add_space(5.0);
    }

    fn show_directory(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.current_tab, Tab::Events, "🏆 EVENTS");
            ui.selectable_value(&mut self.current_tab, Tab::Channels, "📺 CHANNELS");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.selectable_value(&mut self.current_tab, Tab::Console, "🖥 CONSOLE");
            });
        });
        ui.separator();

        match self.current_tab {
            Tab::Events => self.show_events_tab(ui),
            Tab::Channels => self.show_channels_tab(ui),
            Tab::Console => self.show_console_tab(ui),
        }
    }

    fn show_events_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui
                .selectable_label(self.league_filter == LeagueFilter::All, "All")
                .clicked()
            {
                self.league_filter = LeagueFilter::All;
            }
            for league in &self.catalog.leagues {
                let active = self.league_filter == LeagueFilter::League(league.id.clone());
                if ui.selectable_label(active, &league.name).clicked() {
                    self.league_filter = LeagueFilter::League(league.id.clone());
                }
            }
        });
        ui.horizontal(|ui| {
            ui.label("🔍");
            ui.add(
                egui::TextEdit::singleline(&mut self.event_search)
                    .hint_text("Search events...")
                    .desired_width(300.0),
            );
        });
        ui.separator();

        let now = chrono::Local::now();
        let mut to_open: Option<String> = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let events = self.catalog.filter_events(&self.league_filter, &self.event_search);
                if events.is_empty() {
                    ui.label(egui::RichText::new("No events found").weak());
                }
                for event in events {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_min_width(ui.available_width());
                        ui.horizontal(|ui| {
                            let status = event_status(event, now);
                            let badge_color = match status {
                                EventStatus::Live => egui::Color32::from_rgb(220, 60, 60),
                                _ => egui::Color32::GRAY,
                            };
                            ui.label(egui::RichText::new(status.label()).strong().color(badge_color));

                            match (&event.home, &event.away) {
                                (Some(home), Some(away)) => {
                                    draw_badge(ui, home);
                                    ui.label(egui::RichText::new(&home.name).strong());
                                    ui.label("vs");
                                    draw_badge(ui, away);
                                    ui.label(egui::RichText::new(&away.name).strong());
                                }
                                _ => {
                                    ui.label(egui::RichText::new(event.card_title()).strong());
                                }
                            }

                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                if ui.button("▶ Watch").clicked() {
                                    to_open = Some(resolver::event_watch_query(&event.id));
                                }
                            });
                        });
                        ui.label(
                            egui::RichText::new(format!("{} | {}", event.league, format_event_time(event)))
                                .small()
                                .weak(),
                        );
                    });
                }
            });

        if let Some(query) = to_open {
            self.open_query(&query);
        }
    }

    fn show_channels_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("🔍");
            ui.add(
                egui::TextEdit::singleline(&mut self.channel_search)
                    .hint_text("Search channels...")
                    .desired_width(300.0),
            );
        });
        ui.separator();

        let mut to_open: Option<String> = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let channels = self.catalog.search_channels(&self.channel_search);
                if channels.is_empty() {
                    ui.label(egui::RichText::new("No channels found").weak());
                }
                ui.horizontal_wrapped(|ui| {
                    for ch in channels {
                        egui::Frame::group(ui.style()).show(ui, |ui| {
                            ui.set_width(180.0);
                            ui.vertical(|ui| {
                                ui.label(egui::RichText::new(&ch.name).strong());
                                ui.label(egui::RichText::new(&ch.category).small().weak());
                                if ui.button("▶ Watch").clicked() {
                                    to_open = Some(resolver::channel_watch_query(&ch.name));
                                }
                            });
                        });
                    }
                });
            });

        if let Some(query) = to_open {
            self.open_query(&query);
        }
    }

    fn show_console_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Console Log");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🗑 Clear").clicked() {
                    self.console_log.clear();
                    self.console_log.push(format!("[{}] Console cleared", timestamp_now()));
                }
            });
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.console_log {
                    let color = if line.contains("[ERROR]") {
                        egui::Color32::RED
                    } else if line.contains("[WARN]") {
                        egui::Color32::YELLOW
                    } else if line.contains("[INFO]") {
                        egui::Color32::LIGHT_BLUE
                    } else if line.contains("[PLAY]") {
                        egui::Color32::GREEN
                    } else {
                        egui::Color32::GRAY
                    };
                    ui.label(egui::RichText::new(line).monospace().color(color));
                }
            });
    }

    fn show_watch(watch: &WatchView, ui: &mut egui::Ui) -> Option<WatchAction> {
        let mut action = None;
        let error_color = egui::Color32::from_rgb(220, 80, 80);

        if ui.button("⬅ Back").clicked() {
            action = Some(WatchAction::Back);
        }
        ui.separator();

        match watch {
            WatchView::Player { title, controller, .. } => {
                let view = controller.view();
                ui.heading(title);
                ui.horizontal(|ui| {
                    if view.loading_visible {
                        ui.spinner();
                    }
                    let mut text = egui::RichText::new(&view.status_text);
                    if view.is_error {
                        text = text.color(error_color);
                    }
                    ui.label(text);
                });
                if view.unmute_visible && ui.button("🔇 Tap to unmute").clicked() {
                    action = Some(WatchAction::Unmute);
                }

                ui.add_space(10.0);
                ui.label(egui::RichText::new("Available servers").strong());
                ui.horizontal_wrapped(|ui| {
                    for (i, stream) in controller.streams().iter().enumerate() {
                        let active = view.active_server == Some(i);
                        if ui.selectable_label(active, stream.display_name(i)).clicked() {
                            action = Some(WatchAction::SelectServer(i));
                        }
                    }
                });
                ui.add_space(10.0);
                ui.label(
                    egui::RichText::new(format!("Playing in {}", controller.media().program()))
                        .small()
                        .weak(),
                );
            }
            WatchView::NoMatch { choices } => {
                ui.heading("Select a stream to play");
                if choices.is_empty() {
                    ui.label(egui::RichText::new("No events available").weak());
                }
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for choice in choices {
                        if ui.button(&choice.label).clicked() {
                            action = Some(WatchAction::Open(choice.query.clone()));
                        }
                    }
                });
            }
            WatchView::NoStreams { title } => {
                ui.heading(title);
                ui.label(
                    egui::RichText::new("No valid stream URLs found in the data for this item.")
                        .color(error_color),
                );
            }
            WatchView::LoadFailed { error } => {
                ui.heading("Could not load data document");
                ui.label(egui::RichText::new(error).color(error_color));
            }
            WatchView::InitFailed { title, error } => {
                ui.heading(title);
                ui.label(egui::RichText::new(error).color(error_color));
            }
            WatchView::Waiting => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading data document...");
                });
            }
        }
        action
    }

    fn apply_watch_action(&mut self, action: WatchAction) {
        match action {
            WatchAction::Back => {
                self.close_watch();
                self.log("[INFO] Closed watch view");
            }
            WatchAction::Open(query) => self.open_query(&query),
            WatchAction::SelectServer(index) => {
                if let Some(WatchView::Player { controller, .. }) = self.watch.as_mut() {
                    controller.select_server(index);
                }
            }
            WatchAction::Unmute => {
                if let Some(WatchView::Player { controller, .. }) = self.watch.as_mut() {
                    controller.unmute();
                }
            }
        }
    }
}

impl eframe::App for FstvApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Process background task results (non-blocking)
        while let Ok(result) = self.task_receiver.try_recv() {
            self.handle_task(result);
        }

        let mut status_change = None;
        if let Some(WatchView::Player { controller, last_status, .. }) = self.watch.as_mut() {
            controller.pump(Instant::now());
            let view = controller.view();
            if view.status_text != *last_status {
                *last_status = view.status_text.clone();
                status_change = Some((view.status_text.clone(), view.is_error));
            }
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
        if let Some((text, is_error)) = status_change {
            let tag = if is_error { "[WARN]" } else { "[PLAY]" };
            self.log(&format!("{} {}", tag, text));
        }
        if self.loading {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }

        if self.config.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.show_top_panel(ui);
        });

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.loading {
                    ui.spinner();
                }
                ui.label(&self.status_message);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let action = match &self.watch {
                Some(watch) => Self::show_watch(watch, ui),
                None => {
                    self.show_directory(ui);
                    None
                }
            };
            if let Some(action) = action {
                self.apply_watch_action(action);
            }
        });
    }
}

impl Drop for FstvApp {
    fn drop(&mut self) {
        self.close_watch();
    }
}

/// Team badge: filled circle for colors, initial on a placeholder for image URLs
fn draw_badge(ui: &mut egui::Ui, team: &Team) {
    let (rect, response) = ui.allocate_exact_size(egui::vec2(26.0, 26.0), egui::Sense::hover());
    let center = rect.center();
    match team.badge_kind() {
        BadgeKind::Color(css) => {
            let color = parse_css_color(css).unwrap_or(egui::Color32::GRAY);
            ui.painter().circle_filled(center, 12.0, color);
        }
        BadgeKind::Image(url) => {
            ui.painter().circle_filled(center, 12.0, egui::Color32::from_gray(70));
            let initial = team
                .name
                .chars()
                .next()
                .map(|c| c.to_uppercase().to_string())
                .unwrap_or_default();
            ui.painter().text(
                center,
                egui::Align2::CENTER_CENTER,
                initial,
                egui::FontId::proportional(12.0),
                egui::Color32::WHITE,
            );
            response.on_hover_text(url);
        }
        BadgeKind::Empty => {
            ui.painter()
                .circle_stroke(center, 12.0, egui::Stroke::new(1.0, egui::Color32::GRAY));
        }
    }
}

/// `#rgb`, `#rrggbb` or a handful of named colors
fn parse_css_color(value: &str) -> Option<egui::Color32> {
    let value = value.trim().to_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        return Some(egui::Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?));
    }
    let rgb = match value.as_str() {
        "red" => (220, 40, 40),
        "blue" => (40, 80, 220),
        "navy" => (0, 0, 128),
        "skyblue" => (135, 206, 235),
        "green" => (40, 160, 60),
        "yellow" => (240, 210, 40),
        "orange" => (240, 140, 30),
        "purple" => (128, 0, 128),
        "maroon" => (128, 0, 0),
        "white" => (255, 255, 255),
        "black" => (0, 0, 0),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_css_color() {
        assert_eq!(parse_css_color("#ff0000"), Some(egui::Color32::from_rgb(255, 0, 0)));
        assert_eq!(parse_css_color(" #0F0 "), Some(egui::Color32::from_rgb(0, 255, 0)));
        assert_eq!(parse_css_color("Navy"), Some(egui::Color32::from_rgb(0, 0, 128)));
        assert_eq!(parse_css_color("#12"), None);
        assert_eq!(parse_css_color("#zzzzzz"), None);
        assert_eq!(parse_css_color("#aéaé"), None);
        assert_eq!(parse_css_color("#ééé"), None);
        assert_eq!(parse_css_color("chartreuse-ish"), None);
    }

    #[test]
    fn test_watch_request_waits_for_document() {
        let mut app = FstvApp::with_config(AppConfig::default(), None);
        assert!(app.watch.is_none());

        app.open_query("?channel=ESPN");
        assert!(matches!(app.watch, Some(WatchView::Waiting)));
        assert!(app.pending_watch.is_some());

        app.handle_task(TaskResult::DocumentFailed {
            source: "data.json".to_string(),
            error: "HTTP error: 404".to_string(),
        });
        assert!(matches!(app.watch, Some(WatchView::LoadFailed { .. })));
        assert!(app.pending_watch.is_none());

        app.apply_watch_action(WatchAction::Back);
        assert!(app.watch.is_none());
    }

    #[test]
    fn test_startup_watch_shows_loading() {
        let mut app = FstvApp::with_config(AppConfig::default(), Some("?channel=ESPN"));
        assert!(matches!(app.watch, Some(WatchView::Waiting)));

        app.apply_watch_action(WatchAction::Back);
        assert!(app.watch.is_none());
        assert!(app.pending_watch.is_none());
    }

    #[test]
    fn test_cli_args() {
        let args = Args::parse_from(["fstv", "data.json", "--watch", "?channel=ESPN"]);
        assert_eq!(args.data_source.as_deref(), Some("data.json"));
        assert_eq!(args.watch.as_deref(), Some("?channel=ESPN"));

        let args = Args::parse_from(["fstv"]);
        assert!(args.data_source.is_none() && args.watch.is_none());
    }
}

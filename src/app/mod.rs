use eframe::egui;
use flowboard::Engine;
use flowboard::model::{EntityId, Rgba};
use flowboard::settings::{self, Settings};
use flowboard::store::EntityStore;
use flowboard::sync::Journal;

mod command_palette;
mod help;
mod render;
mod update;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum View {
    Board,
    Swimlane,
}

struct ParticipantForm {
    name: String,
    role: String,
    color: Rgba,
}

impl Default for ParticipantForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            role: String::new(),
            color: Rgba::rgb(40, 90, 200),
        }
    }
}

#[derive(Default)]
struct ConnectionForm {
    from: Option<EntityId>,
    to: Option<EntityId>,
    label: String,
    medium: String,
    duration: String,
}

struct DecisionForm {
    from: Option<EntityId>,
    question: String,
    labels: [String; 2],
    targets: [Option<EntityId>; 2],
}

impl Default for DecisionForm {
    fn default() -> Self {
        Self {
            from: None,
            question: String::new(),
            labels: ["Yes".to_string(), "No".to_string()],
            targets: [None, None],
        }
    }
}

#[derive(Default)]
struct ObjectForm {
    name: String,
    connection: Option<EntityId>,
}

pub struct FlowboardApp {
    engine: Engine<Journal>,
    view: View,
    /// Canvas bounds from the last painted frame; pointer events are
    /// measured against it.
    canvas_rect: egui::Rect,
    participant_form: ParticipantForm,
    connection_form: ConnectionForm,
    decision_form: DecisionForm,
    object_form: ObjectForm,
    snapshot_path: String,
    settings_path: String,
    status: Option<String>,
    synced: usize,
    command_palette: command_palette::CommandPalette,
    show_help: bool,
}

impl FlowboardApp {
    fn config_path() -> Option<String> {
        if let Some(home) = std::env::var_os("HOME") {
            let path = std::path::PathBuf::from(home).join(".config").join("flowboard.toml");
            if path.exists() {
                return Some(path.display().to_string());
            }
        }
        if std::path::Path::new("flowboard.toml").exists() {
            return Some("flowboard.toml".to_string());
        }
        None
    }

    fn read_settings(path: &str) -> Settings {
        if !std::path::Path::new(path).exists() {
            return Settings::default();
        }
        settings::load_settings(path).unwrap_or_else(|err| {
            log::warn!("using default settings, {path} is unusable: {err}");
            Settings::default()
        })
    }

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings_path = Self::config_path().unwrap_or_else(|| "flowboard.toml".to_string());
        let settings = Self::read_settings(&settings_path);
        log::info!("settings from {settings_path}");

        Self {
            engine: Engine::new(settings, Journal::new()),
            view: View::Board,
            canvas_rect: egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0)),
            participant_form: ParticipantForm::default(),
            connection_form: ConnectionForm::default(),
            decision_form: DecisionForm::default(),
            object_form: ObjectForm::default(),
            snapshot_path: "flowboard.json".to_string(),
            settings_path,
            status: None,
            synced: 0,
            command_palette: command_palette::CommandPalette::default(),
            show_help: false,
        }
    }

    fn save_snapshot(&mut self) {
        let result = serde_json::to_string_pretty(self.engine.store())
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&self.snapshot_path, json).map_err(|e| e.to_string()));
        self.status = Some(match result {
            Ok(()) => format!("Saved {}", self.snapshot_path),
            Err(err) => format!("Save failed: {err}"),
        });
    }

    fn load_snapshot(&mut self) {
        let result = std::fs::read_to_string(&self.snapshot_path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<EntityStore>(&s).map_err(|e| e.to_string()));
        self.status = Some(match result {
            Ok(store) => {
                self.engine.replace_store(store);
                format!("Loaded {}", self.snapshot_path)
            }
            Err(err) => format!("Load failed: {err}"),
        });
    }

    fn reload_settings(&mut self) {
        match settings::load_settings(&self.settings_path) {
            Ok(settings) => {
                self.engine.set_settings(settings);
                self.status = Some(format!("Reloaded {}", self.settings_path));
            }
            Err(err) => self.status = Some(format!("Settings not reloaded: {err}")),
        }
    }

    fn save_settings(&mut self) {
        self.status = Some(
            match settings::save_settings(&self.settings_path, self.engine.settings()) {
                Ok(()) => format!("Wrote {}", self.settings_path),
                Err(err) => format!("Settings not written: {err}"),
            },
        );
    }

    fn pump_sync(&mut self) {
        let written = self.engine.sink_mut().take();
        if !written.is_empty() {
            self.synced += written.len();
            log::debug!("{} changes handed to sync", written.len());
        }
        let failures = self.engine.drain_sync_failures();
        if let Some(err) = failures.last() {
            self.status = Some(format!("Sync failed ({}): {err}", failures.len()));
        }
    }
}

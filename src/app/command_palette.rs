use eframe::egui;
use flowboard::model::{DecisionLine, FreeLine, Placement, Point};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::{FlowboardApp, View};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CommandId {
    RadialLayout,
    ShowBoard,
    ShowSwimlane,
    AddFreeLine,
    AddDecisionLine,
    ReturnAllToStaging,
    CancelDrag,
    SaveSnapshot,
    LoadSnapshot,
    ReloadSettings,
    WriteSettings,
    Help,
}

pub(super) struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub search: &'static str,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec { id: CommandId::RadialLayout, name: "Layout: Radial", search: "radial circle layout arrange auto" },
    CommandSpec { id: CommandId::ShowBoard, name: "View: Board", search: "board canvas view" },
    CommandSpec { id: CommandId::ShowSwimlane, name: "View: Swimlanes", search: "swimlane lanes timeline chronological view" },
    CommandSpec { id: CommandId::AddFreeLine, name: "Add: Free line", search: "free line add annotation" },
    CommandSpec { id: CommandId::AddDecisionLine, name: "Add: Decision line", search: "decision line add branch annotation" },
    CommandSpec { id: CommandId::ReturnAllToStaging, name: "Board: Return everyone to staging", search: "staging clear board reset unplace" },
    CommandSpec { id: CommandId::CancelDrag, name: "Edit: Cancel drag", search: "cancel drag escape abort" },
    CommandSpec { id: CommandId::SaveSnapshot, name: "File: Save snapshot", search: "save file json snapshot" },
    CommandSpec { id: CommandId::LoadSnapshot, name: "File: Load snapshot", search: "load open file json snapshot" },
    CommandSpec { id: CommandId::ReloadSettings, name: "Settings: Reload", search: "settings reload config toml" },
    CommandSpec { id: CommandId::WriteSettings, name: "Settings: Write current", search: "settings save write config toml" },
    CommandSpec { id: CommandId::Help, name: "Help: Shortcuts", search: "help shortcuts keys" },
];

#[derive(Default)]
pub(super) struct CommandPalette {
    pub open: bool,
    pub query: String,
    pub selected: usize,
    request_focus: bool,
}

#[derive(Clone, Copy)]
pub(super) struct CommandContext {
    pub placed: usize,
    pub dragging: bool,
    pub view: View,
}

impl CommandPalette {
    pub fn open(&mut self, query: impl Into<String>) {
        self.open = true;
        self.query = query.into();
        self.selected = 0;
        self.request_focus = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.selected = 0;
        self.request_focus = false;
    }

    fn is_enabled(cx: CommandContext, id: CommandId) -> bool {
        match id {
            CommandId::RadialLayout | CommandId::ReturnAllToStaging => cx.placed > 0,
            CommandId::CancelDrag => cx.dragging,
            CommandId::ShowBoard => cx.view != View::Board,
            CommandId::ShowSwimlane => cx.view != View::Swimlane,
            _ => true,
        }
    }

    pub(super) fn execute(app: &mut FlowboardApp, ctx: &egui::Context, id: CommandId) {
        match id {
            CommandId::RadialLayout => {
                let slots = app.engine.apply_radial_layout();
                app.status = Some(format!("Arranged {} participants", slots.len()));
            }
            CommandId::ShowBoard => app.view = View::Board,
            CommandId::ShowSwimlane => app.view = View::Swimlane,
            CommandId::AddFreeLine => {
                app.engine
                    .add_free_line(FreeLine::new(Point::new(40.0, 30.0), Point::new(60.0, 30.0)));
            }
            CommandId::AddDecisionLine => {
                app.engine.add_decision_line(DecisionLine::new(
                    Point::new(30.0, 50.0),
                    Point::new(45.0, 50.0),
                    [Point::new(60.0, 40.0), Point::new(60.0, 60.0)],
                ));
            }
            CommandId::ReturnAllToStaging => {
                let placed: Vec<String> = app
                    .engine
                    .store()
                    .participants
                    .iter()
                    .filter(|p| p.is_placed())
                    .map(|p| p.id.clone())
                    .collect();
                for id in placed {
                    if let Err(err) = app.engine.update_participant_position(&id, Placement::Staging) {
                        log::debug!("could not unplace {id}: {err}");
                    }
                }
            }
            CommandId::CancelDrag => app.cancel_drag(ctx),
            CommandId::SaveSnapshot => app.save_snapshot(),
            CommandId::LoadSnapshot => app.load_snapshot(),
            CommandId::ReloadSettings => app.reload_settings(),
            CommandId::WriteSettings => app.save_settings(),
            CommandId::Help => app.show_help = true,
        }
        ctx.request_repaint();
    }

    fn filtered(&self) -> Vec<(&'static CommandSpec, i64)> {
        let matcher = SkimMatcherV2::default();
        let q = self.query.trim();
        if q.is_empty() {
            return COMMANDS.iter().map(|c| (c, 0)).collect();
        }
        let mut out = Vec::new();
        for c in COMMANDS {
            if let Some(score) = matcher.fuzzy_match(c.search, q) {
                out.push((c, score));
            }
        }
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(b.0.name)));
        out
    }

    pub fn ui(&mut self, ctx: &egui::Context, cx: CommandContext) -> Option<CommandId> {
        if !self.open {
            return None;
        }
        let matches = self.filtered();
        if self.selected >= matches.len() {
            self.selected = matches.len().saturating_sub(1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.close();
            return None;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowDown)) && !matches.is_empty() {
            self.selected = (self.selected + 1).min(matches.len() - 1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowUp)) && !matches.is_empty() {
            self.selected = self.selected.saturating_sub(1);
        }
        let mut run_selected = ctx.input(|i| i.key_pressed(egui::Key::Enter));

        let screen = ctx.content_rect();
        let width = 480.0;
        let height = 280.0;
        let pos = egui::pos2(screen.center().x - width * 0.5, screen.top() + 48.0);
        egui::Area::new(egui::Id::new("command_palette"))
            .fixed_pos(pos)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let frame = egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(20, 20, 20, 240))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(90, 160, 255)))
                    .inner_margin(10.0)
                    .corner_radius(egui::CornerRadius::same(8));
                frame.show(ui, |ui| {
                    ui.set_min_size(egui::vec2(width, height));
                    let resp = ui.add(
                        egui::TextEdit::singleline(&mut self.query)
                            .desired_width(f32::INFINITY)
                            .hint_text("Search commands"),
                    );
                    if self.request_focus {
                        resp.request_focus();
                        self.request_focus = false;
                    }
                    ui.separator();
                    egui::ScrollArea::vertical().max_height(height - 64.0).show(ui, |ui| {
                        for (idx, (spec, _score)) in matches.iter().enumerate() {
                            let enabled = CommandPalette::is_enabled(cx, spec.id);
                            let resp = ui.add_enabled(
                                enabled,
                                egui::Button::new(spec.name).selected(idx == self.selected),
                            );
                            if resp.clicked() {
                                self.selected = idx;
                                run_selected = true;
                            }
                        }
                    });
                });
            });

        if run_selected {
            if let Some((spec, _)) = matches.get(self.selected) {
                if CommandPalette::is_enabled(cx, spec.id) {
                    let cmd = spec.id;
                    self.close();
                    return Some(cmd);
                }
            }
        }
        None
    }
}

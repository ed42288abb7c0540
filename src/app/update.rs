use eframe::egui;
use flowboard::drag::{DragTarget, PointerEvent};
use flowboard::model::{
    Connection, DecisionNode, DecisionOption, EntityId, Participant, Placement, Point,
    ProcessObject,
};
use flowboard::store::EntityStore;

use super::command_palette::{CommandContext, CommandPalette};
use super::help::draw_help_window;
use super::render::{draw_background, draw_board, draw_swimlane};
use super::{FlowboardApp, View};

fn participant_name(store: &EntityStore, id: Option<&str>, none: &str) -> String {
    id.and_then(|id| store.participants.get(id))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| none.to_string())
}

fn participant_combo(
    ui: &mut egui::Ui,
    salt: &str,
    store: &EntityStore,
    value: &mut Option<EntityId>,
    none: &str,
) {
    egui::ComboBox::from_id_salt(salt)
        .selected_text(participant_name(store, value.as_deref(), none))
        .show_ui(ui, |ui| {
            ui.selectable_value(value, None, none);
            for p in store.participants.iter() {
                ui.selectable_value(value, Some(p.id.clone()), &p.name);
            }
        });
}

impl FlowboardApp {
    pub(super) fn cancel_drag(&mut self, ctx: &egui::Context) {
        if self.engine.drag_state().is_idle() {
            return;
        }
        let pos = ctx
            .input(|i| i.pointer.latest_pos())
            .unwrap_or(self.canvas_rect.center());
        self.engine.pointer(&PointerEvent::cancel(pos, self.canvas_rect));
        self.status = Some("Drag cancelled".to_string());
    }

    fn pump_drag(&mut self, ctx: &egui::Context) {
        if self.engine.drag_state().is_idle() {
            return;
        }
        let (pos, moved, released) = ctx.input(|i| {
            (
                i.pointer.latest_pos(),
                i.pointer.delta() != egui::Vec2::ZERO,
                i.pointer.any_released(),
            )
        });
        let Some(pos) = pos else {
            return;
        };
        if released {
            self.engine.pointer(&PointerEvent::up(pos, self.canvas_rect));
        } else if moved {
            self.engine.pointer(&PointerEvent::moved(pos, self.canvas_rect));
        }
    }

    fn delete_target(&mut self, target: DragTarget) {
        let result = match target {
            DragTarget::Participant { id } => self.engine.remove_participant(&id),
            DragTarget::FreeLine { id, .. } => self.engine.remove_free_line(&id),
            DragTarget::DecisionLine { id, .. } => self.engine.remove_decision_line(&id),
            DragTarget::DecisionNode { id } => self.engine.remove_decision_node(&id),
            DragTarget::ProcessObject { id } => self.engine.remove_process_object(&id),
            DragTarget::Edge { key } => {
                let ids: Vec<EntityId> = self
                    .engine
                    .store()
                    .group(&key)
                    .map(|g| g.cards.iter().map(|c| c.id.clone()).collect())
                    .unwrap_or_default();
                ids.iter()
                    .try_for_each(|id| self.engine.remove_connection(id))
            }
            DragTarget::OpenEnd { from } => {
                let ids: Vec<EntityId> = self
                    .engine
                    .store()
                    .connections
                    .iter()
                    .filter(|c| c.from == from && c.is_open())
                    .map(|c| c.id.clone())
                    .collect();
                ids.iter()
                    .try_for_each(|id| self.engine.remove_connection(id))
            }
        };
        if let Err(err) = result {
            self.status = Some(format!("Delete failed: {err}"));
        }
    }

    fn staging_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Participants");
        ui.horizontal(|ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut self.participant_form.name);
        });
        ui.horizontal(|ui| {
            ui.label("Role");
            ui.text_edit_singleline(&mut self.participant_form.role);
        });
        ui.horizontal(|ui| {
            ui.label("Color");
            let mut c = self.participant_form.color.to_color32();
            if ui.color_edit_button_srgba(&mut c).changed() {
                self.participant_form.color = flowboard::model::Rgba::from_color32(c);
            }
        });
        let name = self.participant_form.name.trim().to_string();
        if ui
            .add_enabled(!name.is_empty(), egui::Button::new("Add to staging"))
            .clicked()
        {
            let mut p = Participant::new(name);
            p.role = self.participant_form.role.trim().to_string();
            p.color = self.participant_form.color;
            self.engine.add_participant(p);
            self.participant_form.name.clear();
            self.participant_form.role.clear();
        }

        ui.separator();
        ui.label("Staging (drag onto the board)");
        let staged: Vec<(EntityId, String)> = self
            .engine
            .store()
            .participants
            .iter()
            .filter(|p| !p.is_placed())
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect();
        if staged.is_empty() {
            ui.small("Nobody waiting");
        }
        for (id, name) in staged {
            let resp = ui.add(
                egui::Button::new(format!("⠿ {name}")).sense(egui::Sense::click_and_drag()),
            );
            if resp.drag_started() {
                if let Some(pos) = resp.interact_pointer_pos() {
                    self.engine.pointer(&PointerEvent::down(
                        DragTarget::Participant { id },
                        pos,
                        self.canvas_rect,
                    ));
                }
            }
        }

        ui.separator();
        ui.heading("Process step");
        let store = self.engine.store().clone();
        ui.horizontal(|ui| {
            ui.label("From");
            participant_combo(ui, "step_from", &store, &mut self.connection_form.from, "—");
        });
        ui.horizontal(|ui| {
            ui.label("To");
            participant_combo(ui, "step_to", &store, &mut self.connection_form.to, "(open)");
        });
        ui.horizontal(|ui| {
            ui.label("Label");
            ui.text_edit_singleline(&mut self.connection_form.label);
        });
        ui.horizontal(|ui| {
            ui.label("Medium");
            ui.text_edit_singleline(&mut self.connection_form.medium);
        });
        ui.horizontal(|ui| {
            ui.label("Duration");
            ui.text_edit_singleline(&mut self.connection_form.duration);
        });
        if ui
            .add_enabled(self.connection_form.from.is_some(), egui::Button::new("Add step"))
            .clicked()
        {
            if let Some(from) = self.connection_form.from.clone() {
                let form = &mut self.connection_form;
                let mut c = Connection::new(from, form.to.clone(), form.label.trim());
                let optional = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());
                c.medium = optional(&form.medium);
                c.duration = optional(&form.duration);
                form.label.clear();
                self.engine.add_connection(c);
            }
        }

        ui.separator();
        ui.heading("Decision");
        ui.horizontal(|ui| {
            ui.label("Decider");
            participant_combo(ui, "decision_from", &store, &mut self.decision_form.from, "—");
        });
        ui.horizontal(|ui| {
            ui.label("Question");
            ui.text_edit_singleline(&mut self.decision_form.question);
        });
        for i in 0..2 {
            ui.horizontal(|ui| {
                ui.add(egui::TextEdit::singleline(&mut self.decision_form.labels[i]).desired_width(60.0));
                ui.label("→");
                participant_combo(
                    ui,
                    &format!("decision_target_{i}"),
                    &store,
                    &mut self.decision_form.targets[i],
                    "—",
                );
            });
        }
        if ui
            .add_enabled(self.decision_form.from.is_some(), egui::Button::new("Add decision"))
            .clicked()
        {
            if let Some(from) = self.decision_form.from.clone() {
                let form = &mut self.decision_form;
                let mut node = DecisionNode::new(from.clone(), form.question.trim(), Point::new(50.0, 50.0));
                node.docked_to = Some(from);
                node.options = (0..2)
                    .map(|i| DecisionOption::new(form.labels[i].trim(), form.targets[i].clone()))
                    .collect();
                form.question.clear();
                self.engine.add_decision_node(node);
            }
        }

        ui.separator();
        ui.heading("Process object");
        ui.horizontal(|ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut self.object_form.name);
        });
        let selected_label = self
            .object_form
            .connection
            .as_deref()
            .and_then(|id| store.connections.get(id))
            .map(|c| c.label.clone())
            .unwrap_or_else(|| "—".to_string());
        egui::ComboBox::from_id_salt("object_connection")
            .selected_text(selected_label)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.object_form.connection, None, "—");
                for c in store.connections.iter() {
                    ui.selectable_value(&mut self.object_form.connection, Some(c.id.clone()), &c.label);
                }
            });
        let name = self.object_form.name.trim().to_string();
        if ui
            .add_enabled(!name.is_empty(), egui::Button::new("Add object"))
            .clicked()
        {
            let mut object = ProcessObject::new(name);
            object.connection_id = self.object_form.connection.clone();
            object.position = Some(Point::new(50.0, 85.0));
            self.engine.add_process_object(object);
            self.object_form.name.clear();
        }
    }

    fn board(&mut self, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        self.canvas_rect = rect;

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                if let Some(target) = self.engine.pick(pos, rect) {
                    self.engine.pointer(&PointerEvent::down(target, pos, rect));
                }
            }
        }
        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                if let Some(DragTarget::Participant { id }) = self.engine.pick(pos, rect) {
                    if let Err(err) = self.engine.update_participant_position(&id, Placement::Staging) {
                        self.status = Some(format!("Could not unplace: {err}"));
                    }
                }
            }
        }
        if response.secondary_clicked() {
            if let Some(target) = response
                .interact_pointer_pos()
                .and_then(|pos| self.engine.pick(pos, rect))
            {
                self.delete_target(target);
            }
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);
        let curves = self.engine.edge_curves();
        draw_board(
            &painter,
            rect,
            self.engine.store(),
            self.engine.settings(),
            &curves,
            self.engine.drag_state(),
        );
    }

    fn swimlanes(&mut self, ui: &mut egui::Ui) {
        let layout = self.engine.swimlane();
        let settings = self.engine.settings().swimlane.clone();
        egui::ScrollArea::both().show(ui, |ui| {
            let size = egui::vec2(layout.width.max(1.0), layout.height.max(1.0));
            let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
            draw_swimlane(ui.painter(), rect.min, &layout, &settings);
        });
    }
}

impl eframe::App for FlowboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let wants_keyboard = ctx.wants_keyboard_input();
        ctx.input_mut(|i| {
            if !self.command_palette.open
                && i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::P)
            {
                self.command_palette.open("");
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                self.save_snapshot();
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::O) {
                self.load_snapshot();
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::F1) {
                self.show_help = true;
            }
            if wants_keyboard || self.command_palette.open {
                return;
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::L) {
                let slots = self.engine.apply_radial_layout();
                self.status = Some(format!("Arranged {} participants", slots.len()));
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Tab) {
                self.view = match self.view {
                    View::Board => View::Swimlane,
                    View::Swimlane => View::Board,
                };
            }
        });
        if !wants_keyboard
            && !self.command_palette.open
            && ctx.input(|i| i.key_pressed(egui::Key::Escape))
        {
            self.cancel_drag(ctx);
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    ui.label("Snapshot:");
                    ui.text_edit_singleline(&mut self.snapshot_path);
                    if ui.button("Save (⌘S)").clicked() {
                        self.save_snapshot();
                        ui.close_menu();
                    }
                    if ui.button("Load (⌘O)").clicked() {
                        self.load_snapshot();
                        ui.close_menu();
                    }
                    ui.separator();
                    ui.label("Settings:");
                    ui.text_edit_singleline(&mut self.settings_path);
                    if ui.button("Reload settings").clicked() {
                        self.reload_settings();
                        ui.close_menu();
                    }
                    if ui.button("Write settings").clicked() {
                        self.save_settings();
                        ui.close_menu();
                    }
                });
                ui.menu_button("Layout", |ui| {
                    if ui.button("Radial (⌘L)").clicked() {
                        let slots = self.engine.apply_radial_layout();
                        self.status = Some(format!("Arranged {} participants", slots.len()));
                        ui.close_menu();
                    }
                });
                ui.separator();
                ui.selectable_value(&mut self.view, View::Board, "Board");
                ui.selectable_value(&mut self.view, View::Swimlane, "Swimlanes");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("?").clicked() {
                        self.show_help = true;
                    }
                });
            });
        });

        egui::SidePanel::left("staging_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.staging_panel(ui));
            });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.status.as_deref().unwrap_or("Ready"));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let store = self.engine.store();
                    ui.label(format!("Synced: {}", self.synced));
                    ui.separator();
                    ui.label(format!("Steps: {}", store.connections.len()));
                    ui.separator();
                    ui.label(format!("Participants: {}", store.participants.len()));
                    if let Some(target) = self.engine.drag_state().target() {
                        ui.separator();
                        ui.label(format!("Dragging {target:?}"));
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.view {
            View::Board => self.board(ui),
            View::Swimlane => self.swimlanes(ui),
        });

        self.pump_drag(ctx);
        self.pump_sync();

        let cx = CommandContext {
            placed: self
                .engine
                .store()
                .participants
                .iter()
                .filter(|p| p.is_placed())
                .count(),
            dragging: !self.engine.drag_state().is_idle(),
            view: self.view,
        };
        if let Some(cmd) = self.command_palette.ui(ctx, cx) {
            CommandPalette::execute(self, ctx, cmd);
        }
        draw_help_window(ctx, &mut self.show_help);
    }
}

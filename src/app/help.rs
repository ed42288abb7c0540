use eframe::egui;

pub(super) fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Help & Commands")
        .open(open)
        .resizable(true)
        .default_width(520.0)
        .default_height(440.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Keyboard Shortcuts");
                ui.separator();
                help_row(ui, "⌘⇧P", "Open command palette");
                help_row(ui, "⌘S", "Save snapshot (JSON)");
                help_row(ui, "⌘O", "Load snapshot");
                help_row(ui, "⌘L", "Radial layout");
                help_row(ui, "Tab", "Switch board / swimlanes");
                help_row(ui, "Escape", "Cancel the current drag");
                help_row(ui, "F1", "This window");

                ui.add_space(10.0);
                ui.heading("Board");
                ui.separator();
                help_row(ui, "Drag", "Move participants, line ends, decision boxes");
                help_row(ui, "Drag edge dot", "Bend a process step");
                help_row(ui, "Drag open end", "Connect an open step to a receiver");
                help_row(ui, "Double-click", "Send a participant back to staging");
                help_row(ui, "Right-click", "Delete what is under the pointer");
                ui.label("Drop a staged participant onto the canvas to place it. Dropping it next to a loose line end docks that end.");
                ui.label("Line ends dropped close to a participant dock to it and follow it from then on.");

                ui.add_space(10.0);
                ui.heading("Settings");
                ui.separator();
                ui.label("Settings are read from ~/.config/flowboard.toml or ./flowboard.toml:");
                ui.code(r##"endpoint_snap_px = 70.0
placement_snap_fraction = 0.12
radial_radius = 35.0

[swimlane]
lane_height = 110.0
column_width = 170.0"##);
            });
        });
}

fn help_row(ui: &mut egui::Ui, shortcut: &str, description: &str) {
    ui.horizontal(|ui| {
        ui.add_sized(
            [110.0, 16.0],
            egui::Label::new(egui::RichText::new(shortcut).monospace().strong()),
        );
        ui.label(description);
    });
}

mod app;

fn main() -> eframe::Result<()> {
    env_logger::init();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Flowboard",
        native_options,
        Box::new(|cc| Ok(Box::new(app::FlowboardApp::new(cc)))),
    )
}

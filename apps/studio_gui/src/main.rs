use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::StudioApp;

/// Desktop client for the product try-on service.
#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the product/media API.
    #[arg(long, env = "TRYON_SERVER_URL", default_value = "http://localhost:5000")]
    server_url: String,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(args.server_url, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Try-On Studio")
            .with_inner_size([1100.0, 780.0])
            .with_min_inner_size([840.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Try-On Studio",
        options,
        Box::new(|_cc| Ok(Box::new(StudioApp::new(cmd_tx, ui_rx)))),
    )
}

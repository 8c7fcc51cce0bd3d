// src/main.rs
use anyhow::{Context, Result};
use eframe::egui;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gesture_reader::app::BookReaderApp;
use gesture_reader::config::{GestureConfig, ReaderSettings, SourceKind};
use gesture_reader::pdf::check_pdf_path;
use gesture_reader::video::log_available_cameras;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut settings = ReaderSettings::from_args(std::env::args().skip(1))?;

    if settings.pdf_path.is_none() {
        settings.pdf_path = rfd::FileDialog::new()
            .set_title("Select a PDF book")
            .add_filter("PDF", &["pdf"])
            .pick_file();
    }
    let pdf_path = settings.pdf_path.clone().context("No PDF file selected")?;
    check_pdf_path(&pdf_path)?;

    let config = GestureConfig::resolve(settings.config_path.as_deref())?;
    info!(
        "Gesture config: window {} frames, wave {:.2}, priming {}s, cooldown {}s",
        config.window_size, config.wave_displacement, config.priming_timeout_secs, config.cooldown_secs
    );

    if matches!(settings.source, SourceKind::Camera { .. }) {
        log_available_cameras();
    }

    let app = BookReaderApp::new(&settings, config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.width, settings.height])
            .with_min_inner_size([400.0, 300.0]),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        "PDF Book Reader",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(app)
        }),
    )
    .map_err(|e| anyhow::anyhow!("Error running application: {}", e))
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::light();

    visuals.panel_fill = egui::Color32::from_rgb(220, 220, 220);
    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.window_rounding = egui::Rounding::same(12.0);

    visuals
}

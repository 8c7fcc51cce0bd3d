// src/app.rs
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use eframe::egui;
use tracing::{info, warn};

use crate::capture::{CaptureHandle, CaptureStatus};
use crate::config::{GestureConfig, ReaderSettings};
use crate::data::{GestureTraceExporter, LandmarkRecorder};
use crate::gate::PageTurnCommand;
use crate::navigator::PageNavigator;
use crate::pdf::{PageRenderer, PdfDocument};
use crate::pipeline::GesturePipeline;
use crate::source::{open_source, CapturedFrame};
use crate::ui::{self, BookLayout, PageTexture, Theme};

pub struct BookReaderApp {
    // Core components
    pipeline: GesturePipeline,
    navigator: PageNavigator,
    renderer: PageRenderer,
    pdf_path: PathBuf,
    capture: CaptureHandle,
    trace: Option<GestureTraceExporter>,

    // Textures for the pages currently on screen
    page_textures: HashMap<usize, PageTexture>,
    page_errors: HashMap<usize, String>,
    pending_pages: HashSet<usize>,
    webcam: Option<PageTexture>,

    // UI state
    show_webcam: bool,
    hand_confidence: Option<f64>,
    theme: Theme,
}

impl BookReaderApp {
    /// Opens the document and starts capturing. Everything that can fail
    /// happens here, before the window exists.
    pub fn new(settings: &ReaderSettings, config: GestureConfig) -> Result<Self> {
        let pdf_path = settings
            .pdf_path
            .as_ref()
            .context("No PDF file selected")?;
        let document = PdfDocument::open(pdf_path, settings.render_dpi, settings.page_cache_size)?;
        let navigator = PageNavigator::new(document.page_count());
        let pdf_path = document.path().to_path_buf();
        let renderer = PageRenderer::for_document(document)?;
        let pipeline = GesturePipeline::new(config).context("Invalid gesture configuration")?;

        let trace = settings
            .trace_path
            .as_ref()
            .map(GestureTraceExporter::for_path)
            .transpose()?;
        let recorder = settings
            .record_path
            .as_ref()
            .map(LandmarkRecorder::create)
            .transpose()?;

        let source = settings.source.clone();
        let capture = CaptureHandle::spawn(move || open_source(&source), recorder);

        Ok(Self {
            pipeline,
            navigator,
            renderer,
            pdf_path,
            capture,
            trace,
            page_textures: HashMap::new(),
            page_errors: HashMap::new(),
            pending_pages: HashSet::new(),
            webcam: None,
            show_webcam: settings.show_webcam,
            hand_confidence: None,
            theme: Theme::default(),
        })
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (escape, space, right, left) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::ArrowLeft),
            )
        });
        if escape {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if space {
            self.show_webcam = !self.show_webcam;
            info!("Webcam view {}", if self.show_webcam { "shown" } else { "hidden" });
        }
        // Keyboard turns bypass the gesture gate.
        if right {
            self.turn_page(PageTurnCommand::Next);
        }
        if left {
            self.turn_page(PageTurnCommand::Previous);
        }
    }

    fn turn_page(&mut self, command: PageTurnCommand) {
        if self.navigator.apply(command) {
            info!(
                "{}: now at page {} of {}",
                command.as_str(),
                self.navigator.current() + 1,
                self.navigator.page_count()
            );
        }
    }

    /// One pipeline tick per captured frame.
    fn process_frame(&mut self, ctx: &egui::Context, frame: CapturedFrame) {
        let outcome = self.pipeline.tick(&frame.landmarks);
        self.hand_confidence = frame.landmarks.hand.as_ref().map(|h| h.confidence);

        let trace_error = self
            .trace
            .as_mut()
            .and_then(|t| t.add_tick(&outcome, self.pipeline.state()).err());
        if let Some(e) = trace_error {
            warn!("Gesture trace stopped: {:#}", e);
            self.trace = None;
        }

        if let Some(command) = outcome.command {
            self.turn_page(command);
        }

        if self.show_webcam {
            if let Some(preview) = frame.preview {
                match self.webcam.as_mut() {
                    Some(texture) => texture.update(&preview),
                    None => self.webcam = Some(PageTexture::upload(ctx, "webcam", &preview)),
                }
            }
        }
    }

    /// Picks up finished renders and asks for any visible page still missing.
    fn load_spread_textures(&mut self, ctx: &egui::Context) {
        let spread = self.navigator.spread();
        let visible: Vec<usize> = [spread.left, spread.right].into_iter().flatten().collect();
        self.page_textures.retain(|index, _| visible.contains(index));

        for (index, rendered) in self.renderer.poll() {
            self.pending_pages.remove(&index);
            match rendered {
                // Pages turned away from while rendering stay in the worker's cache.
                Ok(_) if !visible.contains(&index) => {}
                Ok(image) => {
                    let texture = PageTexture::upload(ctx, &format!("page_{}", index), &image);
                    self.page_textures.insert(index, texture);
                }
                Err(e) => {
                    warn!("Failed to render page {}: {:#}", index + 1, e);
                    self.page_errors.insert(index, format!("Page {} unavailable", index + 1));
                }
            }
        }

        for index in visible {
            if self.page_textures.contains_key(&index)
                || self.page_errors.contains_key(&index)
                || self.pending_pages.contains(&index)
            {
                continue;
            }
            match self.renderer.request(index) {
                Ok(()) => {
                    self.pending_pages.insert(index);
                }
                Err(e) => {
                    warn!("Cannot render page {}: {:#}", index + 1, e);
                    self.page_errors.insert(index, format!("Page {} unavailable", index + 1));
                }
            }
        }
    }

    fn source_status(&self) -> String {
        let shared = self.capture.shared();
        match shared.status() {
            CaptureStatus::Starting => "Starting input...".to_string(),
            CaptureStatus::Running(name) => match shared.metrics() {
                Some(m) => format!(
                    "Input: {} ({:.0} fps, hand {:.0}% of frames)",
                    name,
                    m.avg_fps,
                    m.hand_visible_ratio * 100.0
                ),
                None => format!("Input: {}", name),
            },
            CaptureStatus::Finished => "Input finished".to_string(),
            CaptureStatus::Failed(e) => format!("Input failed: {}", e),
        }
    }

    fn render(&self, ui: &mut egui::Ui) {
        let screen = ui.max_rect();
        let layout = BookLayout::new(screen);
        let painter = ui.painter();

        ui::draw_book_background(painter, screen, &layout, &self.theme);

        let spread = self.navigator.spread();
        for (index, slot) in [(spread.left, layout.left_page), (spread.right, layout.right_page)] {
            let Some(index) = index else { continue };
            match self.page_textures.get(&index) {
                Some(texture) => ui::draw_page(painter, slot, texture, &self.theme),
                None => {
                    let message = self
                        .page_errors
                        .get(&index)
                        .map(String::as_str)
                        .unwrap_or("Loading...");
                    ui::draw_page_placeholder(painter, slot, message, &self.theme);
                }
            }
        }
        if self.navigator.page_count() == 0 {
            ui::draw_page_placeholder(painter, layout.right_page, "Empty document", &self.theme);
        }

        ui::draw_page_numbers(painter, &layout, spread.page_numbers(), &self.theme);
        ui::draw_instructions(painter, screen, &self.theme);
        if self.show_webcam {
            ui::draw_webcam(painter, screen, self.webcam.as_ref(), &self.theme);
        }
        ui::draw_gesture_overlay(
            painter,
            screen,
            &self.pipeline.snapshot(),
            &self.source_status(),
            self.hand_confidence,
            &self.theme,
        );
    }
}

impl eframe::App for BookReaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        if let Some(frame) = self.capture.take_latest() {
            self.process_frame(ctx, frame);
        }
        self.load_spread_textures(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.render(ui));

        // ~30 fps, the capture rate
        ctx.request_repaint_after(Duration::from_millis(33));
    }
}

impl Drop for BookReaderApp {
    fn drop(&mut self) {
        self.capture.stop();
        if let Some(trace) = self.trace.take() {
            if let Err(e) = trace.finish() {
                warn!("Failed to finish gesture trace: {:#}", e);
            }
        }
        info!("Closed {}", self.pdf_path.display());
    }
}

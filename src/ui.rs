// src/ui.rs - Book spread drawing, webcam preview and gesture overlay
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use image::DynamicImage;

use crate::classifier::GestureKind;
use crate::gate::GateState;
use crate::pipeline::GestureSnapshot;

#[derive(Debug, Clone)]
pub struct Theme {
    pub desk: Color32,
    pub shadow: Color32,
    pub paper: Color32,
    pub ink: Color32,
    pub primed: Color32,
    pub cooldown: Color32,
    pub idle: Color32,
    pub error: Color32,
    pub overlay_bg: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            desk: Color32::from_rgb(220, 220, 220),
            shadow: Color32::from_rgb(128, 128, 128),
            paper: Color32::WHITE,
            ink: Color32::BLACK,
            primed: Color32::from_rgb(76, 175, 80),
            cooldown: Color32::from_rgb(255, 152, 0),
            idle: Color32::from_rgb(70, 130, 240),
            error: Color32::from_rgb(244, 67, 54),
            overlay_bg: Color32::from_rgba_unmultiplied(20, 20, 25, 200),
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

/// Geometry of the open book inside the window.
#[derive(Debug, Clone, Copy)]
pub struct BookLayout {
    pub book: Rect,
    pub left_page: Rect,
    pub right_page: Rect,
}

impl BookLayout {
    const BOOK_MARGIN: f32 = 50.0;
    const PAGE_MARGIN: f32 = 20.0;

    pub fn new(screen: Rect) -> Self {
        let book = screen.shrink(Self::BOOK_MARGIN);
        let page_width = ((book.width() - 3.0 * Self::PAGE_MARGIN) / 2.0).max(1.0);
        let page_height = (book.height() - 2.0 * Self::PAGE_MARGIN).max(1.0);
        let top = book.top() + Self::PAGE_MARGIN;

        let left_page = Rect::from_min_size(
            Pos2::new(book.left() + Self::PAGE_MARGIN, top),
            Vec2::new(page_width, page_height),
        );
        let right_page = Rect::from_min_size(
            Pos2::new(book.center().x + Self::PAGE_MARGIN, top),
            Vec2::new(page_width, page_height),
        );
        Self { book, left_page, right_page }
    }
}

pub fn draw_book_background(painter: &egui::Painter, screen: Rect, layout: &BookLayout, theme: &Theme) {
    painter.rect_filled(screen, egui::Rounding::ZERO, theme.desk);
    painter.rect_filled(
        layout.book.translate(Vec2::splat(5.0)),
        egui::Rounding::ZERO,
        theme.shadow,
    );
    painter.rect_filled(layout.book, egui::Rounding::ZERO, theme.paper);
    painter.rect_stroke(layout.book, egui::Rounding::ZERO, Stroke::new(2.0, theme.ink));

    let spine = layout.book.center().x;
    painter.line_segment(
        [Pos2::new(spine, layout.book.top()), Pos2::new(spine, layout.book.bottom())],
        Stroke::new(2.0, theme.ink),
    );
}

/// Draws a page image scaled to fit its slot, keeping the aspect ratio.
pub fn draw_page(painter: &egui::Painter, slot: Rect, page: &PageTexture, theme: &Theme) {
    painter.rect_filled(slot, egui::Rounding::ZERO, theme.paper);
    painter.rect_stroke(slot, egui::Rounding::ZERO, Stroke::new(1.0, theme.ink));

    let [w, h] = page.size;
    let scale = (slot.width() / w as f32).min(slot.height() / h as f32);
    let fitted = Rect::from_center_size(slot.center(), Vec2::new(w as f32 * scale, h as f32 * scale));
    painter.image(
        page.texture.id(),
        fitted,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );
}

pub fn draw_page_placeholder(painter: &egui::Painter, slot: Rect, message: &str, theme: &Theme) {
    painter.rect_stroke(slot, egui::Rounding::ZERO, Stroke::new(1.0, theme.shadow));
    painter.text(
        slot.center(),
        egui::Align2::CENTER_CENTER,
        message,
        egui::FontId::proportional(16.0),
        theme.shadow,
    );
}

pub fn draw_page_numbers(
    painter: &egui::Painter,
    layout: &BookLayout,
    numbers: (Option<usize>, Option<usize>),
    theme: &Theme,
) {
    let y = layout.book.bottom() - 30.0;
    for (number, slot) in [(numbers.0, layout.left_page), (numbers.1, layout.right_page)] {
        if let Some(number) = number {
            painter.text(
                Pos2::new(slot.center().x, y),
                egui::Align2::CENTER_TOP,
                number.to_string(),
                egui::FontId::proportional(18.0),
                theme.ink,
            );
        }
    }
}

pub fn draw_instructions(painter: &egui::Painter, screen: Rect, theme: &Theme) {
    let lines = [
        "Touch your finger to your mouth, then wave left or right to turn pages",
        "Press SPACE to toggle webcam view, arrow keys to turn pages",
        "Press ESC to exit",
    ];
    for (i, line) in lines.iter().enumerate() {
        painter.text(
            screen.left_top() + Vec2::new(10.0, 10.0 + i as f32 * 16.0),
            egui::Align2::LEFT_TOP,
            *line,
            egui::FontId::proportional(13.0),
            theme.ink,
        );
    }
}

/// Webcam preview in the top-right corner.
pub fn draw_webcam(painter: &egui::Painter, screen: Rect, preview: Option<&PageTexture>, theme: &Theme) {
    let size = Vec2::new(200.0, 150.0);
    let rect = Rect::from_min_size(
        Pos2::new(screen.right() - size.x - 10.0, screen.top() + 10.0),
        size,
    );
    match preview {
        Some(frame) => {
            painter.image(
                frame.texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        None => {
            painter.rect_filled(rect, egui::Rounding::same(4.0), Color32::from_rgb(50, 50, 55));
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No Video Signal",
                egui::FontId::proportional(14.0),
                Color32::from_rgb(150, 150, 155),
            );
        }
    }
    painter.rect_stroke(rect, egui::Rounding::ZERO, Stroke::new(2.0, theme.ink));
}

fn state_color(state: &GateState, theme: &Theme) -> Color32 {
    match state {
        GateState::Idle => theme.idle,
        GateState::Primed { .. } => theme.primed,
        GateState::CoolingDown { .. } | GateState::PrimedCoolingDown { .. } => theme.cooldown,
    }
}

/// Status box in the bottom-left corner: what the gate waits for next.
pub fn draw_gesture_overlay(
    painter: &egui::Painter,
    screen: Rect,
    snapshot: &GestureSnapshot,
    source_status: &str,
    hand_confidence: Option<f64>,
    theme: &Theme,
) {
    let rect = Rect::from_min_size(
        Pos2::new(screen.left() + 10.0, screen.bottom() - 120.0),
        Vec2::new(360.0, 110.0),
    );
    painter.rect_filled(rect, egui::Rounding::same(8.0), theme.overlay_bg);

    let color = state_color(&snapshot.state, theme);
    let headline = match (snapshot.primed_remaining, snapshot.cooldown_remaining) {
        (_, Some(cooldown)) => format!("COOLDOWN {:.1}s", cooldown),
        (Some(primed), None) => format!("Ready for {:.0}s - wave to turn the page", primed.ceil()),
        (None, None) => "Touch finger to mouth to enable page turn".to_string(),
    };

    let mut y = rect.top() + 10.0;
    let mut line = |text: String, size: f32, color: Color32| {
        painter.text(
            Pos2::new(rect.left() + 12.0, y),
            egui::Align2::LEFT_TOP,
            text,
            egui::FontId::proportional(size),
            color,
        );
        y += size + 6.0;
    };
    line(headline, 18.0, color);
    line(
        format!(
            "Gate: {}   Last: {}",
            snapshot.state.label(),
            if snapshot.last_event.kind == GestureKind::None {
                "-"
            } else {
                snapshot.last_event.kind.as_str()
            }
        ),
        13.0,
        theme.text_secondary,
    );
    line(
        format!(
            "Window {}/{}   Mouth hold {}",
            snapshot.window_len, snapshot.window_capacity, snapshot.mouth_hold
        ),
        13.0,
        theme.text_secondary,
    );
    line(source_status.to_string(), 13.0, theme.text_secondary);

    let bar = Rect::from_min_size(Pos2::new(rect.left() + 12.0, rect.bottom() - 18.0), Vec2::new(200.0, 10.0));
    draw_confidence_bar(painter, bar, hand_confidence.unwrap_or(0.0) as f32, theme);
}

pub fn draw_confidence_bar(painter: &egui::Painter, rect: Rect, value: f32, theme: &Theme) {
    let value = value.clamp(0.0, 1.0);
    painter.rect_filled(rect, egui::Rounding::same(4.0), Color32::from_rgb(50, 50, 55));

    let fill = Rect::from_min_size(rect.min, Vec2::new(rect.width() * value, rect.height()));
    let color = if value > 0.7 {
        theme.primed
    } else if value > 0.4 {
        theme.cooldown
    } else {
        theme.error
    };
    painter.rect_filled(fill, egui::Rounding::same(4.0), color);
    painter.text(
        Pos2::new(rect.right() + 8.0, rect.center().y),
        egui::Align2::LEFT_CENTER,
        format!("hand {:.0}%", value * 100.0),
        egui::FontId::proportional(11.0),
        theme.text_secondary,
    );
}

/// GPU texture for a page or camera frame.
pub struct PageTexture {
    texture: egui::TextureHandle,
    size: [usize; 2],
}

impl PageTexture {
    pub fn upload(ctx: &egui::Context, name: &str, image: &DynamicImage) -> Self {
        let size = [image.width() as usize, image.height() as usize];
        let rgba = image.to_rgba8();
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        Self {
            texture: ctx.load_texture(name, color_image, Default::default()),
            size,
        }
    }

    /// Replace the pixels in place, reusing the texture slot.
    pub fn update(&mut self, image: &DynamicImage) {
        let size = [image.width() as usize, image.height() as usize];
        let rgba = image.to_rgba8();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice());
        self.texture.set(color_image, Default::default());
        self.size = size;
    }
}

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::warn;

use crate::refresh::summary::{SummaryInput, SummaryRenderer};

pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;

/// DejaVu Sans, shipped with the crate (see `assets/fonts/LICENSE-DejaVu`).
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const RULE: Rgb<u8> = Rgb([210, 210, 210]);

/// Draws the summary onto a fixed 800x600 PNG canvas.
///
/// Configured fonts that cannot be loaded are replaced by the bundled face,
/// so the text content is always present.
pub struct PngSummaryRenderer {
    regular: FontArc,
    bold: FontArc,
}

impl PngSummaryRenderer {
    pub fn from_paths(regular: &Path, bold: &Path) -> Result<Self> {
        let fallback = bundled_font()?;
        let regular = load_font(regular).unwrap_or_else(|| fallback.clone());
        let bold = load_font(bold).unwrap_or_else(|| regular.clone());
        Ok(Self { regular, bold })
    }

    /// Bundled face for every line.
    pub fn bundled() -> Result<Self> {
        let font = bundled_font()?;
        Ok(Self {
            regular: font.clone(),
            bold: font,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn text(&self, img: &mut RgbImage, bold: bool, color: Rgb<u8>, x: i32, y: i32, px: f32, s: &str) {
        let font = if bold { &self.bold } else { &self.regular };
        draw_text_mut(img, color, x, y, PxScale::from(px), font, s);
    }
}

fn bundled_font() -> Result<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT).context("parsing bundled summary font")
}

fn load_font(path: &Path) -> Option<FontArc> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "font not readable; using bundled font");
            return None;
        }
    };
    match FontArc::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid font file; using bundled font");
            None
        }
    }
}

impl SummaryRenderer for PngSummaryRenderer {
    fn render(&self, input: &SummaryInput) -> Result<Vec<u8>> {
        let text = input.text();
        let mut img = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, WHITE);

        self.text(&mut img, true, BLACK, 50, 30, 32.0, &text.title);
        draw_filled_rect_mut(&mut img, Rect::at(50, 80).of_size(700, 2), RULE);
        self.text(&mut img, false, BLACK, 50, 100, 24.0, &text.total);
        self.text(&mut img, false, BLACK, 50, 150, 24.0, &text.heading);

        let mut y = 200;
        for line in &text.ranked {
            draw_filled_rect_mut(&mut img, Rect::at(55, y + 6).of_size(6, 6), GRAY);
            self.text(&mut img, false, BLACK, 70, y, 18.0, line);
            y += 40;
        }

        draw_filled_rect_mut(&mut img, Rect::at(50, 505).of_size(700, 1), RULE);
        self.text(&mut img, false, GRAY, 50, 520, 18.0, &text.refreshed);

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("encoding summary png")?;
        Ok(bytes)
    }
}

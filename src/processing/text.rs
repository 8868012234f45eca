//! Caption and title rasterisation onto RGBA canvases.

use ab_glyph::{Font, FontArc, FontVec, PxScale, ScaleFont, point};
use fontdb::{Database, Family, Query, Style, Weight};
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

const ELLIPSIS: char = '\u{2026}';

/// Fonts used when compositing pages. Either slot may be missing on hosts
/// without system fonts, in which case text is skipped.
#[derive(Clone, Default)]
pub struct Typefaces {
    italic: Option<FontArc>,
    title: Option<FontArc>,
}

impl std::fmt::Debug for Typefaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typefaces")
            .field("italic", &self.italic.is_some())
            .field("title", &self.title.is_some())
            .finish()
    }
}

impl Typefaces {
    /// No fonts; every text call becomes a no-op.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn load_system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();

        let italic = query_first(
            &db,
            &[
                Family::Name("EB Garamond"),
                Family::Name("DejaVu Serif"),
                Family::Serif,
                Family::SansSerif,
            ],
            Style::Italic,
            Weight::NORMAL,
        );
        let title = query_first(
            &db,
            &[
                Family::Name("Playfair Display"),
                Family::Name("DejaVu Serif"),
                Family::Serif,
                Family::SansSerif,
            ],
            Style::Normal,
            Weight::BOLD,
        );
        if italic.is_none() && title.is_none() {
            warn!("no system fonts found; captions and titles will be omitted");
        }
        // Fall back to whichever face resolved so both roles can render.
        Self {
            italic: italic.clone().or_else(|| title.clone()),
            title: title.or(italic),
        }
    }

    pub fn caption(&self) -> Option<&FontArc> {
        self.italic.as_ref()
    }

    pub fn title(&self) -> Option<&FontArc> {
        self.title.as_ref()
    }
}

fn query_first(
    db: &Database,
    families: &[Family<'_>],
    style: Style,
    weight: Weight,
) -> Option<FontArc> {
    for family in families {
        let Some(id) = db.query(&Query {
            families: std::slice::from_ref(family),
            style,
            weight,
            ..Default::default()
        }) else {
            continue;
        };
        let loaded = db
            .with_face_data(id, |data, index| {
                FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
            })
            .flatten();
        if let Some(font) = loaded {
            debug!(?family, ?style, "resolved typeface");
            return Some(FontArc::new(font));
        }
    }
    None
}

pub fn measure_text(text: &str, font: &FontArc, scale: PxScale) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut previous = None;
    for ch in text.chars().filter(|c| !c.is_control()) {
        let glyph = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled.kern(prev, glyph);
        }
        width += scaled.h_advance(glyph);
        previous = Some(glyph);
    }
    width
}

/// Shorten `text` to fit `max_width`, ending in an ellipsis when cut.
pub fn truncate_to_width(text: &str, font: &FontArc, scale: PxScale, max_width: f32) -> String {
    let text = text.trim();
    if measure_text(text, font, scale) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars
            .iter()
            .collect::<String>()
            .trim_end()
            .chars()
            .chain(std::iter::once(ELLIPSIS))
            .collect();
        if measure_text(&candidate, font, scale) <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// Draw a single line with its baseline at `baseline`, alpha-blended.
pub fn draw_text(
    canvas: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    scale: PxScale,
    left: f32,
    baseline: f32,
    colour: Rgba<u8>,
) {
    let scaled = font.as_scaled(scale);
    let mut cursor_x = left;
    let mut previous = None;
    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        let glyph = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            cursor_x += scaled.kern(prev, glyph);
        }
        let advance = scaled.h_advance(glyph);
        let mut positioned = scaled.scaled_glyph(ch);
        positioned.position = point(cursor_x, baseline);
        if let Some(outline) = font.outline_glyph(positioned) {
            let bounds = outline.px_bounds();
            outline.draw(|x, y, coverage| {
                let px = bounds.min.x as i64 + i64::from(x);
                let py = bounds.min.y as i64 + i64::from(y);
                blend_pixel(canvas, px, py, colour, coverage);
            });
        }
        cursor_x += advance;
        previous = Some(glyph);
    }
}

/// Draw `text` centred horizontally on `center_x`, truncated to `max_width`.
#[allow(clippy::too_many_arguments)]
pub fn draw_centered_line(
    canvas: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    size_px: f32,
    center_x: f32,
    baseline: f32,
    max_width: f32,
    colour: Rgba<u8>,
) {
    let scale = PxScale::from(size_px);
    let line = truncate_to_width(text, font, scale, max_width);
    if line.is_empty() {
        return;
    }
    let width = measure_text(&line, font, scale);
    draw_text(
        canvas,
        font,
        &line,
        scale,
        center_x - width * 0.5,
        baseline,
        colour,
    );
}

pub fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, colour: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height()) {
        return;
    }
    let alpha = (coverage.clamp(0.0, 1.0) * f32::from(colour[3]) / 255.0).clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let src = f32::from(colour[channel]);
        let base = f32::from(dst[channel]);
        dst[channel] = (base + (src - base) * alpha).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = dst[3].max((alpha * 255.0).round() as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_respects_bounds_and_coverage() {
        let mut canvas = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        blend_pixel(&mut canvas, 5, 5, Rgba([255, 255, 255, 255]), 1.0);
        blend_pixel(&mut canvas, 0, 0, Rgba([200, 100, 50, 255]), 0.5);
        assert_eq!(canvas.get_pixel(0, 0).0, [100, 50, 25, 255]);
        assert_eq!(canvas.get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn missing_fonts_render_nothing() {
        let faces = Typefaces::none();
        assert!(faces.caption().is_none());
        assert!(faces.title().is_none());
    }
}

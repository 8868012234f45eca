use chrono::NaiveDate;
use image::RgbaImage;
use tracing::warn;

use crate::config::PageCanvasConfig;
use crate::processing::compositor::{draw_shadow, fill_rect, place_cover};
use crate::processing::layout::GridCell;
use crate::processing::text::{Typefaces, draw_centered_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSide {
    Front,
    Back,
}

/// Inputs of a cover or back-cover rendering.
#[derive(Debug, Clone)]
pub struct TitleCard {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub date: Option<NaiveDate>,
    pub side: CardSide,
}

pub fn render_title_card(
    card: &TitleCard,
    style: &PageCanvasConfig,
    fonts: &Typefaces,
    image: Option<&RgbaImage>,
) -> RgbaImage {
    let (w, h) = (card.width.max(1), card.height.max(1));
    let mut canvas = RgbaImage::from_pixel(w, h, style.cover_colour.rgba(255));
    let ink = style.background.rgba(255);
    let pad = style.padding_px.min(w / 4);
    let text_width = w.saturating_sub(2 * pad) as f32;
    let centre_x = w as f32 * 0.5;

    match card.side {
        CardSide::Front => {
            let mut title_y = h as f32 * 0.45;
            if let Some(img) = image {
                let frame = GridCell::new(pad, pad, w - 2 * pad, (h as f32 * 0.55) as u32);
                draw_shadow(&mut canvas, &frame, style.shadow_px);
                fill_rect(&mut canvas, &frame, ink);
                let inner = frame.inset(style.matte_px);
                if let Err(err) = place_cover(&mut canvas, img, &inner) {
                    warn!(error = ?err, "cover photo could not be placed");
                    fill_rect(&mut canvas, &inner, style.placeholder.rgba(255));
                }
                title_y = frame.bottom() as f32 + h as f32 * 0.16;
            }
            let rule_y = (title_y + h as f32 * 0.04) as u32;
            fill_rect(
                &mut canvas,
                &GridCell::new(w / 2 - w / 8, rule_y, w / 4, (h / 400).max(2)),
                ink,
            );
            if let Some(font) = fonts.title() {
                draw_centered_line(
                    &mut canvas,
                    font,
                    &card.title,
                    w as f32 / 12.0,
                    centre_x,
                    title_y,
                    text_width,
                    ink,
                );
            }
            if let (Some(date), Some(font)) = (card.date, fonts.caption()) {
                draw_centered_line(
                    &mut canvas,
                    font,
                    &date.format("%B %Y").to_string(),
                    w as f32 / 28.0,
                    centre_x,
                    rule_y as f32 + h as f32 * 0.06,
                    text_width,
                    ink,
                );
            }
        }
        CardSide::Back => {
            let rule_y = h.saturating_sub(pad + h / 10);
            fill_rect(
                &mut canvas,
                &GridCell::new(w / 2 - w / 16, rule_y, w / 8, (h / 600).max(1)),
                ink,
            );
            if let Some(font) = fonts.caption() {
                draw_centered_line(
                    &mut canvas,
                    font,
                    &card.title,
                    w as f32 / 30.0,
                    centre_x,
                    h.saturating_sub(pad) as f32,
                    text_width,
                    ink,
                );
            }
        }
    }
    canvas
}

//! On-screen pointer controls. Each button is a screen rectangle bound to the
//! same navigation key the keyboard would send.

use image::{Rgba, RgbaImage};

use crate::events::NavKey;
use crate::processing::layout::GridCell;
use crate::processing::text::blend_pixel;

const MIN_BUTTON_PX: f32 = 44.0;
const MAX_BUTTON_PX: f32 = 72.0;
const EDGE_MARGIN_PX: u32 = 16;
/// Room kept free under the open button for the overlay caption.
const CAPTION_CLEARANCE_PX: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlIcon {
    Prev,
    Next,
    Open,
    Close,
}

impl ControlIcon {
    pub const ALL: [ControlIcon; 4] = [
        ControlIcon::Prev,
        ControlIcon::Next,
        ControlIcon::Open,
        ControlIcon::Close,
    ];

    pub fn key(self) -> NavKey {
        match self {
            ControlIcon::Prev => NavKey::Left,
            ControlIcon::Next => NavKey::Right,
            ControlIcon::Open => NavKey::Enter,
            ControlIcon::Close => NavKey::Escape,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavControl {
    pub icon: ControlIcon,
    pub rect: GridCell,
}

fn button_size(viewport: (u32, u32)) -> u32 {
    let short = viewport.0.min(viewport.1) as f32;
    (short * 0.08).clamp(MIN_BUTTON_PX, MAX_BUTTON_PX) as u32
}

fn side_buttons(viewport: (u32, u32), size: u32) -> [NavControl; 2] {
    let (w, h) = viewport;
    let y = h.saturating_sub(size) / 2;
    [
        NavControl {
            icon: ControlIcon::Prev,
            rect: GridCell::new(EDGE_MARGIN_PX, y, size, size),
        },
        NavControl {
            icon: ControlIcon::Next,
            rect: GridCell::new(w.saturating_sub(EDGE_MARGIN_PX + size), y, size, size),
        },
    ]
}

/// Previous, next and open while browsing the pile.
pub fn browse_controls(viewport: (u32, u32)) -> Vec<NavControl> {
    let size = button_size(viewport);
    let open = NavControl {
        icon: ControlIcon::Open,
        rect: GridCell::new(
            viewport.0.saturating_sub(size) / 2,
            viewport.1.saturating_sub(CAPTION_CLEARANCE_PX + size),
            size,
            size,
        ),
    };
    let mut controls = side_buttons(viewport, size).to_vec();
    controls.push(open);
    controls
}

/// Page back, page forward and close while reading.
pub fn reading_controls(viewport: (u32, u32)) -> Vec<NavControl> {
    let size = button_size(viewport);
    let close = NavControl {
        icon: ControlIcon::Close,
        rect: GridCell::new(
            viewport.0.saturating_sub(EDGE_MARGIN_PX + size),
            EDGE_MARGIN_PX,
            size,
            size,
        ),
    };
    let mut controls = side_buttons(viewport, size).to_vec();
    controls.push(close);
    controls
}

pub fn control_at(controls: &[NavControl], x: f32, y: f32) -> Option<&NavControl> {
    controls.iter().find(|control| control.rect.contains(x, y))
}

/// Rasterise a round button with its glyph, `size` pixels square.
pub fn icon_image(icon: ControlIcon, size: u32) -> RgbaImage {
    let size = size.max(8);
    let mut image = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    let backdrop = Rgba([20, 18, 16, 150]);
    let ink = Rgba([245, 240, 230, 255]);
    let scale = size as f32;
    for y in 0..size {
        for x in 0..size {
            let u = (x as f32 + 0.5) / scale;
            let v = (y as f32 + 0.5) / scale;
            let (du, dv) = (u - 0.5, v - 0.5);
            if du * du + dv * dv > 0.25 {
                continue;
            }
            blend_pixel(&mut image, i64::from(x), i64::from(y), backdrop, 1.0);
            if glyph_covers(icon, u, v) {
                blend_pixel(&mut image, i64::from(x), i64::from(y), ink, 1.0);
            }
        }
    }
    image
}

fn glyph_covers(icon: ControlIcon, u: f32, v: f32) -> bool {
    const STROKE: f32 = 0.06;
    match icon {
        ControlIcon::Prev => in_triangle((u, v), (0.62, 0.28), (0.62, 0.72), (0.32, 0.5)),
        ControlIcon::Next => in_triangle((u, v), (0.38, 0.28), (0.68, 0.5), (0.38, 0.72)),
        ControlIcon::Close => {
            let inside = (0.3..=0.7).contains(&u) && (0.3..=0.7).contains(&v);
            let on_diagonal = (u - v).abs() < STROKE || (u + v - 1.0).abs() < STROKE;
            inside && on_diagonal
        }
        ControlIcon::Open => {
            let inside = (0.3..=0.7).contains(&u) && (0.27..=0.73).contains(&v);
            let on_border = u < 0.3 + STROKE
                || u > 0.7 - STROKE
                || v < 0.27 + STROKE
                || v > 0.73 - STROKE;
            let on_spine = (u - 0.5).abs() < STROKE * 0.5;
            inside && (on_border || on_spine)
        }
    }
}

fn in_triangle(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
    let edge = |from: (f32, f32), to: (f32, f32)| {
        (to.0 - from.0) * (p.1 - from.1) - (to.1 - from.1) * (p.0 - from.0)
    };
    let (d1, d2, d3) = (edge(a, b), edge(b, c), edge(c, a));
    let negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(negative && positive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_stay_inside_the_viewport_without_overlapping() {
        for viewport in [(1280, 800), (390, 844), (320, 240)] {
            for controls in [browse_controls(viewport), reading_controls(viewport)] {
                for (i, a) in controls.iter().enumerate() {
                    assert!(a.rect.right() <= viewport.0 && a.rect.bottom() <= viewport.1);
                    for b in &controls[i + 1..] {
                        assert!(!a.rect.intersects(&b.rect), "{a:?} overlaps {b:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn clicks_resolve_to_keys() {
        let controls = reading_controls((1280, 800));
        let close = controls
            .iter()
            .find(|c| c.icon == ControlIcon::Close)
            .unwrap();
        let (x, y) = (
            close.rect.x as f32 + 1.0,
            close.rect.y as f32 + 1.0,
        );
        assert_eq!(control_at(&controls, x, y).map(|c| c.icon.key()), Some(NavKey::Escape));
        assert!(control_at(&controls, 640.0, 400.0).is_none());
    }

    #[test]
    fn icons_are_round_with_an_opaque_glyph() {
        let image = icon_image(ControlIcon::Next, 64);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert_eq!(*image.get_pixel(32, 32), Rgba([245, 240, 230, 255]));
        assert_eq!(image.get_pixel(32, 6)[3], 150);
    }
}

use crate::config::PageCanvasConfig;

/// Only this many photos are placed on a single face.
pub const MAX_PHOTOS_PER_FACE: usize = 4;

/// A rectangle reserved for one photo, in texture pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl GridCell {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub const fn right(&self) -> u32 {
        self.x + self.w
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub const fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// Half-open containment so neighbouring cells never both claim a pixel.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x as f32
            && py >= self.y as f32
            && px < self.right() as f32
            && py < self.bottom() as f32
    }

    pub fn intersects(&self, other: &GridCell) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn inset(&self, amount: u32) -> GridCell {
        let dx = amount.min(self.w / 2);
        let dy = amount.min(self.h / 2);
        GridCell {
            x: self.x + dx,
            y: self.y + dy,
            w: self.w - 2 * dx,
            h: self.h - 2 * dy,
        }
    }
}

/// Canvas measurements the grid is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub gap: u32,
    pub single_inset: u32,
}

impl From<&PageCanvasConfig> for GridGeometry {
    fn from(cfg: &PageCanvasConfig) -> Self {
        Self {
            width: cfg.width,
            height: cfg.height,
            padding: cfg.padding_px,
            gap: cfg.gap_px,
            single_inset: cfg.single_inset_px,
        }
    }
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::from(&PageCanvasConfig::default())
    }
}

/// The region the cells for `count` photos tile, or `None` for an empty face.
pub fn content_area(count: usize, geo: &GridGeometry) -> Option<GridCell> {
    if count == 0 {
        return None;
    }
    let base = GridCell::new(0, 0, geo.width, geo.height).inset(geo.padding);
    if count == 1 {
        Some(base.inset(geo.single_inset))
    } else {
        Some(base)
    }
}

/// Split `total` into two spans separated by `gap`; the remainder goes to the second.
fn split(total: u32, gap: u32, first_share: (u32, u32)) -> (u32, u32) {
    let usable = total.saturating_sub(gap);
    let first = usable * first_share.0 / first_share.1;
    (first, usable - first)
}

/// Non-overlapping cells for a face holding `count` photos.
pub fn compute_grid_cells(count: usize, geo: &GridGeometry) -> Vec<GridCell> {
    let Some(area) = content_area(count, geo) else {
        return Vec::new();
    };
    let gap = geo.gap;
    match count.min(MAX_PHOTOS_PER_FACE) {
        1 => vec![area],
        2 => {
            let (top, bottom) = split(area.h, gap, (1, 2));
            vec![
                GridCell::new(area.x, area.y, area.w, top),
                GridCell::new(area.x, area.y + top + gap, area.w, bottom),
            ]
        }
        3 => {
            let (top, bottom) = split(area.h, gap, (3, 5));
            let (left, right) = split(area.w, gap, (1, 2));
            let row_y = area.y + top + gap;
            vec![
                GridCell::new(area.x, area.y, area.w, top),
                GridCell::new(area.x, row_y, left, bottom),
                GridCell::new(area.x + left + gap, row_y, right, bottom),
            ]
        }
        _ => {
            let (top, bottom) = split(area.h, gap, (1, 2));
            let (left, right) = split(area.w, gap, (1, 2));
            let col_x = area.x + left + gap;
            let row_y = area.y + top + gap;
            vec![
                GridCell::new(area.x, area.y, left, top),
                GridCell::new(col_x, area.y, right, top),
                GridCell::new(area.x, row_y, left, bottom),
                GridCell::new(col_x, row_y, right, bottom),
            ]
        }
    }
}

/// Source rectangle `(x, y, w, h)` that fills a `dst_w × dst_h` target when
/// scaled, keeping the aspect ratio and centring the crop.
pub fn cover_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32, u32, u32) {
    let sw = src_w.max(1) as f64;
    let sh = src_h.max(1) as f64;
    let target_aspect = dst_w.max(1) as f64 / dst_h.max(1) as f64;
    let (cw, ch) = if sw / sh > target_aspect {
        ((sh * target_aspect).round(), sh)
    } else {
        (sw, (sw / target_aspect).round())
    };
    let cw = (cw as u32).clamp(1, src_w.max(1));
    let ch = (ch as u32).clamp(1, src_h.max(1));
    let (ox, oy) = center_offset(cw, ch, src_w, src_h);
    (ox, oy, cw, ch)
}

/// Largest size with the source aspect ratio that fits inside the canvas.
pub fn resize_to_contain(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let cw = canvas_w.max(1) as f32;
    let ch = canvas_h.max(1) as f32;
    let scale = (cw / iw).min(ch / ih).max(0.0);
    let scale = if scale.is_finite() { scale } else { 1.0 };
    let w = (iw * scale).round().max(1.0);
    let h = (ih * scale).round().max(1.0);
    (w as u32, h as u32)
}

pub fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    let ox = outer_w.saturating_sub(inner_w) / 2;
    let oy = outer_h.saturating_sub(inner_h) / 2;
    (ox, oy)
}

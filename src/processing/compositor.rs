//! Rasterises a face of the book: a grid of matted photos with captions on a
//! fixed-size canvas, plus the JPEG data-URL twin used by the flat reader.

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use futures::future::join_all;
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgba, RgbImage, RgbaImage};
use tracing::{debug, warn};

use crate::config::PageCanvasConfig;
use crate::events::Photo;
use crate::processing::layout::{GridCell, GridGeometry, compute_grid_cells, cover_crop};
use crate::processing::resize::resize_rgba;
use crate::processing::text::{Typefaces, blend_pixel, draw_centered_line};
use crate::processing::title_card::{CardSide, TitleCard, render_title_card};
use crate::source::PhotoSource;

const SHADOW_LAYERS: u32 = 4;
const SHADOW_ALPHA: u8 = 22;
const MATTE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A composited face and its `data:` URL twin.
#[derive(Debug, Clone)]
pub struct PageTexture {
    pub image: Arc<RgbaImage>,
    pub data_url: Arc<str>,
}

impl PageTexture {
    pub fn new(image: RgbaImage, jpeg_quality: u8) -> Self {
        let data_url = match encode_data_url(&image, jpeg_quality) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = ?err, "failed to encode face preview");
                "data:,".to_string()
            }
        };
        Self {
            image: Arc::new(image),
            data_url: data_url.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub fn encode_data_url(image: &RgbaImage, quality: u8) -> Result<String> {
    let rgb: RgbImage = image.convert();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .context("jpeg encoding failed")?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(&bytes)))
}

/// Stateless face renderer; cheap to clone into blocking tasks.
#[derive(Debug, Clone)]
pub struct Compositor {
    canvas: PageCanvasConfig,
    geometry: GridGeometry,
    fonts: Typefaces,
}

impl Compositor {
    pub fn new(canvas: PageCanvasConfig, fonts: Typefaces) -> Self {
        let geometry = GridGeometry::from(&canvas);
        Self {
            canvas,
            geometry,
            fonts,
        }
    }

    pub fn cells_for(&self, count: usize) -> Vec<GridCell> {
        compute_grid_cells(count, &self.geometry)
    }

    /// Fetch every photo concurrently and composite them into `cells`.
    ///
    /// Never fails: a photo that cannot be fetched or decoded becomes a
    /// placeholder rectangle.
    pub async fn render_grid_texture<S: PhotoSource>(
        &self,
        source: &S,
        photos: &[Photo],
        cells: &[GridCell],
    ) -> PageTexture {
        let placed = &photos[..photos.len().min(cells.len())];
        let images = join_all(placed.iter().map(|photo| async move {
            match source.fetch(&photo.url).await {
                Ok(img) => Some(img),
                Err(err) => {
                    warn!(url = %photo.url, error = %err, "photo unavailable; drawing placeholder");
                    None
                }
            }
        }))
        .await;

        let this = self.clone();
        let photos = placed.to_vec();
        let cells = cells.to_vec();
        let images_len = images.len();
        match tokio::task::spawn_blocking(move || this.compose_grid(&photos, &images, &cells)).await
        {
            Ok(texture) => texture,
            Err(err) => {
                warn!(error = %err, photos = images_len, "face composition task failed");
                self.blank_face()
            }
        }
    }

    /// Synchronous half of [`Self::render_grid_texture`].
    pub fn compose_grid(
        &self,
        photos: &[Photo],
        images: &[Option<RgbaImage>],
        cells: &[GridCell],
    ) -> PageTexture {
        let mut canvas = self.background();
        for (i, cell) in cells.iter().enumerate() {
            let Some(photo) = photos.get(i) else { break };
            let image = images.get(i).and_then(Option::as_ref);
            self.draw_cell(&mut canvas, cell, photo, image);
        }
        debug!(cells = cells.len(), "composited face");
        PageTexture::new(canvas, self.canvas.jpeg_quality)
    }

    pub fn blank_face(&self) -> PageTexture {
        PageTexture::new(self.background(), self.canvas.jpeg_quality)
    }

    /// Front or back cover for an album, fetching the cover photo if one is set.
    pub async fn render_cover<S: PhotoSource>(
        &self,
        source: &S,
        title: &str,
        cover_url: Option<&str>,
        date: Option<NaiveDate>,
        side: CardSide,
    ) -> PageTexture {
        let image = match (side, cover_url) {
            (CardSide::Front, Some(url)) => match source.fetch(url).await {
                Ok(img) => Some(img),
                Err(err) => {
                    warn!(url, error = %err, "cover photo unavailable");
                    None
                }
            },
            _ => None,
        };
        let card = TitleCard {
            title: title.to_string(),
            width: self.canvas.width,
            height: self.canvas.height,
            date,
            side,
        };
        let this = self.clone();
        match tokio::task::spawn_blocking(move || {
            let img = render_title_card(&card, &this.canvas, &this.fonts, image.as_ref());
            PageTexture::new(img, this.canvas.jpeg_quality)
        })
        .await
        {
            Ok(texture) => texture,
            Err(err) => {
                warn!(error = %err, "title card task failed");
                self.blank_face()
            }
        }
    }

    fn background(&self) -> RgbaImage {
        RgbaImage::from_pixel(
            self.canvas.width,
            self.canvas.height,
            self.canvas.background.rgba(255),
        )
    }

    fn draw_cell(
        &self,
        canvas: &mut RgbaImage,
        cell: &GridCell,
        photo: &Photo,
        image: Option<&RgbaImage>,
    ) {
        let caption = photo.caption.trim();
        let band = if caption.is_empty() {
            0
        } else {
            self.canvas.caption_band_px.min(cell.h / 3)
        };
        let frame = GridCell::new(cell.x, cell.y, cell.w, cell.h - band);

        draw_shadow(canvas, &frame, self.canvas.shadow_px);
        fill_rect(canvas, &frame, MATTE);

        let inner = frame.inset(self.canvas.matte_px);
        if inner.w == 0 || inner.h == 0 {
            return;
        }
        let drawn = image.is_some_and(|img| match place_cover(canvas, img, &inner) {
            Ok(()) => true,
            Err(err) => {
                warn!(url = %photo.url, error = ?err, "failed to fit photo into cell");
                false
            }
        });
        if !drawn {
            fill_rect(canvas, &inner, self.canvas.placeholder.rgba(255));
        }

        if band > 0 {
            if let Some(font) = self.fonts.caption() {
                let size = self.canvas.caption_size_px.min(band as f32 * 0.8);
                let baseline = frame.bottom() as f32 + band as f32 * 0.5 + size * 0.35;
                draw_centered_line(
                    canvas,
                    font,
                    caption,
                    size,
                    cell.x as f32 + cell.w as f32 * 0.5,
                    baseline,
                    cell.w as f32,
                    self.canvas.caption_colour.rgba(255),
                );
            }
        }
    }
}

/// Centre-crop `img` to the aspect of `dst` and draw it there.
pub(crate) fn place_cover(canvas: &mut RgbaImage, img: &RgbaImage, dst: &GridCell) -> Result<()> {
    let (x, y, w, h) = cover_crop(img.width(), img.height(), dst.w, dst.h);
    let cropped = image::imageops::crop_imm(img, x, y, w, h).to_image();
    let fitted = resize_rgba(&cropped, dst.w, dst.h)?;
    image::imageops::replace(canvas, &fitted, i64::from(dst.x), i64::from(dst.y));
    Ok(())
}

pub(crate) fn fill_rect(canvas: &mut RgbaImage, rect: &GridCell, colour: Rgba<u8>) {
    let right = rect.right().min(canvas.width());
    let bottom = rect.bottom().min(canvas.height());
    for y in rect.y..bottom {
        for x in rect.x..right {
            canvas.put_pixel(x, y, colour);
        }
    }
}

fn blend_rect(canvas: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, colour: Rgba<u8>) {
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(i64::from(canvas.width()));
    let y1 = y1.min(i64::from(canvas.height()));
    for y in y0..y1 {
        for x in x0..x1 {
            blend_pixel(canvas, x, y, colour, 1.0);
        }
    }
}

/// Soft drop shadow approximated by stacked translucent rectangles.
pub(crate) fn draw_shadow(canvas: &mut RgbaImage, rect: &GridCell, offset: u32) {
    if offset == 0 {
        return;
    }
    let shade = Rgba([0, 0, 0, SHADOW_ALPHA]);
    let dx = i64::from(offset / 2);
    let dy = i64::from(offset);
    for layer in (1..=SHADOW_LAYERS).rev() {
        let spread = i64::from(offset * layer / SHADOW_LAYERS);
        blend_rect(
            canvas,
            i64::from(rect.x) + dx - spread,
            i64::from(rect.y) + dy - spread,
            i64::from(rect.right()) + dx + spread,
            i64::from(rect.bottom()) + dy + spread,
            shade,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_canvas() -> PageCanvasConfig {
        PageCanvasConfig {
            width: 200,
            height: 260,
            padding_px: 10,
            gap_px: 6,
            single_inset_px: 10,
            matte_px: 3,
            shadow_px: 2,
            caption_band_px: 12,
            ..PageCanvasConfig::default()
        }
    }

    #[test]
    fn failed_photo_draws_placeholder() {
        let cfg = small_canvas();
        let compositor = Compositor::new(cfg.clone(), Typefaces::none());
        let cells = compositor.cells_for(1);
        let texture = compositor.compose_grid(&[Photo::new("missing", "")], &[None], &cells);
        let inner = cells[0].inset(cfg.matte_px);
        let centre = texture
            .image
            .get_pixel(inner.x + inner.w / 2, inner.y + inner.h / 2);
        assert_eq!(*centre, cfg.placeholder.rgba(255));
        let corner = texture.image.get_pixel(1, 1);
        assert_eq!(*corner, cfg.background.rgba(255));
    }

    #[test]
    fn loaded_photo_fills_its_cell() {
        let cfg = small_canvas();
        let compositor = Compositor::new(cfg.clone(), Typefaces::none());
        let cells = compositor.cells_for(2);
        let red = RgbaImage::from_pixel(40, 10, Rgba([200, 10, 10, 255]));
        let texture = compositor.compose_grid(
            &[Photo::new("a", ""), Photo::new("b", "")],
            &[Some(red), None],
            &cells,
        );
        let inner = cells[0].inset(cfg.matte_px);
        let px = texture
            .image
            .get_pixel(inner.x + inner.w / 2, inner.y + inner.h / 2);
        assert!(px[0] > 180 && px[1] < 40 && px[2] < 40, "{px:?}");
        let matte = texture.image.get_pixel(cells[0].x + 1, cells[0].y + 1);
        assert_eq!(*matte, MATTE);
    }

    #[test]
    fn data_url_is_jpeg() {
        let texture = PageTexture::new(RgbaImage::new(4, 4), 80);
        assert!(texture.data_url.starts_with("data:image/jpeg;base64,"));
    }
}

use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::RgbaImage;

use crate::processing::layout::resize_to_contain;

pub fn resize_rgba(source: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    if target_w == 0 || target_h == 0 {
        anyhow::bail!("resize dimensions must be positive");
    }
    if source.width() == target_w && source.height() == target_h {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("photo resize failed")?;
    let buffer = dst_image.into_vec();
    RgbaImage::from_raw(target_w, target_h, buffer)
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}

/// Downscale so the longest edge is at most `max_dim`; never upscales.
pub fn fit_within(source: RgbaImage, max_dim: u32) -> Result<RgbaImage> {
    let (w, h) = source.dimensions();
    if w.max(h) <= max_dim {
        return Ok(source);
    }
    let (tw, th) = resize_to_contain(max_dim, max_dim, w, h);
    resize_rgba(&source, tw, th)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_within_leaves_small_images_alone() {
        let img = RgbaImage::new(10, 20);
        let out = fit_within(img, 64).unwrap();
        assert_eq!(out.dimensions(), (10, 20));
    }

    #[test]
    fn fit_within_scales_longest_edge() {
        let img = RgbaImage::from_pixel(400, 100, image::Rgba([1, 2, 3, 255]));
        let out = fit_within(img, 200).unwrap();
        assert_eq!(out.dimensions(), (200, 50));
    }
}

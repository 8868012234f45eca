use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use palette::Srgb;
use serde::Deserialize;
use serde::de::{self, Deserializer};

/// An sRGB colour written as `#rrggbb` in the YAML file.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HexColour(pub [u8; 3]);

impl HexColour {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn rgba(self, alpha: u8) -> image::Rgba<u8> {
        image::Rgba([self.0[0], self.0[1], self.0[2], alpha])
    }

    /// Linear-ish float form used for GPU clear colours and tints.
    pub fn to_f32(self) -> [f32; 3] {
        let [r, g, b] = self.0;
        [
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        ]
    }
}

impl fmt::Debug for HexColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for HexColour {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let parsed: Srgb<u8> = raw
            .trim()
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid colour '{raw}': {err}"))?;
        Ok(Self([parsed.red, parsed.green, parsed.blue]))
    }
}

impl<'de> Deserialize<'de> for HexColour {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PageCanvasConfig {
    /// Pixel width of every composited face.
    pub width: u32,
    /// Pixel height of every composited face.
    pub height: u32,
    /// Margin between the canvas edge and the content area.
    pub padding_px: u32,
    /// Gap between neighbouring grid cells.
    pub gap_px: u32,
    /// Extra inset applied around the single-photo layout.
    pub single_inset_px: u32,
    /// Width of the white matte drawn around each photo.
    pub matte_px: u32,
    /// Offset of the drop shadow under each matte.
    pub shadow_px: u32,
    /// Height reserved at the bottom of a cell for the caption.
    pub caption_band_px: u32,
    /// Caption glyph size in pixels.
    pub caption_size_px: f32,
    pub background: HexColour,
    pub placeholder: HexColour,
    pub caption_colour: HexColour,
    pub cover_colour: HexColour,
    /// JPEG quality of the data-URL twin.
    pub jpeg_quality: u8,
}

impl Default for PageCanvasConfig {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2730,
            padding_px: 120,
            gap_px: 60,
            single_inset_px: 120,
            matte_px: 24,
            shadow_px: 14,
            caption_band_px: 96,
            caption_size_px: 54.0,
            background: HexColour::rgb(0xf4, 0xef, 0xe6),
            placeholder: HexColour::rgb(0xc9, 0xc2, 0xb6),
            caption_colour: HexColour::rgb(0x3a, 0x35, 0x2f),
            cover_colour: HexColour::rgb(0x2d, 0x3a, 0x4a),
            jpeg_quality: 82,
        }
    }
}

impl PageCanvasConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "page-canvas dimensions must be positive"
        );
        let reserved = 2 * (self.padding_px + self.single_inset_px) + self.gap_px;
        ensure!(
            reserved < self.width.min(self.height),
            "page-canvas padding, inset and gap leave no room for photos"
        );
        ensure!(
            self.caption_size_px > 0.0,
            "page-canvas.caption-size-px must be positive"
        );
        ensure!(
            (1..=100).contains(&self.jpeg_quality),
            "page-canvas.jpeg-quality must be within 1..=100"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BookConfig {
    /// Number of mesh segments across the page width; the bone chain has one more bone.
    pub segments: usize,
    /// Duration of the curl bump after a page changes side.
    #[serde(with = "humantime_serde")]
    pub flip_duration: Duration,
    /// Delay between cursor steps while far from the target page.
    #[serde(with = "humantime_serde")]
    pub step_fast: Duration,
    /// Delay between cursor steps near the target page.
    #[serde(with = "humantime_serde")]
    pub step_slow: Duration,
    /// Remaining distance above which `step-fast` applies.
    pub fast_step_distance: usize,
    /// Per-page fan-out angle applied while the book is open.
    pub fan_out_degrees: f32,
    /// Smooth time of the primary (Y) bone rotation.
    pub turn_smooth_time: f32,
    /// Smooth time of the fold (X) bone rotation.
    pub fold_smooth_time: f32,
    pub page_width: f32,
    pub page_height: f32,
    pub page_depth: f32,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            segments: 30,
            flip_duration: Duration::from_millis(400),
            step_fast: Duration::from_millis(50),
            step_slow: Duration::from_millis(150),
            fast_step_distance: 2,
            fan_out_degrees: 0.8,
            turn_smooth_time: 0.5,
            fold_smooth_time: 0.3,
            page_width: 1.28,
            page_height: 1.71,
            page_depth: 0.003,
        }
    }
}

impl BookConfig {
    fn validate(&self) -> Result<()> {
        ensure!(self.segments >= 2, "book.segments must be at least 2");
        ensure!(
            !self.flip_duration.is_zero(),
            "book.flip-duration must be positive"
        );
        ensure!(
            self.turn_smooth_time > 0.0 && self.fold_smooth_time > 0.0,
            "book smooth times must be positive"
        );
        ensure!(
            self.page_width > 0.0 && self.page_height > 0.0 && self.page_depth >= 0.0,
            "book page dimensions must be positive"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct IntroConfig {
    /// How long the snapped book rests before the cover opens.
    #[serde(with = "humantime_serde")]
    pub laying_hold: Duration,
    /// Fixed time between the cover starting to open and controls unlocking.
    #[serde(with = "humantime_serde")]
    pub opening_duration: Duration,
    pub max_scale: f32,
    pub min_scale: f32,
    /// Visible world width is divided by this to derive the scale.
    pub width_divisor: f32,
    /// Visible world height is divided by this to derive the scale.
    pub height_divisor: f32,
    /// Distance from the reading camera to the book.
    pub camera_distance: f32,
    pub fov_degrees: f32,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            laying_hold: Duration::from_millis(150),
            opening_duration: Duration::from_millis(1000),
            max_scale: 2.2,
            min_scale: 0.75,
            width_divisor: 3.0,
            height_divisor: 2.2,
            camera_distance: 4.0,
            fov_degrees: 45.0,
        }
    }
}

impl IntroConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.min_scale > 0.0 && self.min_scale <= self.max_scale,
            "intro.min-scale must be positive and not above intro.max-scale"
        );
        ensure!(
            self.width_divisor > 0.0 && self.height_divisor > 0.0,
            "intro divisors must be positive"
        );
        ensure!(
            self.fov_degrees > 1.0 && self.fov_degrees < 179.0,
            "intro.fov-degrees must be between 1 and 179"
        );
        ensure!(
            self.camera_distance > 0.0,
            "intro.camera-distance must be positive"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PileConfig {
    /// Duration of each half of a cycle (slide out, then slide in).
    #[serde(with = "humantime_serde")]
    pub slide_duration: Duration,
    /// Horizontal distance the top book travels off-screen.
    pub slide_distance: f32,
    pub opacity_step: f32,
    pub min_opacity: f32,
    /// Largest fraction the camera moves closer on ultrawide viewports.
    pub max_aspect_compensation: f32,
    pub camera_height: f32,
    pub camera_back: f32,
    pub book_thickness: f32,
    pub fov_degrees: f32,
}

impl Default for PileConfig {
    fn default() -> Self {
        Self {
            slide_duration: Duration::from_millis(400),
            slide_distance: 3.2,
            opacity_step: 0.2,
            min_opacity: 0.25,
            max_aspect_compensation: 0.3,
            camera_height: 6.0,
            camera_back: 3.0,
            book_thickness: 0.08,
            fov_degrees: 40.0,
        }
    }
}

impl PileConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.slide_duration.is_zero(),
            "pile.slide-duration must be positive"
        );
        ensure!(
            (0.0..=1.0).contains(&self.min_opacity),
            "pile.min-opacity must be within 0..=1"
        );
        ensure!(
            (0.0..1.0).contains(&self.max_aspect_compensation),
            "pile.max-aspect-compensation must be within 0..1"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BlinkConfig {
    #[serde(with = "humantime_serde")]
    pub fade_to_black: Duration,
    #[serde(with = "humantime_serde")]
    pub hold: Duration,
    #[serde(with = "humantime_serde")]
    pub reveal: Duration,
    pub colour: HexColour,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            fade_to_black: Duration::from_millis(300),
            hold: Duration::from_millis(100),
            reveal: Duration::from_millis(500),
            colour: HexColour::rgb(0, 0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ViewModePreference {
    /// Flat below the breakpoint, 3D otherwise.
    #[default]
    Auto,
    #[serde(rename = "3d")]
    ThreeD,
    Flat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Minimum spacing between keyboard/arrow page flips.
    #[serde(with = "humantime_serde")]
    pub flip_cooldown: Duration,
    /// Viewports narrower than this start in flat mode.
    pub flat_breakpoint_px: u32,
    pub view_mode: ViewModePreference,
    /// Horizontal travel that counts as a swipe in flat mode.
    pub swipe_threshold_px: f32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            flip_cooldown: Duration::from_millis(300),
            flat_breakpoint_px: 768,
            view_mode: ViewModePreference::Auto,
            swipe_threshold_px: 50.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout for remote photos.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Largest edge a fetched photo is scaled down to before compositing.
    pub max_source_dim: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_source_dim: 2048,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub background: HexColour,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Photo Book".to_string(),
            width: 1280,
            height: 800,
            background: HexColour::rgb(0x1b, 0x1a, 0x19),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// YAML or JSON file listing the albums to present.
    pub album_manifest: PathBuf,
    /// Size and styling of composited faces.
    pub page_canvas: PageCanvasConfig,
    /// Page geometry and flip timing.
    pub book: BookConfig,
    /// Laying/opening choreography of a freshly opened book.
    pub intro: IntroConfig,
    /// Browsing pile layout and cycling animation.
    pub pile: PileConfig,
    /// Fade-to-black transition around book swaps.
    pub blink: BlinkConfig,
    /// Reading controls and view-mode selection.
    pub reader: ReaderConfig,
    /// Photo fetching limits.
    pub fetch: FetchConfig,
    pub window: WindowConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            album_manifest: PathBuf::from("albums.yaml"),
            page_canvas: PageCanvasConfig::default(),
            book: BookConfig::default(),
            intro: IntroConfig::default(),
            pile: PileConfig::default(),
            blink: BlinkConfig::default(),
            reader: ReaderConfig::default(),
            fetch: FetchConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.album_manifest.as_os_str().is_empty(),
            "album-manifest must not be empty"
        );
        self.page_canvas
            .validate()
            .context("invalid page-canvas configuration")?;
        self.book.validate().context("invalid book configuration")?;
        self.intro
            .validate()
            .context("invalid intro configuration")?;
        self.pile.validate().context("invalid pile configuration")?;
        ensure!(
            self.reader.swipe_threshold_px > 0.0,
            "reader.swipe-threshold-px must be positive"
        );
        ensure!(
            self.fetch.max_source_dim > 0,
            "fetch.max-source-dim must be positive"
        );
        ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window dimensions must be positive"
        );
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colour_parses_with_and_without_hash() {
        assert_eq!("#102030".parse::<HexColour>().unwrap().0, [0x10, 0x20, 0x30]);
        assert_eq!("ffffff".parse::<HexColour>().unwrap().0, [255, 255, 255]);
        assert!("#12".parse::<HexColour>().is_err());
    }

    #[test]
    fn defaults_validate() {
        Configuration::default().validated().unwrap();
    }

    #[test]
    fn rejects_inverted_scale_bounds() {
        let mut cfg = Configuration::default();
        cfg.intro.min_scale = 3.0;
        assert!(cfg.validated().is_err());
    }
}

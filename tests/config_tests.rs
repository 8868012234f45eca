use std::path::PathBuf;
use std::time::Duration;

use photo_book::config::{Configuration, HexColour, ViewModePreference};

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
album-manifest: "/srv/albums.yaml"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.album_manifest, PathBuf::from("/srv/albums.yaml"));
    assert_eq!(cfg.book.flip_duration, Duration::from_millis(400));
    assert_eq!(cfg.reader.flip_cooldown, Duration::from_millis(300));
    cfg.validated().unwrap();
}

#[test]
fn parse_timings_and_colours() {
    let yaml = r##"
album-manifest: albums.json
book:
  segments: 12
  step-fast: 30ms
  step-slow: 120ms
intro:
  opening-duration: 1s 200ms
blink:
  hold: 250ms
  colour: "#101010"
reader:
  view-mode: 3d
  flat-breakpoint-px: 640
page-canvas:
  background: "#ffffff"
"##;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.book.segments, 12);
    assert_eq!(cfg.book.step_fast, Duration::from_millis(30));
    assert_eq!(cfg.book.step_slow, Duration::from_millis(120));
    assert_eq!(cfg.intro.opening_duration, Duration::from_millis(1200));
    assert_eq!(cfg.blink.hold, Duration::from_millis(250));
    assert_eq!(cfg.blink.colour, HexColour::rgb(0x10, 0x10, 0x10));
    assert_eq!(cfg.reader.view_mode, ViewModePreference::ThreeD);
    assert_eq!(cfg.reader.flat_breakpoint_px, 640);
    assert_eq!(cfg.page_canvas.background, HexColour::rgb(255, 255, 255));
    // Untouched sections keep their defaults.
    assert_eq!(cfg.pile.slide_duration, Duration::from_millis(400));
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
album-manifest: albums.yaml
book:
  page-curl: 3
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn invalid_values_fail_validation() {
    let yaml = r#"
album-manifest: albums.yaml
book:
  segments: 1
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(format!("{err:#}").contains("book.segments"));

    let yaml = r#"
album-manifest: albums.yaml
page-canvas:
  jpeg-quality: 0
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "album-manifest: a.yaml\nwindow:\n  title: Shelf\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.window.title, "Shelf");
    assert!(Configuration::from_yaml_file(dir.path().join("missing.yaml")).is_err());
}

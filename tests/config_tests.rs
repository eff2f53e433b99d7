use eink_frame::config::{Configuration, DisplayConfig};
use eink_frame::display::Border;
use eink_frame::events::Mode;
use std::path::PathBuf;
use std::time::Duration;

const MINIMAL: &str = r#"
screenshots:
  urls: ["https://ha.local/dashboard/0?kiosk"]
"#;

#[test]
fn minimal_config_uses_defaults() {
    let cfg = Configuration::from_yaml_str(MINIMAL)
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.refresh_period, Duration::from_secs(900));
    assert_eq!(cfg.initial_mode, Mode::Screenshots);
    assert!(matches!(
        cfg.display,
        DisplayConfig::Framebuffer { ref device, border: Border::White } if device == &PathBuf::from("/dev/fb0")
    ));
    assert_eq!(cfg.photos.backlog_size, 10);
    assert_eq!(cfg.photos.startup_retry_delay, Duration::from_secs(300));
    assert_eq!(cfg.buttons.pins.a, 5);
    assert_eq!(cfg.buttons.pins.d, 24);
    assert_eq!(cfg.buttons.debounce, Duration::from_millis(250));
    assert_eq!(cfg.date_overlay.format, "%d.%m.%Y");
    assert_eq!(cfg.power_off_command, "systemctl poweroff");
}

#[test]
fn parse_full_kebab_case_config() {
    let yaml = r#"
refresh-period: 90s
initial-mode: google-photos
display:
  driver: png-file
  path: /tmp/frame.png
  width: 600
  height: 448
  border: black
screenshots:
  directory: /srv/shots
  urls: [a, b, c]
photos:
  library-path: /srv/photos
  backlog-size: 4
  startup-retry-delay: 1m
  refill-queue: 2
  delete-after-display: true
date-overlay:
  enabled: false
  format: "%Y"
  font-size: 18
buttons:
  enabled: false
  chip: /dev/gpiochip4
  debounce: 300ms
  pins: { a: 1, b: 2, c: 3, d: 4 }
diagnostics:
  log-file: /tmp/frame.log
  max-lines: 12
  font-size: 10
font-path: /usr/share/fonts/mono.ttf
power-off-command: "sudo poweroff"
"#;
    let cfg = Configuration::from_yaml_str(yaml)
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.refresh_period, Duration::from_secs(90));
    assert_eq!(cfg.initial_mode, Mode::GooglePhotos);
    match &cfg.display {
        DisplayConfig::PngFile {
            path,
            width,
            height,
            border,
        } => {
            assert_eq!(path, &PathBuf::from("/tmp/frame.png"));
            assert_eq!((*width, *height), (600, 448));
            assert_eq!(*border, Border::Black);
        }
        other => panic!("unexpected display config {other:?}"),
    }
    assert_eq!(cfg.display.border(), Border::Black);
    assert_eq!(cfg.screenshots.urls.len(), 3);
    assert!(cfg.photos.delete_after_display);
    assert_eq!(cfg.photos.startup_retry_delay, Duration::from_secs(60));
    assert!(!cfg.date_overlay.enabled);
    assert_eq!(cfg.buttons.chip, PathBuf::from("/dev/gpiochip4"));
    assert_eq!(cfg.diagnostics.max_lines, 12);
    assert_eq!(cfg.font_path, Some(PathBuf::from("/usr/share/fonts/mono.ttf")));
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = format!("{MINIMAL}\nslideshow-speed: 3\n");
    assert!(Configuration::from_yaml_str(&yaml).is_err());
}

#[test]
fn no_screenshot_urls_is_invalid() {
    let cfg = Configuration::from_yaml_str("refresh-period: 5m\n").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("screenshots.urls"));
}

#[test]
fn zero_refresh_period_is_invalid() {
    let yaml = format!("{MINIMAL}\nrefresh-period: 0s\n");
    let err = Configuration::from_yaml_str(&yaml)
        .unwrap()
        .validated()
        .unwrap_err();
    assert!(err.to_string().contains("refresh-period"));
}

#[test]
fn duplicate_button_pins_are_invalid() {
    let yaml = format!("{MINIMAL}\nbuttons:\n  pins: {{ a: 5, b: 5, c: 16, d: 24 }}\n");
    let err = Configuration::from_yaml_str(&yaml)
        .unwrap()
        .validated()
        .unwrap_err();
    assert!(err.to_string().contains("buttons.pins"));
}

#[test]
fn zero_backlog_is_invalid() {
    let yaml = format!("{MINIMAL}\nphotos:\n  backlog-size: 0\n");
    assert!(
        Configuration::from_yaml_str(&yaml)
            .unwrap()
            .validated()
            .is_err()
    );
}

#[test]
fn blank_power_off_command_is_invalid() {
    let yaml = format!("{MINIMAL}\npower-off-command: \"  \"\n");
    assert!(
        Configuration::from_yaml_str(&yaml)
            .unwrap()
            .validated()
            .is_err()
    );
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, MINIMAL).unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.screenshots.urls.len(), 1);
    assert!(Configuration::from_yaml_file(dir.path().join("absent.yaml")).is_err());
}

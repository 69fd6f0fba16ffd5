//! Viewer configuration.
//!
//! Loaded from TOML; every section falls back to its defaults so a
//! partial file is fine. Command-line flags are applied on top through
//! [`Overrides`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rview_core::connection::{MIN_COLOR_DEPTH, SUPPORTED_COLOR_DEPTHS};
use rview_core::input::platform_scancode_offset;
use rview_core::{ChannelForward, ConnectionSettings, ScriptSettings, ViewerError};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    /// What to connect to.
    pub target: TargetConfig,
    /// Remote desktop geometry.
    pub display: DisplayConfig,
    /// Input forwarding settings.
    pub input: InputConfig,
    /// Keystroke script.
    pub script: ScriptConfig,
    /// Forwarded virtual channels.
    pub channels: Vec<ChannelForward>,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Connection target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Connection URL, e.g. `rdp+ntlm-password://user:pw@host`.
    pub url: String,
}

/// Display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Remote desktop width.
    pub width: u32,
    /// Remote desktop height.
    pub height: u32,
    /// Highest colour depth to negotiate.
    pub bpp: u8,
}

/// Input forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Forward pointer movement without buttons held.
    pub mouse_hover: bool,
    /// Forward keyboard events.
    pub keyboard: bool,
    /// Client keyboard layout short name.
    pub keyboard_layout: String,
    /// Native scancode correction; the platform default when unset.
    pub scancode_offset: Option<u32>,
}

/// Keystroke script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Script file. No script when unset.
    pub path: Option<PathBuf>,
    /// Auto-start delay in seconds. Unset or negative disables auto-start.
    pub autostart_delay_secs: Option<f64>,
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when neither `RUST_LOG` nor `-v` is given.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: "loopback://localhost".into(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            bpp: 32,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mouse_hover: true,
            keyboard: true,
            keyboard_layout: "enus".into(),
            scancode_offset: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

// ── Parsing helpers ──────────────────────────────────────────────

/// Parse `WIDTHxHEIGHT` (the `x` may be upper case).
pub fn parse_resolution(s: &str) -> Result<(u32, u32), ViewerError> {
    let invalid = || ViewerError::InvalidResolution(s.to_string());
    let (w, h) = s
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let w: u32 = w.trim().parse().map_err(|_| invalid())?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

/// Parse a colour depth, accepting only {15, 16, 24, 32}.
pub fn parse_bpp(s: &str) -> Result<u8, ViewerError> {
    let bpp: u8 = s
        .trim()
        .parse()
        .map_err(|_| ViewerError::Other(format!("not a colour depth: {s}")))?;
    if !SUPPORTED_COLOR_DEPTHS.contains(&bpp) {
        return Err(ViewerError::InvalidColorDepth(bpp));
    }
    Ok(bpp)
}

/// Log filter for a `-v` count: 0 keeps `base`, then info, debug, trace.
pub fn level_for_verbosity(base: &str, verbose: u8) -> String {
    match verbose {
        0 => base.to_string(),
        1 => "info".into(),
        2 => "debug".into(),
        _ => "trace".into(),
    }
}

/// A script delay of `secs` seconds. Negative disables auto-start; a
/// value no `Duration` can hold is logged and disables it too.
fn autostart_delay(secs: f64) -> Option<Duration> {
    if secs < 0.0 {
        return None;
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(delay) => Some(delay),
        Err(e) => {
            tracing::warn!("script delay {secs} rejected ({e}); auto-start disabled");
            None
        }
    }
}

// ── Overrides ────────────────────────────────────────────────────

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub url: Option<String>,
    pub resolution: Option<(u32, u32)>,
    pub bpp: Option<u8>,
    pub no_mouse_hover: bool,
    pub no_keyboard: bool,
    pub keyboard_layout: Option<String>,
    pub script: Option<PathBuf>,
    pub script_delay_secs: Option<f64>,
    pub channel: Option<ChannelForward>,
}

// ── Loading ──────────────────────────────────────────────────────

impl GuiConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Apply command-line values on top of the file.
    pub fn apply(&mut self, o: Overrides) {
        if let Some(url) = o.url {
            self.target.url = url;
        }
        if let Some((w, h)) = o.resolution {
            self.display.width = w;
            self.display.height = h;
        }
        if let Some(bpp) = o.bpp {
            self.display.bpp = bpp;
        }
        if o.no_mouse_hover {
            self.input.mouse_hover = false;
        }
        if o.no_keyboard {
            self.input.keyboard = false;
        }
        if let Some(layout) = o.keyboard_layout {
            self.input.keyboard_layout = layout;
        }
        if let Some(path) = o.script {
            self.script.path = Some(path);
        }
        if let Some(secs) = o.script_delay_secs {
            self.script.autostart_delay_secs = Some(secs);
        }
        if let Some(channel) = o.channel {
            self.channels.push(channel);
        }
    }

    // ── Derived settings ─────────────────────────────────────────

    /// Session parameters for the connection collaborator.
    pub fn connection_settings(&self) -> Result<ConnectionSettings, ViewerError> {
        let settings = ConnectionSettings {
            width: self.display.width,
            height: self.display.height,
            bpp_min: MIN_COLOR_DEPTH,
            bpp_max: self.display.bpp,
            keyboard_layout: self.input.keyboard_layout.clone(),
            channels: self.channels.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Script settings, or `None` when no script is configured.
    pub fn script_settings(&self) -> Option<ScriptSettings> {
        let path = self.script.path.clone()?;
        Some(ScriptSettings {
            path,
            autostart_delay: self.script.autostart_delay_secs.and_then(autostart_delay),
            layout: self.input.keyboard_layout.clone(),
        })
    }

    /// Native scancode correction in effect.
    pub fn scancode_offset(&self) -> u32 {
        self.input
            .scancode_offset
            .unwrap_or_else(platform_scancode_offset)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = GuiConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("url"));
        assert!(text.contains("keyboard_layout"));
        let parsed: GuiConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: GuiConfig = toml::from_str(
            r#"
            [display]
            width = 800

            [[channels]]
            name = "socks"
            listen_ip = "127.0.0.1"
            listen_port = 1080
            "#,
        )
        .unwrap();
        assert_eq!(cfg.display.width, 800);
        assert_eq!(cfg.display.height, 768);
        assert!(cfg.input.keyboard);
        assert_eq!(cfg.channels.len(), 1);
    }

    #[test]
    fn resolution_parsing() {
        assert_eq!(parse_resolution("800x600").unwrap(), (800, 600));
        assert_eq!(parse_resolution("1920X1080").unwrap(), (1920, 1080));
        assert!(matches!(
            parse_resolution("0x600"),
            Err(ViewerError::InvalidResolution(_))
        ));
        assert!(parse_resolution("800").is_err());
        assert!(parse_resolution("axb").is_err());
    }

    #[test]
    fn bpp_parsing() {
        assert_eq!(parse_bpp("24").unwrap(), 24);
        assert!(matches!(parse_bpp("8"), Err(ViewerError::InvalidColorDepth(8))));
        assert!(parse_bpp("deep").is_err());
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for_verbosity("warn", 0), "warn");
        assert_eq!(level_for_verbosity("warn", 1), "info");
        assert_eq!(level_for_verbosity("warn", 2), "debug");
        assert_eq!(level_for_verbosity("warn", 7), "trace");
    }

    #[test]
    fn overrides_win_over_file() {
        let mut cfg = GuiConfig::default();
        cfg.apply(Overrides {
            url: Some("vnc://10.0.0.2".into()),
            resolution: Some((800, 600)),
            bpp: Some(16),
            no_keyboard: true,
            script: Some(PathBuf::from("payload.txt")),
            script_delay_secs: Some(2.5),
            ..Default::default()
        });
        assert_eq!(cfg.target.url, "vnc://10.0.0.2");
        assert!(!cfg.input.keyboard);
        assert!(cfg.input.mouse_hover);

        let settings = cfg.connection_settings().unwrap();
        assert_eq!((settings.width, settings.height, settings.bpp_max), (800, 600, 16));
        assert_eq!(settings.bpp_min, 15);

        let script = cfg.script_settings().unwrap();
        assert_eq!(script.autostart_delay, Some(Duration::from_millis(2_500)));
    }

    #[test]
    fn negative_script_delay_disables_autostart() {
        let mut cfg = GuiConfig::default();
        assert!(cfg.script_settings().is_none());
        cfg.script.path = Some(PathBuf::from("s.txt"));
        cfg.script.autostart_delay_secs = Some(-1.0);
        assert_eq!(cfg.script_settings().unwrap().autostart_delay, None);
        cfg.script.autostart_delay_secs = Some(0.0);
        assert_eq!(cfg.script_settings().unwrap().autostart_delay, Some(Duration::ZERO));
    }

    #[test]
    fn unrepresentable_script_delay_disables_autostart() {
        let mut cfg = GuiConfig::default();
        cfg.script.path = Some(PathBuf::from("s.txt"));
        for secs in [1e30, f64::INFINITY, f64::NAN] {
            cfg.script.autostart_delay_secs = Some(secs);
            assert_eq!(cfg.script_settings().unwrap().autostart_delay, None, "delay {secs}");
        }

        let cfg: GuiConfig = toml::from_str("[script]\npath = \"s.txt\"\nautostart_delay_secs = 1e30\n").unwrap();
        assert_eq!(cfg.script_settings().unwrap().autostart_delay, None);
    }

    #[test]
    fn scancode_offset_override() {
        let mut cfg = GuiConfig::default();
        assert_eq!(cfg.scancode_offset(), platform_scancode_offset());
        cfg.input.scancode_offset = Some(0);
        assert_eq!(cfg.scancode_offset(), 0);
    }
}

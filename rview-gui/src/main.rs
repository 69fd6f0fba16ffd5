//! rview remote desktop viewer entry point.
//!
//! ```text
//! rview-gui <url>                 Connect with defaults
//! rview-gui --config <path>       Use custom config TOML
//! rview-gui --gen-config          Dump default config and exit
//! rview-gui loopback://local      Local test pattern, no network
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rview_core::{ChannelForward, ConnectorRegistry, SessionTarget};

use rview_gui::clipboard::SystemClipboard;
use rview_gui::config::{GuiConfig, Overrides, level_for_verbosity, parse_bpp, parse_resolution};
use rview_gui::display::DisplayRenderer;
use rview_gui::shell::{PresentationShell, ShellControl, ShellOptions};
use rview_gui::window::NativeWindow;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rview-gui", version, about = "Remote desktop viewer")]
struct Cli {
    /// Connection URL, e.g. rdp+ntlm-password://DOMAIN%5Cuser:pw@host or vnc://host.
    url: Option<String>,

    /// More logging: -v info, -vv debug, -vvv trace.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Do not forward pointer movement without a button press.
    #[arg(long)]
    no_mouse_hover: bool,

    /// Do not forward keyboard input.
    #[arg(long)]
    no_keyboard: bool,

    /// Remote resolution, WIDTHxHEIGHT [default: 1024x768].
    #[arg(long, value_parser = resolution_arg)]
    res: Option<(u32, u32)>,

    /// Colour depth: 15, 16, 24 or 32 [default: 32].
    #[arg(long, value_parser = bpp_arg)]
    bpp: Option<u8>,

    /// Client keyboard layout [default: enus].
    #[arg(long)]
    keyboard: Option<String>,

    /// Keystroke script to replay into the session.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Seconds before the script starts on its own; negative disables.
    #[arg(long, allow_negative_numbers = true)]
    script_delay: Option<f64>,

    /// Virtual channel to forward to a local listener.
    #[arg(long)]
    channel: Option<String>,

    /// Listen address for --channel.
    #[arg(long, default_value = "127.0.0.1")]
    channel_ip: String,

    /// Listen port for --channel.
    #[arg(long, default_value_t = 1080)]
    channel_port: u16,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rview-gui.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

fn resolution_arg(s: &str) -> Result<(u32, u32), String> {
    parse_resolution(s).map_err(|e| e.to_string())
}

fn bpp_arg(s: &str) -> Result<u8, String> {
    parse_bpp(s).map_err(|e| e.to_string())
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            resolution: self.res,
            bpp: self.bpp,
            no_mouse_hover: self.no_mouse_hover,
            no_keyboard: self.no_keyboard,
            keyboard_layout: self.keyboard.clone(),
            script: self.script.clone(),
            script_delay_secs: self.script_delay,
            channel: self.channel.clone().map(|name| ChannelForward {
                name,
                listen_ip: self.channel_ip.clone(),
                listen_port: self.channel_port,
            }),
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&GuiConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = GuiConfig::load(&cli.config);
    config.apply(cli.overrides());

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(&config.logging.level, cli.verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rview-gui v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Resolve the session ──────────────────────────────────

    let target = SessionTarget::parse(&config.target.url)?;
    let settings = config.connection_settings()?;
    let connection = ConnectorRegistry::with_builtin().open(&target, &settings)?;

    // ── 2. Create the window ────────────────────────────────────

    let host = target.url().host_str().unwrap_or(target.scheme()).to_string();
    let window = NativeWindow::create(&format!("rview - {host}"), settings.width, settings.height)?;
    let mut renderer = DisplayRenderer::new(window.hwnd(), settings.width, settings.height);

    // ── 3. Start the session ────────────────────────────────────

    let options = ShellOptions {
        keyboard: config.input.keyboard,
        mouse_hover: config.input.mouse_hover,
        scancode_offset: config.scancode_offset(),
    };
    let mut shell = PresentationShell::start(
        connection,
        &settings,
        options,
        config.script_settings(),
        SystemClipboard::new(),
    )?;

    // ── 4. Event loop ───────────────────────────────────────────

    'main: loop {
        for ev in window.poll_events() {
            if shell.handle_window_event(ev) == ShellControl::Exit {
                break 'main;
            }
        }

        if shell.pump_bridge_events() == ShellControl::Exit {
            break;
        }
        shell.present(&mut renderer);

        std::thread::sleep(Duration::from_millis(1));
    }

    // ── 5. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    shell.close();
    Ok(())
}

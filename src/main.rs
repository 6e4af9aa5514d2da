use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::Event;

use aura_hud::app::{App, DEMO_PAYLOAD};
use aura_hud::backend::{BackendClient, BackendWorker};
use aura_hud::config::{ConfigOverrides, HudConfig};
use aura_hud::debug_log::{DebugLogHandle, install_panic_hook, set_global_debug_log};
use aura_hud::drivers::OutputDriver;
use aura_hud::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use aura_hud::event_loop::{ControlFlow, EventLoop};
use aura_hud::hud::section::Payload;
use aura_hud::hud::{Hud, HudSource};
use aura_hud::window::WindowManager;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Floating HUD windows for the AURA assistant.
#[derive(Debug, Parser)]
#[command(name = "aura-hud", version, about)]
struct Cli {
    /// Path to a TOML config file (default: ./aura-hud.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base URL of the assistant backend.
    #[arg(long)]
    backend_url: Option<String>,
    /// Location passed to `/hud-data`.
    #[arg(long)]
    location: Option<String>,
    /// JSON payload file to render at startup.
    #[arg(long)]
    payload: Option<PathBuf>,
    /// Render the built-in sample payload.
    #[arg(long)]
    demo: bool,
    /// Fetch HUD data from the backend on start.
    #[arg(long)]
    fetch: bool,
    /// Log level (error, warn, info, debug, trace, off).
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let mut config = HudConfig::load(cli.config.as_deref()).map_err(io::Error::other)?;
    config
        .apply_overrides(ConfigOverrides {
            backend_url: cli.backend_url.clone(),
            location: cli.location.clone(),
            log_level: cli.log_level.clone(),
        })
        .map_err(io::Error::other)?;

    let log = DebugLogHandle::new(config.logging.max_lines);
    set_global_debug_log(log.clone());
    install_panic_hook();
    let level = config.logging.level_filter().map_err(io::Error::other)?;
    aura_hud::tracing_sub::init(level);

    let startup_payload = match &cli.payload {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Some(Payload::from_json(&text).map_err(io::Error::other)?)
        }
        None => None,
    };

    let client = BackendClient::new(&config.backend.url, config.backend.timeout())
        .map_err(io::Error::other)?;
    let hud = Hud::new(WindowManager::new(config.windows.bounds()))
        .with_backend(BackendWorker::new(client));
    let mut app = App::new(hud)
        .with_location(config.backend.location.clone())
        .with_debug_log(log);

    if let Some(payload) = startup_payload {
        app.hud_mut().render_content(payload);
    }
    if cli.demo {
        app.hud_mut()
            .render_json(DEMO_PAYLOAD)
            .map_err(io::Error::other)?;
    }
    if cli.fetch {
        let source = HudSource::Backend {
            location: config.backend.location.clone(),
        };
        if let Err(err) = app.hud_mut().load_data(source) {
            tracing::warn!(error = %err, "initial fetch not sent");
        }
    }
    tracing::info!(backend = %config.backend.url, "aura-hud started");

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let mut event_loop = EventLoop::new(ConsoleInputDriver::new(), FRAME_INTERVAL);

    let result = event_loop.run(|_, event| {
        let flow = match event {
            Some(Event::Resize(_, _)) => ControlFlow::Continue,
            Some(event) => app.handle_event(&event),
            None => {
                app.tick();
                ControlFlow::Continue
            }
        };
        if flow == ControlFlow::Quit {
            return Ok(flow);
        }
        output.draw(|mut frame| app.draw(&mut frame, Instant::now()))?;
        Ok(flow)
    });

    output.exit()?;
    result
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use eink_frame::backlog::ImageBacklog;
use eink_frame::button::{ButtonDispatcher, ButtonMap};
use eink_frame::config::Configuration;
use eink_frame::display::open_display;
use eink_frame::events::{Mode, Outcome};
use eink_frame::orchestrator::{Components, DiagnosticsSource, DisplayOrchestrator, ScreenshotSet};
use eink_frame::platform::gpio::GpioInput;
use eink_frame::platform::power::SystemPower;
use eink_frame::processing::diagnostics::DiagnosticsRenderer;
use eink_frame::processing::overlay::DateOverlay;
use eink_frame::processing::text::load_font;
use eink_frame::retry::RetryPolicy;
use eink_frame::supply::LibrarySupply;
use eink_frame::tasks::{refill::RefillWorker, scheduler};

#[derive(Debug, Parser)]
#[command(
    name = "eink-frame",
    version,
    about = "E-ink photo frame with dashboard screenshots and hardware buttons"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Render a single frame in this mode and exit (hardware check)
    #[arg(long, value_enum, value_name = "MODE")]
    once: Option<Mode>,
    /// Override the configured refresh period, e.g. "90s" or "15m"
    #[arg(long = "refresh-period", value_name = "DURATION", value_parser = humantime::parse_duration)]
    refresh_period: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        once,
        refresh_period,
    } = Args::parse();

    let mut cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    if let Some(period) = refresh_period {
        ensure!(!period.is_zero(), "--refresh-period must be greater than zero");
        cfg.refresh_period = period;
    }

    eink_frame::logging::init(&cfg.diagnostics)?;
    info!(
        "Loaded configuration from {}:\n{:#?}",
        config.display(),
        cfg
    );

    let display = open_display(&cfg.display).context("failed to initialise the display")?;

    let input = if cfg.buttons.enabled && once.is_none() {
        Some(GpioInput::open(&cfg.buttons.chip)?)
    } else {
        None
    };

    let font = match load_font(cfg.font_path.as_deref()) {
        Ok(font) => Some(font),
        Err(err) => {
            warn!("text rendering disabled: {err:#}");
            None
        }
    };

    let supply = Arc::new(LibrarySupply::new(
        &cfg.photos.library_path,
        cfg.photos.delete_after_display,
    ));
    let backlog = Arc::new(ImageBacklog::new(supply, cfg.photos.backlog_size));
    if once.is_none_or(|mode| mode == Mode::GooglePhotos) {
        let policy = RetryPolicy::forever(cfg.photos.startup_retry_delay);
        let backlog = Arc::clone(&backlog);
        tokio::task::spawn_blocking(move || backlog.initialize(&policy))
            .await
            .context("backlog initialisation panicked")?
            .context("failed to populate the image backlog")?;
    }
    let refill = RefillWorker::spawn(Arc::clone(&backlog), cfg.photos.refill_queue)?;

    let date_overlay = font
        .clone()
        .filter(|_| cfg.date_overlay.enabled)
        .map(|font| {
            DateOverlay::new(
                font,
                cfg.date_overlay.format.as_str(),
                cfg.date_overlay.font_size,
            )
        });
    let orchestrator = Arc::new(DisplayOrchestrator::new(Components {
        display,
        initial_mode: cfg.initial_mode,
        backlog,
        refill,
        screenshots: ScreenshotSet::new(&cfg.screenshots.directory, cfg.screenshots.urls.len()),
        date_overlay,
        diagnostics: DiagnosticsSource {
            renderer: DiagnosticsRenderer::new(font, cfg.diagnostics.font_size),
            log_file: cfg.diagnostics.log_file.clone(),
            max_lines: cfg.diagnostics.max_lines,
        },
        power: Box::new(SystemPower::new(cfg.power_off_command.as_str())),
    }));

    if let Some(mode) = once {
        let outcome = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::task::spawn_blocking(move || orchestrator.render_once(mode))
                .await
                .context("render panicked")?
        };
        info!(%mode, ?outcome, "single render finished");
        ensure!(outcome == Outcome::Shown, "nothing was shown ({outcome:?})");
        return Ok(());
    }

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    if sigterm.recv().await.is_some() {
                        info!("SIGTERM received; initiating shutdown");
                        cancel.cancel();
                    }
                }
                Err(err) => warn!("failed to register SIGTERM handler: {err}"),
            }
        });
    }

    if let Some(mut input) = input {
        let dispatcher = ButtonDispatcher::new(Arc::clone(&orchestrator), Handle::current());
        dispatcher.install(
            &mut input,
            &ButtonMap::new(&cfg.buttons.pins),
            cfg.buttons.debounce,
        )?;
    } else {
        info!("buttons disabled");
    }

    scheduler::run(orchestrator, cfg.refresh_period, cancel)
        .await
        .context("refresh scheduler failed")?;
    info!("shutdown complete");
    Ok(())
}

//! xtouch-session - X-Touch control surface runtime
//!
//! Drives one or more Behringer X-Touch units against the in-memory loopback
//! mixer.

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xtouch_session::config::AppConfig;
use xtouch_session::context::{Context, MemoryStore, Outbox};
use xtouch_session::mixer::{LoopbackMixer, MixerEvent};
use xtouch_session::session::Session;
use xtouch_session::timer::SystemClock;
use xtouch_session::xtouch::connection::{discovery, SurfaceConnection, SurfaceEvent};

/// X-Touch session runtime - motor faders, encoders and displays for a loopback mixer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Print the composed surface and encoder pages, then exit
    #[arg(long)]
    print_layout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting xtouch-session {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config).await?;
    config.validate().context("Invalid configuration")?;

    if args.list_ports {
        discovery::print_ports(&config.detection_pattern);
        return Ok(());
    }

    let session = Session::new(&config, Arc::new(SystemClock::new()))?;

    if args.print_layout {
        print_layout(&session);
        return Ok(());
    }

    run_app(session, config, shutdown_signal()).await?;

    info!("xtouch-session shutdown complete");
    Ok(())
}

/// Configuration file, or the defaults when there is none
async fn load_config(path: &str) -> Result<AppConfig> {
    if !Path::new(path).exists() {
        info!("No configuration at {}, using defaults", path);
        return Ok(AppConfig::default());
    }

    let config = AppConfig::load(path).await?;
    info!("Configuration loaded from {}", path);
    Ok(config)
}

/// Owns everything a host callback touches
struct Runtime {
    session: Arc<Session>,
    mixer: LoopbackMixer,
    store: MemoryStore,
    connection: SurfaceConnection,
}

impl Runtime {
    /// Run one host callback, flush its MIDI and feed its commands to the mixer
    fn callback<F>(&mut self, f: F)
    where
        F: for<'c> FnOnce(&Session, &mut Context<'c>),
    {
        let mut outbox = Outbox::new();
        {
            let mut ctx = Context::new(&mut self.store, &mut outbox);
            f(&self.session, &mut ctx);
        }

        self.connection.flush(&outbox.frames);
        for command in outbox.commands {
            let events = self.mixer.apply(&command);
            self.deliver(events);
        }
    }

    fn deliver(&mut self, events: Vec<MixerEvent>) {
        for event in events {
            self.callback(|session, ctx| event.deliver(session, ctx));
        }
    }
}

async fn run_app(
    session: Arc<Session>,
    config: AppConfig,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    info!("Starting main application loop...");

    let (event_tx, mut event_rx) = mpsc::channel::<SurfaceEvent>(1024);
    let connection = SurfaceConnection::connect(&session.ports(), event_tx)
        .context("Failed to connect to the X-Touch")?;
    info!("X-Touch connected successfully");

    let mut runtime = Runtime {
        mixer: LoopbackMixer::new(&config),
        session,
        store: MemoryStore::new(),
        connection,
    };
    info!("Loopback mixer with {} parameters", runtime.mixer.len());

    runtime.callback(|session, ctx| session.initialize(ctx));
    let snapshot = runtime.mixer.snapshot();
    runtime.deliver(snapshot);

    let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                debug!("Received X-Touch event from {}: {:02X?}", event.port, event.data);
                runtime.callback(|session, ctx| session.handle_midi(ctx, event.port, &event.data));
            }

            _ = ticker.tick() => {
                let elapsed = last_tick.elapsed().as_millis() as u64;
                last_tick = Instant::now();
                let events = runtime.mixer.advance(elapsed);
                runtime.deliver(events);
                runtime.callback(|session, ctx| session.tick(ctx));
            }

            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
        }
    }

    debug!("Session store holds {} entries", runtime.store.len());
    Ok(())
}

fn print_layout(session: &Session) {
    println!("\n{}", "=== Surface Layout ===".bold().cyan());
    for device in session.devices() {
        let region = device.region();
        println!(
            "  {} {} at x={} (width {}) channels {}-{}",
            format!("#{}", device.position()).yellow(),
            device.kind().to_string().bold(),
            region.x,
            region.width,
            device.channel_offset() + 1,
            device.channel_offset() + device.channels().len()
        );
        println!(
            "      in: {}  out: {}",
            device.ports().input_name().green(),
            device.ports().output_name().green()
        );
    }

    println!("\n{}", "=== Encoder Banks ===".bold().cyan());
    let paging = session.paging();
    for bank in paging.banks() {
        println!("  {} (button {:#04x})", bank.name.bold(), bank.button);
        for &index in &bank.pages {
            if let Some(page) = paging.page(index) {
                let label = page.assignment_label().unwrap_or_default();
                println!(
                    "      {} {} assignments {}",
                    page.name,
                    page.assignments.len(),
                    label.dimmed()
                );
            }
        }
    }
    println!();
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}

mod config;
mod controller;
mod feed;
mod overlay;
mod playback;
mod sink;
mod state;
mod timer;
mod types;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::feed::FeedManager;
use crate::overlay::Overlay;
use crate::sink::JsonLines;

fn main() -> Result<()> {
    // Initialize logger (stderr; stdout carries the overlay stream)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting now-playing overlay");

    let config = Config::from_env().context("Invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .context("Failed to start timer runtime")?;

    let output = JsonLines::new(std::io::stdout());
    let overlay = Overlay::new(output, &config, runtime.handle().clone());
    log::info!("Fade delay: {:?}", overlay.controller().fade_delay());

    // Start from the "Not Playing" view until the first snapshot arrives
    overlay.publish_view()?;

    let feed = FeedManager::new();
    let reader = match &config.producer {
        Some(command) => feed.spawn(command, overlay.clone())?,
        None => FeedManager::read_stdin(overlay.clone()),
    };

    let feed_for_signal = feed.clone();
    ctrlc::set_handler(move || {
        log::info!("Received interrupt signal (Ctrl+C), stopping producer...");
        if let Err(e) = feed_for_signal.stop() {
            log::error!("Error stopping producer on interrupt: {}", e);
        }
        std::process::exit(0);
    })
    .context("Failed to set Ctrl+C handler")?;

    if reader.join().is_err() {
        log::error!("Feed reader panicked");
    }

    if feed.is_running() {
        log::warn!("Producer closed its output but is still running");
    }

    log::info!("Feed ended, shutting down");
    feed.stop()?;

    Ok(())
}

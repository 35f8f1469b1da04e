mod animations;
mod app;
mod audio;
mod config;
mod error;
mod hardware;
mod hooks;
mod messages;
mod services;

use app::App;
use config::Config;
use hardware::{ButtonPoller, EvdevButtons, Everloop, LedStrip, Rgbw};
use hooks::CommandPowerManager;
use messages::LoopFlag;
use services::MicArrayRecorder;

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{Registry, filter::LevelFilter, fmt, prelude::*, reload};

#[tokio::main]
async fn main() -> Result<()> {
    // Start at INFO so config loading is logged; the config may raise it
    let (level, level_handle) = reload::Layer::new(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(level)
        .with(fmt::layer())
        .init();

    let config = Config::load()?;
    config.validate()?;

    apply_debug_flag(&level_handle, config.debug)?;

    tracing::info!("Starting microphone array recorder");

    let leds: Arc<dyn LedStrip> = Arc::new(Everloop::open(&config.led_device, config.led_count)?);
    let buttons = EvdevButtons::open(&config.button_device, config.button_codes)?;

    let running = LoopFlag::new();
    let mut app = App::new(
        &config,
        running.clone(),
        leds.clone(),
        ButtonPoller::new(Box::new(buttons)),
        Box::new(MicArrayRecorder),
        Box::new(CommandPowerManager::new(config.power_off_command.clone())),
    )?;

    let ctrl_c_flag = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
            ctrl_c_flag.clear();
        }
    });

    let result = app.run().await;
    if let Err(e) = &result {
        tracing::error!("Control loop failed in {:?}: {:#}", app.state(), e);
    }

    if let Err(e) = animations::set_static_color(&*leds, Rgbw::BLACK) {
        tracing::warn!("Failed to switch LEDs off: {}", e);
    }

    tracing::info!("Recorder shutdown complete");
    result
}

fn apply_debug_flag(handle: &reload::Handle<LevelFilter, Registry>, debug: bool) -> Result<()> {
    if debug {
        handle.modify(|filter| *filter = LevelFilter::DEBUG)?;
        tracing::debug!("Debug logging enabled");
    }
    Ok(())
}

use crate::animations;
use crate::audio::AudioFormat;
use crate::config::Config;
use crate::error::ApplianceError;
use crate::hardware::{ButtonPoller, LedStrip, Rgbw};
use crate::hooks::PowerManager;
use crate::messages::{Button, ControllerState, LoopFlag, ShutdownOutcome};
use crate::services::{Recorder, RecordingSession};

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub const SHUTDOWN_WINDOW: Duration = Duration::from_secs(10);
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);
/// The pulse outlasts the capture by this much
const PULSE_TAIL: Duration = Duration::from_millis(500);

const READY_COLOR: Rgbw = Rgbw::GREEN;
const SHUTDOWN_COLOR: Rgbw = Rgbw::RED;
const RECORD_COLOR: Rgbw = Rgbw::BLUE;

/// Standby / Shutdown / Record controller for the microphone array
pub struct App {
    state: ControllerState,
    running: LoopFlag,
    leds: Arc<dyn LedStrip>,
    buttons: ButtonPoller,
    recorder: Box<dyn Recorder>,
    power: Box<dyn PowerManager>,
    recordings_dir: PathBuf,
    filename_base: String,
    record_duration: Duration,
    format: AudioFormat,
    poll_interval: Duration,
}

impl App {
    pub fn new(
        config: &Config,
        running: LoopFlag,
        leds: Arc<dyn LedStrip>,
        buttons: ButtonPoller,
        recorder: Box<dyn Recorder>,
        power: Box<dyn PowerManager>,
    ) -> Result<Self> {
        let recordings_dir = config.recordings_dir()?;
        tracing::info!("Recordings are stored in {:?}", recordings_dir);

        Ok(Self {
            state: ControllerState::Standby,
            running,
            leds,
            buttons,
            recorder,
            power,
            recordings_dir,
            filename_base: config.filename_base.clone(),
            record_duration: config.record_duration(),
            format: config.audio_format(),
            poll_interval: config.poll_interval(),
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Run the activation loop until the loop flag is cleared
    pub async fn run(&mut self) -> Result<()> {
        while self.running.is_set() {
            self.step().await?;
        }
        tracing::info!("Activation loop finished");
        Ok(())
    }

    /// Execute the current state once and move to the next one
    pub async fn step(&mut self) -> Result<()> {
        tracing::debug!("step: current state = {:?}", self.state);

        self.state = match self.state {
            ControllerState::Standby => match self.standby().await? {
                Some(button) => transition(button),
                None => ControllerState::Standby,
            },
            ControllerState::Shutdown => {
                self.shutdown().await?;
                ControllerState::Standby
            }
            ControllerState::Record => {
                self.record().await?;
                ControllerState::Standby
            }
        };

        Ok(())
    }

    async fn standby(&mut self) -> Result<Option<Button>> {
        animations::set_static_color(&*self.leds, READY_COLOR)?;
        tracing::info!("Standby, waiting for a button");
        self.wait_for_press().await
    }

    /// Poll until a button is pressed; `None` once the loop flag is cleared
    async fn wait_for_press(&mut self) -> Result<Option<Button>> {
        loop {
            if !self.running.is_set() {
                return Ok(None);
            }
            if let Some(button) = self.buttons.poll()? {
                return Ok(Some(button));
            }
            tokio::select! {
                _ = self.running.cleared() => {}
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    async fn shutdown(&mut self) -> Result<ShutdownOutcome> {
        tracing::info!(
            "Shutdown in {:?}: front-left confirms, any other button cancels",
            SHUTDOWN_WINDOW
        );

        let token = self.running.animation_token();
        let countdown = tokio::spawn(animations::decreasing_steps(
            self.leds.clone(),
            SHUTDOWN_COLOR,
            SHUTDOWN_WINDOW,
            token.clone(),
        ));

        sleep(SHUTDOWN_GRACE).await;
        let outcome = self.watch_countdown(&countdown).await;

        // Stop the countdown on every path before joining it
        match outcome {
            Ok(ShutdownOutcome::Cancelled) => self.running.clear(),
            _ => token.cancel(),
        }
        let animation = countdown.await;

        let outcome = outcome?;
        animation.context("Shutdown animation task panicked")??;

        match outcome {
            ShutdownOutcome::Confirmed | ShutdownOutcome::Elapsed => {
                tracing::info!("Shutdown confirmed ({:?})", outcome);
                self.power.power_off();
            }
            ShutdownOutcome::Cancelled => {
                // Cancelling leaves the activation loop rather than going back to standby
                tracing::info!("Shutdown cancelled, stopping the control loop");
            }
            ShutdownOutcome::Interrupted => {
                tracing::info!("Shutdown countdown interrupted, host stays up");
            }
        }

        Ok(outcome)
    }

    async fn watch_countdown(
        &mut self,
        countdown: &JoinHandle<Result<(), ApplianceError>>,
    ) -> Result<ShutdownOutcome> {
        loop {
            if !self.running.is_set() {
                return Ok(ShutdownOutcome::Interrupted);
            }

            let finished = countdown.is_finished();

            if let Some(button) = self.buttons.poll()? {
                return Ok(match button {
                    Button::Button0 => ShutdownOutcome::Confirmed,
                    Button::Button1 | Button::Button2 => ShutdownOutcome::Cancelled,
                });
            }

            if finished {
                // The countdown also ends early when the loop flag is cleared
                if !self.running.is_set() {
                    return Ok(ShutdownOutcome::Interrupted);
                }
                return Ok(ShutdownOutcome::Elapsed);
            }

            sleep(self.poll_interval).await;
        }
    }

    async fn record(&mut self) -> Result<()> {
        animations::windmill(&*self.leds, RECORD_COLOR).await?;

        let session = match RecordingSession::next_in(
            &self.recordings_dir,
            &self.filename_base,
            self.record_duration,
            self.format,
        ) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Cannot start recording: {}", e);
                animations::set_static_color(&*self.leds, Rgbw::BLACK)?;
                return Ok(());
            }
        };

        let token = self.running.animation_token();
        let pulse = tokio::spawn(animations::pulsating(
            self.leds.clone(),
            RECORD_COLOR,
            self.record_duration + PULSE_TAIL,
            token.clone(),
        ));

        let result = self.recorder.record(&session).await;
        if result.is_err() {
            token.cancel();
        }
        let animation = pulse.await;

        match result {
            Ok(frames) => tracing::info!("Recorded {} frames to {:?}", frames, session.path),
            Err(e) => {
                tracing::error!("Recording to {:?} failed: {}", session.path, e);
                animations::set_static_color(&*self.leds, Rgbw::BLACK)?;
            }
        }

        animation.context("Recording animation task panicked")??;
        Ok(())
    }
}

/// Next state for a button pressed in standby
pub fn transition(button: Button) -> ControllerState {
    match button {
        Button::Button0 => ControllerState::Shutdown,
        Button::Button1 => ControllerState::Record,
        Button::Button2 => {
            tracing::info!("{:?} has no function", button);
            ControllerState::Standby
        }
    }
}

//! LED ring animations.
//!
//! Frame builders are plain functions so they can be checked without a
//! clock; the async runners push frames to a strip and stop early once their
//! cancellation token fires.

use crate::error::ApplianceError;
use crate::hardware::{LedStrip, Rgbw};
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

pub const PULSE_TICK: Duration = Duration::from_millis(10);

pub const WINDMILL_FRAMES: u32 = 60;
const WINDMILL_GROUP_OFFSETS: [f32; 5] = [0.0, 10.0, 20.0, 30.0, 40.0];
const WINDMILL_RAMP: f32 = 60.0;

/// Sweep groups for the 18-LED MATRIX Voice ring
const WINDMILL_GROUPS_18: [usize; 18] = [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 4, 4, 4];

pub fn set_static_color(strip: &dyn LedStrip, color: Rgbw) -> Result<(), ApplianceError> {
    strip.fill(color)
}

/// Light the whole ring, then switch one LED off per step until all are dark
pub async fn decreasing_steps(
    strip: Arc<dyn LedStrip>,
    color: Rgbw,
    total: Duration,
    token: CancellationToken,
) -> Result<(), ApplianceError> {
    let len = strip.len();
    if len == 0 {
        return Ok(());
    }

    let step = total / len as u32;
    let mut diodes = vec![color; len];
    strip.set(&diodes)?;

    for i in 0..len {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("Decreasing steps stopped after {} of {} steps", i, len);
                return Ok(());
            }
            _ = sleep(step) => {}
        }
        diodes[i] = Rgbw::BLACK;
        strip.set(&diodes)?;
    }

    Ok(())
}

/// Brightness of the pulse at a given 10 ms tick
pub fn pulse_intensity(tick: u32) -> f32 {
    (PI / 50.0 * tick as f32 * 0.4).cos() * 0.4 + 0.4
}

pub async fn pulsating(
    strip: Arc<dyn LedStrip>,
    color: Rgbw,
    time: Duration,
    token: CancellationToken,
) -> Result<(), ApplianceError> {
    let ticks = (time.as_secs_f64() / PULSE_TICK.as_secs_f64()).round() as u32;

    for tick in 0..ticks {
        if token.is_cancelled() {
            break;
        }
        strip.fill(color.scaled(pulse_intensity(tick)))?;

        tokio::select! {
            _ = token.cancelled() => break,
            _ = sleep(PULSE_TICK) => {}
        }
    }

    Ok(())
}

/// Group of an LED for the windmill sweep.
///
/// The 18-LED ring uses a fixed table; other lengths are cut into five
/// contiguous arcs.
pub fn windmill_group(index: usize, len: usize) -> usize {
    if len == WINDMILL_GROUPS_18.len() {
        return WINDMILL_GROUPS_18[index];
    }

    let groups = WINDMILL_GROUP_OFFSETS.len();
    (index * groups / len.max(1)).min(groups - 1)
}

pub fn windmill_frame(frame: u32, len: usize, color: Rgbw) -> Vec<Rgbw> {
    let progress = frame.min(WINDMILL_FRAMES - 1) as f32 * 100.0 / (WINDMILL_FRAMES - 1) as f32;

    (0..len)
        .map(|i| {
            let offset = WINDMILL_GROUP_OFFSETS[windmill_group(i, len)];
            color.scaled((progress - offset) / WINDMILL_RAMP)
        })
        .collect()
}

/// One-shot sweep that fills the ring with `color`
pub async fn windmill(strip: &dyn LedStrip, color: Rgbw) -> Result<(), ApplianceError> {
    let frame_time = Duration::from_secs(1) / WINDMILL_FRAMES;
    for frame in 0..WINDMILL_FRAMES {
        strip.set(&windmill_frame(frame, strip.len(), color))?;
        sleep(frame_time).await;
    }
    Ok(())
}

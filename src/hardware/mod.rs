pub mod buttons;
pub mod leds;

pub use buttons::{ButtonPoller, EvdevButtons};
pub use leds::{Everloop, LedStrip, Rgbw};

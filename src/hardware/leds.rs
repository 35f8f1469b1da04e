use crate::error::ApplianceError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// One LED value: red, green, blue, white
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgbw {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Rgbw {
    pub const BLACK: Rgbw = Rgbw::new(0, 0, 0, 0);
    pub const GREEN: Rgbw = Rgbw::new(0, 255, 0, 0);
    pub const RED: Rgbw = Rgbw::new(255, 0, 0, 0);
    pub const BLUE: Rgbw = Rgbw::new(0, 0, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    /// Scale every channel by `factor`, clamped to 0.0..=1.0
    pub fn scaled(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f32 * factor).round() as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            w: scale(self.w),
        }
    }
}

/// Addressable LED strip, written one whole frame at a time
pub trait LedStrip: Send + Sync {
    fn len(&self) -> usize;

    fn set(&self, colors: &[Rgbw]) -> Result<(), ApplianceError>;

    fn fill(&self, color: Rgbw) -> Result<(), ApplianceError> {
        self.set(&vec![color; self.len()])
    }
}

/// MATRIX everloop LED ring exposed as a character device.
///
/// Each write carries 4 bytes per LED in R, G, B, W order.
pub struct Everloop {
    device: Mutex<File>,
    len: usize,
}

impl Everloop {
    pub fn open(path: &Path, len: usize) -> Result<Self, ApplianceError> {
        let device = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| ApplianceError::hardware(&format!("open {}", path.display()), e))?;

        tracing::info!("Opened LED ring {} ({} LEDs)", path.display(), len);
        Ok(Self {
            device: Mutex::new(device),
            len,
        })
    }
}

impl LedStrip for Everloop {
    fn len(&self) -> usize {
        self.len
    }

    fn set(&self, colors: &[Rgbw]) -> Result<(), ApplianceError> {
        let frame = encode_frame(colors, self.len);
        let mut device = self
            .device
            .lock()
            .map_err(|_| ApplianceError::HardwareUnavailable("LED device lock poisoned".into()))?;
        device
            .write_all(&frame)
            .map_err(|e| ApplianceError::hardware("write LED frame", e))
    }
}

/// Pack colors into the everloop wire layout, padding missing LEDs with black
fn encode_frame(colors: &[Rgbw], len: usize) -> Vec<u8> {
    let mut frame = Vec::with_capacity(len * 4);
    for i in 0..len {
        let c = colors.get(i).copied().unwrap_or(Rgbw::BLACK);
        frame.extend_from_slice(&[c.r, c.g, c.b, c.w]);
    }
    frame
}

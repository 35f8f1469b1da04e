// NOTE: Capture and encoding assume 16-bit signed integer PCM throughout.
// Samples stay interleaved i16 from the device callback to the WAV file.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per chunk read from the device
    pub chunk_size: usize,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;
    pub const ARRAY_CHANNELS: u16 = 8;

    pub fn new(sample_rate: u32, chunk_size: usize) -> Self {
        Self {
            sample_rate,
            channels: Self::ARRAY_CHANNELS,
            chunk_size,
        }
    }

    /// Calculate number of frames for a given duration in seconds
    pub fn frames_for_duration(&self, seconds: f32) -> usize {
        (self.sample_rate as f64 * seconds as f64) as usize
    }

    /// Number of whole chunks needed to cover `seconds`; the last one may overshoot
    pub fn chunks_for_duration(&self, seconds: f32) -> usize {
        let frames = self.sample_rate as f64 * seconds as f64;
        (frames / self.chunk_size as f64).ceil() as usize
    }

    /// Interleaved samples in one chunk
    pub fn samples_per_chunk(&self) -> usize {
        self.chunk_size * self.channels as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(16000, 2048)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_round_up() {
        let format = AudioFormat::default();
        // 5 s at 16 kHz = 80000 frames = 39.06 chunks of 2048
        assert_eq!(format.chunks_for_duration(5.0), 40);

        let exact = AudioFormat::new(16000, 1000);
        assert_eq!(exact.chunks_for_duration(2.0), 32);
    }

    #[test]
    fn test_chunk_samples_are_interleaved() {
        let format = AudioFormat::new(32000, 2048);
        assert_eq!(format.channels, 8);
        assert_eq!(format.samples_per_chunk(), 2048 * 8);
        assert_eq!(format.frames_for_duration(0.5), 16000);
    }
}

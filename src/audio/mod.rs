pub mod capture;
pub mod format;
pub mod paths;
pub mod wav_sink;

pub use capture::AudioCapture;
pub use format::AudioFormat;

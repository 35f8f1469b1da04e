use crate::audio::{AudioCapture, AudioFormat, paths};
use crate::error::ApplianceError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One fixed-length capture to a numbered WAV file
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSession {
    pub path: PathBuf,
    pub duration: Duration,
    pub format: AudioFormat,
}

impl RecordingSession {
    /// Derive the next free `<base>_<N>.wav` in `dir`
    pub fn next_in(
        dir: &Path,
        base: &str,
        duration: Duration,
        format: AudioFormat,
    ) -> Result<Self, ApplianceError> {
        Ok(Self {
            path: paths::next_recording_path(dir, base)?,
            duration,
            format,
        })
    }
}

/// Captures a session to disk, returning the number of frames written.
///
/// Not `Send`: the device stream lives on the calling task.
#[async_trait(?Send)]
pub trait Recorder {
    async fn record(&mut self, session: &RecordingSession) -> Result<u32, ApplianceError>;
}

/// Records the microphone array through the default input device
pub struct MicArrayRecorder;

#[async_trait(?Send)]
impl Recorder for MicArrayRecorder {
    async fn record(&mut self, session: &RecordingSession) -> Result<u32, ApplianceError> {
        tracing::info!("Recording to {:?}", session.path);
        let frames = AudioCapture::record_to_wav(
            session.format,
            session.duration.as_secs_f32(),
            &session.path,
        )
        .await?;
        tracing::info!("Saved {} frames to {:?}", frames, session.path);
        Ok(frames)
    }
}

use super::format::AudioFormat;
use crate::error::ApplianceError;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

enum WavCommand {
    WriteChunk(Vec<i16>),
    Finalize {
        reply: oneshot::Sender<Result<u32, ApplianceError>>,
    },
    Discard {
        reply: oneshot::Sender<Result<(), ApplianceError>>,
    },
}

/// WAV encoder using a dedicated blocking thread for I/O
///
/// Chunks are handed to the thread over a channel and written verbatim, in
/// arrival order, so the capture loop never waits on the disk.
pub struct WavSink {
    tx: mpsc::UnboundedSender<WavCommand>,
}

impl WavSink {
    pub fn create(path: &Path, format: AudioFormat) -> Result<Self, ApplianceError> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec).map_err(|e| wav_error(path, e))?;
        let path = path.to_path_buf();

        let (tx, mut rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let mut failure: Option<hound::Error> = None;

            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    WavCommand::WriteChunk(samples) => {
                        if failure.is_some() {
                            continue;
                        }
                        for sample in samples {
                            if let Err(e) = writer.write_sample(sample) {
                                tracing::error!("Failed to write sample to {:?}: {}", path, e);
                                failure = Some(e);
                                break;
                            }
                        }
                    }
                    WavCommand::Finalize { reply } => {
                        let frames = writer.duration();
                        let result = match failure {
                            Some(e) => Err(wav_error(&path, e)),
                            None => writer
                                .finalize()
                                .map(|_| frames)
                                .map_err(|e| wav_error(&path, e)),
                        };
                        let _ = reply.send(result);
                        return;
                    }
                    WavCommand::Discard { reply } => {
                        drop(writer);
                        let result = std::fs::remove_file(&path)
                            .map_err(|e| ApplianceError::filesystem(path.clone(), e));
                        let _ = reply.send(result);
                        return;
                    }
                }
            }
        });

        Ok(Self { tx })
    }

    /// Queue one interleaved chunk; the Vec is moved to avoid copying
    pub fn write_chunk(&mut self, samples: Vec<i16>) -> Result<(), ApplianceError> {
        self.tx
            .send(WavCommand::WriteChunk(samples))
            .map_err(|_| writer_gone())
    }

    /// Flush the header and close the file, returning the frame count
    pub async fn finalize(self) -> Result<u32, ApplianceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WavCommand::Finalize { reply })
            .map_err(|_| writer_gone())?;

        rx.await.map_err(|_| writer_gone())?
    }

    /// Close the file without finishing it and delete it from disk
    pub async fn discard(self) -> Result<(), ApplianceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WavCommand::Discard { reply })
            .map_err(|_| writer_gone())?;

        rx.await.map_err(|_| writer_gone())?
    }
}

fn wav_error(path: &Path, err: hound::Error) -> ApplianceError {
    let source = match err {
        hound::Error::IoError(e) => e,
        other => std::io::Error::other(other.to_string()),
    };
    ApplianceError::filesystem(PathBuf::from(path), source)
}

fn writer_gone() -> ApplianceError {
    ApplianceError::filesystem(
        PathBuf::new(),
        std::io::Error::other("WAV writer thread exited"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_are_written_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let format = AudioFormat::new(16000, 4);

        let mut sink = WavSink::create(&path, format).unwrap();
        let first: Vec<i16> = (0..32).collect();
        let second: Vec<i16> = (32..64).map(|s| -s).collect();
        sink.write_chunk(first.clone()).unwrap();
        sink.write_chunk(second.clone()).unwrap();
        let frames = sink.finalize().await.unwrap();

        assert_eq!(frames, 8);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 8);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.sample_format, SampleFormat::Int);
        assert_eq!(reader.duration(), 8);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        let expected: Vec<i16> = first.into_iter().chain(second).collect();
        assert_eq!(samples, expected);
    }

    #[tokio::test]
    async fn test_discard_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording_3.wav");

        let mut sink = WavSink::create(&path, AudioFormat::new(16000, 4)).unwrap();
        sink.write_chunk(vec![1; 32]).unwrap();
        assert!(path.exists());

        sink.discard().await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");

        let err = WavSink::create(&path, AudioFormat::default()).err().unwrap();
        assert!(matches!(err, ApplianceError::Filesystem { .. }));
    }
}

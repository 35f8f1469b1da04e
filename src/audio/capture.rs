use super::format::AudioFormat;
use super::wav_sink::WavSink;
use crate::error::ApplianceError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapRb, traits::*};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Chunks of headroom between the device callback and the reader
const RING_CHUNKS: usize = 16;

pub struct AudioCapture;

impl AudioCapture {
    /// Capture `seconds` of audio from the default input device into a WAV file.
    ///
    /// Reads whole chunks until the duration is covered, so the file may be up
    /// to one chunk longer than requested. Returns the number of frames written.
    /// The device is held for the whole capture and released before the file
    /// is finalized.
    pub async fn record_to_wav(
        format: AudioFormat,
        seconds: f32,
        path: &Path,
    ) -> Result<u32, ApplianceError> {
        let ring = HeapRb::<i16>::new(format.samples_per_chunk() * RING_CHUNKS);
        let (mut producer, consumer) = ring.split();

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            ApplianceError::HardwareUnavailable("No input audio device available".into())
        })?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let notify = Arc::new(Notify::new());
        let failed = Arc::new(AtomicBool::new(false));
        let notify_callback = notify.clone();
        let notify_error = notify.clone();
        let failed_callback = failed.clone();
        let dropped = Arc::new(AtomicUsize::new(0));
        let dropped_callback = dropped.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[i16], _info: &cpal::InputCallbackInfo| {
                    push_samples(&mut producer, data, &dropped_callback);
                    notify_callback.notify_one();
                },
                move |err| {
                    tracing::error!("Audio stream error: {}", err);
                    failed_callback.store(true, Ordering::Release);
                    notify_error.notify_one();
                },
                None,
            )
            .map_err(|e| ApplianceError::hardware("build input stream", e))?;

        stream
            .play()
            .map_err(|e| ApplianceError::hardware("start input stream", e))?;

        let mut sink = WavSink::create(path, format)?;
        let mut chunks = ChunkReader::new(consumer, notify, failed, format.samples_per_chunk());
        let chunk_count = format.chunks_for_duration(seconds);

        tracing::info!(
            "Recording {} chunks for {} frames ({} Hz, {} channels)",
            chunk_count,
            format.frames_for_duration(seconds),
            format.sample_rate,
            format.channels
        );

        let copied = chunks.copy_into(&mut sink, chunk_count).await;

        // Stop the device before closing the file
        drop(stream);
        report_dropped(&dropped);

        if let Err(e) = copied {
            match sink.discard().await {
                Ok(()) => tracing::warn!("Discarded incomplete recording {:?}", path),
                Err(discard) => {
                    tracing::error!("Failed to remove incomplete recording {:?}: {}", path, discard)
                }
            }
            return Err(e);
        }
        tracing::info!("Recording done");

        sink.finalize().await
    }
}

/// Push device samples into the ring, counting what does not fit.
///
/// Runs on the real-time audio thread, so it never logs.
fn push_samples<P: Producer<Item = i16>>(producer: &mut P, data: &[i16], dropped: &AtomicUsize) {
    let pushed = producer.push_slice(data);
    if pushed < data.len() {
        dropped.fetch_add(data.len() - pushed, Ordering::Relaxed);
    }
}

fn report_dropped(dropped: &AtomicUsize) {
    let count = dropped.load(Ordering::Relaxed);
    if count > 0 {
        tracing::warn!("Capture buffer overflowed, dropped {} samples", count);
    }
}

/// Pulls fixed-size chunks out of the capture ring buffer.
///
/// The device callback fills the ring and pings `notify`; a ping that arrives
/// while nobody waits is kept as a permit, so no wakeup is lost.
pub struct ChunkReader<C> {
    consumer: C,
    notify: Arc<Notify>,
    failed: Arc<AtomicBool>,
    chunk_samples: usize,
}

impl<C: Consumer<Item = i16>> ChunkReader<C> {
    pub fn new(
        consumer: C,
        notify: Arc<Notify>,
        failed: Arc<AtomicBool>,
        chunk_samples: usize,
    ) -> Self {
        Self {
            consumer,
            notify,
            failed,
            chunk_samples,
        }
    }

    pub async fn next_chunk(&mut self) -> Result<Vec<i16>, ApplianceError> {
        loop {
            if self.consumer.occupied_len() >= self.chunk_samples {
                let mut chunk = vec![0i16; self.chunk_samples];
                let n = self.consumer.pop_slice(&mut chunk);
                chunk.truncate(n);
                return Ok(chunk);
            }

            if self.failed.load(Ordering::Acquire) {
                return Err(ApplianceError::HardwareUnavailable(
                    "input stream failed during capture".into(),
                ));
            }

            self.notify.notified().await;
        }
    }

    /// Move `count` chunks into the sink, in arrival order
    pub async fn copy_into(&mut self, sink: &mut WavSink, count: usize) -> Result<(), ApplianceError> {
        for i in 0..count {
            let chunk = self.next_chunk().await?;
            tracing::debug!("Chunk {}/{} captured", i + 1, count);
            sink.write_chunk(chunk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_are_split_in_arrival_order() {
        let (mut producer, consumer) = HeapRb::<i16>::new(64).split();
        let notify = Arc::new(Notify::new());
        let failed = Arc::new(AtomicBool::new(false));
        let mut reader = ChunkReader::new(consumer, notify.clone(), failed, 4);

        let samples: Vec<i16> = (0..10).collect();
        producer.push_slice(&samples);
        notify.notify_one();

        assert_eq!(reader.next_chunk().await.unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(reader.next_chunk().await.unwrap(), vec![4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_reader_waits_for_a_full_chunk() {
        let (mut producer, consumer) = HeapRb::<i16>::new(64).split();
        let notify = Arc::new(Notify::new());
        let failed = Arc::new(AtomicBool::new(false));
        let mut reader = ChunkReader::new(consumer, notify.clone(), failed, 4);

        let feeder_notify = notify.clone();
        let feeder = tokio::spawn(async move {
            for s in 0..4i16 {
                tokio::task::yield_now().await;
                producer.push_slice(&[s]);
                feeder_notify.notify_one();
            }
            producer
        });

        assert_eq!(reader.next_chunk().await.unwrap(), vec![0, 1, 2, 3]);
        feeder.await.unwrap();
    }

    #[tokio::test]
    async fn test_wav_covers_requested_duration_within_one_chunk() {
        let format = AudioFormat::new(16000, 1024);
        let seconds = 0.3;
        let chunk_count = format.chunks_for_duration(seconds);

        let (mut producer, consumer) =
            HeapRb::<i16>::new(format.samples_per_chunk() * (chunk_count + 1)).split();
        let notify = Arc::new(Notify::new());
        let failed = Arc::new(AtomicBool::new(false));
        let samples = vec![7i16; format.samples_per_chunk() * chunk_count + 100];
        producer.push_slice(&samples);
        notify.notify_one();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.wav");
        let mut sink = WavSink::create(&path, format).unwrap();
        let mut reader = ChunkReader::new(consumer, notify, failed, format.samples_per_chunk());
        reader.copy_into(&mut sink, chunk_count).await.unwrap();
        let frames = sink.finalize().await.unwrap() as usize;

        let requested = format.frames_for_duration(seconds);
        assert!(frames >= requested);
        assert!(frames <= requested + format.chunk_size);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 8);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.duration() as usize, frames);
    }

    #[test]
    fn test_overflow_is_counted_not_pushed() {
        let (mut producer, mut consumer) = HeapRb::<i16>::new(6).split();
        let dropped = AtomicUsize::new(0);

        push_samples(&mut producer, &[1, 2, 3, 4], &dropped);
        assert_eq!(dropped.load(Ordering::Relaxed), 0);

        push_samples(&mut producer, &[5, 6, 7, 8], &dropped);
        push_samples(&mut producer, &[9], &dropped);
        assert_eq!(dropped.load(Ordering::Relaxed), 3);

        let mut out = [0i16; 6];
        assert_eq!(consumer.pop_slice(&mut out), 6);
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_failed_capture_leaves_no_partial_file() {
        let format = AudioFormat::new(16000, 4);
        let (mut producer, consumer) = HeapRb::<i16>::new(256).split();
        let notify = Arc::new(Notify::new());
        let failed = Arc::new(AtomicBool::new(false));
        producer.push_slice(&[1i16; 32]);
        failed.store(true, Ordering::Release);
        notify.notify_one();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording_0.wav");
        let mut sink = WavSink::create(&path, format).unwrap();
        let mut reader = ChunkReader::new(consumer, notify, failed, format.samples_per_chunk());

        // One chunk is buffered, the second never arrives
        assert!(reader.copy_into(&mut sink, 2).await.is_err());
        sink.discard().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stream_failure_ends_capture() {
        let (_producer, consumer) = HeapRb::<i16>::new(64).split();
        let notify = Arc::new(Notify::new());
        let failed = Arc::new(AtomicBool::new(false));
        let mut reader = ChunkReader::new(consumer, notify.clone(), failed.clone(), 4);

        failed.store(true, Ordering::Release);
        notify.notify_one();

        assert!(matches!(
            reader.next_chunk().await,
            Err(ApplianceError::HardwareUnavailable(_))
        ));
    }
}

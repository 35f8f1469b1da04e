pub mod recorder;

pub use recorder::{MicArrayRecorder, Recorder, RecordingSession};

use std::path::PathBuf;

/// Failures of the appliance hardware and recording pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ApplianceError {
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Invalid button event: no button at index {0}")]
    InvalidButtonEvent(usize),

    #[error("Filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApplianceError {
    pub fn hardware(what: &str, err: impl std::fmt::Display) -> Self {
        Self::HardwareUnavailable(format!("{}: {}", what, err))
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

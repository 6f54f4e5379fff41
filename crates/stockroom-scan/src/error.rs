//! # Scan Error Types

use thiserror::Error;

pub type ScanResult<T> = Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No camera at index {0}")]
    CameraUnavailable(u32),

    #[error("Failed to read frame: {0}")]
    FrameRead(String),

    /// Pixel buffer does not match the stated dimensions.
    #[error("Invalid frame: expected {expected} bytes for {width}x{height}, got {actual}")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Decoder failed: {0}")]
    Decode(String),

    #[error("Malformed payload: {0}")]
    Payload(#[from] stockroom_core::ValidationError),

    #[error("Scanner is not running")]
    NotRunning,

    /// The blocking capture task panicked or was cancelled.
    #[error("Capture worker failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Transient errors the polling loop logs and moves past; anything
    /// else stops it.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScanError::FrameRead(_) | ScanError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScanError::FrameRead("timeout".into()).is_transient());
        assert!(ScanError::Decode("bad symbol".into()).is_transient());
        assert!(!ScanError::CameraUnavailable(0).is_transient());
        assert!(!ScanError::Worker("panicked".into()).is_transient());
    }
}

//! # stockroom-scan: Barcode Acquisition
//!
//! Two ways a payload gets into the tool:
//!
//! - [`scanner`] - camera polling loop over the [`frame`] seams
//! - [`wedge`] - line reader for handheld keyboard-wedge scanners
//! - `camera` (feature `camera`) - nokhwa capture and rxing decoding

#[cfg(feature = "camera")]
pub mod camera;
pub mod error;
pub mod frame;
pub mod scanner;
pub mod wedge;

pub use error::{ScanError, ScanResult};
pub use frame::{probe_cameras, CameraBackend, Frame, FrameSource, GrayImage, SymbolDecoder, DEFAULT_PROBE_RANGE};
pub use scanner::{ScanConfig, ScanEvent, Scanner, ScannerHandle};
pub use wedge::WedgeReader;

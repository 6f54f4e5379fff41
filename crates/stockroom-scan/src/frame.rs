//! # Frames and Capture Seams
//!
//! Capture hardware and the data-matrix decoder plug in through
//! [`CameraBackend`], [`FrameSource`] and [`SymbolDecoder`]. The `camera`
//! feature provides implementations of all three.

use std::ops::Range;
use std::time::Duration;
use tracing::debug;

use crate::error::{ScanError, ScanResult};

/// Camera indices probed by default.
pub const DEFAULT_PROBE_RANGE: Range<u32> = 0..5;

// =============================================================================
// Frame Types
// =============================================================================

/// A captured frame, 8-bit BGR, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    bgr: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, bgr: Vec<u8>) -> ScanResult<Self> {
        let expected = width as usize * height as usize * 3;
        if bgr.len() != expected {
            return Err(ScanError::InvalidFrame {
                width,
                height,
                expected,
                actual: bgr.len(),
            });
        }
        Ok(Frame { width, height, bgr })
    }

    /// Builds a frame from RGB bytes, as most capture APIs deliver them.
    pub fn from_rgb(width: u32, height: u32, mut rgb: Vec<u8>) -> ScanResult<Self> {
        for px in rgb.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        Frame::new(width, height, rgb)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// BT.601 luma: `0.299 R + 0.587 G + 0.114 B`, in fixed point.
    pub fn to_gray(&self) -> GrayImage {
        let pixels = self
            .bgr
            .chunks_exact(3)
            .map(|px| {
                let (b, g, r) = (px[0] as u32, px[1] as u32, px[2] as u32);
                ((77 * r + 150 * g + 29 * b + 128) >> 8) as u8
            })
            .collect();

        GrayImage {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// Single-channel 8-bit image handed to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

// =============================================================================
// Seams
// =============================================================================

/// An open camera.
pub trait FrameSource: Send {
    fn read_frame(&mut self) -> ScanResult<Frame>;
}

/// Opens cameras by index.
pub trait CameraBackend: Send + Sync {
    fn open(&self, index: u32) -> ScanResult<Box<dyn FrameSource>>;
}

/// Data-matrix decoder.
///
/// Implementations must give up after `timeout` and return at most
/// `max_symbols` payloads.
pub trait SymbolDecoder: Send {
    fn decode(&mut self, image: &GrayImage, timeout: Duration, max_symbols: usize) -> ScanResult<Vec<Vec<u8>>>;
}

/// Indices in `range` that open and deliver a frame.
pub fn probe_cameras(backend: &dyn CameraBackend, range: Range<u32>) -> Vec<u32> {
    range
        .filter(|&index| match backend.open(index) {
            Ok(mut source) => match source.read_frame() {
                Ok(_) => true,
                Err(e) => {
                    debug!(index, error = %e, "Camera opened but gave no frame");
                    false
                }
            },
            Err(_) => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank;

    impl FrameSource for Blank {
        fn read_frame(&mut self) -> ScanResult<Frame> {
            Frame::new(1, 1, vec![0, 0, 0])
        }
    }

    struct Broken;

    impl FrameSource for Broken {
        fn read_frame(&mut self) -> ScanResult<Frame> {
            Err(ScanError::FrameRead("no signal".into()))
        }
    }

    /// Camera 0 works, camera 2 opens but is dead, the rest are absent.
    struct Rig;

    impl CameraBackend for Rig {
        fn open(&self, index: u32) -> ScanResult<Box<dyn FrameSource>> {
            match index {
                0 => Ok(Box::new(Blank)),
                2 => Ok(Box::new(Broken)),
                other => Err(ScanError::CameraUnavailable(other)),
            }
        }
    }

    #[test]
    fn test_only_cameras_with_frames_are_listed() {
        assert_eq!(probe_cameras(&Rig, DEFAULT_PROBE_RANGE), vec![0]);
    }

    #[test]
    fn test_frame_size_is_checked() {
        assert!(matches!(
            Frame::new(2, 2, vec![0; 11]),
            Err(ScanError::InvalidFrame { expected: 12, actual: 11, .. })
        ));
    }

    #[test]
    fn test_rgb_frames_are_reordered() {
        let frame = Frame::from_rgb(1, 1, vec![255, 0, 0]).unwrap();
        assert_eq!(frame.to_gray().pixels, vec![77]);
    }

    #[test]
    fn test_gray_conversion() {
        // white, black, pure red, pure green, pure blue
        let frame = Frame::new(
            5,
            1,
            vec![255, 255, 255, 0, 0, 0, 0, 0, 255, 0, 255, 0, 255, 0, 0],
        )
        .unwrap();
        let gray = frame.to_gray();
        assert_eq!(gray.pixels, vec![255, 0, 77, 149, 29]);
        assert_eq!((gray.width, gray.height), (5, 1));
    }
}

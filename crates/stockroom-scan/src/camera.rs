//! # Camera Capture and Data-Matrix Decoding
//!
//! Enabled by the `camera` feature.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NokhwaBackend::open(i)                                                 │
//! │     │ spawns "camera-i" thread, which owns the nokhwa Camera            │
//! │     ▼                                                                   │
//! │  CameraThread ──request──► thread: camera.frame() ──► RGB ──► Frame     │
//! │               ◄──frame────                                              │
//! │                                                                         │
//! │  RxingDecoder: GrayImage ──► rxing (DATA_MATRIX only) ──► payload bytes │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The camera lives on its own thread because capture handles are not
//! `Send` on every platform; the scanner only sees channel ends.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use rxing::BarcodeFormat;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{ScanError, ScanResult};
use crate::frame::{CameraBackend, Frame, FrameSource, GrayImage, SymbolDecoder};

// =============================================================================
// Capture
// =============================================================================

/// Opens system cameras through nokhwa.
#[derive(Debug, Default, Clone, Copy)]
pub struct NokhwaBackend;

impl CameraBackend for NokhwaBackend {
    fn open(&self, index: u32) -> ScanResult<Box<dyn FrameSource>> {
        Ok(Box::new(CameraThread::spawn(index)?))
    }
}

/// Request/response channel to the thread that owns the camera.
///
/// Dropping it closes the request channel; the thread then stops the
/// stream and exits.
struct CameraThread {
    index: u32,
    requests: SyncSender<()>,
    frames: Receiver<ScanResult<Frame>>,
}

impl CameraThread {
    fn spawn(index: u32) -> ScanResult<Self> {
        let (request_tx, request_rx) = sync_channel::<()>(1);
        let (frame_tx, frame_rx) = sync_channel::<ScanResult<Frame>>(1);
        let (ready_tx, ready_rx) = sync_channel::<ScanResult<()>>(1);

        std::thread::Builder::new()
            .name(format!("camera-{}", index))
            .spawn(move || {
                let mut camera = match open_stream(index) {
                    Ok(camera) => {
                        let _ = ready_tx.send(Ok(()));
                        camera
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while request_rx.recv().is_ok() {
                    if frame_tx.send(capture(&mut camera)).is_err() {
                        break;
                    }
                }

                if let Err(e) = camera.stop_stream() {
                    debug!(index, error = %e, "Stopping camera stream failed");
                }
                debug!(index, "Camera thread exited");
            })?;

        ready_rx.recv().map_err(|_| ScanError::CameraUnavailable(index))??;
        info!(index, "Camera opened");

        Ok(CameraThread {
            index,
            requests: request_tx,
            frames: frame_rx,
        })
    }
}

impl FrameSource for CameraThread {
    fn read_frame(&mut self) -> ScanResult<Frame> {
        let gone = || ScanError::FrameRead(format!("camera {} thread exited", self.index));
        self.requests.send(()).map_err(|_| gone())?;
        self.frames.recv().map_err(|_| gone())?
    }
}

fn open_stream(index: u32) -> ScanResult<Camera> {
    let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

    let mut camera = Camera::new(CameraIndex::Index(index), format).map_err(|e| {
        debug!(index, error = %e, "Camera did not open");
        ScanError::CameraUnavailable(index)
    })?;
    camera.open_stream().map_err(|e| {
        warn!(index, error = %e, "Camera stream did not start");
        ScanError::CameraUnavailable(index)
    })?;

    Ok(camera)
}

fn capture(camera: &mut Camera) -> ScanResult<Frame> {
    let buffer = camera.frame().map_err(|e| ScanError::FrameRead(e.to_string()))?;
    let image = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| ScanError::FrameRead(e.to_string()))?;

    Frame::from_rgb(image.width(), image.height(), image.into_raw())
}

// =============================================================================
// Decoding
// =============================================================================

/// Data-matrix decoder backed by rxing.
///
/// rxing has no deadline of its own; a decode that overruns the budget is
/// still returned, and logged so a slow camera resolution shows up.
#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl SymbolDecoder for RxingDecoder {
    fn decode(&mut self, image: &GrayImage, timeout: Duration, max_symbols: usize) -> ScanResult<Vec<Vec<u8>>> {
        let started = Instant::now();
        let result = rxing::helpers::detect_in_luma(
            image.pixels.clone(),
            image.width,
            image.height,
            Some(BarcodeFormat::DATA_MATRIX),
        );

        let elapsed = started.elapsed();
        if elapsed > timeout {
            debug!(?elapsed, ?timeout, "Decode overran its budget");
        }

        match result {
            Ok(symbol) if max_symbols > 0 => Ok(vec![symbol.getText().as_bytes().to_vec()]),
            Ok(_) => Ok(Vec::new()),
            Err(e) => {
                debug!(error = %e, "No symbol in frame");
                Ok(Vec::new())
            }
        }
    }
}

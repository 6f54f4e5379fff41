//! # Acquisition Loop
//!
//! Polls a [`FrameSource`] on a fixed interval and hands each frame to a
//! [`SymbolDecoder`].
//!
//! ## Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  every 1/15 s (missed ticks skipped) while not paused:                  │
//! │                                                                         │
//! │    spawn_blocking {                                                     │
//! │      read_frame ──err──► transient: warn!, next tick; else stop         │
//! │          │                                                              │
//! │      to_gray ──► decode(≤50 ms, ≤1 symbol) ──none──► next tick          │
//! │                          │                                              │
//! │      flush 20 frames ◄───┘                                              │
//! │    }                                                                    │
//! │        │                                                                │
//! │    ScanEvent::Decoded ──► pause                                         │
//! │                                                                         │
//! │  control channel: Pause │ Resume │ Stop (also on handle drop)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pausing after a decode keeps the same bag from being reported twice
//! while the user is still editing its record. The caller resumes once the
//! record is saved or discarded.

use std::time::Duration;
use stockroom_core::Barcode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{ScanError, ScanResult};
use crate::frame::{FrameSource, SymbolDecoder};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Polling rate in frames per second.
    pub frame_rate: u32,
    /// Upper bound handed to the decoder per frame.
    pub decode_timeout: Duration,
    /// Symbols requested per frame.
    pub max_symbols: usize,
    /// Frames discarded after a successful decode.
    pub flush_frames: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            frame_rate: 15,
            decode_timeout: Duration::from_millis(50),
            max_symbols: 1,
            flush_frames: 20,
        }
    }
}

impl ScanConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

// =============================================================================
// Events and Control
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A payload was decoded; polling is now paused.
    Decoded(Barcode),
}

#[derive(Debug)]
enum Control {
    Pause,
    Resume,
    Stop,
}

/// Handle for controlling a running scanner.
#[derive(Clone)]
pub struct ScannerHandle {
    control_tx: mpsc::Sender<Control>,
}

impl ScannerHandle {
    pub async fn pause(&self) -> ScanResult<()> {
        self.send(Control::Pause).await
    }

    /// Resumes polling, typically after the decoded record was handled.
    pub async fn resume(&self) -> ScanResult<()> {
        self.send(Control::Resume).await
    }

    /// Stops the loop; the frame source is dropped when it exits.
    pub async fn stop(&self) -> ScanResult<()> {
        self.send(Control::Stop).await
    }

    async fn send(&self, control: Control) -> ScanResult<()> {
        self.control_tx.send(control).await.map_err(|_| ScanError::NotRunning)
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// Camera and decoder, moved onto a blocking thread for each poll.
struct Capture {
    source: Box<dyn FrameSource>,
    decoder: Box<dyn SymbolDecoder>,
}

impl Capture {
    /// One frame through the decoder; a hit is followed by the flush.
    fn poll(&mut self, config: &ScanConfig) -> ScanResult<Option<Barcode>> {
        let frame = self.source.read_frame()?;
        let gray = frame.to_gray();
        let symbols = self.decoder.decode(&gray, config.decode_timeout, config.max_symbols)?;

        let found = symbols
            .into_iter()
            .find(|payload| !payload.is_empty())
            .map(Barcode::new);
        if found.is_some() {
            self.flush(config.flush_frames);
        }
        Ok(found)
    }

    fn flush(&mut self, frames: usize) {
        for _ in 0..frames {
            if let Err(e) = self.source.read_frame() {
                debug!(error = %e, "Read failed during flush");
            }
        }
    }
}

pub struct Scanner {
    capture: Option<Capture>,
    config: ScanConfig,
    events_tx: mpsc::Sender<ScanEvent>,
    control_rx: mpsc::Receiver<Control>,
    paused: bool,
}

impl Scanner {
    /// Creates a scanner, its control handle and the event stream.
    pub fn new(
        source: Box<dyn FrameSource>,
        decoder: Box<dyn SymbolDecoder>,
        config: ScanConfig,
    ) -> (Self, ScannerHandle, mpsc::Receiver<ScanEvent>) {
        let (events_tx, events_rx) = mpsc::channel(8);
        let (control_tx, control_rx) = mpsc::channel(8);

        let scanner = Scanner {
            capture: Some(Capture { source, decoder }),
            config,
            events_tx,
            control_rx,
            paused: false,
        };

        (scanner, ScannerHandle { control_tx }, events_rx)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs the polling loop until stopped, the handle is dropped, the
    /// event receiver goes away, or the capture fails for good.
    pub async fn run(mut self) {
        info!(fps = self.config.frame_rate, "Scanner starting");

        let mut interval = tokio::time::interval(self.config.frame_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick(), if !self.paused => {
                    match self.poll_once().await {
                        Ok(Some(barcode)) => {
                            info!(barcode = %barcode, "Barcode decoded");
                            self.paused = true;
                            if self.events_tx.send(ScanEvent::Decoded(barcode)).await.is_err() {
                                debug!("Event receiver dropped");
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) if e.is_transient() => warn!(error = %e, "Frame skipped"),
                        Err(e) => {
                            error!(error = %e, "Scanner capture failed");
                            break;
                        }
                    }
                }

                control = self.control_rx.recv() => match control {
                    Some(Control::Pause) => {
                        debug!("Scanner paused");
                        self.paused = true;
                    }
                    Some(Control::Resume) => {
                        debug!("Scanner resumed");
                        self.paused = false;
                        interval.reset();
                    }
                    Some(Control::Stop) | None => break,
                },
            }
        }

        info!("Scanner stopped");
    }

    async fn poll_once(&mut self) -> ScanResult<Option<Barcode>> {
        let mut capture = self.capture.take().ok_or(ScanError::NotRunning)?;
        let config = self.config.clone();

        let (capture, result) = tokio::task::spawn_blocking(move || {
            let result = capture.poll(&config);
            (capture, result)
        })
        .await
        .map_err(|e| ScanError::Worker(e.to_string()))?;

        self.capture = Some(capture);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, GrayImage};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts reads; fails the first `failures` of them.
    struct CountingSource {
        reads: Arc<AtomicUsize>,
        failures: usize,
        dropped: Arc<AtomicBool>,
    }

    impl FrameSource for CountingSource {
        fn read_frame(&mut self) -> ScanResult<Frame> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(ScanError::FrameRead("usb hiccup".into()));
            }
            Frame::new(2, 1, vec![10, 20, 30, 40, 50, 60])
        }
    }

    impl Drop for CountingSource {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    /// Finds a symbol on the `hit_on`th call (1-based), nothing otherwise.
    struct ScriptedDecoder {
        calls: Arc<AtomicUsize>,
        hit_on: usize,
    }

    impl SymbolDecoder for ScriptedDecoder {
        fn decode(&mut self, image: &GrayImage, timeout: Duration, max_symbols: usize) -> ScanResult<Vec<Vec<u8>>> {
            assert_eq!(timeout, Duration::from_millis(50));
            assert_eq!(max_symbols, 1);
            assert_eq!(image.pixels.len(), 2);

            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.hit_on {
                Ok(vec![b"\x1dP123-ND\x1d1PRC0603\x1dQ10".to_vec()])
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct Rig {
        reads: Arc<AtomicUsize>,
        decodes: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
        handle: ScannerHandle,
        events: mpsc::Receiver<ScanEvent>,
        task: JoinHandle<()>,
    }

    fn start(failures: usize, hit_on: usize) -> Rig {
        let reads = Arc::new(AtomicUsize::new(0));
        let decodes = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));

        let source = CountingSource {
            reads: reads.clone(),
            failures,
            dropped: dropped.clone(),
        };
        let decoder = ScriptedDecoder {
            calls: decodes.clone(),
            hit_on,
        };

        let (scanner, handle, events) = Scanner::new(Box::new(source), Box::new(decoder), ScanConfig::default());
        let task = scanner.spawn();

        Rig {
            reads,
            decodes,
            dropped,
            handle,
            events,
            task,
        }
    }

    #[test]
    fn test_default_rate() {
        assert_eq!(ScanConfig::default().frame_interval(), Duration::from_nanos(66_666_666));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_pauses_and_flushes() {
        let mut rig = start(0, 3);

        let event = rig.events.recv().await.unwrap();
        assert_eq!(
            event,
            ScanEvent::Decoded(Barcode::new(b"\x1dP123-ND\x1d1PRC0603\x1dQ10".to_vec()))
        );

        // Three polled frames plus the flush, then nothing while paused.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rig.reads.load(Ordering::SeqCst), 3 + 20);
        assert_eq!(rig.decodes.load(Ordering::SeqCst), 3);

        rig.handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rig.reads.load(Ordering::SeqCst) > 23);

        rig.handle.stop().await.unwrap();
        rig.task.await.unwrap();
        assert!(rig.dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failures_do_not_stop_the_loop() {
        let mut rig = start(4, 1);

        assert!(matches!(rig.events.recv().await, Some(ScanEvent::Decoded(_))));
        // Four failed reads never reached the decoder.
        assert_eq!(rig.decodes.load(Ordering::SeqCst), 1);

        rig.handle.stop().await.unwrap();
        rig.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_stop() {
        let rig = start(0, usize::MAX);

        tokio::time::sleep(Duration::from_millis(300)).await;
        rig.handle.pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let paused_at = rig.reads.load(Ordering::SeqCst);
        assert!(paused_at > 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rig.reads.load(Ordering::SeqCst), paused_at);

        rig.handle.stop().await.unwrap();
        rig.task.await.unwrap();
        assert!(rig.dropped.load(Ordering::SeqCst));
        assert!(matches!(rig.handle.resume().await, Err(ScanError::NotRunning)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_events_receiver_stops_loop() {
        let rig = start(0, 1);
        drop(rig.events);
        rig.task.await.unwrap();
        assert!(rig.dropped.load(Ordering::SeqCst));
    }

    struct DeadCamera;

    impl FrameSource for DeadCamera {
        fn read_frame(&mut self) -> ScanResult<Frame> {
            Err(ScanError::CameraUnavailable(3))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_camera_ends_the_loop() {
        let decoder = ScriptedDecoder {
            calls: Arc::new(AtomicUsize::new(0)),
            hit_on: 1,
        };
        let (scanner, handle, mut events) = Scanner::new(Box::new(DeadCamera), Box::new(decoder), ScanConfig::default());

        scanner.spawn().await.unwrap();
        assert!(events.recv().await.is_none());
        assert!(matches!(handle.resume().await, Err(ScanError::NotRunning)));
    }
}

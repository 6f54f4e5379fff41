//! # Scan Session
//!
//! Reads payloads from a keyboard-wedge scanner (stdin) or a camera and
//! resolves each one as it arrives.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WedgeReader ──► payload ──► resolve ──┬── Existing ──► report          │
//! │  or Scanner                            │                                │
//! │       ▲                                │                                │
//! │       │                                └── Draft ──┬── no --location    │
//! │       │                                            │     ──► report     │
//! │       │                                            └── --location L     │
//! │       │                                                  ──► save       │
//! │       └──────────── next line ◄─────────────────────────────────────────│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure on one payload is reported and the session moves on; only a
//! broken input stream ends it early. The camera scanner pauses on each
//! decode and is resumed once the payload has been handled.

use serde::Serialize;
use stockroom_core::Barcode;
use stockroom_scan::{FrameSource, ScanConfig, ScanError, ScanEvent, Scanner, SymbolDecoder, WedgeReader};
use tokio::io::AsyncBufRead;
use tracing::{debug, info, warn};

use super::record::{self, RecordDto};
use super::resolve::{resolve, Resolution};
use crate::error::{CliError, CliResult, ErrorCode};
use crate::state::AppContext;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Save new parts straight away at this location.
    pub location: Option<String>,
    /// End the session after this many payloads.
    pub count: Option<usize>,
}

impl ScanOptions {
    fn done(&self, handled: usize) -> bool {
        self.count.is_some_and(|limit| handled >= limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Existing,
    Draft,
    Saved,
    Failed,
}

/// What happened to one payload.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub barcode: String,
    pub status: ScanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

impl ScanOutcome {
    fn failed(barcode: String, error: CliError) -> Self {
        ScanOutcome {
            barcode,
            status: ScanStatus::Failed,
            record: None,
            error: Some(error),
        }
    }
}

/// Runs until end of input. Returns the number of payloads handled.
pub async fn run_wedge<R, F>(
    ctx: &AppContext,
    reader: &mut WedgeReader<R>,
    options: &ScanOptions,
    mut report: F,
) -> CliResult<usize>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&ScanOutcome) -> CliResult<()>,
{
    let mut handled = 0;
    info!(mode = %ctx.mode(), "Scan session started");

    loop {
        let outcome = match reader.next_payload().await {
            Ok(Some(barcode)) => handle_payload(ctx, barcode, options).await,
            Ok(None) => break,
            Err(ScanError::Payload(e)) => ScanOutcome::failed(String::new(), e.into()),
            Err(e) => return Err(e.into()),
        };

        handled += 1;
        finish(&outcome, &mut report)?;
        if options.done(handled) {
            break;
        }
    }

    info!(handled, "Scan session ended");
    Ok(handled)
}

/// Runs a camera scanner over `source` until `options.count` payloads were
/// handled or the scanner stops. Returns the number handled.
pub async fn run_camera<F>(
    ctx: &AppContext,
    source: Box<dyn FrameSource>,
    decoder: Box<dyn SymbolDecoder>,
    config: ScanConfig,
    options: &ScanOptions,
    mut report: F,
) -> CliResult<usize>
where
    F: FnMut(&ScanOutcome) -> CliResult<()>,
{
    let (scanner, handle, mut events) = Scanner::new(source, decoder, config);
    let task = scanner.spawn();
    let mut handled = 0;
    info!(mode = %ctx.mode(), "Camera scan session started");

    let result: CliResult<()> = async {
        while let Some(ScanEvent::Decoded(barcode)) = events.recv().await {
            let outcome = handle_payload(ctx, barcode, options).await;
            handled += 1;
            finish(&outcome, &mut report)?;
            if options.done(handled) {
                break;
            }
            handle.resume().await?;
        }
        Ok(())
    }
    .await;

    if handle.stop().await.is_err() {
        debug!("Scanner already stopped");
    }
    drop(events);
    if let Err(e) = task.await {
        warn!(error = %e, "Scanner task failed");
    }

    info!(handled, "Camera scan session ended");
    result.map(|()| handled)
}

/// Probes the cameras and opens `index` with the rxing decoder.
#[cfg(feature = "camera")]
pub fn open_camera(index: u32) -> CliResult<(Box<dyn FrameSource>, Box<dyn SymbolDecoder>)> {
    use stockroom_scan::camera::{NokhwaBackend, RxingDecoder};
    use stockroom_scan::{probe_cameras, CameraBackend, DEFAULT_PROBE_RANGE};

    let backend = NokhwaBackend;
    let available = probe_cameras(&backend, DEFAULT_PROBE_RANGE);
    info!(?available, "Cameras probed");

    let source = backend.open(index).map_err(|e| {
        CliError::from(e).with_hint(&format!("cameras that delivered a frame: {:?}", available))
    })?;
    Ok((source, Box::new(RxingDecoder)))
}

#[cfg(not(feature = "camera"))]
pub fn open_camera(index: u32) -> CliResult<(Box<dyn FrameSource>, Box<dyn SymbolDecoder>)> {
    Err(CliError::new(
        ErrorCode::ScanError,
        format!("camera {} requested, but this build has no camera support", index),
    )
    .with_hint("rebuild with `--features camera`, or pipe a keyboard-wedge scanner into `stockroom scan`"))
}

fn finish<F>(outcome: &ScanOutcome, report: &mut F) -> CliResult<()>
where
    F: FnMut(&ScanOutcome) -> CliResult<()>,
{
    if let Some(err) = &outcome.error {
        warn!(barcode = %outcome.barcode, error = %err, "Payload not handled");
    }
    report(outcome)
}

async fn handle_payload(ctx: &AppContext, barcode: Barcode, options: &ScanOptions) -> ScanOutcome {
    let label = barcode.to_string();

    let resolution = match resolve(ctx, &barcode).await {
        Ok(r) => r,
        Err(e) => return ScanOutcome::failed(label, e),
    };

    match (resolution, &options.location) {
        (Resolution::Existing(r), _) => ScanOutcome {
            barcode: label,
            status: ScanStatus::Existing,
            record: Some(r.into()),
            error: None,
        },
        (Resolution::Draft(mut draft), Some(location)) => {
            draft.location = location.trim().to_string();
            match record::save(ctx, &draft, true).await {
                Ok(outcome) => ScanOutcome {
                    barcode: label,
                    status: ScanStatus::Saved,
                    record: Some(outcome.record().clone().into()),
                    error: None,
                },
                Err(e) => ScanOutcome::failed(label, e),
            }
        }
        (Resolution::Draft(draft), None) => ScanOutcome {
            barcode: label,
            status: ScanStatus::Draft,
            record: Some(draft.into()),
            error: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::resolve::DecodeMode;
    use crate::state::testing::test_context;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use stockroom_scan::{Frame, GrayImage, ScanResult};

    const INPUT: &[u8] = b"[)>\\x1e06\\x1dP296-1-ND\\x1d1PNE555P\\x1dQ8\n\
                           \n\
                           [)>\\x1e06\\x1dP296-1-ND\\x1d1PNE555P\\x1dQ8\r\n\
                           bad\\xZZ\n";

    async fn collect(ctx: &AppContext, options: &ScanOptions) -> Vec<ScanOutcome> {
        let mut reader = WedgeReader::new(INPUT);
        let mut seen = Vec::new();
        let handled = run_wedge(ctx, &mut reader, options, |o| {
            seen.push(o.clone());
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(handled, seen.len());
        seen
    }

    #[tokio::test]
    async fn test_drafts_without_location() {
        let ctx = test_context(DecodeMode::Local).await;

        let seen = collect(&ctx, &ScanOptions::default()).await;
        let statuses: Vec<_> = seen.iter().map(|o| o.status).collect();
        assert_eq!(statuses, [ScanStatus::Draft, ScanStatus::Draft, ScanStatus::Failed]);
        assert_eq!(seen[0].record.as_ref().unwrap().manufacturer_pn, "NE555P");
        assert_eq!(seen[2].error.as_ref().unwrap().code, ErrorCode::ValidationError);
        assert_eq!(ctx.db().components().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_location_saves_then_finds_existing() {
        let ctx = test_context(DecodeMode::Local).await;
        let options = ScanOptions {
            location: Some("Drawer D4".into()),
            ..Default::default()
        };

        let seen = collect(&ctx, &options).await;
        assert_eq!(seen[0].status, ScanStatus::Saved);
        assert_eq!(seen[1].status, ScanStatus::Existing);
        assert_eq!(seen[1].record.as_ref().unwrap().location, "Drawer D4");
        assert_eq!(seen[1].record.as_ref().unwrap().quantity, 8);
        assert_eq!(ctx.db().components().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_vendor_failure_keeps_session_going() {
        let ctx = test_context(DecodeMode::Vendor).await;

        let seen = collect(&ctx, &ScanOptions::default()).await;
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|o| o.status == ScanStatus::Failed));
        assert_eq!(seen[0].error.as_ref().unwrap().code, ErrorCode::AuthRequired);
    }

    #[tokio::test]
    async fn test_report_error_stops_session() {
        let ctx = test_context(DecodeMode::Local).await;
        let mut reader = WedgeReader::new(INPUT);

        let err = run_wedge(&ctx, &mut reader, &ScanOptions::default(), |_| {
            Err(CliError::internal("stdout closed"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[tokio::test]
    async fn test_count_ends_wedge_session() {
        let ctx = test_context(DecodeMode::Local).await;
        let mut reader = WedgeReader::new(INPUT);
        let options = ScanOptions {
            count: Some(1),
            ..Default::default()
        };

        let handled = run_wedge(&ctx, &mut reader, &options, |_| Ok(())).await.unwrap();
        assert_eq!(handled, 1);
        assert!(reader.next_payload().await.unwrap().is_some());
    }

    struct StillFrame;

    impl FrameSource for StillFrame {
        fn read_frame(&mut self) -> ScanResult<Frame> {
            Frame::new(1, 1, vec![0, 0, 0])
        }
    }

    /// Sees the same bag on every other frame.
    struct BagDecoder {
        calls: Arc<AtomicUsize>,
    }

    impl SymbolDecoder for BagDecoder {
        fn decode(&mut self, _image: &GrayImage, _timeout: Duration, _max: usize) -> ScanResult<Vec<Vec<u8>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 0 {
                Ok(vec![b"[)>\x1e06\x1dP296-1-ND\x1d1PNE555P\x1dQ8\x1d".to_vec()])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn fast() -> ScanConfig {
        ScanConfig {
            frame_rate: 100,
            flush_frames: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_camera_session_saves_then_finds_existing() {
        let ctx = test_context(DecodeMode::Local).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let decoder = BagDecoder { calls: calls.clone() };
        let options = ScanOptions {
            location: Some("Shelf 2".into()),
            count: Some(2),
        };

        let mut seen = Vec::new();
        let handled = run_camera(&ctx, Box::new(StillFrame), Box::new(decoder), fast(), &options, |o| {
            seen.push(o.clone());
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(handled, 2);
        let statuses: Vec<_> = seen.iter().map(|o| o.status).collect();
        assert_eq!(statuses, [ScanStatus::Saved, ScanStatus::Existing]);
        assert_eq!(seen[1].record.as_ref().unwrap().location, "Shelf 2");
        assert_eq!(ctx.db().components().count().await.unwrap(), 1);
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_camera_report_error_stops_scanner() {
        let ctx = test_context(DecodeMode::Local).await;
        let decoder = BagDecoder {
            calls: Arc::new(AtomicUsize::new(0)),
        };

        let err = run_camera(
            &ctx,
            Box::new(StillFrame),
            Box::new(decoder),
            fast(),
            &ScanOptions::default(),
            |_| Err(CliError::internal("stdout closed")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[cfg(not(feature = "camera"))]
    #[test]
    fn test_camera_needs_feature() {
        let err = open_camera(0).err().unwrap();
        assert_eq!(err.code, ErrorCode::ScanError);
    }
}

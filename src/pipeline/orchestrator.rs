//! Pipeline wiring: connect the four stages with bounded channels and hand
//! back the join handles.

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver};
use std::thread::JoinHandle;

use crate::errors::PipelineError;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::dedup::DedupEngine;
use crate::pipeline::hash::HashStage;
use crate::pipeline::ship::ApiShipper;
use crate::pipeline::walk::FileWalker;

/// Handles returned by [`run_pipeline`]: drain `error_rx` concurrently, then
/// join via [`shutdown_pipeline`] once the shipper finishes.
pub struct PipelineHandles {
    pub walker_handles: Vec<JoinHandle<()>>,
    pub hasher_handles: Vec<JoinHandle<()>>,
    pub dedup_handle: JoinHandle<()>,
    pub shipper_handle: JoinHandle<()>,
    pub error_rx: Receiver<PipelineError>,
}

/// Start all four stages: walker → hasher → deduper → shipper.
///
/// Every queue between stages is bounded, so a slow sink applies
/// backpressure all the way to the walker instead of buffering the tree in
/// memory. The error channel closes once the walker and shipper have both
/// finished, which is what lets the driver's drain loop terminate.
pub fn run_pipeline(
    walker: &FileWalker,
    hasher: &HashStage,
    deduper: &DedupEngine,
    shipper: &ApiShipper,
    error_buffer: usize,
    cancel: &CancelToken,
) -> PipelineHandles {
    let (error_tx, error_rx) = bounded::<PipelineError>(error_buffer);

    let (path_rx, walker_handles) = walker.scan(cancel, &error_tx);
    let (record_rx, hasher_handles) = hasher.process(cancel, path_rx);
    let (unique_rx, dedup_handle) = deduper.run(cancel, record_rx);
    let shipper_handle = shipper.ship(cancel, unique_rx, error_tx);

    PipelineHandles {
        walker_handles,
        hasher_handles,
        dedup_handle,
        shipper_handle,
        error_rx,
    }
}

/// Join every stage thread. Returns an error only if a stage panicked;
/// ordinary walk/delivery failures travel the error channel instead.
pub fn shutdown_pipeline(handles: PipelineHandles) -> Result<()> {
    handles
        .shipper_handle
        .join()
        .map_err(|_| anyhow::anyhow!("shipper thread panicked"))?;
    handles
        .dedup_handle
        .join()
        .map_err(|_| anyhow::anyhow!("dedup thread panicked"))?;
    for h in handles.hasher_handles {
        let _ = h.join();
    }
    for h in handles.walker_handles {
        let _ = h.join();
    }
    Ok(())
}

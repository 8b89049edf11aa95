//! Trigger channel and the dedicated pipeline worker.
//!
//! Watch callbacks never run the pipeline themselves. They push a unit
//! signal into a capacity-1 channel; a single worker task drains one signal
//! at a time and runs the pipeline to completion. A burst of N changes
//! while a run is in progress collapses to exactly one follow-up run.

use crate::pipeline::{CoveragePipeline, PipelineError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Sends "run requested" signals from watch callbacks to the worker.
#[derive(Clone, Debug)]
pub struct TriggerSender {
    tx: mpsc::Sender<()>,
}

impl TriggerSender {
    /// Request a pipeline run.
    ///
    /// Safe to call from any thread, including the watch backend's
    /// notification threads. While a signal is already pending, further
    /// requests are coalesced into it.
    pub fn request_run(&self) {
        match self.tx.try_send(()) {
            Ok(()) => trace!("pipeline run requested"),
            Err(mpsc::error::TrySendError::Full(())) => {
                trace!("run already pending; trigger coalesced")
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!("worker stopped; trigger dropped")
            }
        }
    }
}

/// Receiving half of the trigger channel, consumed by the worker.
pub type TriggerReceiver = mpsc::Receiver<()>;

/// Create the trigger channel.
///
/// Capacity 1 gives the at-most-one-pending guarantee: one signal can wait
/// while a run is in progress, everything beyond that is dropped.
pub fn trigger_channel() -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (TriggerSender { tx }, rx)
}

/// Dedicated worker task owning all pipeline executions.
pub struct PipelineWorker {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl PipelineWorker {
    /// Spawn the worker. It runs until [`PipelineWorker::shutdown`] is
    /// called or every [`TriggerSender`] is dropped.
    pub fn spawn(
        pipeline: Arc<CoveragePipeline>,
        output_dirs: BTreeMap<String, PathBuf>,
        mut triggers: TriggerReceiver,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    signal = triggers.recv() => {
                        if signal.is_none() {
                            break;
                        }
                        match pipeline.run(&output_dirs).await {
                            Ok(result) => info!(
                                run_id = %result.run_id,
                                duration_ms = result.duration_ms,
                                "coverage run finished"
                            ),
                            Err(PipelineError::AlreadyRunning) => {
                                warn!("trigger raced a run in progress; skipped")
                            }
                            Err(err) => error!(error = %err, "coverage run failed"),
                        }
                    }
                }
            }
            debug!("pipeline worker stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop scheduling further runs. An in-flight run completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}

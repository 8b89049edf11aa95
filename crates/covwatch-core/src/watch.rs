//! Filesystem watches over resolved build output directories.
//!
//! One non-recursive watch per output directory, filtered to modification
//! events on that project's `<name>.dll`. All watches share a single
//! arming gate so the pipeline can suspend the whole set while its own
//! staging writes and tool output land on disk.

use crate::error::WatchError;
use crate::worker::TriggerSender;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Shared arming gate for a whole watch set.
///
/// One lock covers every handle, so a suspend or resume is a single atomic
/// flip — concurrent callbacks can never observe a half-applied state.
/// Both operations are idempotent.
#[derive(Debug)]
pub struct WatchGate {
    armed: Mutex<bool>,
}

impl WatchGate {
    /// New gate, armed.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            armed: Mutex::new(true),
        })
    }

    /// Whether change events currently pass the gate.
    pub fn is_armed(&self) -> bool {
        *self.lock()
    }

    /// Disarm every watch in the set.
    pub fn suspend(&self) {
        *self.lock() = false;
    }

    /// Re-arm every watch in the set.
    pub fn resume(&self) {
        *self.lock() = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct WatchHandle {
    // Held only to keep the backend watch alive; dropping it stops callbacks.
    _watcher: RecommendedWatcher,
    dir: PathBuf,
    file_name: String,
}

/// Owns the set of filesystem watches for one watch session.
///
/// Lifecycle: [`WatchCoordinator::start`] → armed; suspend/resume via the
/// shared [`WatchGate`]; [`WatchCoordinator::stop`] disposes every handle
/// and no further callbacks fire.
pub struct WatchCoordinator {
    gate: Arc<WatchGate>,
    handles: Vec<WatchHandle>,
}

impl WatchCoordinator {
    /// Start one watch per resolved output directory.
    ///
    /// Each watch reacts only to modify-kind events whose path names the
    /// project's `<name>.dll`; qualifying events that pass the gate request
    /// a pipeline run through `trigger`.
    pub fn start(
        output_dirs: &BTreeMap<String, PathBuf>,
        gate: Arc<WatchGate>,
        trigger: TriggerSender,
    ) -> Result<Self, WatchError> {
        let mut handles = Vec::with_capacity(output_dirs.len());

        for (project, dir) in output_dirs {
            let file_name = format!("{project}.dll");

            let cb_gate = Arc::clone(&gate);
            let cb_trigger = trigger.clone();
            let cb_file = file_name.clone();

            let mut watcher =
                notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
                    let event = match res {
                        Ok(event) => event,
                        Err(err) => {
                            warn!(error = %err, "watch backend error");
                            return;
                        }
                    };

                    // Content writes only: renames and metadata-only
                    // changes (chmod, timestamps) must not start a run.
                    if !matches!(
                        event.kind,
                        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
                    ) {
                        return;
                    }

                    let matches_file = event
                        .paths
                        .iter()
                        .any(|path| path.file_name().is_some_and(|n| n == cb_file.as_str()));
                    if !matches_file {
                        return;
                    }

                    if !cb_gate.is_armed() {
                        return;
                    }

                    cb_trigger.request_run();
                })
                .map_err(WatchError::Create)?;

            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| WatchError::Watch {
                    path: dir.clone(),
                    source,
                })?;

            debug!(dir = %dir.display(), file = %file_name, "watching build output");

            handles.push(WatchHandle {
                _watcher: watcher,
                dir: dir.clone(),
                file_name,
            });
        }

        Ok(Self { gate, handles })
    }

    /// Atomically disarm the whole set. Idempotent.
    pub fn suspend_all(&self) {
        self.gate.suspend();
    }

    /// Atomically re-arm the whole set. Idempotent.
    pub fn resume_all(&self) {
        self.gate.resume();
    }

    /// Whether the set is currently armed.
    pub fn is_armed(&self) -> bool {
        self.gate.is_armed()
    }

    /// Number of active watches.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the set holds no watches.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// `(directory, filename)` pairs under watch.
    pub fn watched(&self) -> impl Iterator<Item = (&PathBuf, &str)> {
        self.handles
            .iter()
            .map(|h| (&h.dir, h.file_name.as_str()))
    }

    /// Dispose every watch. No callbacks fire afterwards.
    pub fn stop(self) {
        drop(self.handles);
        debug!("watch set stopped");
    }
}

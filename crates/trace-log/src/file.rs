//! File-Backed Trace Sink

use crate::{TraceError, TraceSink};
use metrics::counter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default number of lines buffered ahead of the writer
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Trace sink that hands lines to a background writer task
///
/// `append_line` only enqueues; the file is written by the task returned
/// from [`FileTraceSink::spawn`], which finishes once every sink clone is
/// dropped and yields the number of lines written.
#[derive(Debug)]
pub struct FileTraceSink {
    enabled: AtomicBool,
    tx: mpsc::Sender<String>,
    path: PathBuf,
}

impl FileTraceSink {
    /// Start a writer appending to `path`; must be called inside a runtime
    pub fn spawn(
        path: impl AsRef<Path>,
        queue_capacity: usize,
        enabled: bool,
    ) -> (Self, JoinHandle<Result<u64, TraceError>>) {
        let path = path.as_ref().to_path_buf();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        info!("Creating trace sink for file: {}", path.display());

        let writer = tokio::spawn(run_writer(path.clone(), rx));
        let sink = Self {
            enabled: AtomicBool::new(enabled),
            tx,
            path,
        };
        (sink, writer)
    }

    /// Switch tracing on or off at runtime
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        info!("Trace logging {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Trace file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for FileTraceSink {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn append_line(&self, line: &str) -> Result<(), TraceError> {
        self.tx.try_send(line.to_owned()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TraceError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => TraceError::Closed,
        })
    }
}

async fn run_writer(path: PathBuf, rx: mpsc::Receiver<String>) -> Result<u64, TraceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    debug!("Trace writer opened {}", path.display());

    let written = write_lines(&mut file, &path, rx).await;
    info!("Trace writer stopped after {} lines", written);
    Ok(written)
}

/// Drain the queue into `out`, flushing after every line
///
/// A failed write drops that line and a failed flush is only counted; the
/// writer keeps draining either way.
async fn write_lines<W: AsyncWrite + Unpin>(
    out: &mut W,
    path: &Path,
    mut rx: mpsc::Receiver<String>,
) -> u64 {
    let mut written = 0u64;
    while let Some(line) = rx.recv().await {
        if let Err(e) = out.write_all(line.as_bytes()).await {
            counter!("ecu_can_trace_write_failures_total").increment(1);
            warn!("Trace write to {} failed: {}", path.display(), e);
            continue;
        }
        written += 1;
        if let Err(e) = out.flush().await {
            counter!("ecu_can_trace_write_failures_total").increment(1);
            warn!("Trace flush to {} failed: {}", path.display(), e);
        }
    }

    if let Err(e) = out.flush().await {
        warn!("Final trace flush to {} failed: {}", path.display(), e);
    }
    written
}

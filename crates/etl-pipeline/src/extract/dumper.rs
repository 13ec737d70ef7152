//! Buffering/flush engine
//!
//! A [`Dumper`] runs two activities for the lifetime of one [`Dumper::run`]:
//!
//! 1. **download**: drives the [`Producer`] into a rendezvous handoff.
//! 2. **buffering**: the only owner of the current batch. It waits on the
//!    flush timer, cancellation, and the handoff, appending each record and
//!    flushing when the accumulated serialized size reaches the limit.
//!
//! Flushes happen inline in the buffering activity, so at most one sink write
//! is in flight and batch N is written before any record of batch N+1 is
//! appended. Any download, serialization or write failure ends the run; the
//! failed batch is dropped.

use chrono::Utc;
use etl_common::{EtlError, Record};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::config::DumpConfig;
use super::producer::{Producer, RecordSender};
use crate::storage::Sink;

/// tokio has no zero-capacity channel; one slot keeps the producer at most
/// one record ahead of the buffering activity.
const HANDOFF_CAPACITY: usize = 1;

/// One slot per activity, each reports at most one fatal error.
const ERROR_CAPACITY: usize = 2;

/// Fatal outcome of a dumper run
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("download failed: {0}")]
    Download(#[source] EtlError),

    #[error("could not dump file, can't serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not dump file {artifact}, can't write it: {source}")]
    Write {
        artifact: String,
        #[source]
        source: EtlError,
    },

    #[error("dumper activity aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Why a flush was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushTrigger {
    Interval,
    Size,
    Cancelled,
    Completed,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushTrigger::Interval => "interval",
            FlushTrigger::Size => "size",
            FlushTrigger::Cancelled => "cancelled",
            FlushTrigger::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Records accumulated since the last flush
#[derive(Debug, Default)]
struct Buffer {
    records: Vec<Record>,
    /// Sum of each record's serialized length, measured on arrival
    size: u64,
}

impl Buffer {
    fn push(&mut self, record: Record) -> Result<(), DumpError> {
        let len = serde_json::to_vec(&record)?.len();
        self.records.push(record);
        self.size += len as u64;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand the batch out and start a new one
    fn take(&mut self) -> Vec<Record> {
        self.size = 0;
        std::mem::take(&mut self.records)
    }
}

/// Serializes batches and writes them under strictly increasing millisecond names
struct BatchWriter {
    sink: Arc<dyn Sink>,
    last_name_ms: i64,
}

impl BatchWriter {
    fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            sink,
            last_name_ms: i64::MIN,
        }
    }

    /// Epoch milliseconds; bumped past the previous name if the clock has not moved
    fn next_name(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        let ms = if now > self.last_name_ms {
            now
        } else {
            self.last_name_ms + 1
        };
        self.last_name_ms = ms;
        ms.to_string()
    }

    /// The buffer is reset whether or not the write succeeds
    async fn flush(&mut self, buffer: &mut Buffer, trigger: FlushTrigger) -> Result<(), DumpError> {
        if buffer.is_empty() {
            info!(%trigger, "Empty buffer, discarding");
            return Ok(());
        }

        let records = buffer.take();
        let data = serde_json::to_vec(&records)?;
        let name = self.next_name();

        info!(
            artifact = %name,
            records = records.len(),
            bytes = data.len(),
            %trigger,
            "Dumping file"
        );

        self.sink
            .write(data, &name)
            .await
            .map_err(|source| DumpError::Write {
                artifact: name,
                source,
            })
    }
}

enum Step {
    Continue,
    Stop,
}

/// Windowed buffer between a [`Producer`] and a [`Sink`]
pub struct Dumper {
    cancel: CancellationToken,
    config: DumpConfig,
    producer: Arc<dyn Producer>,
    sink: Arc<dyn Sink>,
}

impl Dumper {
    /// No work starts until [`run`](Self::run). The dumper stops when either
    /// `parent` or its own [`stop`](Self::stop) is cancelled.
    pub fn new(
        parent: &CancellationToken,
        config: DumpConfig,
        producer: Arc<dyn Producer>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            cancel: parent.child_token(),
            config,
            producer,
            sink,
        }
    }

    /// Run until the producer finishes, a fatal error occurs, or the dumper
    /// is stopped.
    ///
    /// Returns only after both activities have exited, so by then the final
    /// flush has been attempted. The first reported error wins; a final flush
    /// that fails after cancellation is still reported. A dumper is meant to
    /// be run once: after it returns its scope is cancelled.
    #[instrument(skip(self), fields(
        time_limit_ms = self.config.time_limit_ms,
        size_limit_bytes = self.config.size_limit_bytes
    ))]
    pub async fn run(&self) -> Result<(), DumpError> {
        info!("Starting dumper");

        let (record_tx, record_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (error_tx, mut error_rx) = mpsc::channel(ERROR_CAPACITY);

        let buffering = tokio::spawn(buffer_records(
            record_rx,
            self.cancel.clone(),
            self.config,
            self.sink.clone(),
            error_tx.clone(),
        ));
        let downloading = tokio::spawn(download_records(
            self.producer.clone(),
            RecordSender::new(record_tx, self.cancel.clone()),
            self.cancel.clone(),
            error_tx,
        ));

        let reported = tokio::select! {
            biased;
            reported = error_rx.recv() => reported,
            _ = self.cancel.cancelled() => {
                info!("Dumper stopped, waiting for final flush");
                None
            },
        };

        // Winds down whichever activity is still running
        self.cancel.cancel();
        buffering.await?;
        downloading.await?;

        match reported.or_else(|| error_rx.try_recv().ok()) {
            Some(err) => {
                error!(error = %err, "Dumper exited with an error");
                Err(err)
            },
            None => {
                info!("Dumper finished");
                Ok(())
            },
        }
    }

    /// Request cancellation without waiting for the final flush; await
    /// [`run`](Self::run) for that.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

async fn download_records(
    producer: Arc<dyn Producer>,
    output: RecordSender,
    cancel: CancellationToken,
    errors: mpsc::Sender<DumpError>,
) {
    let result = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Download abandoned on cancellation");
            return;
        },
        result = producer.download(output) => result,
    };

    match result {
        Ok(()) => info!("Finished downloading"),
        Err(e) if e.is_handoff_closed() => debug!("Handoff closed, download stopped"),
        Err(e) => {
            error!(error = %e, "Issue with downloading");
            let _ = errors.send(DumpError::Download(e)).await;
        },
    }
}

async fn buffer_records(
    mut records: mpsc::Receiver<Record>,
    cancel: CancellationToken,
    config: DumpConfig,
    sink: Arc<dyn Sink>,
    errors: mpsc::Sender<DumpError>,
) {
    let window = config.window();
    let mut ticker = interval_at(Instant::now() + window, window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut buffer = Buffer::default();
    let mut writer = BatchWriter::new(sink);

    loop {
        let step = tokio::select! {
            _ = ticker.tick() => {
                info!(time_limit_ms = config.time_limit_ms, "Hit the interval timeout");
                writer.flush(&mut buffer, FlushTrigger::Interval).await.map(|_| Step::Continue)
            },
            _ = cancel.cancelled() => match drain_handoff(&mut records, &mut buffer) {
                Ok(()) => writer.flush(&mut buffer, FlushTrigger::Cancelled).await.map(|_| Step::Stop),
                Err(e) => Err(e),
            },
            received = records.recv() => match received {
                Some(record) => {
                    debug!("Got new item");
                    match buffer.push(record) {
                        Ok(()) if buffer.size >= config.size_limit_bytes => {
                            info!(
                                size_limit_bytes = config.size_limit_bytes,
                                buffered_bytes = buffer.size,
                                "Items size hit the limit"
                            );
                            writer.flush(&mut buffer, FlushTrigger::Size).await.map(|_| Step::Continue)
                        },
                        Ok(()) => Ok(Step::Continue),
                        Err(e) => Err(e),
                    }
                },
                None => {
                    info!("Downloading finished, dumping remaining items");
                    writer.flush(&mut buffer, FlushTrigger::Completed).await.map(|_| Step::Stop)
                },
            },
        };

        match step {
            Ok(Step::Continue) => {},
            Ok(Step::Stop) => return,
            Err(e) => {
                error!(error = %e, "Buffering stopped");
                let _ = errors.send(e).await;
                return;
            },
        }
    }
}

/// A send that already completed sits in the handoff slot; it belongs to the
/// final batch.
fn drain_handoff(records: &mut mpsc::Receiver<Record>, buffer: &mut Buffer) -> Result<(), DumpError> {
    records.close();
    while let Ok(record) = records.try_recv() {
        buffer.push(record)?;
    }
    Ok(())
}

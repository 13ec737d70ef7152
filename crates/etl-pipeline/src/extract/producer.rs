//! Producer boundary and the record handoff

use async_trait::async_trait;
use etl_common::{EtlError, Record, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Source of records for the extract stage
///
/// `download` pushes zero or more records into `output` and returns once the
/// source is exhausted. An `Err` is fatal to the run. When `output.send`
/// reports [`EtlError::HandoffClosed`] the producer should stop and return it.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn download(&self, output: RecordSender) -> Result<()>;
}

/// Producer side of the rendezvous handoff into the buffering activity
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: mpsc::Sender<Record>,
    cancel: CancellationToken,
}

impl RecordSender {
    pub(crate) fn new(tx: mpsc::Sender<Record>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Hand one record over, waiting while the consumer is busy.
    ///
    /// Resolves early with [`EtlError::HandoffClosed`] on cancellation, so a
    /// blocked send never outlives the run.
    pub async fn send(&self, record: Record) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(EtlError::HandoffClosed),
            sent = self.tx.send(record) => sent.map_err(|_| EtlError::HandoffClosed),
        }
    }

    /// Create a standalone sender/receiver pair, mainly for driving a
    /// producer outside a [`Dumper`](super::Dumper)
    pub fn channel(capacity: usize, cancel: CancellationToken) -> (Self, mpsc::Receiver<Record>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx, cancel), rx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: i64) -> Record {
        json!({ "id": id }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_send_delivers_in_order() {
        let (sender, mut rx) = RecordSender::channel(4, CancellationToken::new());

        sender.send(record(1)).await.unwrap();
        sender.send(record(2)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), record(1));
        assert_eq!(rx.recv().await.unwrap(), record(2));
    }

    #[tokio::test]
    async fn test_blocked_send_released_by_cancellation() {
        let cancel = CancellationToken::new();
        let (sender, _rx) = RecordSender::channel(1, cancel.clone());

        sender.send(record(1)).await.unwrap();

        let blocked = tokio::spawn({
            let sender = sender.clone();
            async move { sender.send(record(2)).await }
        });
        cancel.cancel();

        let result = blocked.await.unwrap();
        assert!(matches!(result, Err(EtlError::HandoffClosed)));
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (sender, rx) = RecordSender::channel(1, CancellationToken::new());
        drop(rx);

        assert!(sender.send(record(1)).await.unwrap_err().is_handoff_closed());
    }
}

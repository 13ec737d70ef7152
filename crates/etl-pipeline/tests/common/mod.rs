//! Shared doubles for pipeline integration tests
#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use etl_common::{EtlError, Record, Result};
use etl_pipeline::extract::{Producer, RecordSender};
use etl_pipeline::storage::Sink;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn record(id: i64) -> Record {
    json!({ "id": id, "name": format!("user-{}", id) })
        .as_object()
        .cloned()
        .unwrap()
}

pub fn records(count: i64) -> Vec<Record> {
    (1..=count).map(record).collect()
}

/// In-memory sink keeping writes in the order they landed
#[derive(Default)]
pub struct MemorySink {
    writes: Mutex<Vec<(String, Vec<u8>)>>,
    write_delay: Option<Duration>,
    fail_writes: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write takes `delay` to complete
    pub fn slow(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    /// Seed an artifact without going through a dumper
    pub fn with_artifacts(names: &[&str]) -> Self {
        let sink = Self::default();
        {
            let mut writes = sink.writes.lock().unwrap();
            for name in names {
                writes.push((name.to_string(), b"[]".to_vec()));
            }
        }
        sink
    }

    pub fn names(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Each write decoded as a batch, in write order
    pub fn batches(&self) -> Vec<Vec<Record>> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| serde_json::from_slice(data).unwrap())
            .collect()
    }

    /// All records across batches, in write order
    pub fn all_records(&self) -> Vec<Record> {
        self.batches().into_iter().flatten().collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&self, data: Vec<u8>, name: &str) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.fail_writes {
            Err(EtlError::storage("sink is read-only"))
        } else {
            let mut writes = self.writes.lock().unwrap();
            writes.retain(|(existing, _)| existing != name);
            writes.push((name.to_string(), data));
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| EtlError::storage(format!("no artifact named {}", name)))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.names())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .retain(|(existing, _)| existing != name);
        Ok(())
    }
}

/// Sink whose listing always fails
pub struct UnlistableSink;

#[async_trait]
impl Sink for UnlistableSink {
    async fn write(&self, _data: Vec<u8>, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        Err(EtlError::storage(format!("no artifact named {}", name)))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Err(EtlError::storage("access denied"))
    }

    async fn delete(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// Emits a fixed list of records, optionally pausing before each one, then
/// returns, fails or hangs
pub struct VecProducer {
    records: Vec<Record>,
    delay: Option<Duration>,
    fail_after: bool,
    hang_after: bool,
}

impl VecProducer {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            delay: None,
            fail_after: false,
            hang_after: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Return an error once every record has been handed over
    pub fn failing(mut self) -> Self {
        self.fail_after = true;
        self
    }

    /// Never return once every record has been handed over
    pub fn then_hang(mut self) -> Self {
        self.hang_after = true;
        self
    }
}

#[async_trait]
impl Producer for VecProducer {
    async fn download(&self, output: RecordSender) -> Result<()> {
        for record in &self.records {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            output.send(record.clone()).await?;
        }

        if self.hang_after {
            std::future::pending::<()>().await;
        }
        if self.fail_after {
            return Err(EtlError::network("connection reset by peer"));
        }
        Ok(())
    }
}

/// Emits records forever
pub struct EndlessProducer;

#[async_trait]
impl Producer for EndlessProducer {
    async fn download(&self, output: RecordSender) -> Result<()> {
        let mut id = 0;
        loop {
            id += 1;
            output.send(record(id)).await?;
        }
    }
}

/// Never emits anything and never returns on its own
pub struct PendingProducer;

#[async_trait]
impl Producer for PendingProducer {
    async fn download(&self, _output: RecordSender) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Serialized length of `record`, as the dumper accounts for it
pub fn serialized_len(record: &Record) -> u64 {
    serde_json::to_vec(record).unwrap().len() as u64
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|record| record.get("id").and_then(Value::as_i64).unwrap())
        .collect()
}

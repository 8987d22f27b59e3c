//! Delivered-payload ingestion.
//!
//! After a chain receives a packet and stores its payload, the payload is
//! handed to a [`PayloadSink`]: the state-processing component that treats
//! delivered payloads as transactions.

use std::sync::Mutex;

use relay_core::{ContentHash, EndpointId, Sequence};

/// Callback invoked once per successful receive.
pub trait PayloadSink: Send + Sync {
    fn deliver_tx(&self, from: &EndpointId, sequence: Sequence, hash: &ContentHash, payload: &[u8]);
}

/// Sink that only logs each ingested payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl PayloadSink for TracingSink {
    fn deliver_tx(&self, from: &EndpointId, sequence: Sequence, hash: &ContentHash, payload: &[u8]) {
        tracing::info!(
            from = %from,
            sequence,
            hash = %hash,
            len = payload.len(),
            "payload ingested"
        );
    }
}

/// A payload handed to a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedTx {
    pub from: EndpointId,
    pub sequence: Sequence,
    pub hash: ContentHash,
    pub payload: Vec<u8>,
}

/// Sink that keeps every ingested payload in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<IngestedTx>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything ingested so far.
    pub fn records(&self) -> Vec<IngestedTx> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PayloadSink for RecordingSink {
    fn deliver_tx(&self, from: &EndpointId, sequence: Sequence, hash: &ContentHash, payload: &[u8]) {
        tracing::debug!(from = %from, sequence, "payload recorded");
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(IngestedTx {
                from: from.clone(),
                sequence,
                hash: *hash,
                payload: payload.to_vec(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::content_hash;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        assert!(sink.is_empty());

        let from = EndpointId::from("chain-a");
        sink.deliver_tx(&from, 1, &content_hash(b"tx1"), b"tx1");
        sink.deliver_tx(&from, 2, &content_hash(b"tx2"), b"tx2");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, 1);
        assert_eq!(records[0].payload, b"tx1");
        assert_eq!(records[1].hash, content_hash(b"tx2"));
    }

    #[test]
    fn tracing_sink_accepts_payloads() {
        crate::logging::init_for_tests();
        TracingSink.deliver_tx(&EndpointId::from("chain-a"), 1, &content_hash(b"x"), b"x");
    }
}

//! Two-chain simulation driving the `relay-sim` binary.

use std::sync::Arc;
use std::time::Duration;

use relay_core::{Clock, EndpointId};

use crate::clock::TokioClock;
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::node::{Chain, connect};
use crate::sink::{PayloadSink, RecordingSink};

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub source: EndpointId,
    pub destination: EndpointId,
    pub sent: usize,
    pub acknowledged: usize,
    pub timed_out: usize,
    /// Payloads ingested by the destination's sink.
    pub delivered: usize,
}

impl SimulationReport {
    /// Every sent packet was acknowledged.
    pub fn is_complete(&self) -> bool {
        self.acknowledged == self.sent
    }

    /// Every sent packet reached a final state.
    pub fn is_settled(&self) -> bool {
        self.acknowledged + self.timed_out >= self.sent
    }
}

/// Send `config.simulation.packets` payloads `tx1..txN` from `config.node.chain_id`
/// to `config.simulation.peer_id` and run both chains until each packet is
/// acknowledged or past its deadline.
pub async fn run_simulation(config: &NodeConfig) -> Result<SimulationReport, NodeError> {
    let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());
    let sink = Arc::new(RecordingSink::new());
    let destination_sink: Arc<dyn PayloadSink> = sink.clone();

    let mut source = Chain::new(
        config.node.chain_id.as_str(),
        config,
        Arc::clone(&clock),
        Arc::new(RecordingSink::new()),
    );
    let mut destination = Chain::new(
        config.simulation.peer_id.as_str(),
        config,
        Arc::clone(&clock),
        destination_sink,
    );
    connect(&source, &destination).await?;

    let source_handle = source.handle();
    let peer = destination.id().clone();
    let shutdowns = [source.shutdown_handle(), destination.shutdown_handle()];

    tracing::info!(
        source = %source.id(),
        destination = %peer,
        packets = config.simulation.packets,
        "starting simulation"
    );

    let source_task = tokio::spawn(async move { source.run().await });
    let destination_task = tokio::spawn(async move { destination.run().await });

    let poll = config.timers.sweep_interval();
    let sent = config.simulation.packets;
    for i in 1..=sent {
        let payload = format!("tx{i}");
        loop {
            match source_handle.send(&peer, payload.as_bytes()).await {
                Err(NodeError::LinkFull(_)) => tokio::time::sleep(poll).await,
                result => {
                    result?;
                    break;
                }
            }
        }
    }

    // Once past every deadline, one more sweep period settles the outcome.
    let settled = tokio::time::timeout(settle_deadline(config), async {
        loop {
            let (acked, expired) = source_handle.outbound_status().await;
            if acked + expired >= sent {
                break;
            }
            tokio::time::sleep(poll).await;
        }
    })
    .await;
    if settled.is_err() {
        tracing::warn!("simulation deadline reached with packets outstanding");
    }

    let (acknowledged, timed_out) = source_handle.outbound_status().await;

    for shutdown in &shutdowns {
        shutdown.shutdown();
    }
    source_task
        .await
        .map_err(|e| NodeError::Task(e.to_string()))?;
    destination_task
        .await
        .map_err(|e| NodeError::Task(e.to_string()))?;

    let report = SimulationReport {
        source: source_handle.id().clone(),
        destination: peer,
        sent,
        acknowledged,
        timed_out,
        delivered: sink.len(),
    };
    tracing::info!(
        sent = report.sent,
        acknowledged = report.acknowledged,
        timed_out = report.timed_out,
        delivered = report.delivered,
        "simulation finished"
    );
    Ok(report)
}

/// How long to poll for a settled outcome after the last send.
pub fn settle_deadline(config: &NodeConfig) -> Duration {
    config.relay.packet_timeout() + config.timers.sweep_interval() * 2
}

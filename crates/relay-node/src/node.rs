//! Chain runtime and async event loop.
//!
//! A [`Chain`] wraps one relay endpoint. The endpoint sits behind a single
//! async mutex, so send, receive, ack application and sweeps on the same
//! chain are mutually exclusive. No code path holds two chains' endpoint
//! locks at once: a send locks only the sending chain and pushes the packet
//! into the destination's inbox while still holding that lock, which keeps
//! per-sender arrival order and lets two chains send to each other at the
//! same time without deadlock.
//!
//! An endpoint consumes one sequence stream, so a chain has exactly one
//! counterparty. [`connect`] refuses to attach a second one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, watch};

use relay_core::{Ack, Clock, EndpointId, Packet, Sequence};
use relay_protocol::{Delivery, Endpoint, ReceiveError};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::link::{self, LinkRx, LinkTx};
use crate::sink::PayloadSink;

/// State shared between a [`Chain`] and its [`ChainHandle`]s.
struct Shared {
    id: EndpointId,
    endpoint: Mutex<Endpoint>,
    peer: RwLock<Option<Peer>>,
    clock: Arc<dyn Clock>,
    packet_timeout: Duration,
    timeout_height_offset: u64,
}

/// The counterparty chain and the link into its inbox.
struct Peer {
    id: EndpointId,
    link: LinkTx,
}

/// Counters from one [`Chain::step`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub enqueued: usize,
    pub acks_applied: usize,
    pub evicted: usize,
    pub delivered: usize,
}

/// A relay chain: one endpoint, its inbox, its sink and its timers.
pub struct Chain {
    shared: Arc<Shared>,
    inbox_tx: LinkTx,
    inbox: LinkRx,
    sink: Arc<dyn PayloadSink>,
    sweep_interval: Duration,
    block_interval: Duration,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Chain {
    /// Create a chain identified by `id`, taking relay defaults and timer
    /// intervals from `config`.
    pub fn new(
        id: impl Into<EndpointId>,
        config: &NodeConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn PayloadSink>,
    ) -> Self {
        let id = id.into();
        let (inbox_tx, inbox) = link::inbox(config.relay.inbox_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                endpoint: Mutex::new(Endpoint::new(id.clone())),
                id,
                peer: RwLock::new(None),
                clock,
                packet_timeout: config.relay.packet_timeout(),
                timeout_height_offset: config.relay.timeout_height_offset,
            }),
            inbox_tx,
            inbox,
            sink,
            sweep_interval: config.timers.sweep_interval(),
            block_interval: config.timers.block_interval(),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    pub fn id(&self) -> &EndpointId {
        &self.shared.id
    }

    /// Handle for sending from and inspecting this chain.
    pub fn handle(&self) -> ChainHandle {
        ChainHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Register `peer` as this chain's counterparty, reachable through `link`.
    ///
    /// Re-registering the same peer replaces its link; any other peer is
    /// refused once one is set.
    pub async fn add_peer(&self, peer: EndpointId, link: LinkTx) -> Result<(), NodeError> {
        let mut slot = self.shared.peer.write().await;
        self.check_peer(slot.as_ref(), &peer)?;
        *slot = Some(Peer { id: peer, link });
        Ok(())
    }

    /// The current counterparty, if connected.
    pub async fn peer_id(&self) -> Option<EndpointId> {
        self.shared.peer.read().await.as_ref().map(|p| p.id.clone())
    }

    fn check_peer(&self, current: Option<&Peer>, peer: &EndpointId) -> Result<(), NodeError> {
        if *peer == self.shared.id {
            return Err(NodeError::Config(format!("{peer} cannot be its own peer")));
        }
        match current {
            Some(existing) if existing.id != *peer => Err(NodeError::AlreadyConnected {
                chain: self.shared.id.clone(),
                peer: existing.id.clone(),
            }),
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------ //
    // Event loop
    // ------------------------------------------------------------------ //

    /// Run the event loop until shutdown is signalled.
    pub async fn run(&mut self) {
        let mut sweep_interval = tokio::time::interval(self.sweep_interval);
        let mut block_interval = tokio::time::interval(self.block_interval);

        // Don't fire immediately
        sweep_interval.tick().await;
        block_interval.tick().await;

        tracing::info!(chain = %self.shared.id, "entering event loop");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    tracing::info!(chain = %self.shared.id, "shutdown signal received");
                    break;
                }

                Some(ack) = self.inbox.acks.recv() => {
                    self.apply_acks(vec![ack]).await;
                }

                Some(packet) = self.inbox.packets.recv() => {
                    let mut batch = vec![packet];
                    while let Ok(more) = self.inbox.packets.try_recv() {
                        batch.push(more);
                    }
                    self.enqueue(batch).await;
                    // Never deliver a packet whose deadline passed in transit.
                    self.sweep().await;
                    self.deliver_ready().await;
                }

                _ = sweep_interval.tick() => {
                    if self.sweep().await > 0 {
                        // Eviction may expose the expected packet at the head.
                        self.deliver_ready().await;
                    }
                }

                _ = block_interval.tick() => {
                    self.handle().advance_height().await;
                }
            }
        }

        tracing::info!(chain = %self.shared.id, "event loop stopped");
    }

    /// One maintenance pass without timers: drain the inbox, apply acks,
    /// sweep timed-out packets, then deliver whatever is deliverable.
    pub async fn step(&mut self) -> StepReport {
        let mut packets = Vec::new();
        while let Ok(p) = self.inbox.packets.try_recv() {
            packets.push(p);
        }
        let mut acks = Vec::new();
        while let Ok(a) = self.inbox.acks.try_recv() {
            acks.push(a);
        }

        let enqueued = packets.len();
        self.enqueue(packets).await;
        let acks_applied = self.apply_acks(acks).await;
        let evicted = self.sweep().await;
        let delivered = self.deliver_ready().await;

        StepReport {
            enqueued,
            acks_applied,
            evicted,
            delivered,
        }
    }

    // ------------------------------------------------------------------ //
    // Internals
    // ------------------------------------------------------------------ //

    async fn enqueue(&self, packets: Vec<Packet>) {
        if packets.is_empty() {
            return;
        }
        let mut endpoint = self.shared.endpoint.lock().await;
        for packet in packets {
            endpoint.enqueue(packet);
        }
    }

    async fn apply_acks(&self, acks: Vec<Ack>) -> usize {
        let mut applied = 0;
        let mut endpoint = self.shared.endpoint.lock().await;
        for ack in acks {
            match endpoint.apply_ack(&ack) {
                Ok(()) => applied += 1,
                Err(e) => {
                    tracing::warn!(chain = %self.shared.id, sequence = ack.sequence, "ack rejected: {e}");
                }
            }
        }
        applied
    }

    async fn sweep(&self) -> usize {
        let now = self.shared.clock.now();
        self.shared.endpoint.lock().await.sweep_timeouts(now)
    }

    /// Receive from the queue head until it is empty or blocked, then hand
    /// payloads to the sink and route acks back to their senders.
    async fn deliver_ready(&self) -> usize {
        let mut deliveries: Vec<Delivery> = Vec::new();
        {
            let mut endpoint = self.shared.endpoint.lock().await;
            loop {
                match endpoint.receive() {
                    Ok(delivery) => deliveries.push(delivery),
                    Err(ReceiveError::EmptyQueue) => break,
                    Err(ReceiveError::SequenceMismatch { expected, got }) => {
                        tracing::debug!(
                            chain = %self.shared.id,
                            expected,
                            got,
                            "queue blocked on out-of-order head"
                        );
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(chain = %self.shared.id, "delivery refused: {e}");
                        break;
                    }
                }
            }
        }

        let count = deliveries.len();
        if count == 0 {
            return 0;
        }

        let peer = self.shared.peer.read().await;
        for delivery in deliveries {
            let Delivery { ack, hash, payload } = delivery;
            self.sink
                .deliver_tx(&ack.sender, ack.sequence, &hash, &payload);

            match peer.as_ref().filter(|p| p.id == ack.sender) {
                Some(p) => {
                    if p.link.send_ack(ack).is_err() {
                        tracing::warn!(chain = %self.shared.id, peer = %p.id, "ack dropped: link closed");
                    }
                }
                None => {
                    tracing::warn!(chain = %self.shared.id, peer = %ack.sender, "ack dropped: unknown peer");
                }
            }
        }
        count
    }
}

/// Wire two chains to each other in both directions.
///
/// Fails without changing either chain if one of them already has a
/// different counterparty.
pub async fn connect(a: &Chain, b: &Chain) -> Result<(), NodeError> {
    a.check_peer(a.shared.peer.read().await.as_ref(), b.id())?;
    b.check_peer(b.shared.peer.read().await.as_ref(), a.id())?;
    a.add_peer(b.id().clone(), b.inbox_tx.clone()).await?;
    b.add_peer(a.id().clone(), a.inbox_tx.clone()).await?;
    tracing::debug!(a = %a.id(), b = %b.id(), "chains connected");
    Ok(())
}

// ---------------------------------------------------------------------- //
// Handles
// ---------------------------------------------------------------------- //

/// Cloneable access to a running chain.
#[derive(Clone)]
pub struct ChainHandle {
    shared: Arc<Shared>,
}

impl ChainHandle {
    pub fn id(&self) -> &EndpointId {
        &self.shared.id
    }

    /// Send `payload` to `peer` using the configured timeout and a timeout
    /// height of the current height plus the configured offset.
    pub async fn send(&self, peer: &EndpointId, payload: impl Into<Vec<u8>>) -> Result<Packet, NodeError> {
        let height = self.shared.endpoint.lock().await.height();
        self.send_with(
            peer,
            payload,
            height + self.shared.timeout_height_offset,
            self.shared.packet_timeout,
        )
        .await
    }

    /// Send with explicit timeout values.
    pub async fn send_with(
        &self,
        peer: &EndpointId,
        payload: impl Into<Vec<u8>>,
        timeout_height: u64,
        timeout: Duration,
    ) -> Result<Packet, NodeError> {
        let link = match self.shared.peer.read().await.as_ref() {
            Some(p) if p.id == *peer => p.link.clone(),
            _ => return Err(NodeError::UnknownPeer(peer.clone())),
        };

        let mut endpoint = self.shared.endpoint.lock().await;
        if link.is_closed() {
            return Err(NodeError::LinkClosed(peer.clone()));
        }
        let packet = endpoint.prepare_send(payload.into(), timeout_height, timeout, &self.shared.clock);
        // Pushed while the lock is held so per-sender order matches sequence order.
        if let Err(e) = link.send_packet(packet.clone()) {
            // Still locked, so this is the latest sequence and can be withdrawn.
            endpoint.cancel_send(packet.sequence);
            return Err(match e {
                TrySendError::Full(_) => NodeError::LinkFull(peer.clone()),
                TrySendError::Closed(_) => NodeError::LinkClosed(peer.clone()),
            });
        }
        Ok(packet)
    }

    pub async fn advance_height(&self) {
        self.shared.endpoint.lock().await.advance_height();
    }

    /// Run `f` against the endpoint under its lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&Endpoint) -> R) -> R {
        let endpoint = self.shared.endpoint.lock().await;
        f(&endpoint)
    }

    /// Whether packet `sequence` sent by this chain has been acknowledged.
    pub async fn is_acknowledged(&self, sequence: Sequence) -> Option<bool> {
        self.inspect(|e| e.is_acknowledged(sequence)).await
    }

    /// `(acknowledged, expired)` counts over this chain's outbound packets.
    pub async fn outbound_status(&self) -> (usize, usize) {
        let now = self.shared.clock.now();
        self.inspect(|e| (e.outbound().acknowledged_count(), e.outbound().expired(now).len()))
            .await
    }
}

/// Signals a chain's event loop to stop.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

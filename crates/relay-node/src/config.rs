//! TOML-based configuration for relay chains and the simulator.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::NodeError;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub timers: TimersSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s)
            .map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), NodeError> {
        if self.node.chain_id.is_empty() {
            return Err(NodeError::Config("node.chain_id must not be empty".into()));
        }
        if self.simulation.peer_id == self.node.chain_id {
            return Err(NodeError::Config(
                "simulation.peer_id must differ from node.chain_id".into(),
            ));
        }
        if self.timers.sweep_interval_ms == 0 || self.timers.block_interval_ms == 0 {
            return Err(NodeError::Config("timer intervals must be non-zero".into()));
        }
        if self.relay.inbox_capacity == 0 {
            return Err(NodeError::Config("relay.inbox_capacity must be non-zero".into()));
        }
        Ok(())
    }
}

/// The `[node]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSection {
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
}

fn default_chain_id() -> String {
    "chain-a".to_string()
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
        }
    }
}

/// The `[relay]` section: defaults applied to outgoing packets.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySection {
    /// Packet deadline relative to send time. Default: 5000.
    #[serde(default = "default_packet_timeout_ms")]
    pub packet_timeout_ms: u64,
    /// Added to the sender's current height to form `timeout_height`. Default: 10.
    #[serde(default = "default_timeout_height_offset")]
    pub timeout_height_offset: u64,
    /// Packets a chain's inbox buffers before sends to it fail. Default: 1024.
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
}

fn default_packet_timeout_ms() -> u64 {
    5_000
}

fn default_timeout_height_offset() -> u64 {
    10
}

fn default_inbox_capacity() -> usize {
    1024
}

impl RelaySection {
    pub fn packet_timeout(&self) -> Duration {
        Duration::from_millis(self.packet_timeout_ms)
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            packet_timeout_ms: default_packet_timeout_ms(),
            timeout_height_offset: default_timeout_height_offset(),
            inbox_capacity: default_inbox_capacity(),
        }
    }
}

/// The `[timers]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TimersSection {
    /// Interval between inbound timeout sweeps. Default: 100.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Interval between height increments. Default: 1000.
    #[serde(default = "default_block_interval_ms")]
    pub block_interval_ms: u64,
}

fn default_sweep_interval_ms() -> u64 {
    100
}

fn default_block_interval_ms() -> u64 {
    1_000
}

impl TimersSection {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_millis(self.block_interval_ms)
    }
}

impl Default for TimersSection {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
            block_interval_ms: default_block_interval_ms(),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// The `[simulation]` section used by `relay-sim`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSection {
    /// Identifier of the counterparty chain.
    #[serde(default = "default_peer_id")]
    pub peer_id: String,
    /// Number of payloads (`tx1`..`txN`) to send. Default: 3.
    #[serde(default = "default_packets")]
    pub packets: usize,
}

fn default_peer_id() -> String {
    "chain-b".to_string()
}

fn default_packets() -> usize {
    3
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            peer_id: default_peer_id(),
            packets: default_packets(),
        }
    }
}

//! Runtime for the cross-chain packet relay.
//!
//! This crate runs relay endpoints as concurrent chains: each chain owns its
//! endpoint behind a lock, exchanges packets and acknowledgments with its
//! counterparty over an in-process link, sweeps timed-out packets and advances its
//! height on timers, and hands delivered payloads to a [`sink::PayloadSink`].
//! It also provides configuration, logging setup and the two-chain simulator
//! behind the `relay-sim` binary.

pub mod clock;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod node;
pub mod simulation;
pub mod sink;

pub use clock::TokioClock;
pub use config::NodeConfig;
pub use error::NodeError;
pub use node::{Chain, ChainHandle, ShutdownHandle, StepReport, connect};
pub use simulation::{SimulationReport, run_simulation};
pub use sink::{PayloadSink, RecordingSink, TracingSink};

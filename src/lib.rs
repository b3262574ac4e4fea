//! Cosim bridge: message broker between a hardware simulator and external
//! software clients.
//!
//! The simulator side is a fixed, non-blocking `extern "C"` entry-point
//! surface ([`ffi`]) polled once per simulated time step; the client side
//! is a TCP listener ([`broker`]/`server`) speaking the wire protocol from
//! `cosim-bridge-client`. Between them sit addressed endpoints with
//! independent per-direction FIFO queues.

pub mod broker;
pub mod config;
pub mod endpoint;
pub mod ffi;
pub mod message;
pub mod registry;
mod server;

pub use broker::{BrokerError, CosimBroker};
pub use config::Config;
pub use endpoint::{Endpoint, EndpointId, MessageQueue, PushError, TypeDescriptor};
pub use message::MessageBlob;
pub use registry::EndpointRegistry;

//! Blocking wrapper around [`CosimClient`] for non-async client processes.

use crate::client::CosimClient;
use crate::error::{ClientError, Result};
use crate::wire::EndpointInfo;

/// Blocking client owning a single-threaded runtime.
///
/// The client side of the bridge is allowed to block waiting for data, so
/// plain (non-async) client programs can use this wrapper and call `recv`
/// from an ordinary thread.
pub struct BlockingCosimClient {
    runtime: tokio::runtime::Runtime,
    inner: CosimClient,
}

impl BlockingCosimClient {
    /// Connect to a bridge at the given `host:port` address.
    pub fn connect(addr: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let inner = runtime.block_on(CosimClient::connect(addr))?;
        Ok(Self { runtime, inner })
    }

    /// Enumerate the endpoints currently registered with the bridge.
    pub fn endpoints(&mut self) -> Result<Vec<EndpointInfo>> {
        self.runtime.block_on(self.inner.endpoints())
    }

    /// Receive the next simulator-to-client message, blocking until one
    /// arrives or the bridge shuts down.
    pub fn recv(&mut self, endpoint_id: u32) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.recv(endpoint_id))
    }

    /// Send one client-to-simulator message.
    pub fn send(&mut self, endpoint_id: u32, payload: Vec<u8>) -> Result<()> {
        self.runtime.block_on(self.inner.send(endpoint_id, payload))
    }
}

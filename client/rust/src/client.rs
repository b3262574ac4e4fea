//! Async client for the cosim bridge.

use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::wire::{
    read_frame, request, response, write_frame, EndpointInfo, ListEndpoints, RecvMessage, Request,
    Response, SendMessage,
};

/// Async client for one bridge connection.
///
/// Requests on a connection are sequential; `recv` parks the connection
/// until the simulator produces a message, so a client that wants to
/// receive and send concurrently opens one connection per role.
pub struct CosimClient {
    stream: TcpStream,
}

impl CosimClient {
    /// Connect to a bridge at the given `host:port` address.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        stream
            .set_nodelay(true)
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        debug!(addr = %addr, "connected to bridge");
        Ok(Self { stream })
    }

    /// Connect using an address from an environment variable with fallback.
    pub async fn from_env(env_var: &str, default: &str) -> Result<Self> {
        let addr = std::env::var(env_var).unwrap_or_else(|_| default.to_string());
        Self::connect(&addr).await
    }

    /// Enumerate the endpoints currently registered with the bridge.
    pub async fn endpoints(&mut self) -> Result<Vec<EndpointInfo>> {
        let body = self.call(request::Op::ListEndpoints(ListEndpoints {})).await?;
        match body {
            response::Body::Endpoints(list) => Ok(list.endpoints),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Receive the next simulator-to-client message for `endpoint_id`.
    ///
    /// Waits until the simulator produces a message or the bridge shuts
    /// down; shutdown surfaces as a `ShuttingDown` bridge error or `Closed`.
    pub async fn recv(&mut self, endpoint_id: u32) -> Result<Vec<u8>> {
        let body = self.call(request::Op::Recv(RecvMessage { endpoint_id })).await?;
        match body {
            response::Body::Delivery(delivery) => Ok(delivery.payload),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Send one client-to-simulator message to `endpoint_id`.
    ///
    /// A `QueueFull` bridge error means the endpoint's inbound queue is at
    /// capacity; the send may be retried once the simulator drains it.
    pub async fn send(&mut self, endpoint_id: u32, payload: Vec<u8>) -> Result<()> {
        let body = self
            .call(request::Op::Send(SendMessage {
                endpoint_id,
                payload,
            }))
            .await?;
        match body {
            response::Body::Ack(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// One request/response exchange, unwrapping failure responses.
    async fn call(&mut self, op: request::Op) -> Result<response::Body> {
        let request = Request { op: Some(op) };
        write_frame(&mut self.stream, &request).await?;

        let response: Response = read_frame(&mut self.stream)
            .await?
            .ok_or(ClientError::Closed)?;

        match response.body {
            Some(response::Body::Failure(failure)) => Err(ClientError::Bridge {
                reason: failure.reason(),
                message: failure.message,
            }),
            Some(body) => Ok(body),
            None => Err(ClientError::UnexpectedResponse),
        }
    }
}

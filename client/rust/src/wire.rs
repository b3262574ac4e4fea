//! Wire protocol shared by the bridge server and its clients.
//!
//! Frame format: `[length:4][body:N]`
//!
//! - **length**: body size in bytes (little-endian u32), capped at
//!   [`MAX_FRAME_LEN`]
//! - **body**: one protobuf-encoded [`Request`] or [`Response`]
//!
//! Each connection is a sequential request/response stream. A client that
//! wants to park on a blocking receive opens a dedicated connection for it.
//! The payload bytes inside a frame are opaque to the bridge; only the two
//! endpoint participants interpret them.

use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame body size (16 MiB).
///
/// Frames larger than this are rejected to prevent memory exhaustion from a
/// misbehaving peer.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Wire-level error types.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Socket read/write failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame body did not decode as the expected message.
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Peer announced a frame larger than [`MAX_FRAME_LEN`].
    #[error("frame too large: {len} bytes (max {MAX_FRAME_LEN})")]
    FrameTooLarge {
        /// Announced body length.
        len: usize,
    },
}

/// Descriptors of one registered endpoint, as reported by ListEndpoints.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndpointInfo {
    /// Endpoint identifier.
    #[prost(uint32, tag = "1")]
    pub id: u32,
    /// Type id of messages the simulator sends (simulator to client).
    #[prost(int64, tag = "2")]
    pub send_type_id: i64,
    /// Declared size of the send type, stored verbatim.
    #[prost(int32, tag = "3")]
    pub send_type_size: i32,
    /// Type id of messages the simulator receives (client to simulator).
    #[prost(int64, tag = "4")]
    pub recv_type_id: i64,
    /// Declared size of the receive type, stored verbatim.
    #[prost(int32, tag = "5")]
    pub recv_type_size: i32,
}

/// Enumerate the registered endpoints.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ListEndpoints {}

/// Receive the next simulator-to-client message for one endpoint.
///
/// The server holds the request until a message is available or the bridge
/// shuts down.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RecvMessage {
    /// Endpoint to receive from.
    #[prost(uint32, tag = "1")]
    pub endpoint_id: u32,
}

/// Send one client-to-simulator message to an endpoint.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendMessage {
    /// Endpoint to deliver to.
    #[prost(uint32, tag = "1")]
    pub endpoint_id: u32,
    /// Message payload, opaque to the bridge.
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

/// One client request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    /// The requested operation.
    #[prost(oneof = "request::Op", tags = "1, 2, 3")]
    pub op: Option<request::Op>,
}

pub mod request {
    /// Operations a client may request.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        /// Enumerate registered endpoints.
        #[prost(message, tag = "1")]
        ListEndpoints(super::ListEndpoints),
        /// Blocking receive for one endpoint.
        #[prost(message, tag = "2")]
        Recv(super::RecvMessage),
        /// Send one message to one endpoint.
        #[prost(message, tag = "3")]
        Send(super::SendMessage),
    }
}

/// Response to [`ListEndpoints`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndpointList {
    /// Registered endpoints, ascending by id.
    #[prost(message, repeated, tag = "1")]
    pub endpoints: Vec<EndpointInfo>,
}

/// Response to [`RecvMessage`]: one delivered message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Delivery {
    /// Message payload, opaque to the bridge.
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
}

/// Response to [`SendMessage`]: the message was queued.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SendAck {}

/// Why a request failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FailureReason {
    /// Unknown or unset reason.
    Unspecified = 0,
    /// The endpoint id was never registered.
    UnknownEndpoint = 1,
    /// The endpoint's inbound queue is at capacity; the send may be retried.
    QueueFull = 2,
    /// The bridge is stopping; no further messages will flow.
    ShuttingDown = 3,
    /// The request carried no recognizable operation.
    MalformedRequest = 4,
}

/// Failed request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Failure {
    /// Failure classification.
    #[prost(enumeration = "FailureReason", tag = "1")]
    pub reason: i32,
    /// Human-readable detail.
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}

impl Failure {
    /// Build a failure response with the given reason and detail.
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason: reason as i32,
            message: message.into(),
        }
    }
}

/// One server response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    /// The response body.
    #[prost(oneof = "response::Body", tags = "1, 2, 3, 4")]
    pub body: Option<response::Body>,
}

pub mod response {
    /// Response bodies, one per request kind plus failure.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        /// Endpoint enumeration result.
        #[prost(message, tag = "1")]
        Endpoints(super::EndpointList),
        /// Delivered message.
        #[prost(message, tag = "2")]
        Delivery(super::Delivery),
        /// Send acknowledged.
        #[prost(message, tag = "3")]
        Ack(super::SendAck),
        /// Request failed.
        #[prost(message, tag = "4")]
        Failure(super::Failure),
    }
}

impl Response {
    /// Wrap a body in a response envelope.
    pub fn from_body(body: response::Body) -> Self {
        Self { body: Some(body) }
    }

    /// Build a failure response.
    pub fn failure(reason: FailureReason, message: impl Into<String>) -> Self {
        Self::from_body(response::Body::Failure(Failure::new(reason, message)))
    }
}

/// Write one length-prefixed frame.
pub async fn write_frame<W, M>(writer: &mut W, message: &M) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
    M: Message,
{
    let body = message.encode_to_vec();
    if body.len() > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge { len: body.len() });
    }
    writer.write_all(&(body.len() as u32).to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// Returns `Ok(None)` on clean end-of-stream (peer closed before the next
/// frame); a close mid-frame is an io error.
pub async fn read_frame<R, M>(reader: &mut R) -> Result<Option<M>, WireError>
where
    R: AsyncRead + Unpin,
    M: Message + Default,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge { len });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(M::decode(body.as_slice())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn roundtrip<M: Message + Default + PartialEq + std::fmt::Debug>(message: &M) -> M {
        let mut buf = Vec::new();
        write_frame(&mut buf, message).await.expect("write");
        let mut cursor = buf.as_slice();
        read_frame(&mut cursor).await.expect("read").expect("frame")
    }

    #[tokio::test]
    async fn test_request_roundtrip() {
        let request = Request {
            op: Some(request::Op::Send(SendMessage {
                endpoint_id: 7,
                payload: vec![1, 2, 3, 4],
            })),
        };
        assert_eq!(roundtrip(&request).await, request);
    }

    #[tokio::test]
    async fn test_response_roundtrip() {
        let response = Response::from_body(response::Body::Endpoints(EndpointList {
            endpoints: vec![EndpointInfo {
                id: 3,
                send_type_id: 0x1234,
                send_type_size: 8,
                recv_type_id: 0x5678,
                recv_type_size: 4,
            }],
        }));
        assert_eq!(roundtrip(&response).await, response);
    }

    #[tokio::test]
    async fn test_failure_reason_decoding() {
        let failure = Failure::new(FailureReason::QueueFull, "endpoint 9 inbound full");
        assert_eq!(failure.reason(), FailureReason::QueueFull);

        let unknown = Failure {
            reason: 999,
            message: String::new(),
        };
        assert_eq!(unknown.reason(), FailureReason::Unspecified);
    }

    #[tokio::test]
    async fn test_read_frame_clean_eof() {
        let mut empty: &[u8] = &[];
        let frame: Option<Request> = read_frame(&mut empty).await.expect("read");
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn test_read_frame_truncated_body_is_error() {
        let request = Request {
            op: Some(request::Op::ListEndpoints(ListEndpoints {})),
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &request).await.expect("write");
        // Announce a longer body than we deliver.
        buf[0] = buf[0].wrapping_add(10);

        let mut cursor = buf.as_slice();
        let result: Result<Option<Request>, _> = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(WireError::Io(_))));
    }

    #[tokio::test]
    async fn test_read_frame_oversize_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&((MAX_FRAME_LEN as u32) + 1).to_le_bytes());

        let mut cursor = buf.as_slice();
        let result: Result<Option<Request>, _> = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(WireError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_empty_payload_send() {
        let request = Request {
            op: Some(request::Op::Send(SendMessage {
                endpoint_id: 0,
                payload: vec![],
            })),
        };
        assert_eq!(roundtrip(&request).await, request);
    }

    #[tokio::test]
    async fn test_two_frames_back_to_back() {
        let first = Request {
            op: Some(request::Op::Recv(RecvMessage { endpoint_id: 1 })),
        };
        let second = Request {
            op: Some(request::Op::Recv(RecvMessage { endpoint_id: 2 })),
        };

        let mut buf = Vec::new();
        write_frame(&mut buf, &first).await.expect("write");
        write_frame(&mut buf, &second).await.expect("write");

        let mut cursor = buf.as_slice();
        let a: Request = read_frame(&mut cursor).await.expect("read").expect("frame");
        let b: Request = read_frame(&mut cursor).await.expect("read").expect("frame");
        assert_eq!(a, first);
        assert_eq!(b, second);
    }
}

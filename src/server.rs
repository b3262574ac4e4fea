//! Client listener: accept loop and per-connection request handling.
//!
//! Each client connection is served by one task speaking the sequential
//! request/response wire protocol from `cosim_bridge_client::wire`. The
//! handlers call only registry and endpoint operations; payload bytes stay
//! opaque.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use cosim_bridge_client::wire::{
    read_frame, request, response, write_frame, Delivery, EndpointInfo, EndpointList,
    FailureReason, Request, Response, SendAck, WireError,
};

use crate::endpoint::PushError;
use crate::message::MessageBlob;
use crate::registry::EndpointRegistry;

/// Accept client connections until shutdown.
pub(crate) async fn serve(
    listener: TcpListener,
    registry: Arc<EndpointRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!(peer = %peer, "client connected");
                        tokio::spawn(handle_connection(
                            stream,
                            registry.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("listener stopping");
                return;
            }
        }
    }
}

/// Serve one client connection until it closes or the bridge stops.
async fn handle_connection(
    mut stream: TcpStream,
    registry: Arc<EndpointRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let peer = stream.peer_addr().ok();
    loop {
        let request: Option<Request> = tokio::select! {
            read = read_frame(&mut stream) => match read {
                Ok(frame) => frame,
                Err(WireError::Io(e)) => {
                    debug!(peer = ?peer, error = %e, "client read failed");
                    break;
                }
                Err(e) => {
                    warn!(peer = ?peer, error = %e, "malformed client frame");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        };

        let Some(request) = request else {
            debug!(peer = ?peer, "client disconnected");
            break;
        };

        let response = match request.op {
            Some(request::Op::ListEndpoints(_)) => list_endpoints(&registry),
            Some(request::Op::Send(send)) => {
                send_inbound(&registry, send.endpoint_id, send.payload)
            }
            Some(request::Op::Recv(recv)) => {
                recv_outbound(&registry, recv.endpoint_id, &mut shutdown).await
            }
            None => Response::failure(FailureReason::MalformedRequest, "request without operation"),
        };

        if let Err(e) = write_frame(&mut stream, &response).await {
            debug!(peer = ?peer, error = %e, "client write failed");
            break;
        }
    }
}

fn list_endpoints(registry: &EndpointRegistry) -> Response {
    let endpoints = registry
        .snapshot()
        .iter()
        .map(|ep| EndpointInfo {
            id: ep.id(),
            send_type_id: ep.send_type().type_id,
            send_type_size: ep.send_type().size,
            recv_type_id: ep.recv_type().type_id,
            recv_type_size: ep.recv_type().size,
        })
        .collect();
    Response::from_body(response::Body::Endpoints(EndpointList { endpoints }))
}

fn send_inbound(registry: &EndpointRegistry, endpoint_id: u32, payload: Vec<u8>) -> Response {
    let Some(ep) = registry.lookup(endpoint_id) else {
        return Response::failure(
            FailureReason::UnknownEndpoint,
            format!("endpoint {endpoint_id} not registered"),
        );
    };

    match ep.push_inbound(MessageBlob::from(payload)) {
        Ok(()) => Response::from_body(response::Body::Ack(SendAck {})),
        Err(PushError::Full) => Response::failure(
            FailureReason::QueueFull,
            format!("endpoint {endpoint_id} inbound queue full"),
        ),
        Err(PushError::Closed) => {
            Response::failure(FailureReason::ShuttingDown, "bridge stopping")
        }
    }
}

async fn recv_outbound(
    registry: &EndpointRegistry,
    endpoint_id: u32,
    shutdown: &mut watch::Receiver<bool>,
) -> Response {
    let Some(ep) = registry.lookup(endpoint_id) else {
        return Response::failure(
            FailureReason::UnknownEndpoint,
            format!("endpoint {endpoint_id} not registered"),
        );
    };

    tokio::select! {
        message = ep.next_outbound() => match message {
            Some(blob) => Response::from_body(response::Body::Delivery(Delivery {
                payload: blob.into_bytes().to_vec(),
            })),
            None => Response::failure(FailureReason::ShuttingDown, "bridge stopping"),
        },
        _ = shutdown.changed() => {
            Response::failure(FailureReason::ShuttingDown, "bridge stopping")
        }
    }
}

//! Simulator-facing entry points.
//!
//! This is the fixed, non-blocking native call surface the simulator is
//! generated against; signatures and status codes must remain stable once
//! published. All functions return synchronously and never suspend: a
//! stall here stalls simulated time.
//!
//! # Safety
//! All pointer-taking functions use the `extern "C"` ABI and must be called
//! with valid pointers. Foreign buffers are described by [`ByteArrayRef`],
//! validated once at the boundary, and copied into owned memory; the bridge
//! never indexes through the handle afterwards.
//!
//! # Threading
//! A single simulator polling thread per endpoint is assumed. Concurrent
//! try-get/try-put calls for the same endpoint id are not a supported
//! scenario; no cross-call locking is added that could perturb observable
//! FIFO order.

use std::slice;

use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::broker;
use crate::config::Config;
use crate::endpoint::TypeDescriptor;
use crate::message::MessageBlob;

/// Success.
pub const STATUS_OK: i32 = 0;
/// The broker is not running, or (from register) the id is a duplicate.
pub const STATUS_NOT_RUNNING: i32 = -1;
/// Duplicate endpoint registration.
pub const STATUS_DUPLICATE_ENDPOINT: i32 = -1;
/// The foreign buffer is malformed (shape, null data, size inconsistency).
pub const STATUS_BAD_BUFFER: i32 = -2;
/// The declared size exceeds the buffer's actual capacity.
pub const STATUS_BAD_SIZE: i32 = -3;
/// The endpoint id was never registered.
pub const STATUS_UNKNOWN_ENDPOINT: i32 = -4;
/// The pending message does not fit in the resolved buffer capacity.
pub const STATUS_MESSAGE_TOO_BIG: i32 = -5;

/// Sentinel `size` value on try-get meaning "detect the buffer capacity".
pub const SIZE_UNKNOWN: u32 = u32::MAX;

/// Description of a foreign byte buffer owned by the simulator runtime.
///
/// Mirrors the shape/size queries of the simulator's open-array handle: a
/// valid message buffer is one-dimensional with a C-layout data pointer and
/// one byte per element.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ByteArrayRef {
    /// C-layout data pointer.
    pub data: *mut u8,
    /// Number of array dimensions.
    pub num_dims: i32,
    /// Number of elements in the first dimension.
    pub elem_count: i32,
    /// Total size of the array in bytes.
    pub total_bytes: i32,
}

/// Validate a foreign buffer handle and return its data view.
///
/// Checks that the handle is present, one-dimensional, C-layout, and sized
/// at one byte per element. Any violation is a caller integration bug and
/// is logged.
fn validated_view(data: *const ByteArrayRef) -> Option<(*mut u8, usize)> {
    if data.is_null() {
        error!("foreign buffer handle is null");
        return None;
    }
    // The caller guarantees the handle itself is readable.
    let array = unsafe { *data };
    if array.num_dims != 1 {
        error!(dims = array.num_dims, "foreign buffer is not one-dimensional");
        return None;
    }
    if array.data.is_null() {
        error!("foreign buffer has no C-layout data pointer");
        return None;
    }
    if array.total_bytes <= 0 {
        error!(total_bytes = array.total_bytes, "foreign buffer has no C layout (zero size)");
        return None;
    }
    if array.elem_count != array.total_bytes {
        error!(
            elem_count = array.elem_count,
            total_bytes = array.total_bytes,
            "foreign buffer element size is not one byte"
        );
        return None;
    }
    Some((array.data, array.total_bytes as usize))
}

/// Install a default tracing subscriber unless the host already did.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Start the bridge: bind the client listener and transition to Running.
///
/// Idempotent; returns 0 on success, -1 if the listener cannot be bound.
#[no_mangle]
pub extern "C" fn cosim_server_init() -> i32 {
    init_tracing();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load bridge configuration");
            return STATUS_NOT_RUNNING;
        }
    };

    match broker::global_init(&config) {
        Ok(()) => STATUS_OK,
        Err(e) => {
            error!(error = %e, "failed to start bridge");
            STATUS_NOT_RUNNING
        }
    }
}

/// Register a simulated device endpoint.
///
/// Starts the bridge first if needed (self-healing lazy start). Returns 0
/// on success, -1 on duplicate registration.
#[no_mangle]
pub extern "C" fn cosim_server_ep_register(
    id: i32,
    send_type_id: i64,
    send_type_size: i32,
    recv_type_id: i64,
    recv_type_size: i32,
) -> i32 {
    let status = cosim_server_init();
    if status != STATUS_OK {
        return status;
    }

    let Some(registry) = broker::global_registry() else {
        return STATUS_NOT_RUNNING;
    };

    if registry.register(
        id as u32,
        TypeDescriptor::new(send_type_id, send_type_size),
        TypeDescriptor::new(recv_type_id, recv_type_size),
    ) {
        STATUS_OK
    } else {
        STATUS_DUPLICATE_ENDPOINT
    }
}

/// Attempt to receive a client-to-simulator message into a foreign buffer.
///
/// - Returns -1 if the bridge is not running, -4 for an unknown endpoint.
/// - An empty queue is success: `*size` is set to 0 and all buffer
///   validation is skipped, since per-tick polling hits this path almost
///   every call.
/// - With a message pending, the buffer must be a valid one-dimensional
///   byte array (-2 otherwise). `*size == u32::MAX` means "use the
///   buffer's capacity"; any other value must not exceed it (-3).
/// - A message larger than the resolved capacity fails with -5 and stays
///   queued; a failed get never loses or duplicates a message.
/// - On success the message bytes land at offset 0, the rest of the
///   resolved capacity is zero-filled, `*size` becomes the exact message
///   length, and the message is consumed.
///
/// # Safety
/// `data` must describe a live buffer of at least `total_bytes` bytes and
/// `size` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn cosim_server_ep_try_get(
    id: u32,
    data: *const ByteArrayRef,
    size: *mut u32,
) -> i32 {
    let Some(registry) = broker::global_registry() else {
        return STATUS_NOT_RUNNING;
    };

    let Some(ep) = registry.lookup(id) else {
        error!(endpoint = id, "try-get on unregistered endpoint");
        return STATUS_UNKNOWN_ENDPOINT;
    };

    if size.is_null() {
        error!("try-get size pointer is null");
        return STATUS_BAD_BUFFER;
    }

    // Empty queue is the common case under per-tick polling; report it
    // before touching the buffer at all.
    let Some(pending_len) = ep.peek_inbound_len() else {
        *size = 0;
        return STATUS_OK;
    };

    let Some((buf, capacity)) = validated_view(data) else {
        return STATUS_BAD_BUFFER;
    };

    // Detect or verify the usable capacity.
    let requested = *size;
    let resolved = if requested == SIZE_UNKNOWN {
        capacity
    } else if requested as usize > capacity {
        error!(
            endpoint = id,
            requested,
            capacity,
            "try-get size exceeds buffer capacity"
        );
        return STATUS_BAD_SIZE;
    } else {
        requested as usize
    };

    if pending_len > resolved {
        warn!(
            endpoint = id,
            message_len = pending_len,
            capacity = resolved,
            "pending message too big for buffer, leaving it queued"
        );
        return STATUS_MESSAGE_TOO_BIG;
    }

    // Single simulator caller per endpoint: the peeked message is still
    // the queue head here.
    let Some(blob) = ep.poll_inbound() else {
        *size = 0;
        return STATUS_OK;
    };

    let dst = slice::from_raw_parts_mut(buf, resolved);
    dst[..blob.len()].copy_from_slice(blob.as_slice());
    dst[blob.len()..].fill(0);
    *size = blob.len() as u32;
    STATUS_OK
}

/// Attempt to send a simulator-to-client message from a foreign buffer.
///
/// - Returns -1 if the bridge is not running, -2 for a malformed buffer,
///   -4 for an unknown endpoint.
/// - A negative `size` means "use the buffer's full capacity"; any other
///   value must not exceed it (-3).
/// - Each call produces exactly one message; the bytes are copied out of
///   the foreign buffer before the call returns.
///
/// # Safety
/// `data` must describe a live buffer of at least `total_bytes` bytes.
#[no_mangle]
pub unsafe extern "C" fn cosim_server_ep_try_put(
    id: u32,
    data: *const ByteArrayRef,
    size: i32,
) -> i32 {
    let Some(registry) = broker::global_registry() else {
        return STATUS_NOT_RUNNING;
    };

    let Some((buf, capacity)) = validated_view(data) else {
        return STATUS_BAD_BUFFER;
    };

    // Detect or verify the message size.
    let resolved = if size < 0 {
        capacity
    } else if size as usize > capacity {
        error!(
            endpoint = id,
            size,
            capacity,
            "try-put size exceeds buffer capacity"
        );
        return STATUS_BAD_SIZE;
    } else {
        size as usize
    };

    let Some(ep) = registry.lookup(id) else {
        error!(endpoint = id, "try-put on unregistered endpoint");
        return STATUS_UNKNOWN_ENDPOINT;
    };

    let blob = MessageBlob::copy_from_slice(slice::from_raw_parts(buf, resolved));
    ep.push_outbound(blob);
    STATUS_OK
}

/// Tear down the bridge: disconnect clients, stop listening, discard all
/// endpoints. Safe to call multiple times.
#[no_mangle]
pub extern "C" fn cosim_server_finish() {
    broker::global_stop();
}

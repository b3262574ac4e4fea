//! Endpoints and their per-direction message queues.
//!
//! Each endpoint owns one inbound queue (producer: client, consumer:
//! simulator) and one outbound queue (producer: simulator, consumer:
//! client). The queues are synchronized independently, so traffic on one
//! endpoint never stalls another.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::warn;

use crate::message::MessageBlob;

/// Endpoint identifier, unique within one registry instance.
pub type EndpointId = u32;

/// A (type id, byte size) pair for one message direction.
///
/// Stored verbatim at registration; the bridge never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Opaque type identifier declared by the simulator.
    pub type_id: i64,
    /// Declared size in bytes.
    pub size: i32,
}

impl TypeDescriptor {
    /// Build a descriptor from raw registration arguments.
    pub fn new(type_id: i64, size: i32) -> Self {
        Self { type_id, size }
    }
}

/// Why a bounded push was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// The queue is at capacity; the push may be retried after a drain.
    #[error("queue full")]
    Full,
    /// The queue was closed by bridge teardown.
    #[error("queue closed")]
    Closed,
}

struct QueueInner {
    queue: VecDeque<MessageBlob>,
    closed: bool,
}

/// Bounded FIFO of message blobs with one producer role and one consumer
/// role.
///
/// All operations used by the simulator side are non-blocking; the client
/// side waits asynchronously via [`MessageQueue::pop_wait`]. The waiter is
/// woken through a stored-permit notification, so a push that lands between
/// the consumer's empty check and its park is never lost.
pub struct MessageQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
}

impl MessageQueue {
    /// Create an empty queue holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                queue: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueInner> {
        // A poisoning panic cannot cross the entry-point boundary; the
        // queue state itself is a plain VecDeque and stays coherent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Non-blocking pop of the oldest message.
    pub fn try_pop(&self) -> Option<MessageBlob> {
        self.lock().queue.pop_front()
    }

    /// Length of the oldest pending message without consuming it.
    ///
    /// `None` means the queue is empty.
    pub fn peek_len(&self) -> Option<usize> {
        self.lock().queue.front().map(MessageBlob::len)
    }

    /// Append a message, rejecting it if the queue is full or closed.
    pub fn try_push(&self, blob: MessageBlob) -> Result<(), PushError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(PushError::Closed);
        }
        if inner.queue.len() >= self.capacity {
            return Err(PushError::Full);
        }
        inner.queue.push_back(blob);
        drop(inner);
        self.notify.notify_one();
        Ok(())
    }

    /// Append a message, evicting the oldest entry if the queue is full.
    ///
    /// Returns the number of evicted messages (0 or 1). Pushes onto a
    /// closed queue are dropped; the bridge is tearing down and nothing
    /// will consume them.
    pub fn push_evict(&self, blob: MessageBlob) -> usize {
        let mut evicted = 0;
        {
            let mut inner = self.lock();
            if inner.closed {
                return 0;
            }
            if inner.queue.len() >= self.capacity {
                inner.queue.pop_front();
                evicted = 1;
            }
            inner.queue.push_back(blob);
        }
        self.notify.notify_one();
        evicted
    }

    /// Wait for the oldest message, consuming it.
    ///
    /// Returns `None` once the queue is closed and drained. Intended for a
    /// single logical consumer per queue.
    pub async fn pop_wait(&self) -> Option<MessageBlob> {
        loop {
            {
                let mut inner = self.lock();
                if let Some(blob) = inner.queue.pop_front() {
                    return Some(blob);
                }
                if inner.closed {
                    return None;
                }
            }
            // notify_one stores a permit, so a push that raced the check
            // above completes this await immediately.
            self.notify.notified().await;
        }
    }

    /// Close the queue, waking any parked consumer.
    ///
    /// Already-queued messages remain poppable; new pushes are rejected.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// True if no messages are queued.
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// True once [`MessageQueue::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// An addressable channel pairing one simulator-side and one client-side
/// participant, with a fixed per-direction type descriptor.
pub struct Endpoint {
    id: EndpointId,
    send_type: TypeDescriptor,
    recv_type: TypeDescriptor,
    /// Client to simulator.
    inbound: MessageQueue,
    /// Simulator to client.
    outbound: MessageQueue,
}

impl Endpoint {
    /// Create an endpoint with empty queues bounded at `queue_depth`.
    pub fn new(
        id: EndpointId,
        send_type: TypeDescriptor,
        recv_type: TypeDescriptor,
        queue_depth: usize,
    ) -> Self {
        Self {
            id,
            send_type,
            recv_type,
            inbound: MessageQueue::new(queue_depth),
            outbound: MessageQueue::new(queue_depth),
        }
    }

    /// Endpoint identifier.
    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// Descriptor of the simulator-to-client direction.
    pub fn send_type(&self) -> TypeDescriptor {
        self.send_type
    }

    /// Descriptor of the client-to-simulator direction.
    pub fn recv_type(&self) -> TypeDescriptor {
        self.recv_type
    }

    /// Non-blocking pop of the oldest inbound message (simulator side).
    pub fn poll_inbound(&self) -> Option<MessageBlob> {
        self.inbound.try_pop()
    }

    /// Length of the oldest pending inbound message without consuming it.
    ///
    /// A failed get must leave the message queued, so the entry-point layer
    /// peeks here and pops only on the success path.
    pub fn peek_inbound_len(&self) -> Option<usize> {
        self.inbound.peek_len()
    }

    /// Non-blocking append to the outbound tail (simulator side).
    ///
    /// Overflow evicts the oldest outbound message rather than blocking or
    /// failing: the entry-point status surface is fixed. Evictions are
    /// logged, never silent.
    pub fn push_outbound(&self, blob: MessageBlob) {
        if self.outbound.push_evict(blob) > 0 {
            warn!(
                endpoint = self.id,
                "outbound queue full, evicted oldest message"
            );
        }
    }

    /// Append an inbound message (client side), rejecting on overflow.
    pub fn push_inbound(&self, blob: MessageBlob) -> Result<(), PushError> {
        self.inbound.try_push(blob)
    }

    /// Wait for the next outbound message (client side).
    ///
    /// Returns `None` once the bridge closed the endpoint.
    pub async fn next_outbound(&self) -> Option<MessageBlob> {
        self.outbound.pop_wait().await
    }

    /// Non-blocking pop of the oldest outbound message (client side).
    pub fn try_next_outbound(&self) -> Option<MessageBlob> {
        self.outbound.try_pop()
    }

    /// Close both queues, unblocking any parked client consumer.
    pub fn close(&self) {
        self.inbound.close();
        self.outbound.close();
    }

    #[cfg(test)]
    pub(crate) fn outbound_len(&self) -> usize {
        self.outbound.len()
    }
}

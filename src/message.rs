//! Message blobs exchanged across the bridge.

use bytes::Bytes;

/// An immutable owned byte buffer representing one message.
///
/// Constructed once by copying out of a foreign buffer or a wire payload;
/// never mutated afterwards. Ownership transfers atomically from producer
/// to queue to consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBlob {
    data: Bytes,
}

impl MessageBlob {
    /// Build a blob by copying the given bytes.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Message length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length message.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Message bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the blob, yielding its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Vec<u8>> for MessageBlob {
    fn from(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }
}

impl From<Bytes> for MessageBlob {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

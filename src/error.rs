use thiserror::Error;

/// Reasons a bit sequence is not (yet) a valid frame.
///
/// While streaming these are the normal "keep accumulating" outcome, not
/// failures of the receive session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("start sync pattern not found")]
    MissingStartMarker,

    #[error("end sync pattern not found after start pattern")]
    MissingEndMarker,

    #[error("manchester payload has odd length {0}")]
    OddPayloadLength(usize),

    /// Offset is relative to the first payload bit.
    #[error("invalid manchester pair at payload offset {0}")]
    InvalidPair(usize),

    #[error("decoded {0} raw bits, not a whole number of bytes")]
    NotByteAligned(usize),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid bit symbol at position {0}, expected '0' or '1'")]
    InvalidSymbol(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The frame could not be read this time, the next read may succeed.
    #[error("frame acquisition failed")]
    Transient,

    #[error("capture device disconnected: {0}")]
    Disconnected(String),

    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("bit duration {0} ms outside of [{min}, {max}] ms", min = crate::node::MIN_BIT_DURATION_MS, max = crate::node::MAX_BIT_DURATION_MS)]
    InvalidBitDuration(u64),

    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("message too long: {length} characters, max {max}")]
    MessageTooLong { length: usize, max: usize },

    #[error("a session is already active")]
    SessionBusy,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

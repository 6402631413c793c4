//! Error types for live sets
//!
//! - [`ProtocolError`]: a delivered message could not be applied; the live
//!   set keeps processing
//! - [`TransportError`]: the inbound stream failed; terminal

use crate::message::DeltaKind;

/// Malformed or out-of-order message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Message is not a recognizable delta envelope
    #[error("malformed message: {0}")]
    MalformedEnvelope(String),

    /// Envelope carries an event kind this live set does not know
    #[error("unknown message kind: '{0}'")]
    UnknownKind(String),

    /// Payload could not be deserialized for this kind
    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload {
        /// Kind of the offending message
        kind: DeltaKind,
        /// Deserialization failure
        reason: String,
    },

    /// Change or removal for an id that is not in the set
    #[error("{kind} for unknown entity {id}")]
    UnknownEntity {
        /// Kind of the offending message
        kind: DeltaKind,
        /// Debug form of the identifier
        id: String,
    },
}

impl ProtocolError {
    /// Create malformed payload error
    #[must_use]
    pub fn malformed(kind: DeltaKind, reason: impl ToString) -> Self {
        Self::MalformedPayload {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// Inbound stream failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport failed: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Create transport error
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Failure description
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error delivered on a sink's error channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiveSetError {
    /// Message rejected, processing continues
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Stream failed, the live set has stopped
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl LiveSetError {
    /// Check if the live set stopped because of this error
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

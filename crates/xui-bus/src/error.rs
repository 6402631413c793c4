//! Error types for the event bus

use crate::bus::ListenerId;

/// Event bus errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// No listener registered under this id
    #[error("listener not found: {0}")]
    ListenerNotFound(ListenerId),
}

//! Error definitions for the leash state.

use thiserror::Error;

use super::channel::{Channel, ValueKind};

#[derive(Debug, Error)]
pub enum LeashError {
    /// Inbound payload could not be read as the channel's value type.
    #[error("Malformed update on channel {channel}: expected {expected}, {reason}")]
    MalformedUpdate {
        channel: Channel,
        expected: ValueKind,
        reason: String,
    },

    /// The worker task owning the state has stopped.
    #[error("Leash worker stopped")]
    WorkerStopped,
}

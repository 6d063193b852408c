//! # Leash State
//!
//! Holds the latest readings reported by the leash physbone and the grab/release
//! memory the control loop needs for edge detection.
//!
//! ```text
//! leash/
//! ├── channel.rs  - the six inbound channels and the address routing table
//! ├── state.rs    - LeashState, typed updates and per-tick observations
//! ├── worker.rs   - task owning the state, reached through LeashHandle
//! └── error.rs    - LeashError
//! ```
//!
//! ## Ownership
//!
//! The state has exactly one owner, the leash worker task. Inbound handlers send
//! single-field updates and the control loop requests observations over the same
//! channel, so the worker applies every action to completion before looking at
//! the next one. An observation therefore never sees a half-applied update and
//! the edge memory is only ever touched in one place.
//!
//! ```text
//! OSC listener ──(LeashUpdate)──┐
//!                               ▼
//!                          LeashWorker ──owns──► LeashState
//!                               ▲
//! Control loop ──(Observe)──────┘──(TickSnapshot)──► Control loop
//! ```

pub mod channel;
pub mod error;
pub mod state;
pub mod worker;

pub use channel::{AddressTable, Channel};
pub use error::LeashError;
pub use state::{LeashState, LeashUpdate, TickSnapshot};
pub use worker::{LeashHandle, LeashWorker};

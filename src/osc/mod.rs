//! # OSC Transport
//!
//! UDP plumbing between the avatar client and the bridge. Binary framing is
//! handled by `rosc`; this module only binds sockets, routes addresses and
//! turns I/O failures into [`TransportError`]s.
//!
//! ```text
//! osc/
//! ├── listener.rs  - inbound parameters → LeashUpdate → leash worker
//! ├── sender.rs    - CommandSink trait and the UDP OscSender
//! └── error.rs     - TransportError
//! ```
//!
//! Neither direction acknowledges anything. Inbound messages with an unknown
//! address are ignored, malformed payloads are logged and dropped, and a failed
//! send is left for the caller to report.

pub mod error;
pub mod listener;
pub mod sender;

pub use error::TransportError;
pub use listener::{ListenerStats, OscListener};
pub use sender::{CommandSink, OscSender};

//! OSC leash bridge.
//!
//! Reads the leash physbone parameters an avatar client reports over OSC and
//! answers with `/input/Vertical`, `/input/Horizontal` and `/input/Run` so the
//! avatar walks or runs in the direction it is pulled.

pub mod bridge;
pub mod config;
pub mod leash;
pub mod osc;

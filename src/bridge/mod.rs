//! # Bridge
//!
//! Turns the leash state into movement commands at a fixed rate and wires the
//! pieces of a running bridge together.
//!
//! - [`movement`] - deadzone classification and the command type
//! - [`control_loop`] - the periodic tick as a statum state machine
//!
//! [`Bridge::start`] spawns the leash worker, the OSC listener and the control
//! loop under one cancellation token:
//!
//! ```text
//! OscListener ──► LeashWorker ◄── ControlLoop ──► CommandSink (OscSender)
//! ```

pub mod control_loop;
pub mod movement;

pub use control_loop::{ControlLoop, LoopSettings, LoopStats};
pub use movement::{Deadzones, LeashPhase, MovementCommand, TickAction};

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::leash::{LeashState, LeashWorker};
use crate::osc::{CommandSink, ListenerStats, OscListener};

/// Summary of a stopped bridge.
#[derive(Debug, Default)]
pub struct BridgeReport {
    pub loop_stats: LoopStats,
    pub listener_stats: ListenerStats,
    pub final_state: LeashState,
}

/// Handles of the three tasks of a running bridge.
pub struct Bridge {
    cancel: CancellationToken,
    worker: JoinHandle<LeashState>,
    listener: JoinHandle<ListenerStats>,
    control: JoinHandle<LoopStats>,
}

impl Bridge {
    /// Spawns worker, listener and control loop. The listener must already be
    /// bound so a taken port is reported before anything runs.
    pub fn start(
        listener: OscListener,
        sink: Arc<dyn CommandSink>,
        settings: LoopSettings,
        cancel: CancellationToken,
    ) -> Self {
        let (leash, worker) = LeashWorker::spawn(cancel.clone());

        let listener = tokio::spawn(listener.run(leash.clone(), cancel.clone()));

        let control_loop = ControlLoop::create(leash, sink, settings, cancel.clone());
        let control = tokio::spawn(control_loop.run());

        info!("Bridge started");
        Self {
            cancel,
            worker,
            listener,
            control,
        }
    }

    /// Cancels all tasks and waits for them to finish.
    pub async fn shutdown(self) -> BridgeReport {
        self.cancel.cancel();

        let loop_stats = self.control.await.unwrap_or_else(|e| {
            error!("Control loop task failed: {}", e);
            LoopStats::default()
        });
        let listener_stats = self.listener.await.unwrap_or_else(|e| {
            error!("Listener task failed: {}", e);
            ListenerStats::default()
        });
        let final_state = self.worker.await.unwrap_or_else(|e| {
            error!("Leash worker task failed: {}", e);
            LeashState::default()
        });

        info!("Bridge stopped");
        BridgeReport {
            loop_stats,
            listener_stats,
            final_state,
        }
    }
}

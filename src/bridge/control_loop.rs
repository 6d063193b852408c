//! Control loop with statum state machine for one tick
//!
//! Every tick walks the same three states:
//!
//! ```text
//! Waiting ──observe──► Deciding(TickSnapshot) ──decide──► Emitting(TickAction)
//!    ▲                                                          │
//!    └──────────────────────────── emit ────────────────────────┘
//! ```
//!
//! Observing is the only step that touches the leash state. Deciding is pure.
//! Emitting sends commands and performs the release/idle waits, all outside of
//! the leash worker, so inbound updates keep flowing while a tick sleeps.
//!
//! Between two ticks the loop waits `active_delay` after the previous tick has
//! finished, so an idle tick takes `inactive_delay + active_delay` in total.

use chrono::Local;
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::movement::{Deadzones, LeashPhase, MovementCommand, TickAction};
use crate::config::BridgeConfig;
use crate::leash::{LeashError, LeashHandle, TickSnapshot};
use crate::osc::CommandSink;

#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub deadzones: Deadzones,
    pub active_delay: Duration,
    pub inactive_delay: Duration,
    /// Log every emitted command at info level instead of debug.
    pub log_commands: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            deadzones: Deadzones::default(),
            active_delay: Duration::from_millis(100),
            inactive_delay: Duration::from_millis(150),
            log_commands: false,
        }
    }
}

impl From<&BridgeConfig> for LoopSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            deadzones: Deadzones {
                walk: config.walk_deadzone,
                run: config.run_deadzone,
            },
            active_delay: config.active_delay(),
            inactive_delay: config.inactive_delay(),
            log_commands: config.logging,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub commands: u64,
    pub releases: u64,
    pub send_failures: u64,
}

#[state]
#[derive(Debug, Clone)]
pub enum TickState {
    Waiting,
    Deciding(TickSnapshot),
    Emitting(TickAction),
}

#[machine]
pub struct ControlLoop<S: TickState> {
    leash: LeashHandle,
    sink: Arc<dyn CommandSink>,
    settings: LoopSettings,
    cancel: CancellationToken,
    stats: LoopStats,
}

impl<S: TickState> ControlLoop<S> {
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Sends the three input values. A failed send is reported and the
    /// remaining values are still sent.
    async fn send_command(&mut self, command: MovementCommand) {
        for (address, value) in command.messages() {
            if let Err(e) = self.sink.send_float(address, value).await {
                warn!("{}", e);
                self.stats.send_failures += 1;
            }
        }
        self.stats.commands += 1;

        if self.settings.log_commands {
            info!("Sending: {}", command);
        } else {
            debug!("Sending: {}", command);
        }
    }

    /// Sleeps for `duration`. Returns false if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }
}

impl ControlLoop<Waiting> {
    pub fn create(
        leash: LeashHandle,
        sink: Arc<dyn CommandSink>,
        settings: LoopSettings,
        cancel: CancellationToken,
    ) -> Self {
        info!("Creating control loop with settings: {:?}", settings);
        Self::new(leash, sink, settings, cancel, LoopStats::default())
    }

    /// Reads and advances the leash state for this tick.
    pub async fn observe(mut self) -> Result<ControlLoop<Deciding>, LeashError> {
        // Single round trip to the worker: read, derive and edge update
        let snapshot = self.leash.observe().await?;
        self.stats.ticks += 1;
        debug!("Tick {} observed {:?}", self.stats.ticks, snapshot);
        Ok(self.transition_with(snapshot))
    }

    /// Sends a single stop command, used when starting and stopping.
    pub async fn stop(&mut self) {
        self.send_command(MovementCommand::STOP).await;
    }

    /// Runs one full tick.
    pub async fn tick(self) -> Result<ControlLoop<Waiting>, LeashError> {
        let deciding = self.observe().await?;
        let emitting = deciding.decide();
        Ok(emitting.emit().await)
    }

    /// Runs until cancelled or the leash worker stops. Sends a stop command
    /// before the first tick and after the last one.
    pub async fn run(mut self) -> LoopStats {
        let cancel = self.cancel.clone();
        let sink = self.sink.clone();
        let active_delay = self.settings.active_delay;
        info!(
            "Starting control loop with {}ms delay between ticks",
            active_delay.as_millis()
        );

        // Make sure the peer starts from rest
        self.stop().await;

        // Stats for periodic logging
        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);

        let mut control = self;
        let stats = loop {
            if cancel.is_cancelled() {
                debug!("Control loop cancelled");
                control.stop().await;
                break control.stats();
            }

            // Run one cycle of the tick state machine
            let before = control.stats();
            control = match control.tick().await {
                Ok(next) => next,
                Err(e) => {
                    // Worker is gone, the machine went with the failed tick
                    warn!("Control loop stopping: {}", e);
                    for (address, value) in MovementCommand::STOP.messages() {
                        if let Err(e) = sink.send_float(address, value).await {
                            warn!("{}", e);
                        }
                    }
                    break before;
                }
            };

            // Log stats periodically
            let now = Local::now();
            if now - last_stats_time > stats_interval {
                let stats = control.stats();
                info!(
                    "Control loop stats: {} ticks, {} commands, {} releases, {} send failures",
                    stats.ticks, stats.commands, stats.releases, stats.send_failures
                );
                last_stats_time = now;
            }

            // Wait for the next tick; a cancel ends the wait early and is
            // picked up at the top of the loop
            debug!("Waiting {}ms for next tick", active_delay.as_millis());
            control.pause(active_delay).await;
        };

        info!("Control loop stopped: {:?}", stats);
        stats
    }
}

impl ControlLoop<Deciding> {
    pub fn decide(self) -> ControlLoop<Emitting> {
        let action = match self.get_state_data() {
            Some(snapshot) => TickAction::decide(snapshot, &self.settings.deadzones),
            None => {
                warn!("No snapshot in Deciding state, treating tick as idle");
                TickAction {
                    phase: LeashPhase::Idle,
                    command: MovementCommand::STOP,
                }
            }
        };
        self.transition_with(action)
    }
}

impl ControlLoop<Emitting> {
    pub fn action(&self) -> Option<&TickAction> {
        self.get_state_data()
    }

    pub async fn emit(mut self) -> ControlLoop<Waiting> {
        // Get the action from state data
        let action = self.get_state_data().copied().unwrap_or(TickAction {
            phase: LeashPhase::Idle,
            command: MovementCommand::STOP,
        });

        match action.phase {
            // Grabbed: the command already carries the deadzone decision
            LeashPhase::Running | LeashPhase::Walking | LeashPhase::Still => {
                self.send_command(action.command).await;
            }
            LeashPhase::JustReleased => {
                info!("Leash released, stopping movement");
                self.stats.releases += 1;
                self.send_command(MovementCommand::STOP).await;
                // a command from the grabbed state may still be in flight
                if self.pause(self.settings.inactive_delay).await {
                    self.send_command(MovementCommand::STOP).await;
                }
            }
            // Nothing to send, just slow down while nobody holds the leash
            LeashPhase::Idle => {
                self.pause(self.settings.inactive_delay).await;
            }
        }

        // Transition back to Waiting state
        self.transition()
    }
}

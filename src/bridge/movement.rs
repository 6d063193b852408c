use std::fmt;

use crate::leash::TickSnapshot;

pub const INPUT_VERTICAL: &str = "/input/Vertical";
pub const INPUT_HORIZONTAL: &str = "/input/Horizontal";
pub const INPUT_RUN: &str = "/input/Run";

/// Stretch thresholds separating standing still, walking and running.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Deadzones {
    pub walk: f32,
    pub run: f32,
}

impl Default for Deadzones {
    fn default() -> Self {
        Self {
            walk: 0.15,
            run: 0.70,
        }
    }
}

/// One movement command as sent to the three input addresses.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementCommand {
    pub vertical: f32,
    pub horizontal: f32,
    pub run: bool,
}

impl MovementCommand {
    pub const STOP: MovementCommand = MovementCommand {
        vertical: 0.0,
        horizontal: 0.0,
        run: false,
    };

    pub fn run_value(&self) -> f32 {
        if self.run {
            1.0
        } else {
            0.0
        }
    }

    /// `(address, value)` pairs in send order.
    pub fn messages(&self) -> [(&'static str, f32); 3] {
        [
            (INPUT_VERTICAL, self.vertical),
            (INPUT_HORIZONTAL, self.horizontal),
            (INPUT_RUN, self.run_value()),
        ]
    }
}

impl fmt::Display for MovementCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Vertical - {:.2} | Horizontal - {:.2} | Run - {}",
            self.vertical,
            self.horizontal,
            self.run_value()
        )
    }
}

/// Phase of the leash as seen by one tick. Derived from the snapshot every
/// tick, never kept between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeashPhase {
    Idle,
    Running,
    Walking,
    Still,
    JustReleased,
}

impl LeashPhase {
    pub fn derive(snapshot: &TickSnapshot, deadzones: &Deadzones) -> Self {
        if snapshot.grabbed {
            if snapshot.stretch > deadzones.run {
                LeashPhase::Running
            } else if snapshot.stretch > deadzones.walk {
                LeashPhase::Walking
            } else {
                LeashPhase::Still
            }
        } else if snapshot.released {
            LeashPhase::JustReleased
        } else {
            LeashPhase::Idle
        }
    }
}

/// What the emitting step of a tick has to do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickAction {
    pub phase: LeashPhase,
    /// Command for grabbed phases, [`MovementCommand::STOP`] otherwise.
    pub command: MovementCommand,
}

impl TickAction {
    pub fn decide(snapshot: &TickSnapshot, deadzones: &Deadzones) -> Self {
        let phase = LeashPhase::derive(snapshot, deadzones);
        let command = match phase {
            LeashPhase::Running | LeashPhase::Walking => MovementCommand {
                vertical: snapshot.vertical,
                horizontal: snapshot.horizontal,
                run: phase == LeashPhase::Running,
            },
            LeashPhase::Still | LeashPhase::JustReleased | LeashPhase::Idle => {
                MovementCommand::STOP
            }
        };
        Self { phase, command }
    }
}

use rosc::OscType;
use std::fmt;

use super::channel::{Channel, ValueKind};
use super::error::LeashError;

/// Latest readings of the leash plus the edge detection memory.
///
/// Values are stored exactly as received, nothing is clamped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeashState {
    pub z_positive: f32,
    pub z_negative: f32,
    pub x_positive: f32,
    pub x_negative: f32,
    pub stretch: f32,
    pub grabbed: bool,
    /// Set once a grab has been observed by a tick, cleared on the tick that
    /// detects the release.
    pub was_grabbed: bool,
}

/// A single-field write to [`LeashState`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LeashUpdate {
    ZPositive(f32),
    ZNegative(f32),
    XPositive(f32),
    XNegative(f32),
    Stretch(f32),
    Grabbed(bool),
}

/// What one tick observed, taken atomically with the edge update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickSnapshot {
    pub vertical: f32,
    pub horizontal: f32,
    pub stretch: f32,
    pub grabbed: bool,
    /// True on the one tick where a release edge was detected.
    pub released: bool,
}

impl LeashUpdate {
    /// Reads the first OSC argument as the value type `channel` expects.
    ///
    /// Float channels take floats, doubles (narrowed) and ints. The grab
    /// channel takes booleans, or an int where anything above zero is grabbed.
    /// Everything else, including an empty argument list, is a
    /// [`LeashError::MalformedUpdate`].
    pub fn from_osc(channel: Channel, args: &[OscType]) -> Result<Self, LeashError> {
        let expected = channel.value_kind();
        let malformed = |reason: String| LeashError::MalformedUpdate {
            channel,
            expected,
            reason,
        };

        let arg = args
            .first()
            .ok_or_else(|| malformed("message has no arguments".to_string()))?;

        match (expected, arg) {
            (ValueKind::Bool, OscType::Bool(value)) => Ok(LeashUpdate::Grabbed(*value)),
            (ValueKind::Bool, OscType::Int(value)) => Ok(LeashUpdate::Grabbed(*value > 0)),
            (ValueKind::Float, OscType::Float(value)) => Ok(Self::float(channel, *value)),
            (ValueKind::Float, OscType::Double(value)) => Ok(Self::float(channel, *value as f32)),
            (ValueKind::Float, OscType::Int(value)) => Ok(Self::float(channel, *value as f32)),
            (_, other) => Err(malformed(format!("got {other:?}"))),
        }
    }

    fn float(channel: Channel, value: f32) -> Self {
        match channel {
            Channel::ZPositive => LeashUpdate::ZPositive(value),
            Channel::ZNegative => LeashUpdate::ZNegative(value),
            Channel::XPositive => LeashUpdate::XPositive(value),
            Channel::XNegative => LeashUpdate::XNegative(value),
            Channel::Stretch => LeashUpdate::Stretch(value),
            // value_kind() routes Grab to the bool arm
            Channel::Grab => LeashUpdate::Grabbed(value != 0.0),
        }
    }
}

impl LeashState {
    pub fn apply(&mut self, update: LeashUpdate) {
        match update {
            LeashUpdate::ZPositive(v) => self.z_positive = v,
            LeashUpdate::ZNegative(v) => self.z_negative = v,
            LeashUpdate::XPositive(v) => self.x_positive = v,
            LeashUpdate::XNegative(v) => self.x_negative = v,
            LeashUpdate::Stretch(v) => self.stretch = v,
            LeashUpdate::Grabbed(v) => self.grabbed = v,
        }
    }

    pub fn vertical(&self) -> f32 {
        (self.z_positive - self.z_negative) * self.stretch
    }

    pub fn horizontal(&self) -> f32 {
        (self.x_positive - self.x_negative) * self.stretch
    }

    /// Reads the state for one tick and advances the grab/release memory.
    ///
    /// `released` compares `grabbed` against `was_grabbed` after it has been
    /// raised for a grabbed state, so it can only be true while not grabbed.
    pub fn observe(&mut self) -> TickSnapshot {
        let vertical = self.vertical();
        let horizontal = self.horizontal();
        let grabbed = self.grabbed;

        if grabbed {
            self.was_grabbed = true;
        }
        let released = grabbed != self.was_grabbed;
        if released {
            self.was_grabbed = false;
        }

        TickSnapshot {
            vertical,
            horizontal,
            stretch: self.stretch,
            grabbed,
            released,
        }
    }
}

impl fmt::Display for LeashState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Grabbed - {} was {} | Stretch - {} | ({}, {})",
            self.grabbed,
            self.was_grabbed,
            self.stretch,
            self.z_positive - self.z_negative,
            self.x_positive - self.x_negative
        )
    }
}

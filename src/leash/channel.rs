use std::collections::HashMap;
use std::fmt;

/// Logical input channel of the leash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    ZPositive,
    ZNegative,
    XPositive,
    XNegative,
    Grab,
    Stretch,
}

/// Expected payload type of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Bool,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::ZPositive,
        Channel::ZNegative,
        Channel::XPositive,
        Channel::XNegative,
        Channel::Grab,
        Channel::Stretch,
    ];

    pub fn value_kind(self) -> ValueKind {
        match self {
            Channel::Grab => ValueKind::Bool,
            _ => ValueKind::Float,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Channel::ZPositive => "Z+",
            Channel::ZNegative => "Z-",
            Channel::XPositive => "X+",
            Channel::XNegative => "X-",
            Channel::Grab => "Grab",
            Channel::Stretch => "Stretch",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueKind::Float => f.write_str("float"),
            ValueKind::Bool => f.write_str("bool"),
        }
    }
}

/// Static mapping from OSC address to channel, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    routes: HashMap<String, Channel>,
}

impl AddressTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Channel)>) -> Self {
        Self {
            routes: pairs.into_iter().collect(),
        }
    }

    pub fn route(&self, address: &str) -> Option<Channel> {
        self.routes.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

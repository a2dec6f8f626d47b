use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ItemStatus {
    /// No attempt outstanding, polling continues.
    Idle = 0,
    /// A purchase attempt is in flight; held by exactly one task.
    InQueue = 1,
    /// Terminal.
    Purchased = 2,
    /// Last attempt did not succeed; the item is still polled.
    Failed = 3,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Purchased)
    }

    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ItemStatus::Idle,
            1 => ItemStatus::InQueue,
            2 => ItemStatus::Purchased,
            _ => ItemStatus::Failed,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemStatus::Idle => "idle",
            ItemStatus::InQueue => "in_queue",
            ItemStatus::Purchased => "purchased",
            ItemStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{SimResult, SimulationError};
use serde::{Deserialize, Serialize};

pub const CHANNELS: usize = 4;

/// Which 16-bit half of a timer channel an access targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerHalf {
    /// Reload on write, counter on read.
    Low,
    Control,
}

impl TimerHalf {
    /// Bit 1 of the address picks the half.
    pub fn from_addr(addr: u32) -> Self {
        if addr & 0x2 == 0 {
            TimerHalf::Low
        } else {
            TimerHalf::Control
        }
    }
}

/// Register-level interface of the timer block.
///
/// The bus only forwards accesses; counting, overflow and cascade behaviour
/// belong to the implementation.
pub trait TimerBank: std::fmt::Debug + Send {
    fn read_half(&self, channel: usize, half: TimerHalf) -> u16;
    fn write_half(&mut self, channel: usize, half: TimerHalf, value: u16);
    fn reset(&mut self);

    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn restore(&mut self, _state: serde_json::Value) -> SimResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerChannel {
    pub reload: u16,
    pub control: u16,
}

/// Timer bank that does not count.
///
/// It latches the last reload and control values and reports the reload as
/// the current counter, which is what a stopped timer reads back.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatchedTimers {
    channels: [TimerChannel; CHANNELS],
}

impl LatchedTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, channel: usize) -> Option<&TimerChannel> {
        self.channels.get(channel)
    }
}

impl TimerBank for LatchedTimers {
    fn read_half(&self, channel: usize, half: TimerHalf) -> u16 {
        let Some(ch) = self.channels.get(channel) else {
            return 0;
        };
        match half {
            TimerHalf::Low => ch.reload,
            TimerHalf::Control => ch.control,
        }
    }

    fn write_half(&mut self, channel: usize, half: TimerHalf, value: u16) {
        let Some(ch) = self.channels.get_mut(channel) else {
            tracing::warn!("Timer write to nonexistent channel {}", channel);
            return;
        };
        match half {
            TimerHalf::Low => ch.reload = value,
            TimerHalf::Control => ch.control = value,
        }
        tracing::trace!("Timer {} {:?} <- {:#06x}", channel, half, value);
    }

    fn reset(&mut self) {
        self.channels = Default::default();
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        *self = serde_json::from_value(state)
            .map_err(|e| SimulationError::SnapshotMismatch(format!("timers: {}", e)))?;
        Ok(())
    }
}

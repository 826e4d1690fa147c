// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod interrupt;
pub mod timer;

pub use interrupt::InterruptRegisters;
pub use timer::{LatchedTimers, TimerBank, TimerHalf};

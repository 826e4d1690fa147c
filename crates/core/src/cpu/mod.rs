// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod arm7;
pub mod registers;

pub use arm7::Arm7;
pub use registers::{Flags, Psr, RegisterFile};

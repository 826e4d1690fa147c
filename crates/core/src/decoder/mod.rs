// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod arm;
pub mod thumb;

pub use arm::decode_arm;
pub use arm::Instruction as ArmInstruction;
pub use thumb::decode_thumb;
pub use thumb::Instruction as ThumbInstruction;

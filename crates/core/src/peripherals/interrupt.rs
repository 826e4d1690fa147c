// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// Offsets of the interrupt registers inside their 12-byte block.
pub const IE_OFFSET: u32 = 0x0;
pub const IF_OFFSET: u32 = 0x4;
pub const IME_OFFSET: u32 = 0x8;
pub const BLOCK_SIZE: u32 = 0xC;

/// Interrupt master enable, enable mask and flag registers.
///
/// IF is write-one-to-clear: every 1 bit written clears the matching flag,
/// 0 bits leave it alone. Sources set flags with [`raise`](Self::raise).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptRegisters {
    pub ime: u32,
    pub ie: u32,
    #[serde(rename = "if")]
    pub flags: u32,
}

impl InterruptRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&mut self, mask: u32) {
        self.flags |= mask;
    }

    /// Sources both enabled and flagged, or zero while IME bit 0 is clear.
    pub fn pending(&self) -> u32 {
        if self.ime & 1 == 0 {
            return 0;
        }
        self.ie & self.flags
    }

    fn read_reg(&self, offset: u32) -> u32 {
        match offset {
            IE_OFFSET => self.ie,
            IF_OFFSET => self.flags,
            IME_OFFSET => self.ime,
            _ => 0,
        }
    }

    pub fn read_u8(&self, offset: u32) -> u8 {
        let reg_val = self.read_reg(offset & !3);
        let byte_offset = offset % 4;
        ((reg_val >> (byte_offset * 8)) & 0xFF) as u8
    }

    pub fn write_u8(&mut self, offset: u32, value: u8) {
        let byte_offset = offset % 4;
        let lane = (value as u32) << (byte_offset * 8);
        let mask = 0xFF << (byte_offset * 8);

        match offset & !3 {
            IE_OFFSET => self.ie = (self.ie & !mask) | lane,
            IF_OFFSET => self.flags &= !lane,
            IME_OFFSET => self.ime = (self.ime & !mask) | lane,
            _ => {}
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

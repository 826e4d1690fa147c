// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub const SP: u8 = 13;
pub const LR: u8 = 14;
pub const PC: u8 = 15;

bitflags! {
    /// Bit layout of the packed status word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Psr: u32 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
        const T = 1 << 5;
    }
}

/// Condition flags and execution state.
///
/// The CPU works on this structure and only packs it into a status word at
/// the debug/snapshot boundary, so bits outside N/Z/C/V/T can never be set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
    pub thumb: bool,
}

impl Flags {
    pub fn from_word(word: u32) -> Self {
        let psr = Psr::from_bits_truncate(word);
        Self {
            n: psr.contains(Psr::N),
            z: psr.contains(Psr::Z),
            c: psr.contains(Psr::C),
            v: psr.contains(Psr::V),
            thumb: psr.contains(Psr::T),
        }
    }

    pub fn to_word(self) -> u32 {
        let mut psr = Psr::empty();
        psr.set(Psr::N, self.n);
        psr.set(Psr::Z, self.z);
        psr.set(Psr::C, self.c);
        psr.set(Psr::V, self.v);
        psr.set(Psr::T, self.thumb);
        psr.bits()
    }

    /// Update N and Z from `result`; C and V are left alone.
    pub fn set_nz(&mut self, result: u32) {
        self.n = (result >> 31) & 1 == 1;
        self.z = result == 0;
    }

    pub fn set_nzcv(&mut self, result: u32, carry: bool, overflow: bool) {
        self.set_nz(result);
        self.c = carry;
        self.v = overflow;
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u32; 16],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn read(&self, n: u8) -> u32 {
        self.regs[(n & 0xF) as usize]
    }

    #[inline]
    pub fn write(&mut self, n: u8, val: u32) {
        self.regs[(n & 0xF) as usize] = val;
    }

    #[inline]
    pub fn pc(&self) -> u32 {
        self.regs[PC as usize]
    }

    #[inline]
    pub fn set_pc(&mut self, val: u32) {
        self.regs[PC as usize] = val;
    }

    pub fn reset(&mut self) {
        self.regs = [0; 16];
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.regs
    }
}

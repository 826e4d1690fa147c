// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start_addr: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramImage {
    /// Initial PC. Bit 0 set means the program starts in Thumb state.
    pub entry_point: u32,
    pub segments: Vec<Segment>,
}

impl ProgramImage {
    pub fn new(entry_point: u32) -> Self {
        Self {
            entry_point,
            segments: Vec::new(),
        }
    }

    pub fn add_segment(&mut self, start_addr: u32, data: Vec<u8>) {
        self.segments.push(Segment { start_addr, data });
    }

    pub fn total_bytes(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }
}

/// Flat byte storage for one region.
///
/// Image regions are created sparse: storage only grows as far as the loaded
/// data reaches, and every byte beyond it reads as zero. This keeps a 64 MiB
/// cartridge window from allocating 64 MiB up front.
#[derive(Debug, Clone)]
pub struct LinearMemory {
    data: Vec<u8>,
    base_addr: u32,
    size: u32,
}

impl LinearMemory {
    pub fn new(size: u32, base_addr: u32) -> Self {
        Self {
            data: vec![0; size as usize],
            base_addr,
            size,
        }
    }

    pub fn sparse(size: u32, base_addr: u32) -> Self {
        Self {
            data: Vec::new(),
            base_addr,
            size,
        }
    }

    pub fn base_addr(&self) -> u32 {
        self.base_addr
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of bytes actually backed by storage.
    pub fn loaded_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn offset(&self, addr: u32) -> Option<usize> {
        let off = addr.checked_sub(self.base_addr)?;
        (off < self.size).then_some(off as usize)
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.offset(addr).is_some()
    }

    pub fn read_u8(&self, addr: u32) -> Option<u8> {
        let off = self.offset(addr)?;
        Some(self.data.get(off).copied().unwrap_or(0))
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) -> bool {
        match self.offset(addr) {
            Some(off) => {
                if off >= self.data.len() {
                    self.data.resize(off + 1, 0);
                }
                self.data[off] = value;
                true
            }
            None => false,
        }
    }

    /// Replace the contents with `bytes`, truncated to the region size.
    /// Returns the number of bytes kept.
    pub fn load(&mut self, bytes: &[u8]) -> usize {
        let kept = bytes.len().min(self.size as usize);
        let full = self.data.len() == self.size as usize;
        self.data.clear();
        self.data.extend_from_slice(&bytes[..kept]);
        if full {
            self.data.resize(self.size as usize, 0);
        }
        kept
    }

    /// Copy a segment in place. Fails without writing anything when the
    /// segment does not fit entirely inside the region.
    pub fn load_from_segment(&mut self, segment: &Segment) -> bool {
        let Some(start) = self.offset(segment.start_addr) else {
            return false;
        };
        let end = start + segment.data.len();
        if end > self.size as usize {
            return false;
        }
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(&segment.data);
        true
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

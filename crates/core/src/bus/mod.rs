// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::{LinearMemory, Segment};
use crate::peripherals::interrupt::{self, InterruptRegisters};
use crate::peripherals::timer::{self, LatchedTimers, TimerBank, TimerHalf};
use crate::{Access, Bus, Fault, SimResult, SimulationError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use synpad_config::{parse_size, ManifestError, MachineManifest, MemoryOverrides, MemoryRange};

/// Offset of the timer channels inside the I/O window.
pub const TIMER_BASE: u32 = 0x100;
pub const TIMER_END: u32 = TIMER_BASE + 4 * timer::CHANNELS as u32;
/// Offset of IE/IF/IME inside the I/O window.
pub const INTERRUPT_BASE: u32 = 0x200;
pub const INTERRUPT_END: u32 = INTERRUPT_BASE + interrupt::BLOCK_SIZE;

/// Faults held between drains. Further faults are counted, not stored.
pub const FAULT_QUEUE_LIMIT: usize = 1024;

/// Region kinds, declared in lookup precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    BootCode,
    Ram,
    ScratchRam,
    Cartridge,
    Io,
}

impl RegionKind {
    pub const ALL: [RegionKind; 5] = [
        RegionKind::BootCode,
        RegionKind::Ram,
        RegionKind::ScratchRam,
        RegionKind::Cartridge,
        RegionKind::Io,
    ];

    pub fn read_only(self) -> bool {
        matches!(self, RegionKind::BootCode | RegionKind::Cartridge)
    }

    /// Cleared by `reset()`.
    pub fn volatile(self) -> bool {
        matches!(self, RegionKind::Ram | RegionKind::ScratchRam)
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegionKind::BootCode => "boot code",
            RegionKind::Ram => "RAM",
            RegionKind::ScratchRam => "scratch RAM",
            RegionKind::Cartridge => "cartridge",
            RegionKind::Io => "I/O window",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub base: u32,
    pub size: u32,
}

impl RegionSpec {
    pub const fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    fn end(&self) -> u64 {
        self.base as u64 + self.size as u64
    }

    fn overlaps(&self, other: &RegionSpec) -> bool {
        (self.base as u64) < other.end() && (other.base as u64) < self.end()
    }
}

/// Base and size of every region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMap {
    pub boot: RegionSpec,
    pub ram: RegionSpec,
    pub scratch: RegionSpec,
    pub cartridge: RegionSpec,
    pub io: RegionSpec,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            boot: RegionSpec::new(0x0000_0000, 32 * 1024),
            ram: RegionSpec::new(0x0200_0000, 4 * 1024 * 1024),
            scratch: RegionSpec::new(0x0300_0000, 64 * 1024),
            cartridge: RegionSpec::new(0x0800_0000, 64 * 1024 * 1024),
            io: RegionSpec::new(0x0400_0000, 1024),
        }
    }
}

impl MemoryMap {
    pub fn from_overrides(overrides: &MemoryOverrides) -> anyhow::Result<Self> {
        fn apply(spec: &mut RegionSpec, range: Option<&MemoryRange>, name: &str) -> anyhow::Result<()> {
            let Some(range) = range else {
                return Ok(());
            };
            let size = parse_size(&range.size)
                .with_context(|| format!("Invalid size for region '{}'", name))?;
            spec.base = range.base;
            spec.size = u32::try_from(size)
                .with_context(|| format!("Region '{}' does not fit a 32-bit address space", name))?;
            Ok(())
        }

        let mut map = Self::default();
        apply(&mut map.boot, overrides.boot.as_ref(), "boot")?;
        apply(&mut map.ram, overrides.ram.as_ref(), "ram")?;
        apply(&mut map.scratch, overrides.scratch.as_ref(), "scratch")?;
        apply(&mut map.cartridge, overrides.cartridge.as_ref(), "cartridge")?;
        apply(&mut map.io, overrides.io.as_ref(), "io")?;
        if map.io.size < INTERRUPT_END {
            return Err(ManifestError::IoWindowTooSmall(u64::from(map.io.size)).into());
        }
        Ok(map)
    }

    pub fn spec(&self, kind: RegionKind) -> RegionSpec {
        match kind {
            RegionKind::BootCode => self.boot,
            RegionKind::Ram => self.ram,
            RegionKind::ScratchRam => self.scratch,
            RegionKind::Cartridge => self.cartridge,
            RegionKind::Io => self.io,
        }
    }
}

#[derive(Debug)]
enum Backing {
    Memory(LinearMemory),
    Io,
}

#[derive(Debug)]
pub struct Region {
    pub kind: RegionKind,
    pub base: u32,
    pub size: u32,
    backing: Backing,
}

impl Region {
    #[inline]
    fn offset(&self, addr: u32) -> Option<u32> {
        let off = addr.checked_sub(self.base)?;
        (off < self.size).then_some(off)
    }
}

/// The I/O register window: timer channels, interrupt registers and a flat
/// array behind everything else.
#[derive(Debug)]
pub struct IoWindow {
    fallback: Vec<u8>,
    interrupts: InterruptRegisters,
    timers: Box<dyn TimerBank>,
}

impl IoWindow {
    fn new(size: u32, timers: Box<dyn TimerBank>) -> Self {
        Self {
            fallback: vec![0; size as usize],
            interrupts: InterruptRegisters::new(),
            timers,
        }
    }

    fn read_u8(&self, off: u32) -> u8 {
        if (TIMER_BASE..TIMER_END).contains(&off) {
            let rel = off - TIMER_BASE;
            let value = self
                .timers
                .read_half((rel / 4) as usize, TimerHalf::from_addr(rel));
            return (value >> ((rel & 1) * 8)) as u8;
        }
        if (INTERRUPT_BASE..INTERRUPT_END).contains(&off) {
            return self.interrupts.read_u8(off - INTERRUPT_BASE);
        }
        self.fallback.get(off as usize).copied().unwrap_or(0)
    }

    /// Store one byte. Timer bytes are only latched in the shadow array;
    /// the caller forwards the touched half with [`flush_timer_half`].
    ///
    /// [`flush_timer_half`]: Self::flush_timer_half
    fn write_u8(&mut self, off: u32, value: u8) -> Option<(usize, TimerHalf)> {
        if (INTERRUPT_BASE..INTERRUPT_END).contains(&off) {
            self.interrupts.write_u8(off - INTERRUPT_BASE, value);
            return None;
        }
        if let Some(slot) = self.fallback.get_mut(off as usize) {
            *slot = value;
        }
        if (TIMER_BASE..TIMER_END).contains(&off) {
            let rel = off - TIMER_BASE;
            return Some(((rel / 4) as usize, TimerHalf::from_addr(rel)));
        }
        None
    }

    fn flush_timer_half(&mut self, channel: usize, half: TimerHalf) {
        let off = TIMER_BASE as usize
            + channel * 4
            + match half {
                TimerHalf::Low => 0,
                TimerHalf::Control => 2,
            };
        let lo = self.fallback.get(off).copied().unwrap_or(0) as u16;
        let hi = self.fallback.get(off + 1).copied().unwrap_or(0) as u16;
        self.timers.write_half(channel, half, lo | (hi << 8));
    }

    fn reset(&mut self) {
        self.fallback.fill(0);
        self.interrupts.reset();
        self.timers.reset();
    }
}

/// The segmented address space seen by the CPU.
///
/// Every access resolves to the first region (in [`RegionKind`] order) that
/// contains the address. Faulting accesses are queued and drained through
/// [`Bus::take_faults`]; at most [`FAULT_QUEUE_LIMIT`] are held between drains.
#[derive(Debug)]
pub struct AddressSpace {
    regions: Vec<Region>,
    io: IoWindow,
    map: MemoryMap,
    faults: RefCell<Vec<Fault>>,
    dropped_faults: Cell<u64>,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new(MemoryMap::default())
    }
}

impl AddressSpace {
    pub fn new(map: MemoryMap) -> Self {
        Self::with_timers(map, Box::new(LatchedTimers::new()))
    }

    pub fn with_timers(map: MemoryMap, timers: Box<dyn TimerBank>) -> Self {
        for (i, a) in RegionKind::ALL.iter().enumerate() {
            for b in &RegionKind::ALL[i + 1..] {
                if map.spec(*a).overlaps(&map.spec(*b)) {
                    tracing::warn!("Regions {} and {} overlap; {} takes precedence", a, b, a);
                }
            }
        }

        let regions = RegionKind::ALL
            .iter()
            .map(|&kind| {
                let spec = map.spec(kind);
                let backing = match kind {
                    RegionKind::Io => Backing::Io,
                    RegionKind::BootCode | RegionKind::Cartridge => {
                        Backing::Memory(LinearMemory::sparse(spec.size, spec.base))
                    }
                    RegionKind::Ram | RegionKind::ScratchRam => {
                        Backing::Memory(LinearMemory::new(spec.size, spec.base))
                    }
                };
                Region {
                    kind,
                    base: spec.base,
                    size: spec.size,
                    backing,
                }
            })
            .collect();

        Self {
            regions,
            io: IoWindow::new(map.io.size, timers),
            map,
            faults: RefCell::new(Vec::new()),
            dropped_faults: Cell::new(0),
        }
    }

    pub fn from_manifest(manifest: &MachineManifest) -> anyhow::Result<Self> {
        let map = MemoryMap::from_overrides(&manifest.memory)?;
        Ok(Self::new(map))
    }

    pub fn memory_map(&self) -> &MemoryMap {
        &self.map
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The region that owns `addr`, if any.
    pub fn region_at(&self, addr: u32) -> Option<RegionKind> {
        self.locate(addr).map(|idx| self.regions[idx].kind)
    }

    #[inline]
    fn locate(&self, addr: u32) -> Option<usize> {
        self.regions.iter().position(|r| r.offset(addr).is_some())
    }

    fn memory_mut(&mut self, kind: RegionKind) -> Option<&mut LinearMemory> {
        self.regions
            .iter_mut()
            .find(|r| r.kind == kind)
            .and_then(|r| match &mut r.backing {
                Backing::Memory(mem) => Some(mem),
                Backing::Io => None,
            })
    }

    fn load_region(&mut self, kind: RegionKind, bytes: &[u8]) -> usize {
        let Some(mem) = self.memory_mut(kind) else {
            return 0;
        };
        let kept = mem.load(bytes);
        if kept < bytes.len() {
            tracing::warn!(
                "{} image truncated from {} to {} bytes",
                kind,
                bytes.len(),
                kept
            );
        } else {
            tracing::info!("Loaded {} bytes into {}", kept, kind);
        }
        kept
    }

    /// Seed the cartridge region. Returns the number of bytes kept after
    /// truncation to the region maximum.
    pub fn load_image(&mut self, bytes: &[u8]) -> usize {
        self.load_region(RegionKind::Cartridge, bytes)
    }

    /// Seed the boot-code region, truncated like [`load_image`](Self::load_image).
    pub fn load_boot(&mut self, bytes: &[u8]) -> usize {
        self.load_region(RegionKind::BootCode, bytes)
    }

    /// Copy a program segment into the region that contains it. Read-only
    /// regions accept it too.
    pub fn load_segment(&mut self, segment: &Segment) -> SimResult<()> {
        if segment.data.is_empty() {
            return Ok(());
        }
        let out_of_range = SimulationError::SegmentOutOfRange {
            addr: segment.start_addr,
            len: segment.data.len(),
        };

        let Some(idx) = self.locate(segment.start_addr) else {
            return Err(out_of_range);
        };
        let loaded = match &mut self.regions[idx].backing {
            Backing::Memory(mem) => mem.load_from_segment(segment),
            _ => false,
        };
        if loaded {
            tracing::debug!(
                "Segment {:#010x} ({} bytes) -> {}",
                segment.start_addr,
                segment.data.len(),
                self.regions[idx].kind
            );
            Ok(())
        } else {
            Err(out_of_range)
        }
    }

    /// Clear RAM, scratch RAM and the I/O window. Boot and cartridge images
    /// are kept.
    pub fn reset(&mut self) {
        for region in &mut self.regions {
            if let (true, Backing::Memory(mem)) = (region.kind.volatile(), &mut region.backing) {
                mem.clear();
            }
        }
        self.io.reset();
        self.faults.get_mut().clear();
        self.dropped_faults.set(0);
    }

    /// Faults discarded because the queue was full since the last drain.
    pub fn dropped_faults(&self) -> u64 {
        self.dropped_faults.get()
    }

    fn queue_fault(&self, fault: Fault) {
        let mut faults = self.faults.borrow_mut();
        if faults.len() < FAULT_QUEUE_LIMIT {
            faults.push(fault);
            return;
        }
        let dropped = self.dropped_faults.get();
        if dropped == 0 {
            tracing::warn!(
                "Fault queue full ({} entries) and not drained; dropping further faults",
                FAULT_QUEUE_LIMIT
            );
        }
        self.dropped_faults.set(dropped + 1);
    }

    pub fn interrupts(&self) -> &InterruptRegisters {
        &self.io.interrupts
    }

    pub fn interrupts_mut(&mut self) -> &mut InterruptRegisters {
        &mut self.io.interrupts
    }

    pub fn timers(&self) -> &dyn TimerBank {
        self.io.timers.as_ref()
    }

    pub fn timers_mut(&mut self) -> &mut dyn TimerBank {
        self.io.timers.as_mut()
    }

    /// Store `bytes` little-endian from `addr`, then forward every timer
    /// half the store touched exactly once.
    fn write_bytes(&mut self, addr: u32, bytes: &[u8]) {
        let mut touched: [Option<(usize, TimerHalf)>; 4] = [None; 4];
        let mut n = 0;

        for (i, &value) in bytes.iter().enumerate() {
            let addr = addr.wrapping_add(i as u32);
            let Some(idx) = self.locate(addr) else {
                tracing::warn!("Write to unmapped address {:#010x} dropped", addr);
                self.queue_fault(Fault::InvalidAddress {
                    addr,
                    access: Access::Write,
                });
                continue;
            };

            let kind = self.regions[idx].kind;
            if kind.read_only() {
                tracing::debug!("Write to read-only {} at {:#010x} dropped", kind, addr);
                self.queue_fault(Fault::ReadOnlyViolation { addr, region: kind });
                continue;
            }

            let region = &mut self.regions[idx];

            let off = addr - region.base;
            match &mut region.backing {
                Backing::Memory(mem) => {
                    mem.write_u8(addr, value);
                }
                Backing::Io => {
                    if let Some(half) = self.io.write_u8(off, value) {
                        if !touched[..n].contains(&Some(half)) && n < touched.len() {
                            touched[n] = Some(half);
                            n += 1;
                        }
                    }
                }
            }
        }

        for (channel, half) in touched[..n].iter().flatten() {
            self.io.flush_timer_half(*channel, *half);
        }
    }
}

impl Bus for AddressSpace {
    fn read_u8(&self, addr: u32) -> u8 {
        let Some(idx) = self.locate(addr) else {
            tracing::warn!("Read from unmapped address {:#010x}", addr);
            self.queue_fault(Fault::InvalidAddress {
                addr,
                access: Access::Read,
            });
            return 0;
        };

        let region = &self.regions[idx];
        match &region.backing {
            Backing::Memory(mem) => mem.read_u8(addr).unwrap_or(0),
            Backing::Io => self.io.read_u8(addr - region.base),
        }
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        self.write_bytes(addr, &[value]);
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    fn take_faults(&mut self) -> Vec<Fault> {
        let dropped = self.dropped_faults.replace(0);
        if dropped > 0 {
            tracing::warn!("{} fault(s) were dropped before this drain", dropped);
        }
        std::mem::take(self.faults.get_mut())
    }
}

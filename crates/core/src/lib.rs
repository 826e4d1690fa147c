// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod config;
pub mod cpu;
pub mod decoder;
pub mod memory;
pub mod metrics;
pub mod peripherals;
pub mod snapshot;
pub mod system;
pub mod video;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub use bus::{AddressSpace, RegionKind};
pub use config::SimulationConfig;
pub use cpu::Arm7;


/// Instruction encoding the CPU was in when an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrSet {
    Arm,
    Thumb,
}

impl fmt::Display for InstrSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrSet::Arm => f.write_str("ARM"),
            InstrSet::Thumb => f.write_str("Thumb"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// Non-fatal conditions raised while executing guest code.
///
/// None of these stop the simulation. They are logged where they happen and
/// delivered to every [`SimulationObserver`] through `on_fault`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fault {
    #[error("unknown {set} instruction {opcode:#010x} at {pc:#010x}")]
    UnknownInstruction { pc: u32, opcode: u32, set: InstrSet },
    #[error("{access} of unmapped address {addr:#010x}")]
    InvalidAddress { addr: u32, access: Access },
    #[error("write to read-only {region} at {addr:#010x} dropped")]
    ReadOnlyViolation { addr: u32, region: RegionKind },
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Segment at {addr:#x} ({len} bytes) does not fit any loadable region")]
    SegmentOutOfRange { addr: u32, len: usize },
    #[error("Snapshot does not match this machine: {0}")]
    SnapshotMismatch(String),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// What a single `step()` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Executed,
    /// The ARM condition predicate was false; only the PC advanced.
    ConditionFailed,
    SoftwareInterrupt { comment: u32 },
    Faulted { fault: Fault },
}

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self) {}
    fn on_step_start(&self, _pc: u32, _opcode: u32) {}
    fn on_step_end(&self, _outcome: &StepOutcome) {}
    fn on_fault(&self, _fault: &Fault) {}
    fn on_software_interrupt(&self, _pc: u32, _comment: u32) {}
}

/// Trait representing a CPU architecture
pub trait Cpu: Send {
    fn reset(&mut self);
    fn step(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> StepOutcome;
    fn set_pc(&mut self, val: u32);
    fn get_pc(&self) -> u32;

    // Debug Access
    fn get_register(&self, id: u8) -> u32;
    fn set_register(&mut self, id: u8, val: u32);
    fn status_word(&self) -> u32;
    fn set_status_word(&mut self, word: u32);
    fn snapshot(&self) -> snapshot::CpuSnapshot;
    fn apply_snapshot(&mut self, snapshot: &snapshot::CpuSnapshot) -> SimResult<()>;
    fn get_register_names(&self) -> Vec<String>;
}

/// Trait representing the system bus.
///
/// Accesses never fail: unmapped reads return zero and unmapped or read-only
/// writes are dropped. Implementations queue a [`Fault`] for each such access,
/// which the driver collects with [`Bus::take_faults`].
pub trait Bus {
    fn read_u8(&self, addr: u32) -> u8;
    fn write_u8(&mut self, addr: u32, value: u8);

    /// Drain the faults queued since the last call.
    ///
    /// `Machine::step` drains after every instruction. Callers driving
    /// `Cpu::step` directly must drain themselves; implementations may bound
    /// the queue and discard faults past that bound.
    fn take_faults(&mut self) -> Vec<Fault> {
        Vec::new()
    }

    fn read_u16(&self, addr: u32) -> u16 {
        let b0 = self.read_u8(addr) as u16;
        let b1 = self.read_u8(addr.wrapping_add(1)) as u16;
        // Little Endian
        b0 | (b1 << 8)
    }

    fn read_u32(&self, addr: u32) -> u32 {
        let b0 = self.read_u8(addr) as u32;
        let b1 = self.read_u8(addr.wrapping_add(1)) as u32;
        let b2 = self.read_u8(addr.wrapping_add(2)) as u32;
        let b3 = self.read_u8(addr.wrapping_add(3)) as u32;
        b0 | (b1 << 8) | (b2 << 16) | (b3 << 24)
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        self.write_u8(addr, (value & 0xFF) as u8);
        self.write_u8(addr.wrapping_add(1), ((value >> 8) & 0xFF) as u8);
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        self.write_u8(addr, (value & 0xFF) as u8);
        self.write_u8(addr.wrapping_add(1), ((value >> 8) & 0xFF) as u8);
        self.write_u8(addr.wrapping_add(2), ((value >> 16) & 0xFF) as u8);
        self.write_u8(addr.wrapping_add(3), ((value >> 24) & 0xFF) as u8);
    }
}

/// Trait for controlling the machine in debug mode
pub trait DebugControl {
    fn add_breakpoint(&mut self, addr: u32);
    fn remove_breakpoint(&mut self, addr: u32);
    fn clear_breakpoints(&mut self);

    /// Run until breakpoint or steps limit
    fn run(&mut self, max_steps: Option<u64>) -> StopReason;

    /// Step a single instruction
    fn step_single(&mut self) -> StopReason;

    fn read_core_reg(&self, id: u8) -> u32;
    fn write_core_reg(&mut self, id: u8, val: u32);

    fn read_memory(&mut self, addr: u32, len: usize) -> Vec<u8>;
    fn write_memory(&mut self, addr: u32, data: &[u8]);

    fn get_pc(&self) -> u32;
    fn set_pc(&mut self, addr: u32);
    fn get_register_names(&self) -> Vec<String>;
    fn get_step_count(&self) -> u64;
    fn reset(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Breakpoint(u32),
    StepDone,
    MaxStepsReached,
    ManualStop,
}

pub struct Machine<C: Cpu> {
    pub cpu: C,
    pub bus: AddressSpace,
    pub observers: Vec<Arc<dyn SimulationObserver>>,

    // Debug state
    pub breakpoints: HashSet<u32>,
    pub total_steps: u64,
}

impl<C: Cpu> Machine<C> {
    pub fn new(cpu: C, bus: AddressSpace) -> Self {
        Self {
            cpu,
            bus,
            observers: Vec::new(),
            breakpoints: HashSet::new(),
            total_steps: 0,
        }
    }

    /// Place every segment of `image` into the region containing it and
    /// point the CPU at the entry. Bit 0 of the entry selects Thumb state.
    pub fn load_program(&mut self, image: &memory::ProgramImage) -> SimResult<()> {
        self.reset();

        for segment in &image.segments {
            self.bus.load_segment(segment)?;
        }

        self.cpu.set_status_word(if image.entry_point & 1 != 0 {
            cpu::registers::Psr::T.bits()
        } else {
            0
        });
        self.cpu.set_pc(image.entry_point & !1);

        for observer in &self.observers {
            observer.on_simulation_start();
        }

        tracing::info!(
            "Program loaded: {} segment(s), entry {:#010x}",
            image.segments.len(),
            image.entry_point
        );
        Ok(())
    }

    /// Reset the CPU and clear volatile memory. Loaded images survive.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset();
        self.total_steps = 0;
    }

    pub fn step(&mut self) -> StepOutcome {
        self.total_steps += 1;
        let outcome = self.cpu.step(&mut self.bus, &self.observers);

        for fault in self.bus.take_faults() {
            for observer in &self.observers {
                observer.on_fault(&fault);
            }
        }

        outcome
    }

    /// Any source enabled in IE and flagged in IF while IME is set.
    pub fn interrupt_pending(&self) -> bool {
        self.bus.interrupts().pending() != 0
    }

    pub fn stop(&self) {
        for observer in &self.observers {
            observer.on_simulation_stop();
        }
    }

    pub fn snapshot(&self) -> snapshot::MachineSnapshot {
        snapshot::MachineSnapshot {
            cpu: self.cpu.snapshot(),
            interrupts: *self.bus.interrupts(),
            timers: self.bus.timers().snapshot(),
            steps: self.total_steps,
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: snapshot::MachineSnapshot) -> SimResult<()> {
        self.cpu.apply_snapshot(&snapshot.cpu)?;
        *self.bus.interrupts_mut() = snapshot.interrupts;
        self.bus.timers_mut().restore(snapshot.timers)?;
        self.total_steps = snapshot.steps;
        Ok(())
    }
}

impl<C: Cpu> DebugControl for Machine<C> {
    fn add_breakpoint(&mut self, addr: u32) {
        self.breakpoints.insert(addr);
    }

    fn remove_breakpoint(&mut self, addr: u32) {
        self.breakpoints.remove(&addr);
    }

    fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    fn run(&mut self, max_steps: Option<u64>) -> StopReason {
        let mut steps = 0;
        loop {
            // Breakpoints match the fetch address with the Thumb bit masked off.
            let pc = self.cpu.get_pc();
            if self.breakpoints.contains(&(pc & !1)) {
                return StopReason::Breakpoint(pc);
            }

            if let Some(max) = max_steps {
                if steps >= max {
                    return StopReason::MaxStepsReached;
                }
            }

            self.step();
            steps += 1;
        }
    }

    fn step_single(&mut self) -> StopReason {
        self.step();
        StopReason::StepDone
    }

    fn read_core_reg(&self, id: u8) -> u32 {
        self.cpu.get_register(id)
    }

    fn write_core_reg(&mut self, id: u8, val: u32) {
        self.cpu.set_register(id, val);
    }

    fn read_memory(&mut self, addr: u32, len: usize) -> Vec<u8> {
        let data = (0..len)
            .map(|i| self.bus.read_u8(addr.wrapping_add(i as u32)))
            .collect();
        // Debugger accesses are already logged by the bus.
        self.bus.take_faults();
        data
    }

    fn write_memory(&mut self, addr: u32, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.bus.write_u8(addr.wrapping_add(i as u32), *byte);
        }
        self.bus.take_faults();
    }

    fn get_pc(&self) -> u32 {
        self.cpu.get_pc()
    }

    fn set_pc(&mut self, addr: u32) {
        self.cpu.set_pc(addr);
    }

    fn get_register_names(&self) -> Vec<String> {
        self.cpu.get_register_names()
    }

    fn get_step_count(&self) -> u64 {
        self.total_steps
    }

    fn reset(&mut self) {
        Machine::reset(self);
    }
}

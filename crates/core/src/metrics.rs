// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Fault, SimulationObserver, StepOutcome};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug)]
pub struct PerformanceMetrics {
    instruction_count: AtomicU64,
    skipped_count: AtomicU64,
    fault_count: AtomicU64,
    swi_count: AtomicU64,
    start_time: Mutex<Instant>,
}

/// Point-in-time copy of the counters, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsReport {
    pub instructions: u64,
    pub skipped: u64,
    pub faults: u64,
    pub software_interrupts: u64,
    pub ips: f64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            instruction_count: AtomicU64::new(0),
            skipped_count: AtomicU64::new(0),
            fault_count: AtomicU64::new(0),
            swi_count: AtomicU64::new(0),
            start_time: Mutex::new(Instant::now()),
        }
    }

    pub fn reset(&self) {
        self.instruction_count.store(0, Ordering::SeqCst);
        self.skipped_count.store(0, Ordering::SeqCst);
        self.fault_count.store(0, Ordering::SeqCst);
        self.swi_count.store(0, Ordering::SeqCst);
        if let Ok(mut start) = self.start_time.lock() {
            *start = Instant::now();
        }
    }

    pub fn get_instructions(&self) -> u64 {
        self.instruction_count.load(Ordering::SeqCst)
    }

    /// Instructions whose condition check failed.
    pub fn get_skipped(&self) -> u64 {
        self.skipped_count.load(Ordering::SeqCst)
    }

    pub fn get_faults(&self) -> u64 {
        self.fault_count.load(Ordering::SeqCst)
    }

    pub fn get_software_interrupts(&self) -> u64 {
        self.swi_count.load(Ordering::SeqCst)
    }

    pub fn get_ips(&self) -> f64 {
        let elapsed = self
            .start_time
            .lock()
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        if elapsed > 0.0 {
            self.get_instructions() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            instructions: self.get_instructions(),
            skipped: self.get_skipped(),
            faults: self.get_faults(),
            software_interrupts: self.get_software_interrupts(),
            ips: self.get_ips(),
        }
    }
}

impl SimulationObserver for PerformanceMetrics {
    fn on_simulation_start(&self) {
        self.reset();
    }

    fn on_step_start(&self, _pc: u32, _opcode: u32) {
        self.instruction_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_step_end(&self, outcome: &StepOutcome) {
        if *outcome == StepOutcome::ConditionFailed {
            self.skipped_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_fault(&self, _fault: &Fault) {
        self.fault_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_software_interrupt(&self, _pc: u32, _comment: u32) {
        self.swi_count.fetch_add(1, Ordering::SeqCst);
    }
}

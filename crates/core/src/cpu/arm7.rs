// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::config::{ConditionSet, SimulationConfig};
use crate::cpu::registers::{Flags, RegisterFile, LR, PC};
use crate::decoder::arm::{self, Condition, DpOpcode, Operand2, TransferOffset};
use crate::decoder::thumb;
use crate::snapshot::CpuSnapshot;
use crate::{Bus, Cpu, Fault, InstrSet, SimResult, SimulationError, SimulationObserver, StepOutcome};
use std::sync::Arc;

/// Register id used by the debug interface for the packed status word.
pub const STATUS_WORD_ID: u8 = 16;

/// ARM7-class core executing the ARM and Thumb subsets.
#[derive(Debug, Default, Clone)]
pub struct Arm7 {
    regs: RegisterFile,
    flags: Flags,
    conditions: ConditionSet,
}

impl Arm7 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &SimulationConfig) -> Self {
        let mut cpu = Self::new();
        cpu.set_condition_set(config.condition_codes);
        cpu
    }

    pub fn condition_set(&self) -> ConditionSet {
        self.conditions
    }

    pub fn set_condition_set(&mut self, conditions: ConditionSet) {
        if conditions != self.conditions {
            tracing::info!("ARM condition table switched to {:?}", conditions);
        }
        self.conditions = conditions;
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn in_thumb(&self) -> bool {
        self.flags.thumb
    }

    pub fn check_condition(&self, cond: Condition) -> bool {
        let Flags { n, z, c, v, .. } = self.flags;

        match cond {
            Condition::Eq => z,
            Condition::Ne => !z,
            Condition::Mi => n,
            Condition::Pl => !n,
            Condition::Vs => v,
            Condition::Vc => !v,
            Condition::Al => true,
            _ if self.conditions == ConditionSet::Simplified => true,
            Condition::Cs => c,
            Condition::Cc => !c,
            Condition::Hi => c && !z,
            Condition::Ls => !c || z,
            Condition::Ge => n == v,
            Condition::Lt => n != v,
            Condition::Gt => !z && (n == v),
            Condition::Le => z || (n != v),
            Condition::Nv => false,
        }
    }

    /// Shared by ARM and Thumb BX: bit 0 of the target selects the state.
    fn branch_exchange(&mut self, target: u32) {
        self.flags.thumb = target & 1 != 0;
        self.regs.set_pc(target & !1);
    }

    fn report_unknown(
        &self,
        pc: u32,
        opcode: u32,
        set: InstrSet,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> StepOutcome {
        tracing::warn!("Unknown {} instruction {:#010x} at {:#010x}", set, opcode, pc);
        let fault = Fault::UnknownInstruction { pc, opcode, set };
        for observer in observers {
            observer.on_fault(&fault);
        }
        StepOutcome::Faulted { fault }
    }

    fn step_arm(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> StepOutcome {
        let pc = self.regs.pc();
        let opcode = bus.read_u32(pc);
        for observer in observers {
            observer.on_step_start(pc, opcode);
        }

        self.regs.set_pc(pc.wrapping_add(4));

        if !self.check_condition(Condition::from_opcode(opcode)) {
            tracing::trace!("{:#010x}: {:08x} condition failed", pc, opcode);
            return StepOutcome::ConditionFailed;
        }

        let instruction = arm::decode_arm(opcode);
        tracing::trace!("{:#010x}: {:08x} {:?}", pc, opcode, instruction);

        match instruction {
            arm::Instruction::SoftwareInterrupt { comment } => {
                tracing::debug!("SWI {:#08x} at {:#010x}", comment, pc);
                for observer in observers {
                    observer.on_software_interrupt(pc, comment);
                }
                return StepOutcome::SoftwareInterrupt { comment };
            }
            arm::Instruction::BranchExchange { rm } => {
                let target = self.regs.read(rm);
                self.branch_exchange(target);
            }
            arm::Instruction::BlockTransfer {
                load,
                pre,
                up,
                write_back,
                rn,
                registers,
            } => self.block_transfer(bus, load, pre, up, write_back, rn, registers),
            arm::Instruction::Branch { link, offset } => {
                let next = self.regs.pc();
                if link {
                    self.regs.write(LR, next);
                }
                self.regs.set_pc(next.wrapping_add(offset as u32));
            }
            arm::Instruction::DataProcessing {
                op,
                set_flags,
                rn,
                rd,
                operand2,
            } => {
                let op2 = match operand2 {
                    Operand2::Imm(value) => value,
                    Operand2::Reg(rm) => self.regs.read(rm),
                };
                self.data_processing(op, set_flags, rn, rd, op2);
            }
            arm::Instruction::SingleTransfer {
                load,
                byte,
                pre,
                up,
                write_back,
                rn,
                rd,
                offset,
            } => {
                let offset = match offset {
                    TransferOffset::Imm(value) => value as u32,
                    TransferOffset::Reg(rm) => self.regs.read(rm),
                };
                self.single_transfer(bus, load, byte, pre, up, write_back, rn, rd, offset);
            }
            arm::Instruction::Unknown(opcode) => {
                return self.report_unknown(pc, opcode, InstrSet::Arm, observers);
            }
        }

        StepOutcome::Executed
    }

    fn data_processing(&mut self, op: DpOpcode, set_flags: bool, rn: u8, rd: u8, op2: u32) {
        let rn_val = self.regs.read(rn);

        let (result, arith) = match op {
            DpOpcode::And => (rn_val & op2, None),
            DpOpcode::Eor => (rn_val ^ op2, None),
            DpOpcode::Orr => (rn_val | op2, None),
            DpOpcode::Mov => (op2, None),
            DpOpcode::Add => {
                let (res, c, v) = add_with_flags(rn_val, op2);
                (res, Some((c, v)))
            }
            DpOpcode::Sub | DpOpcode::Cmp => {
                let (res, c, v) = sub_with_flags(rn_val, op2);
                (res, Some((c, v)))
            }
            DpOpcode::Rsb => {
                let (res, c, v) = sub_with_flags(op2, rn_val);
                (res, Some((c, v)))
            }
        };

        if op != DpOpcode::Cmp {
            self.regs.write(rd, result);
        }

        if set_flags || op == DpOpcode::Cmp {
            match arith {
                Some((c, v)) => self.flags.set_nzcv(result, c, v),
                None => self.flags.set_nz(result),
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn block_transfer(
        &mut self,
        bus: &mut dyn Bus,
        load: bool,
        pre: bool,
        up: bool,
        write_back: bool,
        rn: u8,
        registers: u16,
    ) {
        let base = self.regs.read(rn);
        let span = 4 * registers.count_ones();

        // Registers always move in ascending order from the lowest address.
        let start = match (up, pre) {
            (true, false) => base,                                    // IA
            (true, true) => base.wrapping_add(4),                     // IB
            (false, false) => base.wrapping_sub(span).wrapping_add(4), // DA
            (false, true) => base.wrapping_sub(span),                 // DB
        };
        let new_base = if up {
            base.wrapping_add(span)
        } else {
            base.wrapping_sub(span)
        };

        let list = (0..16u8).filter(|r| registers & (1 << r) != 0);

        if load {
            let loaded: Vec<(u8, u32)> = list
                .zip((0u32..).map(|i| start.wrapping_add(4 * i)))
                .map(|(r, addr)| (r, bus.read_u32(addr)))
                .collect();
            if write_back {
                self.regs.write(rn, new_base);
            }
            for (r, value) in loaded {
                self.regs.write(r, value);
            }
        } else {
            let mut addr = start;
            for r in list {
                bus.write_u32(addr, self.regs.read(r));
                addr = addr.wrapping_add(4);
            }
            if write_back {
                self.regs.write(rn, new_base);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn single_transfer(
        &mut self,
        bus: &mut dyn Bus,
        load: bool,
        byte: bool,
        pre: bool,
        up: bool,
        write_back: bool,
        rn: u8,
        rd: u8,
        offset: u32,
    ) {
        let base = self.regs.read(rn);
        let adjusted = if up {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        let addr = if pre { adjusted } else { base };

        if load {
            let value = if byte {
                bus.read_u8(addr) as u32
            } else {
                bus.read_u32(addr)
            };
            if write_back {
                self.regs.write(rn, adjusted);
            }
            self.regs.write(rd, value);
        } else {
            let value = self.regs.read(rd);
            if byte {
                bus.write_u8(addr, value as u8);
            } else {
                bus.write_u32(addr, value);
            }
            if write_back {
                self.regs.write(rn, adjusted);
            }
        }
    }

    fn step_thumb(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> StepOutcome {
        let pc = self.regs.pc() & !1;
        let opcode = bus.read_u16(pc);
        for observer in observers {
            observer.on_step_start(pc, opcode as u32);
        }

        self.regs.set_pc(pc.wrapping_add(2));

        let instruction = thumb::decode_thumb(opcode);
        tracing::trace!("{:#010x}: {:04x} {:?}", pc, opcode, instruction);

        match instruction {
            thumb::Instruction::Lsl { rd, rm, imm } => {
                let value = self.regs.read(rm);
                let result = if imm == 0 {
                    value
                } else {
                    self.flags.c = (value >> (32 - imm as u32)) & 1 == 1;
                    value << imm
                };
                self.regs.write(rd, result);
                self.flags.set_nz(result);
            }
            thumb::Instruction::Lsr { rd, rm, imm } => {
                let value = self.regs.read(rm);
                // Amount 0 moves the value through and keeps C.
                let result = if imm == 0 {
                    value
                } else {
                    self.flags.c = (value >> (imm - 1)) & 1 == 1;
                    value >> imm
                };
                self.regs.write(rd, result);
                self.flags.set_nz(result);
            }
            thumb::Instruction::Asr { rd, rm, imm } => {
                let value = self.regs.read(rm);
                let result = if imm == 0 {
                    value
                } else {
                    self.flags.c = (value >> (imm - 1)) & 1 == 1;
                    ((value as i32) >> imm) as u32
                };
                self.regs.write(rd, result);
                self.flags.set_nz(result);
            }
            thumb::Instruction::MovImm { rd, imm } => {
                self.regs.write(rd, imm as u32);
                self.flags.set_nz(imm as u32);
            }
            thumb::Instruction::CmpImm { rn, imm } => {
                let (res, c, v) = sub_with_flags(self.regs.read(rn), imm as u32);
                self.flags.set_nzcv(res, c, v);
            }
            thumb::Instruction::AddImm8 { rd, imm } => {
                let (res, c, v) = add_with_flags(self.regs.read(rd), imm as u32);
                self.regs.write(rd, res);
                self.flags.set_nzcv(res, c, v);
            }
            thumb::Instruction::SubImm8 { rd, imm } => {
                let (res, c, v) = sub_with_flags(self.regs.read(rd), imm as u32);
                self.regs.write(rd, res);
                self.flags.set_nzcv(res, c, v);
            }
            thumb::Instruction::And { rd, rm } => {
                let res = self.regs.read(rd) & self.regs.read(rm);
                self.regs.write(rd, res);
                self.flags.set_nz(res);
            }
            thumb::Instruction::Eor { rd, rm } => {
                let res = self.regs.read(rd) ^ self.regs.read(rm);
                self.regs.write(rd, res);
                self.flags.set_nz(res);
            }
            thumb::Instruction::Orr { rd, rm } => {
                let res = self.regs.read(rd) | self.regs.read(rm);
                self.regs.write(rd, res);
                self.flags.set_nz(res);
            }
            thumb::Instruction::MovReg { rd, rm } => {
                let value = self.regs.read(rm);
                if rd == PC {
                    self.regs.set_pc(value & !1);
                } else {
                    self.regs.write(rd, value);
                }
            }
            thumb::Instruction::Bx { rm } => {
                let target = self.regs.read(rm);
                self.branch_exchange(target);
            }
            thumb::Instruction::Branch { offset } => {
                let next = self.regs.pc();
                self.regs.set_pc(next.wrapping_add(offset as u32));
            }
            thumb::Instruction::Unknown(opcode) => {
                return self.report_unknown(pc, opcode as u32, InstrSet::Thumb, observers);
            }
        }

        StepOutcome::Executed
    }
}

impl Cpu for Arm7 {
    fn reset(&mut self) {
        self.regs.reset();
        self.flags = Flags::default();
    }

    fn step(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> StepOutcome {
        let outcome = if self.flags.thumb {
            self.step_thumb(bus, observers)
        } else {
            self.step_arm(bus, observers)
        };

        for observer in observers {
            observer.on_step_end(&outcome);
        }
        outcome
    }

    fn set_pc(&mut self, val: u32) {
        self.regs.set_pc(val);
    }

    fn get_pc(&self) -> u32 {
        self.regs.pc()
    }

    fn get_register(&self, id: u8) -> u32 {
        match id {
            0..=15 => self.regs.read(id),
            STATUS_WORD_ID => self.flags.to_word(),
            _ => 0,
        }
    }

    fn set_register(&mut self, id: u8, val: u32) {
        match id {
            0..=15 => self.regs.write(id, val),
            STATUS_WORD_ID => self.flags = Flags::from_word(val),
            _ => {}
        }
    }

    fn status_word(&self) -> u32 {
        self.flags.to_word()
    }

    fn set_status_word(&mut self, word: u32) {
        self.flags = Flags::from_word(word);
    }

    fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            registers: self.regs.as_slice().to_vec(),
            status_word: self.flags.to_word(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: &CpuSnapshot) -> SimResult<()> {
        if snapshot.registers.len() != 16 {
            return Err(SimulationError::SnapshotMismatch(format!(
                "expected 16 registers, found {}",
                snapshot.registers.len()
            )));
        }
        for (i, value) in snapshot.registers.iter().enumerate() {
            self.regs.write(i as u8, *value);
        }
        self.flags = Flags::from_word(snapshot.status_word);
        Ok(())
    }

    fn get_register_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (0..13).map(|i| format!("R{}", i)).collect();
        names.push("SP".to_string());
        names.push("LR".to_string());
        names.push("PC".to_string());
        names.push("CPSR".to_string());
        names
    }
}

fn add_with_flags(op1: u32, op2: u32) -> (u32, bool, bool) {
    let (res, carry) = op1.overflowing_add(op2);
    let neg_op1 = (op1 as i32) < 0;
    let neg_op2 = (op2 as i32) < 0;
    let neg_res = (res as i32) < 0;
    let overflow = (neg_op1 == neg_op2) && (neg_res != neg_op1);
    (res, carry, overflow)
}

/// C is the inverted borrow, i.e. `op1 >= op2` unsigned.
fn sub_with_flags(op1: u32, op2: u32) -> (u32, bool, bool) {
    let (res, borrow) = op1.overflowing_sub(op2);
    let carry = !borrow;
    let neg_op1 = (op1 as i32) < 0;
    let neg_op2 = (op2 as i32) < 0;
    let neg_res = (res as i32) < 0;
    let overflow = (neg_op1 != neg_op2) && (neg_res != neg_op1);
    (res, carry, overflow)
}

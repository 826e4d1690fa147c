// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use proptest::prelude::*;
use synpad_core::cpu::registers::{Flags, SP};
use synpad_core::cpu::Arm7;
use synpad_core::decoder::arm::{decode_arm, expand_imm, Instruction, Operand2};
use synpad_core::memory::ProgramImage;
use synpad_core::{AddressSpace, Bus, Cpu, Machine};

const RAM: u32 = 0x0200_0000;

fn machine_with(program: &[u8], entry: u32) -> Machine<Arm7> {
    let mut machine = Machine::new(Arm7::new(), AddressSpace::default());
    let mut image = ProgramImage::new(entry);
    image.add_segment(RAM, program.to_vec());
    machine.load_program(&image).unwrap();
    machine
}

proptest! {
    #[test]
    fn flag_update_sets_only_n_and_z(v in any::<u32>(), c in any::<bool>(), overflow in any::<bool>()) {
        let mut flags = Flags { c, v: overflow, ..Default::default() };
        flags.set_nz(v);
        prop_assert_eq!(flags.z, v == 0);
        prop_assert_eq!(flags.n, v >> 31 == 1);
        prop_assert_eq!(flags.c, c);
        prop_assert_eq!(flags.v, overflow);
    }

    #[test]
    fn operand2_rotation_round_trips(imm in any::<u8>(), rot in 0u32..16) {
        let opcode = 0xE3A0_0000 | (rot << 8) | imm as u32; // MOV R0, #imm ROR 2*rot
        let expanded = expand_imm(imm as u32, rot);
        prop_assert_eq!(expanded, (imm as u32).rotate_right(rot * 2));
        prop_assert_eq!(expanded.rotate_left(rot * 2) & 0xFF, imm as u32);

        match decode_arm(opcode) {
            Instruction::DataProcessing { operand2: Operand2::Imm(value), .. } => {
                prop_assert_eq!(value, expanded)
            }
            other => prop_assert!(false, "unexpected decode {:?}", other),
        }
    }

    #[test]
    fn arm_branch_target(field in 0u32..0x0100_0000, slot in 0u32..0x100) {
        let p = RAM + slot * 4;
        let opcode = 0xEA00_0000 | field;
        let mut program = vec![0u8; (slot * 4) as usize];
        program.extend_from_slice(&opcode.to_le_bytes());

        let mut machine = machine_with(&program, p);
        machine.step();

        let sext = ((field << 8) as i32) >> 8;
        let expected = p.wrapping_add(4).wrapping_add((sext << 2) as u32);
        prop_assert_eq!(machine.cpu.get_pc(), expected);
    }

    #[test]
    fn thumb_branch_target(field in 0u16..0x0800, slot in 0u32..0x100) {
        let p = RAM + slot * 2;
        let opcode = 0xE000 | field;
        let mut program = vec![0u8; (slot * 2) as usize];
        program.extend_from_slice(&opcode.to_le_bytes());

        let mut machine = machine_with(&program, p | 1);
        machine.step();

        let sext = (((field as u32) << 21) as i32) >> 21;
        let expected = p.wrapping_add(2).wrapping_add((sext << 1) as u32);
        prop_assert_eq!(machine.cpu.get_pc(), expected);
        prop_assert!(machine.cpu.in_thumb());
    }

    #[test]
    fn branch_exchange_sets_mode_from_bit_zero(target in any::<u32>()) {
        let mut machine = machine_with(&0xE12F_FF14u32.to_le_bytes(), RAM); // BX R4
        machine.cpu.set_register(4, target);
        machine.step();
        prop_assert_eq!(machine.cpu.in_thumb(), target & 1 == 1);
        prop_assert_eq!(machine.cpu.get_pc(), target & !1);
    }

    #[test]
    fn block_store_moves_popcount_registers_in_ascending_order(
        list in 1u16..0x2000, // R0-R12, never the base or PC
        up in any::<bool>(),
        pre in any::<bool>(),
    ) {
        let base = RAM + 0x8000;
        // STM SP!, {list} with the chosen direction and indexing
        let opcode = 0xE82D_0000
            | ((pre as u32) << 24)
            | ((up as u32) << 23)
            | list as u32;
        let mut machine = machine_with(&opcode.to_le_bytes(), RAM);
        machine.cpu.set_register(SP, base);
        for r in 0..13u8 {
            machine.cpu.set_register(r, 0x100 + r as u32);
        }
        machine.step();

        let count = list.count_ones();
        let expected_base = if up { base + 4 * count } else { base - 4 * count };
        prop_assert_eq!(machine.cpu.get_register(SP), expected_base);

        let lowest = if up { base } else { base - 4 * count };
        let start = if pre == up { lowest + 4 } else { lowest };
        let stored: Vec<u32> = (0..count).map(|i| machine.bus.read_u32(start + 4 * i)).collect();
        let expected: Vec<u32> = (0..13u32).filter(|r| list & (1 << r) != 0).map(|r| 0x100 + r).collect();
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn if_register_write_one_to_clear(initial in any::<u32>(), m in any::<u32>()) {
        let mut bus = AddressSpace::default();
        bus.interrupts_mut().raise(initial);
        bus.write_u32(0x0400_0204, m);
        prop_assert_eq!(bus.read_u32(0x0400_0204), initial & !m);
    }

    #[test]
    fn read_only_regions_keep_loaded_content(
        image in prop::collection::vec(any::<u8>(), 4..64),
        offset in 0u32..60,
        value in any::<u32>(),
    ) {
        let mut bus = AddressSpace::default();
        bus.load_boot(&image);
        bus.load_image(&image);
        for base in [0x0000_0000u32, 0x0800_0000] {
            let before = bus.read_u32(base + offset);
            bus.write_u32(base + offset, value);
            prop_assert_eq!(bus.read_u32(base + offset), before);
        }
    }

    #[test]
    fn read32_after_write32(offset in 0u32..(4 * 1024 * 1024 - 3), value in any::<u32>()) {
        let mut bus = AddressSpace::default();
        let addr = RAM + offset;
        bus.write_u32(addr, value);
        prop_assert_eq!(bus.read_u32(addr), value);
        prop_assert_eq!(bus.read_u8(addr), value as u8);
        prop_assert_eq!(bus.read_u8(addr + 3), (value >> 24) as u8);
        prop_assert!(bus.take_faults().is_empty());
    }
}

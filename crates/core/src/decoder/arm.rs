// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Condition field (bits 31..28) of an ARM instruction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Condition {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
    Nv,
}

impl Condition {
    pub fn from_opcode(opcode: u32) -> Self {
        match opcode >> 28 {
            0x0 => Condition::Eq,
            0x1 => Condition::Ne,
            0x2 => Condition::Cs,
            0x3 => Condition::Cc,
            0x4 => Condition::Mi,
            0x5 => Condition::Pl,
            0x6 => Condition::Vs,
            0x7 => Condition::Vc,
            0x8 => Condition::Hi,
            0x9 => Condition::Ls,
            0xA => Condition::Ge,
            0xB => Condition::Lt,
            0xC => Condition::Gt,
            0xD => Condition::Le,
            0xE => Condition::Al,
            _ => Condition::Nv,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DpOpcode {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Cmp,
    Orr,
    Mov,
}

impl DpOpcode {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0x0 => Some(DpOpcode::And),
            0x1 => Some(DpOpcode::Eor),
            0x2 => Some(DpOpcode::Sub),
            0x3 => Some(DpOpcode::Rsb),
            0x4 => Some(DpOpcode::Add),
            0xA => Some(DpOpcode::Cmp),
            0xC => Some(DpOpcode::Orr),
            0xD => Some(DpOpcode::Mov),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operand2 {
    /// Already rotated immediate.
    Imm(u32),
    Reg(u8),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TransferOffset {
    Imm(u16),
    Reg(u8),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    SoftwareInterrupt {
        comment: u32,
    }, // SWI #imm24
    BranchExchange {
        rm: u8,
    }, // BX Rm
    BlockTransfer {
        load: bool,
        pre: bool,
        up: bool,
        write_back: bool,
        rn: u8,
        registers: u16,
    }, // LDM/STM Rn{!}, {list}
    Branch {
        link: bool,
        offset: i32,
    }, // B/BL <label>
    DataProcessing {
        op: DpOpcode,
        set_flags: bool,
        rn: u8,
        rd: u8,
        operand2: Operand2,
    },
    SingleTransfer {
        load: bool,
        byte: bool,
        pre: bool,
        up: bool,
        write_back: bool,
        rn: u8,
        rd: u8,
        offset: TransferOffset,
    }, // LDR/STR{B} Rd, [Rn, #+/-imm12]
    Unknown(u32),
}

/// Rotate an 8-bit immediate right by twice the 4-bit rotate field.
#[inline]
pub fn expand_imm(imm8: u32, rotate: u32) -> u32 {
    (imm8 & 0xFF).rotate_right((rotate & 0xF) * 2)
}

#[inline]
fn reg(opcode: u32, shift: u32) -> u8 {
    ((opcode >> shift) & 0xF) as u8
}

#[inline]
fn bit(opcode: u32, n: u32) -> bool {
    (opcode >> n) & 1 == 1
}

/// Decode a 32-bit ARM instruction, ignoring its condition field.
///
/// Classes are tested in a fixed order because BX and SWI are
/// specialisations of masks the broader classes would also accept.
pub fn decode_arm(opcode: u32) -> Instruction {
    // 1. Software interrupt: cccc 1111 iiii...
    if (opcode & 0x0F00_0000) == 0x0F00_0000 {
        return Instruction::SoftwareInterrupt {
            comment: opcode & 0x00FF_FFFF,
        };
    }

    // 2. Branch and exchange: cccc 0001 0010 1111 1111 1111 0001 mmmm
    if (opcode & 0x0FFF_FFF0) == 0x012F_FF10 {
        return Instruction::BranchExchange { rm: reg(opcode, 0) };
    }

    // 3. Block data transfer: cccc 100P USWL nnnn llll...
    if (opcode & 0x0E00_0000) == 0x0800_0000 {
        return Instruction::BlockTransfer {
            load: bit(opcode, 20),
            pre: bit(opcode, 24),
            up: bit(opcode, 23),
            write_back: bit(opcode, 21),
            rn: reg(opcode, 16),
            registers: (opcode & 0xFFFF) as u16,
        };
    }

    // 4. Branch: cccc 101L oooo...
    if (opcode & 0x0E00_0000) == 0x0A00_0000 {
        // Sign-extend the 24-bit field, then scale to bytes.
        let offset = (((opcode & 0x00FF_FFFF) << 8) as i32 >> 8) << 2;
        return Instruction::Branch {
            link: bit(opcode, 24),
            offset,
        };
    }

    // Multiply, long multiply, swap and halfword transfers share the
    // data-processing space with bits 7 and 4 set and I clear.
    if (opcode & 0x0E00_0090) == 0x0000_0090 {
        return Instruction::Unknown(opcode);
    }

    // 5. Data processing: cccc 00Io oooS nnnn dddd ...
    if (opcode & 0x0C00_0000) == 0x0000_0000 {
        let Some(op) = DpOpcode::from_bits((opcode >> 21) & 0xF) else {
            return Instruction::Unknown(opcode);
        };
        let operand2 = if bit(opcode, 25) {
            Operand2::Imm(expand_imm(opcode & 0xFF, (opcode >> 8) & 0xF))
        } else {
            // Shift field (bits 11..4) is not modelled.
            Operand2::Reg(reg(opcode, 0))
        };
        return Instruction::DataProcessing {
            op,
            set_flags: bit(opcode, 20),
            rn: reg(opcode, 16),
            rd: reg(opcode, 12),
            operand2,
        };
    }

    // 6. Single data transfer: cccc 01IP UBWL nnnn dddd oooo oooo oooo
    if (opcode & 0x0C00_0000) == 0x0400_0000 {
        let offset = if bit(opcode, 25) {
            TransferOffset::Reg(reg(opcode, 0))
        } else {
            TransferOffset::Imm((opcode & 0xFFF) as u16)
        };
        return Instruction::SingleTransfer {
            load: bit(opcode, 20),
            byte: bit(opcode, 22),
            pre: bit(opcode, 24),
            up: bit(opcode, 23),
            write_back: bit(opcode, 21),
            rn: reg(opcode, 16),
            rd: reg(opcode, 12),
            offset,
        };
    }

    Instruction::Unknown(opcode)
}

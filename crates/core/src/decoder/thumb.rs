// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    // Shifts
    Lsl {
        rd: u8,
        rm: u8,
        imm: u8,
    }, // LSL Rd, Rm, #imm5
    Lsr {
        rd: u8,
        rm: u8,
        imm: u8,
    }, // LSR Rd, Rm, #imm5
    Asr {
        rd: u8,
        rm: u8,
        imm: u8,
    }, // ASR Rd, Rm, #imm5

    // 8-bit immediate group
    MovImm {
        rd: u8,
        imm: u8,
    }, // MOV Rd, #imm8
    CmpImm {
        rn: u8,
        imm: u8,
    }, // CMP Rn, #imm8
    AddImm8 {
        rd: u8,
        imm: u8,
    }, // ADD Rd, #imm8
    SubImm8 {
        rd: u8,
        imm: u8,
    }, // SUB Rd, #imm8

    // ALU group
    And {
        rd: u8,
        rm: u8,
    }, // AND Rd, Rm
    Eor {
        rd: u8,
        rm: u8,
    }, // EOR Rd, Rm
    Orr {
        rd: u8,
        rm: u8,
    }, // ORR Rd, Rm
    MovReg {
        rd: u8,
        rm: u8,
    }, // MOV Rd, Rm (any register)
    Bx {
        rm: u8,
    }, // BX Rm

    Branch {
        offset: i32,
    }, // B <label>

    Unknown(u16),
}

/// Decode a 16-bit Thumb instruction by its top three bits.
pub fn decode_thumb(opcode: u16) -> Instruction {
    match opcode >> 13 {
        // 000: shift by immediate (op 11 is add/subtract, not modelled)
        0b000 => {
            let op = (opcode >> 11) & 0x3;
            let imm = ((opcode >> 6) & 0x1F) as u8;
            let rm = ((opcode >> 3) & 0x7) as u8;
            let rd = (opcode & 0x7) as u8;

            match op {
                0 => Instruction::Lsl { rd, rm, imm },
                1 => Instruction::Lsr { rd, rm, imm },
                2 => Instruction::Asr { rd, rm, imm },
                _ => Instruction::Unknown(opcode),
            }
        }
        // 001: move/compare/add/subtract immediate
        0b001 => {
            let op = (opcode >> 11) & 0x3;
            let rd = ((opcode >> 8) & 0x7) as u8;
            let imm = (opcode & 0xFF) as u8;

            match op {
                0 => Instruction::MovImm { rd, imm },
                1 => Instruction::CmpImm { rn: rd, imm },
                2 => Instruction::AddImm8 { rd, imm },
                _ => Instruction::SubImm8 { rd, imm },
            }
        }
        // 010: ALU operations and high-register operations
        0b010 => decode_alu_group(opcode),
        // 111: unconditional branch (11100 only; 11101-11111 are the long forms)
        0b111 if (opcode & 0xF800) == 0xE000 => {
            // Sign-extend the 11-bit field, then scale to bytes.
            let offset = (((opcode & 0x07FF) << 5) as i16 >> 5) as i32;
            Instruction::Branch { offset: offset << 1 }
        }
        _ => Instruction::Unknown(opcode),
    }
}

fn decode_alu_group(opcode: u16) -> Instruction {
    // 0100 00oo oomm mddd
    if (opcode & 0xFC00) == 0x4000 {
        let rm = ((opcode >> 3) & 0x7) as u8;
        let rd = (opcode & 0x7) as u8;

        return match (opcode >> 6) & 0xF {
            0x0 => Instruction::And { rd, rm },
            0x1 => Instruction::Eor { rd, rm },
            0xC => Instruction::Orr { rd, rm },
            _ => Instruction::Unknown(opcode),
        };
    }

    // 0100 0110 Dmmm mddd: MOV with high registers
    if (opcode & 0xFF00) == 0x4600 {
        let rm = ((opcode >> 3) & 0xF) as u8;
        let rd = (((opcode >> 4) & 0x8) | (opcode & 0x7)) as u8;
        return Instruction::MovReg { rd, rm };
    }

    // 0100 0111 0mmm m000: BX
    if (opcode & 0xFF87) == 0x4700 {
        let rm = ((opcode >> 3) & 0xF) as u8;
        return Instruction::Bx { rm };
    }

    Instruction::Unknown(opcode)
}

// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{anyhow, bail, Context, Result};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use std::fs;
use std::path::Path;
use synpad_core::memory::ProgramImage;
use tracing::{debug, info, warn};

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// True when `buffer` starts with the ELF identification bytes.
pub fn is_elf(buffer: &[u8]) -> bool {
    buffer.starts_with(ELF_MAGIC)
}

/// Load `path` as a program image, picking ELF or raw binary by content.
///
/// Raw binaries are placed at `base` and start executing there.
pub fn load_program(path: &Path, base: u32) -> Result<ProgramImage> {
    let buffer =
        fs::read(path).with_context(|| format!("Failed to read program image: {:?}", path))?;
    if is_elf(&buffer) {
        load_elf_bytes(&buffer)
    } else {
        Ok(load_raw_bytes(buffer, base))
    }
}

pub fn load_raw(path: &Path, base: u32) -> Result<ProgramImage> {
    let buffer =
        fs::read(path).with_context(|| format!("Failed to read raw binary: {:?}", path))?;
    Ok(load_raw_bytes(buffer, base))
}

pub fn load_raw_bytes(buffer: Vec<u8>, base: u32) -> ProgramImage {
    info!("Raw image: {} bytes at {:#010x}", buffer.len(), base);
    let mut image = ProgramImage::new(base);
    if !buffer.is_empty() {
        image.add_segment(base, buffer);
    }
    image
}

pub fn load_elf(path: &Path) -> Result<ProgramImage> {
    let buffer = fs::read(path).with_context(|| format!("Failed to read ELF file: {:?}", path))?;
    load_elf_bytes(&buffer)
}

pub fn load_elf_bytes(buffer: &[u8]) -> Result<ProgramImage> {
    let elf = Elf::parse(buffer).context("Failed to parse ELF binary")?;

    if elf.header.e_machine != goblin::elf::header::EM_ARM {
        warn!(
            "ELF machine type {} is not ARM; loading segments anyway",
            elf.header.e_machine
        );
    }

    let entry = u32::try_from(elf.entry)
        .map_err(|_| anyhow!("ELF entry point {:#x} is outside the 32-bit space", elf.entry))?;
    info!("ELF Entry Point: {:#010x}", entry);

    let mut image = ProgramImage::new(entry);

    for ph in &elf.program_headers {
        if ph.p_type != PT_LOAD || ph.p_filesz == 0 {
            continue;
        }

        // Load address (LMA), not the run address.
        let start_addr = u32::try_from(ph.p_paddr)
            .map_err(|_| anyhow!("Segment address {:#x} is outside the 32-bit space", ph.p_paddr))?;
        let offset = ph.p_offset as usize;
        let size = ph.p_filesz as usize;

        debug!(
            "Loadable segment: addr={:#010x}, size={} bytes, offset={:#x}",
            start_addr, size, offset
        );

        let end = offset
            .checked_add(size)
            .filter(|end| *end <= buffer.len());
        let Some(end) = end else {
            bail!("Segment at {:#010x} runs past the end of the ELF file", start_addr);
        };

        image.add_segment(start_addr, buffer[offset..end].to_vec());
    }

    if image.segments.is_empty() {
        warn!("No loadable segments found in ELF file");
    }

    Ok(image)
}

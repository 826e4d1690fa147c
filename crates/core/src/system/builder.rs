// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::AddressSpace;
use crate::cpu::registers::Psr;
use crate::cpu::Arm7;
use crate::{Cpu, Machine, SimulationConfig};
use anyhow::Context;
use std::path::Path;
use synpad_config::MachineManifest;
use tracing::info;

/// Read the manifest at `system_path`, or fall back to the built-in machine.
pub fn load_manifest(system_path: Option<&Path>) -> anyhow::Result<MachineManifest> {
    match system_path {
        Some(path) => {
            info!("Loading machine manifest: {:?}", path);
            MachineManifest::from_file(path)
        }
        None => {
            info!("Using default machine configuration");
            Ok(MachineManifest::default())
        }
    }
}

/// Build the address space described by `manifest` and seed the boot and
/// cartridge images it names.
pub fn build_address_space(manifest: &MachineManifest) -> anyhow::Result<AddressSpace> {
    let mut bus = AddressSpace::from_manifest(manifest)?;

    if let Some(boot) = &manifest.images.boot {
        let path = manifest.resolve_path(boot);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read boot image {:?}", path))?;
        bus.load_boot(&bytes);
    }

    if let Some(cartridge) = &manifest.images.cartridge {
        let path = manifest.resolve_path(cartridge);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read cartridge image {:?}", path))?;
        bus.load_image(&bytes);
    }

    Ok(bus)
}

pub fn configure_arm7(config: &SimulationConfig) -> Arm7 {
    Arm7::with_config(config)
}

/// Assemble a ready-to-run machine. Without an explicit entry the CPU starts
/// in ARM state at the boot region base.
pub fn build_machine(manifest: &MachineManifest) -> anyhow::Result<Machine<Arm7>> {
    let bus = build_address_space(manifest)?;
    let config = SimulationConfig::from_manifest(manifest);
    let boot_base = bus.memory_map().boot.base;

    let mut machine = Machine::new(configure_arm7(&config), bus);
    let entry = manifest.cpu.entry.unwrap_or(boot_base);
    if entry & 1 != 0 {
        machine.cpu.set_status_word(Psr::T.bits());
    }
    machine.cpu.set_pc(entry & !1);

    info!(
        "Machine '{}' ready, entry {:#010x} ({:?} conditions)",
        manifest.name, entry, config.condition_codes
    );
    Ok(machine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConditionSet;
    use crate::Bus;

    #[test]
    fn test_build_default_machine() {
        let machine = build_machine(&MachineManifest::default()).unwrap();
        assert_eq!(machine.cpu.get_pc(), 0);
        assert!(!machine.cpu.in_thumb());
        assert_eq!(machine.cpu.condition_set(), ConditionSet::Simplified);
    }

    #[test]
    fn test_manifest_entry_selects_thumb_and_conditions() {
        let manifest = MachineManifest::from_yaml(
            r#"
name: "thumb-start"
cpu:
  condition_codes: full
  entry: 0x02000001
"#,
        )
        .unwrap();
        let machine = build_machine(&manifest).unwrap();
        assert_eq!(machine.cpu.get_pc(), 0x0200_0000);
        assert!(machine.cpu.in_thumb());
        assert_eq!(machine.cpu.condition_set(), ConditionSet::Full);
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let mut manifest = MachineManifest::default();
        manifest.images.cartridge = Some("/nonexistent/rom.bin".to_string());
        assert!(build_address_space(&manifest).is_err());
    }

    #[test]
    fn test_boot_image_loaded_from_relative_path() {
        let dir = std::env::temp_dir().join(format!("synpad-builder-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("bios.bin"), [0x05, 0x00, 0xA0, 0xE3]).unwrap();

        let mut manifest = MachineManifest::default();
        manifest.base_dir = Some(dir.clone());
        manifest.images.boot = Some("bios.bin".to_string());

        let bus = build_address_space(&manifest).unwrap();
        assert_eq!(bus.read_u32(0), 0xE3A0_0005);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

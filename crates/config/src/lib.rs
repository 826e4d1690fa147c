// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default schema version for YAML manifests
fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Smallest I/O window that still reaches the timer and interrupt registers.
pub const MIN_IO_WINDOW: u64 = 0x20C;

fn default_max_steps() -> u64 {
    20_000
}

fn default_frame_interval() -> u32 {
    4096
}

/// Which ARM condition codes the decoder evaluates.
///
/// `Simplified` only distinguishes EQ/NE/MI/PL/VS/VC/AL and treats every other
/// code as "always". `Full` evaluates all sixteen codes, which changes
/// guest-visible control flow for the relational ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionSet {
    #[default]
    Simplified,
    Full,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Unsupported schema_version '{0}'. Supported versions: '1.0'")]
    UnsupportedSchema(String),
    #[error("Region '{0}' must have a non-zero size")]
    ZeroSizedRegion(&'static str),
    #[error("Limit 'max_steps' must be greater than zero")]
    ZeroMaxSteps,
    #[error("Region 'io' is {0:#x} bytes; at least 0x20c are needed to reach IE/IF/IME")]
    IoWindowTooSmall(u64),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MemoryRange {
    pub base: u32,
    pub size: String, // e.g. "64KiB"
}

/// Per-region overrides of the default memory map. Missing entries keep the
/// built-in layout.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct MemoryOverrides {
    #[serde(default)]
    pub boot: Option<MemoryRange>,
    #[serde(default)]
    pub ram: Option<MemoryRange>,
    #[serde(default)]
    pub scratch: Option<MemoryRange>,
    #[serde(default)]
    pub cartridge: Option<MemoryRange>,
    #[serde(default)]
    pub io: Option<MemoryRange>,
}

impl MemoryOverrides {
    fn named(&self) -> [(&'static str, Option<&MemoryRange>); 5] {
        [
            ("boot", self.boot.as_ref()),
            ("ram", self.ram.as_ref()),
            ("scratch", self.scratch.as_ref()),
            ("cartridge", self.cartridge.as_ref()),
            ("io", self.io.as_ref()),
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct CpuOptions {
    #[serde(default)]
    pub condition_codes: ConditionSet,
    /// Initial program counter. Bit 0 selects Thumb state, as with BX.
    #[serde(default)]
    pub entry: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ImagePaths {
    #[serde(default)]
    pub boot: Option<String>,
    #[serde(default)]
    pub cartridge: Option<String>,
    /// Raw binary or ELF placed by its own segment addresses.
    #[serde(default)]
    pub program: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    #[serde(default = "default_frame_interval")]
    pub frame_interval: u32,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            frame_interval: default_frame_interval(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MachineManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub memory: MemoryOverrides,
    #[serde(default)]
    pub cpu: CpuOptions,
    #[serde(default)]
    pub images: ImagePaths,
    #[serde(default)]
    pub limits: RunLimits,

    /// Directory the manifest was read from; image paths resolve against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for MachineManifest {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: "default".to_string(),
            memory: MemoryOverrides::default(),
            cpu: CpuOptions::default(),
            images: ImagePaths::default(),
            limits: RunLimits::default(),
            base_dir: None,
        }
    }
}

impl MachineManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open machine manifest at {:?}", path))?;
        let mut manifest = Self::from_yaml(&content)
            .with_context(|| format!("Invalid machine manifest {:?}", path))?;
        manifest.base_dir = path.parent().map(Path::to_path_buf);
        Ok(manifest)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Machine Manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            return Err(ManifestError::UnsupportedSchema(self.schema_version.clone()).into());
        }

        for (name, range) in self.memory.named() {
            if let Some(range) = range {
                let size = parse_size(&range.size)
                    .with_context(|| format!("Invalid size for region '{}'", name))?;
                if size == 0 {
                    return Err(ManifestError::ZeroSizedRegion(name).into());
                }
                if name == "io" && size < MIN_IO_WINDOW {
                    return Err(ManifestError::IoWindowTooSmall(size).into());
                }
            }
        }

        if self.limits.max_steps == 0 {
            return Err(ManifestError::ZeroMaxSteps.into());
        }

        if self.limits.frame_interval == 0 {
            tracing::warn!("Limit 'frame_interval' is 0; presenting a frame every step");
        }

        Ok(())
    }

    /// Resolve an image path relative to the manifest's directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path);
        match &self.base_dir {
            Some(dir) if candidate.is_relative() => dir.join(candidate),
            _ => candidate,
        }
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format '{}': {}", size_str, e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_binary_units() {
        assert_eq!(parse_size("32KiB").unwrap(), 32 * 1024);
        assert_eq!(parse_size("4MiB").unwrap(), 4 * 1024 * 1024);
        assert_eq!(parse_size(" 1KiB ").unwrap(), 1024);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_resolve_path_relative_to_manifest() {
        let mut manifest = MachineManifest::default();
        manifest.base_dir = Some(PathBuf::from("/opt/synpad"));
        assert_eq!(
            manifest.resolve_path("rom.bin"),
            PathBuf::from("/opt/synpad/rom.bin")
        );
        assert_eq!(
            manifest.resolve_path("/abs/rom.bin"),
            PathBuf::from("/abs/rom.bin")
        );
    }

    #[test]
    fn test_default_manifest_is_valid() {
        assert!(MachineManifest::default().validate().is_ok());
    }
}

// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use synpad_config::MachineManifest;

pub use synpad_config::ConditionSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Condition table used for ARM instructions.
    pub condition_codes: ConditionSet,
    /// Steps between two presented frames.
    pub frame_interval: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            condition_codes: ConditionSet::Simplified,
            frame_interval: 4096,
        }
    }
}

impl SimulationConfig {
    pub fn from_manifest(manifest: &MachineManifest) -> Self {
        Self {
            condition_codes: manifest.cpu.condition_codes,
            frame_interval: manifest.limits.frame_interval.max(1),
        }
    }
}

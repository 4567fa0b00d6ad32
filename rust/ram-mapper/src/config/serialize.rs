use super::{
    AllCircuitConfig, CircuitConfig, CombinedLogicalRamConfig, ConfigNode, LogicalRamConfig,
    PhysicalRamConfig, RamConfig,
};
use anyhow::Context;
use std::{fs, path::Path};

/// One indentation level is four spaces.
pub(super) fn indent_str(level: usize) -> String {
    " ".repeat(4 * level)
}

impl PhysicalRamConfig {
    pub fn serialize(&self) -> String {
        format!(
            "ID {} S {} P {} Type {} Mode {} W {} D {}",
            self.uid,
            self.fit.num_series(),
            self.fit.num_parallel(),
            self.ram_arch_id,
            self.mode,
            self.physical_shape.width(),
            self.physical_shape.depth()
        )
    }
}

impl LogicalRamConfig {
    pub fn serialize(&self, level: usize) -> String {
        let child = match &self.node {
            ConfigNode::Physical(prc) => prc.serialize(),
            ConfigNode::Split(clrc) => clrc.serialize(level),
        };
        format!(
            "LW {} LD {} {}",
            self.logical_shape.width(),
            self.logical_shape.depth(),
            child
        )
    }
}

impl CombinedLogicalRamConfig {
    pub fn serialize(&self, level: usize) -> String {
        let level = level + 1;
        let indent = indent_str(level);
        format!(
            "{}\n{indent}{}\n{indent}{}",
            self.split,
            self.left.serialize(level),
            self.right.serialize(level)
        )
    }
}

impl RamConfig {
    pub fn serialize(&self, level: usize) -> String {
        format!(
            "{} {} {} {}",
            self.circuit_id,
            self.ram_id,
            self.extra_lut_count(),
            self.root.serialize(level)
        )
    }
}

impl CircuitConfig {
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for rc in self.rams().values() {
            out.push_str(&rc.serialize(0));
            out.push('\n');
        }
        out
    }
}

impl AllCircuitConfig {
    pub fn serialize(&self) -> String {
        let mut out = format!("// Num_Circuits {}\n", self.circuits().len());
        for cc in self.circuits().values() {
            out.push_str(&cc.serialize());
        }
        out
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        tracing::info!("Writing mapping to {}", path.display());
        fs::write(path, self.serialize())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

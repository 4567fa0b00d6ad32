//! Tile-count and FPGA-area cost model.
//!
//! The chip is accounted in tiles: regular logic blocks and LUTRAM blocks each
//! occupy one tile, and every RAM block type imposes an aspect-ratio minimum
//! through its LB:block supply ratio. The required tile count is the larger of
//! the two constraints; the FPGA area prices the whole supply of a chip that
//! big.

use crate::{
    CircuitConfig, CircuitId, LogicBlockArch, LogicalCircuit, LogicalRamConfig,
    PhysicalRamConfig, RamArchId, RamArchs, RamBlockCount, RamMode,
};
use std::fmt;

/// Quality-of-result figures of one circuit (or of a standalone estimate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitQor {
    pub circuit_id: Option<CircuitId>,
    /// Block usage per RAM arch in table order; absent when the area
    /// computation was skipped.
    pub ram_type_counts: Option<Vec<u64>>,
    pub regular_logic_blocks: u64,
    pub required_tiles: u64,
    /// Total chip area, or `required_tiles` as a proxy when skipped.
    pub fpga_area: u64,
}

impl CircuitQor {
    pub fn banner(num_types: usize) -> String {
        let mut fields = vec!["Circuit".to_string()];
        fields.extend((1..=num_types).map(|idx| format!("Type {idx}")));
        fields.extend(["Blocks", "Tiles", "Area"].map(String::from));
        fields.join("\t\t")
    }

    pub fn serialize(&self) -> String {
        let mut fields = Vec::new();
        fields.push(match self.circuit_id {
            Some(id) => id.to_string(),
            None => "-".to_string(),
        });
        if let Some(counts) = &self.ram_type_counts {
            fields.extend(counts.iter().map(|c| c.to_string()));
        }
        fields.push(self.regular_logic_blocks.to_string());
        fields.push(self.required_tiles.to_string());
        fields.push(self.fpga_area.to_string());
        fields.join("\t\t")
    }
}

impl fmt::Display for CircuitQor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Tile count and area for a circuit using `logic_blocks` LBs, `extra_luts`
/// decode/mux LUTs and `usage` physical RAM blocks.
///
/// With `skip_area` the per-type pricing is skipped and `fpga_area` is the
/// required tile count, a proportional stand-in cheap enough for the
/// annealing inner loop.
pub fn calculate_fpga_qor(
    archs: &RamArchs,
    logic_blocks: u64,
    extra_luts: u64,
    usage: &RamBlockCount,
    skip_area: bool,
) -> CircuitQor {
    let lb_for_extra = archs.lb_arch().block_count_from_luts(extra_luts);
    let regular_lb_used = logic_blocks + lb_for_extra;

    let mut aspect_tiles = 0u64;
    let mut lutram_lb_used = 0u64;
    for arch in archs.iter() {
        let count = usage.get(arch.id());
        let (a, b) = arch.lb_to_block_ratio();
        let min_tiles = (count * a).div_ceil(b);
        aspect_tiles = aspect_tiles.max(min_tiles);
        if arch.is_lutram() {
            // Each LUTRAM block sits in a logic-block slot.
            lutram_lb_used += count;
        }
    }

    let required_tiles = (regular_lb_used + lutram_lb_used).max(aspect_tiles);
    tracing::trace!(
        regular_lb_used,
        lutram_lb_used,
        aspect_tiles,
        required_tiles,
        "tile accounting"
    );

    if skip_area {
        return CircuitQor {
            circuit_id: None,
            ram_type_counts: None,
            regular_logic_blocks: regular_lb_used,
            required_tiles,
            fpga_area: required_tiles,
        };
    }

    let mut fpga_area = 0u64;
    for arch in archs.iter() {
        fpga_area += arch.block_count(required_tiles) * arch.area();
    }
    fpga_area += archs.lb_arch().block_count(required_tiles) * archs.lb_arch().area();

    CircuitQor {
        circuit_id: None,
        ram_type_counts: Some(archs.iter().map(|arch| usage.get(arch.id())).collect()),
        regular_logic_blocks: regular_lb_used,
        required_tiles,
        fpga_area,
    }
}

/// QoR of a full circuit mapping. With `allow_sharing` each distinct physical
/// allocation is billed once.
pub fn calculate_fpga_qor_for_circuit(
    archs: &RamArchs,
    logical_circuit: &LogicalCircuit,
    circuit_config: &CircuitConfig,
    allow_sharing: bool,
    skip_area: bool,
) -> CircuitQor {
    debug_assert_eq!(logical_circuit.circuit_id(), circuit_config.circuit_id());
    let usage = if allow_sharing {
        circuit_config.unique_block_count()
    } else {
        circuit_config.block_count()
    };
    let mut qor = calculate_fpga_qor(
        archs,
        logical_circuit.num_logic_blocks(),
        circuit_config.extra_lut_count(),
        &usage,
        skip_area,
    );
    qor.circuit_id = Some(logical_circuit.circuit_id());
    qor
}

/// Standalone QoR of one mapping subtree, as used to rank candidates.
pub fn calculate_fpga_qor_for_ram_config(
    archs: &RamArchs,
    logic_blocks: u64,
    lrc: &LogicalRamConfig,
    mode: RamMode,
    skip_area: bool,
) -> CircuitQor {
    calculate_fpga_qor(
        archs,
        logic_blocks,
        lrc.extra_lut_count(mode),
        &lrc.block_count(),
        skip_area,
    )
}

/// Area of one leaf on its own: its blocks plus the logic blocks hosting its
/// extra LUTs. Used for local tie-breaks and the sharing pass.
pub fn calculate_ram_area(
    archs: &RamArchs,
    extra_luts: u64,
    prc: Option<&PhysicalRamConfig>,
) -> u64 {
    let lb_arch: &LogicBlockArch = archs.lb_arch();
    let lb_area = lb_arch.block_count_from_luts(extra_luts) * lb_arch.area();
    let ram_area = prc
        .map(|prc| prc.block_count() * archs.arch(prc.ram_arch_id).area())
        .unwrap_or(0);
    lb_area + ram_area
}

/// Blocks of each type supplied by a chip of `tiles` tiles.
pub fn chip_ram_supply(archs: &RamArchs, tiles: u64) -> RamBlockCount {
    archs
        .iter()
        .map(|arch| (arch.id(), arch.block_count(tiles)))
        .collect()
}

/// Supply minus usage per RAM arch. Negative entries mean the aspect
/// constraint of that arch is the binding one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeftoverRamSupply(Vec<(RamArchId, i64)>);

impl LeftoverRamSupply {
    pub fn compute(archs: &RamArchs, tiles: u64, usage: &RamBlockCount) -> Self {
        LeftoverRamSupply(
            archs
                .iter()
                .map(|arch| {
                    let supply = arch.block_count(tiles) as i64;
                    (arch.id(), supply - usage.get(arch.id()) as i64)
                })
                .collect(),
        )
    }

    /// Arch with the largest leftover supply; first (lowest id) wins ties.
    pub fn max_arch(&self) -> Option<RamArchId> {
        self.0
            .iter()
            .copied()
            .max_by_key(|(id, leftover)| (*leftover, std::cmp::Reverse(*id)))
            .map(|(id, _)| id)
    }

    pub fn get(&self, id: RamArchId) -> i64 {
        self.0
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, leftover)| *leftover)
            .unwrap_or(0)
    }
}

/// Geometric mean of per-circuit areas, scaled for numeric headroom.
pub fn geomean_fpga_area(areas: &[u64]) -> Option<f64> {
    if areas.is_empty() {
        return None;
    }
    const FACTOR: f64 = 1e7;
    let log_sum: f64 = areas
        .iter()
        .map(|area| (*area as f64 / FACTOR).ln())
        .sum();
    Some((log_sum / areas.len() as f64).exp() * FACTOR)
}

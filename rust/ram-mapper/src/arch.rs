//! Physical architecture of the FPGA: RAM block types and the logic block.
//!
//! An architecture is a table of [`RamArch`] entries (LUT-RAMs and Block-RAMs
//! of various sizes) plus one [`LogicBlockArch`]. Shape tables and per-block
//! areas are precomputed at construction; the table is read-only while
//! solving.

mod parse;
#[cfg(test)]
mod tests;

pub use parse::ArchParseError;

use crate::{RamMode, RamModeSet, RamShape};
use derive_more::{Deref, From};
use std::{collections::BTreeMap, fmt};

/// The default architecture: one LUTRAM slice per two logic blocks, an 8Kb
/// BRAM every 10 tiles and a 128Kb BRAM every 300 tiles.
pub const DEFAULT_ARCH_DESCRIPTOR: &str = "-l 1 1 -b 8192 32 10 1 -b 131072 128 300 1";

/// ID of a RAM architecture, assigned from 1 in descriptor order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref)]
pub struct RamArchId(u64);

impl RamArchId {
    pub fn into_inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RamArchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RamArchId({})", self.0)
    }
}

impl fmt::Display for RamArchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of a RAM architecture, with the kind-specific descriptor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamArchKind {
    /// LUT-based RAM carved out of logic blocks. `slices` is the raw
    /// `(a, b)` pair of the descriptor: `b` of every `a + b` logic blocks can
    /// act as a LUTRAM.
    LutRam { slices: (u64, u64) },
    /// Dedicated block RAM.
    BlockRam,
}

/// One RAM block type.
///
/// Invariants
/// ----------
/// - `shapes_for` tables are width-descending powers of two and all have
///   `max_shape`'s capacity (LUTRAM's fixed pair included).
/// - `lb_to_block_ratio` components are positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamArch {
    id: RamArchId,
    kind: RamArchKind,
    max_shape: RamShape,
    supported_modes: RamModeSet,
    lb_to_block_ratio: (u64, u64),
    area: u64,
    shapes: Vec<RamShape>,
    shapes_tdp: Vec<RamShape>,
}

impl RamArch {
    /// LUTRAM with `b` slices of every `a + b` logic blocks usable as RAM.
    pub fn lutram(id: RamArchId, slices: (u64, u64)) -> Self {
        let (a, b) = slices;
        let max_shape = RamShape::new(20, 32).expect("static LUTRAM shape");
        RamArch {
            id,
            kind: RamArchKind::LutRam { slices },
            max_shape,
            supported_modes: RamModeSet::from(RamMode::Rom)
                | RamMode::SinglePort
                | RamMode::SimpleDualPort,
            lb_to_block_ratio: (a + b, b),
            area: 40_000,
            shapes: vec![max_shape, RamShape::new(10, 64).expect("static LUTRAM shape")],
            shapes_tdp: Vec::new(),
        }
    }

    /// Block RAM with the given full-width layout and LB:block supply ratio.
    pub fn block_ram(id: RamArchId, max_shape: RamShape, lb_to_block_ratio: (u64, u64)) -> Self {
        let size = max_shape.size();
        let max_width = max_shape.width();
        let area = (9000.0
            + 5.0 * size as f64
            + 90.0 * (size as f64).sqrt()
            + 1200.0 * max_width as f64)
            .round() as u64;
        let widths_to_shapes = |limit: u64| {
            all_pow2_below(limit)
                .into_iter()
                .map(|w| RamShape::from_size(size, w).expect("power-of-two width divides size"))
                .collect()
        };
        RamArch {
            id,
            kind: RamArchKind::BlockRam,
            max_shape,
            supported_modes: RamModeSet::from(RamMode::Rom)
                | RamMode::SinglePort
                | RamMode::SimpleDualPort
                | RamMode::TrueDualPort,
            lb_to_block_ratio,
            area,
            shapes: widths_to_shapes(max_width),
            // True dual port halves the widest layout: one fewer doubling.
            shapes_tdp: widths_to_shapes(max_width - 1),
        }
    }

    pub fn id(&self) -> RamArchId {
        self.id
    }

    pub fn kind(&self) -> &RamArchKind {
        &self.kind
    }

    pub fn is_lutram(&self) -> bool {
        matches!(self.kind, RamArchKind::LutRam { .. })
    }

    pub fn max_shape(&self) -> RamShape {
        self.max_shape
    }

    /// Capacity of one block in bits.
    pub fn size(&self) -> u64 {
        self.max_shape.size()
    }

    pub fn supported_modes(&self) -> RamModeSet {
        self.supported_modes
    }

    /// All legal port-width layouts in `mode`, width descending.
    pub fn shapes_for(&self, mode: RamMode) -> &[RamShape] {
        debug_assert!(self.supported_modes.contains(mode));
        match (mode, &self.kind) {
            (RamMode::TrueDualPort, RamArchKind::BlockRam) => &self.shapes_tdp,
            _ => &self.shapes,
        }
    }

    pub fn lb_to_block_ratio(&self) -> (u64, u64) {
        self.lb_to_block_ratio
    }

    /// Per-block tile area.
    pub fn area(&self) -> u64 {
        self.area
    }

    /// Blocks of this type supplied by a chip of `tiles` tiles.
    pub fn block_count(&self, tiles: u64) -> u64 {
        let (a, b) = self.lb_to_block_ratio;
        tiles * b / a
    }
}

impl fmt::Display for RamArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            RamArchKind::LutRam { .. } => "LUTRAM",
            RamArchKind::BlockRam => "BLOCK_RAM",
        };
        let (a, b) = self.lb_to_block_ratio;
        write!(
            f,
            "<{} {kind} {} ({}) LB:block ({a},{b}) Area:{}>",
            self.id, self.max_shape, self.supported_modes, self.area
        )
    }
}

/// The regular (non-LUTRAM) logic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicBlockArch {
    lb_to_block_ratio: (u64, u64),
}

impl LogicBlockArch {
    const LUTS_PER_BLOCK: u64 = 10;

    /// Derived from the LUTRAM supply ratio so that LUTRAM tiles and regular
    /// logic-block tiles partition the chip.
    fn from_lutram_ratio(lutram_ratio: Option<(u64, u64)>) -> Self {
        let lb_to_block_ratio = match lutram_ratio {
            Some((a, b)) => (a, a - b),
            None => (1, 1),
        };
        LogicBlockArch { lb_to_block_ratio }
    }

    pub fn lb_to_block_ratio(&self) -> (u64, u64) {
        self.lb_to_block_ratio
    }

    pub fn area(&self) -> u64 {
        35_000
    }

    /// Regular logic blocks supplied by a chip of `tiles` tiles.
    pub fn block_count(&self, tiles: u64) -> u64 {
        let (a, b) = self.lb_to_block_ratio;
        (tiles * b).div_ceil(a)
    }

    /// Logic blocks needed to host `luts` extra LUTs.
    pub fn block_count_from_luts(&self, luts: u64) -> u64 {
        luts.div_ceil(Self::LUTS_PER_BLOCK)
    }
}

impl fmt::Display for LogicBlockArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.lb_to_block_ratio;
        write!(
            f,
            "<RegularLogicBlock self:LUT (1,{}) LB:block ({a},{b}) Area:{}>",
            Self::LUTS_PER_BLOCK,
            self.area()
        )
    }
}

/// The full architecture table: RAM archs keyed by id, plus the logic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamArchs {
    ram_archs: BTreeMap<RamArchId, RamArch>,
    lb_arch: LogicBlockArch,
}

impl RamArchs {
    /// Parse a descriptor string such as
    /// [`DEFAULT_ARCH_DESCRIPTOR`](crate::DEFAULT_ARCH_DESCRIPTOR).
    pub fn from_descriptor(descriptor: &str) -> Result<Self, ArchParseError> {
        parse::parse_descriptor(descriptor)
    }

    pub fn default_archs() -> Self {
        Self::from_descriptor(DEFAULT_ARCH_DESCRIPTOR).expect("default descriptor is well-formed")
    }

    fn new(ram_archs: BTreeMap<RamArchId, RamArch>) -> Self {
        let lutram_ratio = ram_archs
            .values()
            .find(|arch| arch.is_lutram())
            .map(|arch| arch.lb_to_block_ratio());
        RamArchs {
            ram_archs,
            lb_arch: LogicBlockArch::from_lutram_ratio(lutram_ratio),
        }
    }

    pub fn get(&self, id: RamArchId) -> Option<&RamArch> {
        self.ram_archs.get(&id)
    }

    /// Panics on an id that is not in the table; configs are built from the
    /// table, so a miss is a programming error.
    pub fn arch(&self, id: RamArchId) -> &RamArch {
        self.ram_archs.get(&id).expect("RAM arch id out of table")
    }

    pub fn lb_arch(&self) -> &LogicBlockArch {
        &self.lb_arch
    }

    pub fn len(&self) -> usize {
        self.ram_archs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ram_archs.is_empty()
    }

    /// Ascending by arch id.
    pub fn iter(&self) -> impl Iterator<Item = &RamArch> {
        self.ram_archs.values()
    }

    /// Regenerate a descriptor string equivalent to the parsed one.
    pub fn descriptor(&self) -> String {
        let groups: Vec<String> = self
            .iter()
            .map(|arch| match arch.kind() {
                RamArchKind::LutRam { slices: (a, b) } => format!("-l {a} {b}"),
                RamArchKind::BlockRam => {
                    let (a, b) = arch.lb_to_block_ratio();
                    format!("-b {} {} {a} {b}", arch.size(), arch.max_shape().width())
                }
            })
            .collect();
        groups.join(" ")
    }
}

/// All powers of two below or equal to `x`, descending: `32 → [32,16,8,4,2,1]`,
/// `31 → [16,8,4,2,1]`.
fn all_pow2_below(x: u64) -> Vec<u64> {
    let mut result = Vec::new();
    let mut a = x;
    while a >= 1 {
        let p = 1u64 << a.ilog2();
        result.push(p);
        if p == 1 {
            break;
        }
        a = p - 1;
    }
    result
}

//! The mapping tree: how one logical RAM is realized by physical blocks.
//!
//! A [`LogicalRamConfig`] is either a leaf holding one [`PhysicalRamConfig`]
//! (a tiling of identical physical blocks) or a two-child split along the
//! series or parallel dimension. [`RamConfig`] wraps the root per logical RAM,
//! [`CircuitConfig`] collects a circuit, [`AllCircuitConfig`] the whole
//! benchmark set.

mod parse;
mod serialize;
#[cfg(test)]
mod tests;

pub use parse::{MappingParseError, MappingParseReason};

use crate::{
    extra_lut::{accumulate_extra_luts, extra_luts, write_decoder_luts},
    CircuitId, RamArchId, RamId, RamMode, RamShape, RamShapeFit, MAX_NUM_SERIES,
};
use derive_more::{Deref, From};
use fnv::FnvHashMap;
use std::{collections::BTreeMap, fmt};

/// Process-unique id of one physical RAM allocation. After the sharing pass
/// two leaves may carry the same uid: they alias one physical block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref)]
pub struct PhysicalRamUid(u64);

impl PhysicalRamUid {
    /// Placeholder for candidates; never legal in a finished mapping.
    pub const UNASSIGNED: PhysicalRamUid = PhysicalRamUid(u64::MAX);

    pub fn into_inner(&self) -> u64 {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        *self != Self::UNASSIGNED
    }
}

impl fmt::Debug for PhysicalRamUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalRamUid({})", self.0)
    }
}

impl fmt::Display for PhysicalRamUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RamConfig of circuit {found} inserted into CircuitConfig {expected}")]
    CircuitIdMismatch { expected: CircuitId, found: CircuitId },
    #[error("Tree shape {actual} does not cover the declared logical shape {logical}")]
    ShapeNotCovered { logical: RamShape, actual: RamShape },
    #[error("Series split arms must agree on width: {left} vs {right}")]
    SeriesWidthMismatch { left: RamShape, right: RamShape },
    #[error("Parallel split arms must agree on depth: {left} vs {right}")]
    ParallelDepthMismatch { left: RamShape, right: RamShape },
    #[error("Fit exceeds the serial-composition limit of {MAX_NUM_SERIES}: num_series={num_series}")]
    SeriesLimitExceeded { num_series: u64 },
    #[error("Physical RAM uid is unassigned")]
    UnassignedUid,
}

/// Leaf of the mapping tree: `fit.count()` identical physical blocks of one
/// architecture, tiled `num_series` deep by `num_parallel` wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalRamConfig {
    pub uid: PhysicalRamUid,
    pub fit: RamShapeFit,
    pub ram_arch_id: RamArchId,
    pub mode: RamMode,
    pub physical_shape: RamShape,
}

impl PhysicalRamConfig {
    /// Total footprint of the tiling.
    pub fn shape(&self) -> RamShape {
        RamShape::new(
            self.fit.num_parallel() * self.physical_shape.width(),
            self.fit.num_series() * self.physical_shape.depth(),
        )
        .expect("physical shape dimensions are positive")
    }

    pub fn block_count(&self) -> u64 {
        self.fit.count()
    }

    /// Same placement irrespective of the allocation uid; a candidate equal to
    /// the present leaf is a wasted move.
    pub fn same_placement(&self, other: &PhysicalRamConfig) -> bool {
        self.fit == other.fit
            && self.ram_arch_id == other.ram_arch_id
            && self.mode == other.mode
            && self.physical_shape == other.physical_shape
    }
}

/// Direction of an internal split node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitDimension {
    Series,
    Parallel,
}

impl fmt::Display for SplitDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitDimension::Series => f.write_str("series"),
            SplitDimension::Parallel => f.write_str("parallel"),
        }
    }
}

/// Internal split node with two sub-configs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedLogicalRamConfig {
    pub split: SplitDimension,
    pub left: Box<LogicalRamConfig>,
    pub right: Box<LogicalRamConfig>,
}

impl CombinedLogicalRamConfig {
    /// Shape of the combination: sum along the split dimension, the left
    /// arm's extent along the other.
    pub fn shape(&self) -> RamShape {
        let l = self.left.shape();
        let r = self.right.shape();
        let shape = match self.split {
            SplitDimension::Series => RamShape::new(l.width(), l.depth() + r.depth()),
            SplitDimension::Parallel => RamShape::new(l.width() + r.width(), l.depth()),
        };
        shape.expect("arm dimensions are positive")
    }
}

/// Payload of a [`LogicalRamConfig`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNode {
    Physical(PhysicalRamConfig),
    Split(CombinedLogicalRamConfig),
}

/// A node of the mapping tree with its declared logical shape.
///
/// Invariants
/// ----------
/// - The node's realized shape covers `logical_shape` componentwise.
/// - Split arms agree along the non-split dimension.
/// - Leaf fits respect [`MAX_NUM_SERIES`].
///
/// Checked by [`RamConfig::verify`], not by construction; the solver moves
/// through intermediate states one leaf at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRamConfig {
    pub logical_shape: RamShape,
    pub node: ConfigNode,
}

impl LogicalRamConfig {
    pub fn leaf(logical_shape: RamShape, prc: PhysicalRamConfig) -> Self {
        LogicalRamConfig {
            logical_shape,
            node: ConfigNode::Physical(prc),
        }
    }

    pub fn split(
        logical_shape: RamShape,
        split: SplitDimension,
        left: LogicalRamConfig,
        right: LogicalRamConfig,
    ) -> Self {
        LogicalRamConfig {
            logical_shape,
            node: ConfigNode::Split(CombinedLogicalRamConfig {
                split,
                left: Box::new(left),
                right: Box::new(right),
            }),
        }
    }

    pub fn shape(&self) -> RamShape {
        self.logical_shape
    }

    /// `num_series` of the leaf directly under this node, if it is a leaf.
    pub fn immediate_num_series(&self) -> Option<u64> {
        match &self.node {
            ConfigNode::Physical(prc) => Some(prc.fit.num_series()),
            ConfigNode::Split(_) => None,
        }
    }

    /// Extra decode/mux LUTs of the subtree for a logical RAM in `mode`.
    pub fn extra_lut_count(&self, mode: RamMode) -> u64 {
        match &self.node {
            ConfigNode::Physical(prc) => {
                extra_luts(prc.fit.num_series(), self.logical_shape.width(), mode)
            }
            ConfigNode::Split(clrc) => {
                let arms = clrc.left.extra_lut_count(mode) + clrc.right.extra_lut_count(mode);
                let node = match clrc.split {
                    // Stitching two sub-RAMs in series is itself a depth-2
                    // composition.
                    SplitDimension::Series => {
                        extra_luts(2, self.logical_shape.width(), mode)
                    }
                    // Two leaf arms of equal num_series can share one write
                    // decoder; drop the double-counted copy.
                    SplitDimension::Parallel => {
                        match (
                            clrc.left.immediate_num_series(),
                            clrc.right.immediate_num_series(),
                        ) {
                            (Some(l), Some(r)) if l == r => {
                                let write_luts = write_decoder_luts(l);
                                return arms - accumulate_extra_luts(write_luts, 0, mode);
                            }
                            _ => 0,
                        }
                    }
                };
                arms + node
            }
        }
    }

    /// Per-arch physical block usage of the subtree.
    pub fn block_count(&self) -> RamBlockCount {
        let mut count = RamBlockCount::default();
        self.block_count_into(&mut count);
        count
    }

    fn block_count_into(&self, count: &mut RamBlockCount) {
        match &self.node {
            ConfigNode::Physical(prc) => count.add(prc.ram_arch_id, prc.block_count()),
            ConfigNode::Split(clrc) => {
                clrc.left.block_count_into(count);
                clrc.right.block_count_into(count);
            }
        }
    }

    /// Invoke `f` on every leaf-holding node, left arm before right arm.
    pub fn visit_leaves<'a>(&'a self, f: &mut impl FnMut(&'a LogicalRamConfig)) {
        match &self.node {
            ConfigNode::Physical(_) => f(self),
            ConfigNode::Split(clrc) => {
                clrc.left.visit_leaves(f);
                clrc.right.visit_leaves(f);
            }
        }
    }

    pub fn visit_leaves_mut(&mut self, f: &mut impl FnMut(&mut LogicalRamConfig)) {
        match &mut self.node {
            ConfigNode::Physical(_) => f(self),
            ConfigNode::Split(clrc) => {
                clrc.left.visit_leaves_mut(f);
                clrc.right.visit_leaves_mut(f);
            }
        }
    }

    /// Mode of the leftmost leaf.
    pub fn first_leaf_mode(&self) -> RamMode {
        match &self.node {
            ConfigNode::Physical(prc) => prc.mode,
            ConfigNode::Split(clrc) => clrc.left.first_leaf_mode(),
        }
    }

    fn verify(&self) -> Result<(), ConfigError> {
        let actual = match &self.node {
            ConfigNode::Physical(prc) => {
                if !prc.fit.is_legal() {
                    return Err(ConfigError::SeriesLimitExceeded {
                        num_series: prc.fit.num_series(),
                    });
                }
                if !prc.uid.is_assigned() {
                    return Err(ConfigError::UnassignedUid);
                }
                prc.shape()
            }
            ConfigNode::Split(clrc) => {
                clrc.left.verify()?;
                clrc.right.verify()?;
                let (l, r) = (clrc.left.shape(), clrc.right.shape());
                match clrc.split {
                    SplitDimension::Series if l.width() != r.width() => {
                        return Err(ConfigError::SeriesWidthMismatch { left: l, right: r });
                    }
                    SplitDimension::Parallel if l.depth() != r.depth() => {
                        return Err(ConfigError::ParallelDepthMismatch { left: l, right: r });
                    }
                    _ => {}
                }
                clrc.shape()
            }
        };
        if actual.width() < self.logical_shape.width() || actual.depth() < self.logical_shape.depth()
        {
            return Err(ConfigError::ShapeNotCovered {
                logical: self.logical_shape,
                actual,
            });
        }
        Ok(())
    }
}

/// Mapping of one logical RAM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamConfig {
    pub circuit_id: CircuitId,
    pub ram_id: RamId,
    /// Port mode of the *logical* RAM. Leaves record their own mode, which the
    /// sharing pass may upgrade to [`RamMode::TrueDualPort`] independently.
    pub mode: RamMode,
    pub root: LogicalRamConfig,
}

impl RamConfig {
    pub fn shape(&self) -> RamShape {
        self.root.shape()
    }

    pub fn extra_lut_count(&self) -> u64 {
        self.root.extra_lut_count(self.mode)
    }

    pub fn block_count(&self) -> RamBlockCount {
        self.root.block_count()
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        self.root.verify()
    }
}

/// All RAM mappings of one circuit, keyed by RAM id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitConfig {
    circuit_id: CircuitId,
    rams: BTreeMap<RamId, RamConfig>,
}

impl CircuitConfig {
    pub fn new(circuit_id: CircuitId) -> Self {
        CircuitConfig {
            circuit_id,
            rams: BTreeMap::new(),
        }
    }

    pub fn circuit_id(&self) -> CircuitId {
        self.circuit_id
    }

    pub fn rams(&self) -> &BTreeMap<RamId, RamConfig> {
        &self.rams
    }

    pub fn rams_mut(&mut self) -> &mut BTreeMap<RamId, RamConfig> {
        &mut self.rams
    }

    pub fn insert_ram_config(&mut self, rc: RamConfig) -> Result<(), ConfigError> {
        if rc.circuit_id != self.circuit_id {
            return Err(ConfigError::CircuitIdMismatch {
                expected: self.circuit_id,
                found: rc.circuit_id,
            });
        }
        self.rams.insert(rc.ram_id, rc);
        Ok(())
    }

    pub fn extra_lut_count(&self) -> u64 {
        self.rams.values().map(RamConfig::extra_lut_count).sum()
    }

    /// Per-arch block usage counting every leaf.
    pub fn block_count(&self) -> RamBlockCount {
        let mut count = RamBlockCount::default();
        for rc in self.rams.values() {
            rc.root.block_count_into(&mut count);
        }
        count
    }

    /// Per-arch block usage counting each distinct allocation uid once; after
    /// the sharing pass aliasing leaves collapse to one block.
    pub fn unique_block_count(&self) -> RamBlockCount {
        let mut seen: FnvHashMap<PhysicalRamUid, PhysicalRamConfig> = FnvHashMap::default();
        self.visit_leaves(&mut |lrc| {
            if let ConfigNode::Physical(prc) = &lrc.node {
                seen.insert(prc.uid, *prc);
            }
        });
        let mut count = RamBlockCount::default();
        for prc in seen.values() {
            count.add(prc.ram_arch_id, prc.block_count());
        }
        count
    }

    pub fn visit_leaves<'a>(&'a self, f: &mut impl FnMut(&'a LogicalRamConfig)) {
        for rc in self.rams.values() {
            rc.root.visit_leaves(f);
        }
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        for rc in self.rams.values() {
            rc.verify()?;
        }
        Ok(())
    }
}

/// Mappings of every circuit in the benchmark set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllCircuitConfig {
    circuits: BTreeMap<CircuitId, CircuitConfig>,
}

impl AllCircuitConfig {
    pub fn circuits(&self) -> &BTreeMap<CircuitId, CircuitConfig> {
        &self.circuits
    }

    pub fn insert_circuit_config(&mut self, cc: CircuitConfig) {
        self.circuits.insert(cc.circuit_id(), cc);
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        for cc in self.circuits.values() {
            cc.verify()?;
        }
        Ok(())
    }
}

/// Physical block usage indexed by RAM arch id.
#[derive(Debug, Clone, Default)]
pub struct RamBlockCount(Vec<u64>);

impl RamBlockCount {
    pub fn get(&self, id: RamArchId) -> u64 {
        self.0.get(id.into_inner() as usize).copied().unwrap_or(0)
    }

    pub fn add(&mut self, id: RamArchId, count: u64) {
        let idx = id.into_inner() as usize;
        if self.0.len() <= idx {
            self.0.resize(idx + 1, 0);
        }
        self.0[idx] += count;
    }

    pub fn merge(&mut self, other: &RamBlockCount) {
        for (id, count) in other.iter() {
            self.add(id, count);
        }
    }

    /// Remove `other`'s counts; callers only subtract what they added.
    pub fn sub(&mut self, other: &RamBlockCount) {
        for (id, count) in other.iter() {
            if count == 0 {
                continue;
            }
            let idx = id.into_inner() as usize;
            debug_assert!(self.0.get(idx).copied().unwrap_or(0) >= count);
            self.0[idx] -= count;
        }
    }

    /// `(arch id, count)` for every populated slot, ascending by id.
    pub fn iter(&self) -> impl Iterator<Item = (RamArchId, u64)> + '_ {
        self.0
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, count)| (RamArchId::from(idx as u64), *count))
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

impl PartialEq for RamBlockCount {
    fn eq(&self, other: &Self) -> bool {
        let longest = self.0.len().max(other.0.len());
        (0..longest).all(|idx| {
            self.0.get(idx).copied().unwrap_or(0) == other.0.get(idx).copied().unwrap_or(0)
        })
    }
}

impl Eq for RamBlockCount {}

impl FromIterator<(RamArchId, u64)> for RamBlockCount {
    fn from_iter<T: IntoIterator<Item = (RamArchId, u64)>>(iter: T) -> Self {
        let mut count = RamBlockCount::default();
        for (id, c) in iter {
            count.add(id, c);
        }
        count
    }
}

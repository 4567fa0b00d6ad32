//! Candidate physical configurations and the tree positions they target.

use crate::{
    ConfigNode, LogicalRamConfig, PhysicalRamConfig, PhysicalRamUid, RamArchs, RamConfig, RamId,
    RamMode, RamShape,
};
use std::collections::BTreeMap;

/// Which leaf of a mapping tree a candidate replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateLocator {
    /// The tree is a single leaf at the root.
    Root,
    /// Left arm of a one-level split.
    LeftChild,
    /// Right arm of a one-level split.
    RightChild,
}

impl CandidateLocator {
    /// The leaf-holding node this locator denotes, if the tree has that shape.
    pub fn resolve<'a>(
        &self,
        root: &'a mut LogicalRamConfig,
    ) -> Option<&'a mut LogicalRamConfig> {
        match self {
            CandidateLocator::Root => {
                matches!(root.node, ConfigNode::Physical(_)).then_some(root)
            }
            CandidateLocator::LeftChild | CandidateLocator::RightChild => {
                let ConfigNode::Split(clrc) = &mut root.node else {
                    return None;
                };
                let arm = if matches!(self, CandidateLocator::LeftChild) {
                    clrc.left.as_mut()
                } else {
                    clrc.right.as_mut()
                };
                matches!(arm.node, ConfigNode::Physical(_)).then_some(arm)
            }
        }
    }

    pub fn resolve_ref<'a>(&self, root: &'a LogicalRamConfig) -> Option<&'a LogicalRamConfig> {
        match self {
            CandidateLocator::Root => {
                matches!(root.node, ConfigNode::Physical(_)).then_some(root)
            }
            CandidateLocator::LeftChild | CandidateLocator::RightChild => {
                let ConfigNode::Split(clrc) = &root.node else {
                    return None;
                };
                let arm = if matches!(self, CandidateLocator::LeftChild) {
                    clrc.left.as_ref()
                } else {
                    clrc.right.as_ref()
                };
                matches!(arm.node, ConfigNode::Physical(_)).then_some(arm)
            }
        }
    }
}

/// A legal physical configuration for one position of one RAM's tree. The
/// `prc.uid` stays [`PhysicalRamUid::UNASSIGNED`] until the candidate is
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub locator: CandidateLocator,
    pub prc: PhysicalRamConfig,
}

/// Move set of one circuit: every RAM's legal candidates.
pub type MoveSet = BTreeMap<RamId, Vec<Candidate>>;

/// Every legal physical configuration for `(logical_shape, mode)`: all archs
/// supporting the mode, all their layouts, fits capped at
/// [`MAX_NUM_SERIES`](crate::MAX_NUM_SERIES). Ordered by arch id, then width
/// descending.
pub fn enumerate_physical_configs(
    archs: &RamArchs,
    logical_shape: RamShape,
    mode: RamMode,
) -> Vec<PhysicalRamConfig> {
    let mut out = Vec::new();
    for arch in archs.iter() {
        if !arch.supported_modes().contains(mode) {
            continue;
        }
        for physical_shape in arch.shapes_for(mode) {
            let fit = logical_shape.fit(physical_shape);
            if !fit.is_legal() {
                continue;
            }
            out.push(PhysicalRamConfig {
                uid: PhysicalRamUid::UNASSIGNED,
                fit,
                ram_arch_id: arch.id(),
                mode,
                physical_shape: *physical_shape,
            });
        }
    }
    out
}

/// Candidates replacing a single-leaf tree wholesale.
pub fn root_candidates(archs: &RamArchs, logical_shape: RamShape, mode: RamMode) -> Vec<Candidate> {
    enumerate_physical_configs(archs, logical_shape, mode)
        .into_iter()
        .map(|prc| Candidate {
            locator: CandidateLocator::Root,
            prc,
        })
        .collect()
}

/// Candidates matched to the present tree shape: child locators for a
/// one-level split, the root locator otherwise.
pub fn candidates_for_ram_config(archs: &RamArchs, rc: &RamConfig) -> Vec<Candidate> {
    match &rc.root.node {
        ConfigNode::Physical(_) => root_candidates(archs, rc.root.logical_shape, rc.mode),
        ConfigNode::Split(clrc) => {
            let mut out = Vec::new();
            for (locator, arm) in [
                (CandidateLocator::LeftChild, &clrc.left),
                (CandidateLocator::RightChild, &clrc.right),
            ] {
                if let ConfigNode::Physical(_) = arm.node {
                    out.extend(
                        enumerate_physical_configs(archs, arm.logical_shape, rc.mode)
                            .into_iter()
                            .map(|prc| Candidate { locator, prc }),
                    );
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CircuitId, LogicalRamConfig, RamArchId, RamShapeFit, SplitDimension};

    fn shape(width: u64, depth: u64) -> RamShape {
        RamShape::new(width, depth).unwrap()
    }

    #[test]
    fn enumerates_all_archs_and_widths() {
        let archs = RamArchs::default_archs();
        let candidates =
            enumerate_physical_configs(&archs, shape(12, 45), RamMode::SimpleDualPort);
        // 2 LUTRAM layouts + 6 of the 8K BRAM + 8 of the 128K BRAM.
        assert_eq!(candidates.len(), 16);
        assert!(candidates.iter().all(|prc| prc.fit.is_legal()));
        assert!(candidates
            .iter()
            .all(|prc| prc.uid == PhysicalRamUid::UNASSIGNED));

        // LUTRAM is excluded for TrueDualPort; widest BRAM layouts drop out.
        let tdp = enumerate_physical_configs(&archs, shape(12, 45), RamMode::TrueDualPort);
        assert_eq!(tdp.len(), 5 + 7);
        assert!(tdp
            .iter()
            .all(|prc| prc.ram_arch_id != RamArchId::from(1)));
    }

    #[test]
    fn deep_fits_are_dropped() {
        let archs = RamArchs::default_archs();
        let candidates = enumerate_physical_configs(&archs, shape(1, 40_000), RamMode::SinglePort);
        for prc in &candidates {
            assert!(prc.fit.num_series() <= 16, "candidate {prc:?}");
        }
        // The narrow 8K layout still fits: ceil(40000/8192) = 5 in series.
        assert!(candidates.iter().any(|prc| {
            prc.ram_arch_id == RamArchId::from(2) && prc.physical_shape.width() == 1
        }));
        // The wide 8K layout would need 157 in series.
        assert!(!candidates.iter().any(|prc| {
            prc.ram_arch_id == RamArchId::from(2) && prc.physical_shape.width() == 32
        }));
    }

    #[test]
    fn locator_resolution() {
        let archs = RamArchs::default_archs();
        let prc = enumerate_physical_configs(&archs, shape(12, 45), RamMode::SinglePort)[0];
        let mut single = LogicalRamConfig::leaf(shape(12, 45), prc);
        assert!(CandidateLocator::Root.resolve(&mut single).is_some());
        assert!(CandidateLocator::LeftChild.resolve(&mut single).is_none());

        let mut split = LogicalRamConfig::split(
            shape(12, 45),
            SplitDimension::Parallel,
            LogicalRamConfig::leaf(shape(8, 45), prc),
            LogicalRamConfig::leaf(shape(4, 45), prc),
        );
        assert!(CandidateLocator::Root.resolve(&mut split).is_none());
        let left = CandidateLocator::LeftChild.resolve(&mut split).unwrap();
        assert_eq!(left.logical_shape, shape(8, 45));
        assert!(CandidateLocator::RightChild.resolve(&mut split).is_some());
    }

    #[test]
    fn split_ram_gets_child_candidates() {
        let archs = RamArchs::default_archs();
        let prc = PhysicalRamConfig {
            uid: PhysicalRamUid::from(0),
            fit: RamShapeFit::new(1, 2),
            ram_arch_id: RamArchId::from(2),
            mode: RamMode::SinglePort,
            physical_shape: shape(8, 1024),
        };
        let rc = RamConfig {
            circuit_id: CircuitId::from(0),
            ram_id: crate::RamId::from(0),
            mode: RamMode::SinglePort,
            root: LogicalRamConfig::split(
                shape(12, 1000),
                SplitDimension::Parallel,
                LogicalRamConfig::leaf(shape(8, 1000), prc),
                LogicalRamConfig::leaf(shape(4, 1000), prc),
            ),
        };
        let candidates = candidates_for_ram_config(&archs, &rc);
        assert!(!candidates.is_empty());
        assert!(candidates
            .iter()
            .all(|c| c.locator != CandidateLocator::Root));
        assert!(candidates
            .iter()
            .any(|c| c.locator == CandidateLocator::LeftChild));
        assert!(candidates
            .iter()
            .any(|c| c.locator == CandidateLocator::RightChild));
    }
}

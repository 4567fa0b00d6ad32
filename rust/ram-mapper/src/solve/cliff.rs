use super::UidAllocator;
use crate::{
    CircuitConfig, ConfigNode, LogicalRamConfig, PhysicalRamConfig, RamId, RamShape, RamShapeFit,
    SplitDimension,
};

/// Widest arm that is broken off a width-wasteful leaf.
const CLIFF_MAX_NUM_PARALLEL: u64 = 2;

/// Rewrite single-leaf mappings that waste at least one whole block column
/// into a parallel two-arm split, so the narrow arm can be re-optimized on its
/// own. Block count and extra-LUT count are preserved exactly. Returns the
/// RAM ids that were split.
pub fn split_width_cliffs(config: &mut CircuitConfig, uids: &mut UidAllocator) -> Vec<RamId> {
    let circuit_id = config.circuit_id();
    let mut split_rams = Vec::new();
    for (ram_id, rc) in config.rams_mut() {
        let ConfigNode::Physical(prc) = &rc.root.node else {
            continue;
        };
        let prc = *prc;
        let logical = rc.root.logical_shape;
        let total = prc.shape();
        let extra_width = total.width() - logical.width();
        let extra_depth = total.depth() - logical.depth();
        let (num_series, num_parallel) = (prc.fit.num_series(), prc.fit.num_parallel());

        if extra_width > 0 && num_parallel > 1 {
            let broken_off = CLIFF_MAX_NUM_PARALLEL.min(num_parallel - 1);
            let left_width = (num_parallel - broken_off) * prc.physical_shape.width();
            // num_parallel is the rounded-up fit, so the leftover is positive.
            let right_width = logical.width() - left_width;
            let left = LogicalRamConfig::leaf(
                RamShape::new(left_width, logical.depth()).expect("arm dimensions are positive"),
                PhysicalRamConfig {
                    fit: RamShapeFit::new(num_series, num_parallel - broken_off),
                    ..prc
                },
            );
            let right = LogicalRamConfig::leaf(
                RamShape::new(right_width, logical.depth()).expect("arm dimensions are positive"),
                PhysicalRamConfig {
                    uid: uids.next_uid(),
                    fit: RamShapeFit::new(num_series, broken_off),
                    ..prc
                },
            );
            tracing::debug!(
                %circuit_id,
                %ram_id,
                extra_width,
                "width cliff split: {} -> {} + {}",
                total,
                left.logical_shape,
                right.logical_shape
            );
            rc.root = LogicalRamConfig::split(logical, SplitDimension::Parallel, left, right);
            split_rams.push(*ram_id);
        } else if extra_depth > 0 && num_series > 1 {
            // Depth cliffs are identified but left alone.
            tracing::debug!(%circuit_id, %ram_id, extra_depth, "depth cliff not transformed");
        }
    }
    split_rams
}

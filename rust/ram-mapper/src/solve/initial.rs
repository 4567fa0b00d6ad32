use super::{SolveError, UidAllocator};
use crate::{
    candidate::enumerate_physical_configs,
    qor::calculate_fpga_qor_for_ram_config,
    CircuitConfig, ConfigNode, LogicalCircuit, LogicalRamConfig, RamArchs, RamConfig,
};

/// Greedy initial assignment: every logical RAM gets the single-leaf mapping
/// with the smallest standalone area estimate.
pub fn initial_solve(
    archs: &RamArchs,
    logical_circuit: &LogicalCircuit,
    uids: &mut UidAllocator,
) -> Result<CircuitConfig, SolveError> {
    let circuit_id = logical_circuit.circuit_id();
    let mut config = CircuitConfig::new(circuit_id);
    for (ram_id, lr) in logical_circuit.rams() {
        let candidates = enumerate_physical_configs(archs, lr.shape(), lr.mode());
        let scored = candidates.into_iter().map(|prc| {
            let lrc = LogicalRamConfig::leaf(lr.shape(), prc);
            let area =
                calculate_fpga_qor_for_ram_config(archs, 0, &lrc, lr.mode(), false).fpga_area;
            tracing::trace!(%circuit_id, %ram_id, candidate = %lrc.serialize(0), area, "candidate");
            (lrc, area, prc.fit)
        });
        // Equal-area candidates resolve to the shallower, smaller tiling;
        // remaining ties to enumeration order.
        let Some((mut best, best_area, _)) = scored
            .min_by_key(|(_, area, fit)| (*area, fit.num_series(), fit.count()))
        else {
            return Err(SolveError::NoCandidates {
                circuit_id,
                ram_id: *ram_id,
                shape: lr.shape(),
                mode: lr.mode(),
            });
        };
        if let ConfigNode::Physical(prc) = &mut best.node {
            prc.uid = uids.next_uid();
        }
        tracing::debug!(%circuit_id, %ram_id, best = %best.serialize(0), area = best_area, "initial pick");
        config
            .insert_ram_config(RamConfig {
                circuit_id,
                ram_id: *ram_id,
                mode: lr.mode(),
                root: best,
            })
            .expect("RAM belongs to this circuit");
    }
    Ok(config)
}

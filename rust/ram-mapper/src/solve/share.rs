//! The true-dual-port sharing pass.
//!
//! Two single-port logical RAMs can live in one physical block when the block
//! runs in true-dual-port mode: each logical RAM drives one port and owns a
//! disjoint range of rows. The pass pairs *providers* (leaves with free rows
//! whose shape is legal in true-dual-port mode) with *receivers* (leaves that
//! fit into those rows), preferring the pairings that save the most area per
//! wasted provider bit, and rewrites the receiver's leaf to alias the
//! provider's block.

use crate::{
    extra_lut::extra_luts,
    qor::calculate_ram_area,
    CircuitConfig, ConfigNode, PhysicalRamConfig, PhysicalRamUid, RamArchs, RamMode, RamShape,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy)]
struct LeafInfo {
    rc_mode: RamMode,
    logical_shape: RamShape,
    prc: PhysicalRamConfig,
}

/// Merge pairs of single-port RAM leaves into shared true-dual-port blocks.
/// Returns the number of pairs formed.
pub fn share_physical_rams(archs: &RamArchs, config: &mut CircuitConfig) -> usize {
    let leaves = collect_single_port_leaves(config);

    // Ordered candidate pairs, grouped by provider uid.
    let mut grouped: BTreeMap<PhysicalRamUid, Vec<(f64, PhysicalRamUid)>> = BTreeMap::new();
    for provider in leaves.iter().filter(|leaf| is_provider(archs, leaf)) {
        let block = provider.prc.shape();
        let free_bits = block.size() - provider.logical_shape.size();
        for receiver in &leaves {
            if receiver.prc.uid == provider.prc.uid {
                continue;
            }
            if receiver.logical_shape.width() > block.width() {
                continue;
            }
            if receiver.logical_shape.depth() + provider.logical_shape.depth() > block.depth() {
                continue;
            }
            let now = extra_luts(
                receiver.prc.fit.num_series(),
                receiver.logical_shape.width(),
                receiver.rc_mode,
            );
            let shared = extra_luts(
                provider.prc.fit.num_series(),
                receiver.logical_shape.width(),
                receiver.rc_mode,
            );
            let saved_area = calculate_ram_area(archs, now, Some(&receiver.prc)) as f64
                - calculate_ram_area(archs, shared, None) as f64;
            let saving = saved_area / free_bits as f64;
            grouped
                .entry(provider.prc.uid)
                .or_default()
                .push((saving, receiver.prc.uid));
        }
    }
    grouped.retain(|_, receivers| !receivers.is_empty());

    // Providers with the fewest options commit first; each takes its best
    // receiver, and both uids leave the pool.
    let mut chosen: Vec<(PhysicalRamUid, PhysicalRamUid)> = Vec::new();
    while let Some((&provider_uid, _)) = grouped
        .iter()
        .min_by_key(|(uid, receivers)| (receivers.len(), **uid))
    {
        let receivers = grouped.remove(&provider_uid).expect("key just observed");
        let (_, receiver_uid) = receivers
            .iter()
            .copied()
            .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
            .expect("empty entries were dropped");
        chosen.push((provider_uid, receiver_uid));
        grouped.remove(&receiver_uid);
        for receivers in grouped.values_mut() {
            receivers.retain(|(_, uid)| *uid != provider_uid && *uid != receiver_uid);
        }
        grouped.retain(|_, receivers| !receivers.is_empty());
    }

    for (provider_uid, receiver_uid) in &chosen {
        tracing::debug!(
            circuit_id = %config.circuit_id(),
            provider = %provider_uid,
            receiver = %receiver_uid,
            "sharing a true-dual-port block"
        );
    }
    apply_sharing(config, &leaves, &chosen);
    chosen.len()
}

fn collect_single_port_leaves(config: &CircuitConfig) -> Vec<LeafInfo> {
    let mut leaves = Vec::new();
    for rc in config.rams().values() {
        if rc.mode.num_ports() != 1 {
            continue;
        }
        rc.root.visit_leaves(&mut |lrc| {
            if let ConfigNode::Physical(prc) = &lrc.node {
                leaves.push(LeafInfo {
                    rc_mode: rc.mode,
                    logical_shape: lrc.logical_shape,
                    prc: *prc,
                });
            }
        });
    }
    leaves
}

/// A leaf can host a second logical RAM if its block type speaks true dual
/// port at the current layout and the tiling has spare rows.
fn is_provider(archs: &RamArchs, leaf: &LeafInfo) -> bool {
    let arch = archs.arch(leaf.prc.ram_arch_id);
    arch.supported_modes().contains(RamMode::TrueDualPort)
        && arch
            .shapes_for(RamMode::TrueDualPort)
            .contains(&leaf.prc.physical_shape)
        && leaf.prc.shape().depth() > leaf.logical_shape.depth()
}

fn apply_sharing(
    config: &mut CircuitConfig,
    leaves: &[LeafInfo],
    chosen: &[(PhysicalRamUid, PhysicalRamUid)],
) {
    if chosen.is_empty() {
        return;
    }
    let provider_prc = |uid: PhysicalRamUid| {
        leaves
            .iter()
            .find(|leaf| leaf.prc.uid == uid)
            .map(|leaf| leaf.prc)
            .expect("chosen uids come from the leaf list")
    };
    let providers: BTreeSet<PhysicalRamUid> = chosen.iter().map(|(p, _)| *p).collect();
    let mut receivers: BTreeMap<PhysicalRamUid, PhysicalRamConfig> = BTreeMap::new();
    for (p_uid, r_uid) in chosen {
        let mut shared = provider_prc(*p_uid);
        shared.mode = RamMode::TrueDualPort;
        receivers.insert(*r_uid, shared);
    }

    for rc in config.rams_mut().values_mut() {
        rc.root.visit_leaves_mut(&mut |lrc| {
            if let ConfigNode::Physical(prc) = &mut lrc.node {
                if providers.contains(&prc.uid) {
                    prc.mode = RamMode::TrueDualPort;
                } else if let Some(shared) = receivers.get(&prc.uid) {
                    *prc = *shared;
                }
            }
        });
    }
}

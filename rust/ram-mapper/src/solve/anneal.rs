//! Simulated annealing over single-leaf swaps, with a terminating greedy
//! descent.
//!
//! The optimizer never rebuilds the tree: a move replaces one leaf's physical
//! configuration in place, the cached extra-LUT and block-count totals are
//! updated from that RAM's before/after difference, and the tile count is
//! re-derived from the caches. Rejected moves restore the old leaf.

use super::UidAllocator;
use crate::{
    candidate::{Candidate, MoveSet},
    extra_lut::extra_luts,
    qor::{calculate_fpga_qor, calculate_ram_area, LeftoverRamSupply},
    CircuitConfig, ConfigNode, LogicalCircuit, PhysicalRamConfig, RamArchs, RamBlockCount, RamId,
    RamMode,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Probability of steering a move toward the arch with the most unused chip
/// supply.
const ARCH_BIAS: f64 = 0.4;

/// Acceptance-ratio floor below which the outer loop stops extending.
const KEEP_GOING_RATIO: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct AnnealOptions {
    /// Tag for logging, e.g. `"L1"`.
    pub name: &'static str,
    pub seed: u64,
    /// Scales both the initial temperature and the step budget.
    pub effort: f64,
    /// Stop as soon as no mapping can beat the pure logic-block floor.
    pub allow_early_exit: bool,
    /// Snapshot the best configuration seen and restore it afterwards.
    pub enable_save_best: bool,
    /// Fraction of each inner loop after which the temperature is forced to
    /// zero; `>= 1` disables quenching.
    pub quench_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveOutcome {
    AcceptedArea,
    AcceptedLocalArea,
    AcceptedTemperature,
    Rejected,
    /// The candidate equals the leaf it would replace.
    AbortDuplicated,
}

impl MoveOutcome {
    fn is_accepted(&self) -> bool {
        matches!(
            self,
            MoveOutcome::AcceptedArea
                | MoveOutcome::AcceptedLocalArea
                | MoveOutcome::AcceptedTemperature
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnealStats {
    pub accepted_area: u64,
    pub accepted_local_area: u64,
    pub accepted_temperature: u64,
    pub rejected: u64,
    pub duplicated: u64,
    pub outer_iterations: u64,
    pub greedy_loops: u64,
    pub early_exit: bool,
    pub final_area: u64,
}

impl AnnealStats {
    fn record(&mut self, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::AcceptedArea => self.accepted_area += 1,
            MoveOutcome::AcceptedLocalArea => self.accepted_local_area += 1,
            MoveOutcome::AcceptedTemperature => self.accepted_temperature += 1,
            MoveOutcome::Rejected => self.rejected += 1,
            MoveOutcome::AbortDuplicated => self.duplicated += 1,
        }
    }
}

enum Phase {
    Anneal { temperature: f64 },
    Greedy,
}

/// Anneal `config` over `move_set`, then descend greedily until no strictly
/// improving swap remains. Deterministic for a given seed.
pub fn anneal_circuit(
    archs: &RamArchs,
    logical_circuit: &LogicalCircuit,
    config: &mut CircuitConfig,
    move_set: &MoveSet,
    uids: &mut UidAllocator,
    options: &AnnealOptions,
) -> AnnealStats {
    let mut annealer = Annealer::new(archs, logical_circuit, config, move_set, uids, options);
    annealer.run();
    let stats = annealer.finish();
    tracing::info!(
        name = options.name,
        circuit_id = %logical_circuit.circuit_id(),
        final_area = stats.final_area,
        accepted_area = stats.accepted_area,
        accepted_local_area = stats.accepted_local_area,
        accepted_temperature = stats.accepted_temperature,
        rejected = stats.rejected,
        duplicated = stats.duplicated,
        outer_iterations = stats.outer_iterations,
        greedy_loops = stats.greedy_loops,
        early_exit = stats.early_exit,
        "annealing finished"
    );
    stats
}

struct Annealer<'a> {
    archs: &'a RamArchs,
    logical_circuit: &'a LogicalCircuit,
    config: &'a mut CircuitConfig,
    move_set: &'a MoveSet,
    uids: &'a mut UidAllocator,
    options: &'a AnnealOptions,
    ram_ids: Vec<RamId>,
    num_candidates: usize,
    rng: StdRng,
    // Caches, maintained incrementally across accepted moves.
    extra_luts: u64,
    block_count: RamBlockCount,
    /// Required tile count; annealing runs the cost model with `skip_area`.
    area: u64,
    leftover: LeftoverRamSupply,
    best_area: u64,
    best_config: Option<CircuitConfig>,
    stats: AnnealStats,
}

impl<'a> Annealer<'a> {
    fn new(
        archs: &'a RamArchs,
        logical_circuit: &'a LogicalCircuit,
        config: &'a mut CircuitConfig,
        move_set: &'a MoveSet,
        uids: &'a mut UidAllocator,
        options: &'a AnnealOptions,
    ) -> Self {
        let ram_ids = move_set.keys().copied().collect();
        let num_candidates = move_set.values().map(Vec::len).sum();
        let mut annealer = Annealer {
            archs,
            logical_circuit,
            config,
            move_set,
            uids,
            options,
            ram_ids,
            num_candidates,
            rng: StdRng::seed_from_u64(options.seed),
            extra_luts: 0,
            block_count: RamBlockCount::default(),
            area: 0,
            leftover: LeftoverRamSupply::default(),
            best_area: u64::MAX,
            best_config: None,
            stats: AnnealStats::default(),
        };
        annealer.recompute_caches();
        annealer.best_area = annealer.area;
        if annealer.options.enable_save_best {
            // The starting configuration counts as best-so-far; restoring it
            // bounds the pass from above.
            annealer.best_config = Some(annealer.config.clone());
        }
        annealer
    }

    fn recompute_caches(&mut self) {
        self.extra_luts = self.config.extra_lut_count();
        self.block_count = self.config.block_count();
        self.area = calculate_fpga_qor(
            self.archs,
            self.logical_circuit.num_logic_blocks(),
            self.extra_luts,
            &self.block_count,
            true,
        )
        .fpga_area;
        self.leftover = LeftoverRamSupply::compute(self.archs, self.area, &self.block_count);
    }

    /// The pure logic-block floor: no mapping can cost fewer tiles.
    fn at_floor(&self) -> bool {
        self.options.allow_early_exit && self.area <= self.logical_circuit.num_logic_blocks()
    }

    fn run(&mut self) {
        if self.num_candidates == 0 {
            return;
        }
        if self.at_floor() {
            self.stats.early_exit = true;
            return;
        }

        let t0 = 50.0 * self.options.effort;
        let rounds = (20.0 * self.options.effort).ceil() as usize;
        let steps_per_outer = self.num_candidates * rounds.max(1);
        let max_outer = rounds as u64;

        let mut step = 0u64;
        let mut outer = 0u64;
        'outer: loop {
            let mut accepted = 0u64;
            for inner in 0..steps_per_outer {
                let progress = inner as f64 / steps_per_outer as f64;
                let temperature = if progress >= self.options.quench_fraction {
                    0.0
                } else {
                    t0 / (step + 1) as f64
                };
                let (ram_id, candidate) = self.pick_candidate();
                let outcome =
                    self.attempt_candidate(ram_id, &candidate, Phase::Anneal { temperature });
                self.stats.record(outcome);
                if outcome.is_accepted() {
                    accepted += 1;
                }
                step += 1;
                if self.at_floor() {
                    self.stats.early_exit = true;
                    return;
                }
            }
            outer += 1;
            self.stats.outer_iterations = outer;
            let ratio = accepted as f64 / steps_per_outer as f64;
            tracing::debug!(
                name = self.options.name,
                outer,
                ratio,
                area = self.area,
                "annealing outer iteration"
            );
            if ratio <= KEEP_GOING_RATIO || outer >= max_outer {
                break 'outer;
            }
        }

        if self.options.enable_save_best {
            if let Some(best) = self.best_config.take() {
                if self.best_area < self.area {
                    tracing::debug!(
                        name = self.options.name,
                        best_area = self.best_area,
                        area = self.area,
                        "restoring best snapshot"
                    );
                    *self.config = best;
                    self.recompute_caches();
                }
            }
        }

        self.greedy_descent();
    }

    /// Deterministic sweep over every `(ram, candidate)` pair, accepting any
    /// strictly area-improving swap, until a full pass accepts nothing. The
    /// area strictly decreases on each acceptance and is bounded below, so
    /// this terminates.
    fn greedy_descent(&mut self) {
        let move_set = self.move_set;
        loop {
            let mut improved = false;
            for (ram_id, candidates) in move_set {
                for candidate in candidates {
                    let outcome = self.attempt_candidate(*ram_id, candidate, Phase::Greedy);
                    self.stats.record(outcome);
                    if outcome.is_accepted() {
                        improved = true;
                        if self.at_floor() {
                            self.stats.early_exit = true;
                            return;
                        }
                    }
                }
            }
            self.stats.greedy_loops += 1;
            if !improved {
                break;
            }
        }
    }

    fn finish(self) -> AnnealStats {
        let mut stats = self.stats;
        stats.final_area = self.area;
        stats
    }

    fn pick_candidate(&mut self) -> (RamId, Candidate) {
        let move_set = self.move_set;
        let ram_id = self.ram_ids[self.rng.gen_range(0..self.ram_ids.len())];
        let candidates = &move_set[&ram_id];
        if self.rng.gen::<f64>() < ARCH_BIAS {
            if let Some(arch_id) = self.leftover.max_arch() {
                let biased: Vec<&Candidate> = candidates
                    .iter()
                    .filter(|c| c.prc.ram_arch_id == arch_id)
                    .collect();
                if !biased.is_empty() {
                    let idx = self.rng.gen_range(0..biased.len());
                    return (ram_id, Candidate::clone(biased[idx]));
                }
            }
        }
        let idx = self.rng.gen_range(0..candidates.len());
        (ram_id, candidates[idx].clone())
    }

    fn attempt_candidate(
        &mut self,
        ram_id: RamId,
        candidate: &Candidate,
        phase: Phase,
    ) -> MoveOutcome {
        let rc = &self.config.rams()[&ram_id];
        let Some(leaf) = candidate.locator.resolve_ref(&rc.root) else {
            // The move set no longer matches the tree shape; treat as a no-op.
            return MoveOutcome::Rejected;
        };
        let ConfigNode::Physical(old_prc) = &leaf.node else {
            unreachable!("resolve_ref only returns leaves")
        };
        let old_prc = *old_prc;
        if old_prc.same_placement(&candidate.prc) {
            return MoveOutcome::AbortDuplicated;
        }
        let rc_mode = rc.mode;
        let leaf_width = leaf.logical_shape.width();
        let old_rc_extra = rc.extra_lut_count();
        let old_rc_blocks = rc.block_count();

        // Tentatively swap the leaf in place.
        self.replace_leaf(ram_id, candidate, candidate.prc);
        let rc = &self.config.rams()[&ram_id];
        let new_rc_extra = rc.extra_lut_count();
        let new_rc_blocks = rc.block_count();

        let new_extra = self.extra_luts - old_rc_extra + new_rc_extra;
        let mut new_blocks = self.block_count.clone();
        new_blocks.sub(&old_rc_blocks);
        new_blocks.merge(&new_rc_blocks);
        let new_area = calculate_fpga_qor(
            self.archs,
            self.logical_circuit.num_logic_blocks(),
            new_extra,
            &new_blocks,
            true,
        )
        .fpga_area;

        let outcome = self.decide(&old_prc, &candidate.prc, leaf_width, rc_mode, new_area, phase);
        if outcome.is_accepted() {
            let uid = self.uids.next_uid();
            let mut accepted_prc = candidate.prc;
            accepted_prc.uid = uid;
            self.replace_leaf(ram_id, candidate, accepted_prc);
            self.extra_luts = new_extra;
            self.block_count = new_blocks;
            self.area = new_area;
            self.leftover = LeftoverRamSupply::compute(self.archs, self.area, &self.block_count);
            if self.area < self.best_area {
                self.best_area = self.area;
                if self.options.enable_save_best {
                    self.best_config = Some(self.config.clone());
                }
            }
        } else {
            self.replace_leaf(ram_id, candidate, old_prc);
        }
        outcome
    }

    fn replace_leaf(&mut self, ram_id: RamId, candidate: &Candidate, prc: PhysicalRamConfig) {
        let rc = self
            .config
            .rams_mut()
            .get_mut(&ram_id)
            .expect("move set keys are RAM ids of this circuit");
        let leaf = candidate
            .locator
            .resolve(&mut rc.root)
            .expect("locator was resolved before the swap");
        leaf.node = ConfigNode::Physical(prc);
    }

    fn decide(
        &mut self,
        old_prc: &PhysicalRamConfig,
        new_prc: &PhysicalRamConfig,
        leaf_width: u64,
        rc_mode: RamMode,
        new_area: u64,
        phase: Phase,
    ) -> MoveOutcome {
        if new_area < self.area {
            return MoveOutcome::AcceptedArea;
        }
        match phase {
            Phase::Greedy => MoveOutcome::Rejected,
            Phase::Anneal { temperature } => {
                if new_area == self.area {
                    // Global tile count is unchanged; prefer the leaf that is
                    // cheaper on its own.
                    let local = |prc: &PhysicalRamConfig| {
                        let luts = extra_luts(prc.fit.num_series(), leaf_width, rc_mode);
                        calculate_ram_area(self.archs, luts, Some(prc))
                    };
                    if local(new_prc) < local(old_prc) {
                        return MoveOutcome::AcceptedLocalArea;
                    }
                    return MoveOutcome::Rejected;
                }
                if temperature <= 0.0 {
                    return MoveOutcome::Rejected;
                }
                let delta = (new_area - self.area) as f64 / self.area as f64;
                let probability = (-delta / temperature).exp();
                if self.rng.gen::<f64>() < probability {
                    MoveOutcome::AcceptedTemperature
                } else {
                    MoveOutcome::Rejected
                }
            }
        }
    }
}

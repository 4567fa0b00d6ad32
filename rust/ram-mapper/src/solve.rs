//! The per-circuit solving pipeline and the circuit-level parallel driver.
//!
//! Each circuit is solved independently: a greedy initial assignment, a
//! simulated-annealing pass over single-leaf swaps, a cliff-splitting
//! transform that opens width-wasteful leaves for per-arm optimization, a
//! second annealing pass with best-tracking, and finally the true-dual-port
//! sharing pass.

mod anneal;
mod cliff;
mod initial;
mod share;

pub use anneal::{anneal_circuit, AnnealOptions, AnnealStats};
pub use cliff::split_width_cliffs;
pub use initial::initial_solve;
pub use share::share_physical_rams;

use crate::{
    candidate, AllCircuitConfig, CircuitConfig, CircuitId, LogicalCircuit, PhysicalRamUid,
    RamArchs, RamId, RamMode, RamShape,
};
use rayon::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error(
        "No legal physical configuration for RAM {ram_id} of circuit {circuit_id} ({shape}, {mode}); \
         the input is inconsistent with the architecture"
    )]
    NoCandidates {
        circuit_id: CircuitId,
        ram_id: RamId,
        shape: RamShape,
        mode: RamMode,
    },
    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Scales the annealing schedule; 1.0 is the production setting.
    pub effort: f64,
    /// Worker threads for the circuit-level fan-out; `None` means one per CPU.
    pub threads: Option<usize>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            effort: 1.0,
            threads: None,
        }
    }
}

/// Monotonic allocator of physical RAM uids, one per circuit solve.
#[derive(Debug, Default)]
pub struct UidAllocator(u64);

impl UidAllocator {
    pub fn next_uid(&mut self) -> PhysicalRamUid {
        let uid = PhysicalRamUid::from(self.0);
        self.0 += 1;
        uid
    }
}

/// Solve one circuit. `num_circuits` separates the level-1 and level-2
/// annealing seed ranges across the whole run.
pub fn solve_single_circuit(
    archs: &RamArchs,
    logical_circuit: &LogicalCircuit,
    num_circuits: u64,
    options: &SolverOptions,
) -> Result<CircuitConfig, SolveError> {
    let circuit_id = logical_circuit.circuit_id();
    let mut uids = UidAllocator::default();

    let mut move_set = candidate::MoveSet::new();
    for (ram_id, lr) in logical_circuit.rams() {
        let candidates = candidate::root_candidates(archs, lr.shape(), lr.mode());
        if candidates.is_empty() {
            return Err(SolveError::NoCandidates {
                circuit_id,
                ram_id: *ram_id,
                shape: lr.shape(),
                mode: lr.mode(),
            });
        }
        move_set.insert(*ram_id, candidates);
    }

    let mut config = initial_solve(archs, logical_circuit, &mut uids)?;

    anneal_circuit(
        archs,
        logical_circuit,
        &mut config,
        &move_set,
        &mut uids,
        &AnnealOptions {
            name: "L1",
            seed: circuit_id.into_inner(),
            effort: options.effort,
            allow_early_exit: true,
            enable_save_best: false,
            quench_fraction: 1.0,
        },
    );

    let split_rams = split_width_cliffs(&mut config, &mut uids);
    if !split_rams.is_empty() {
        let mut move_set = candidate::MoveSet::new();
        for (ram_id, rc) in config.rams() {
            let candidates = candidate::candidates_for_ram_config(archs, rc);
            if candidates.is_empty() {
                return Err(SolveError::NoCandidates {
                    circuit_id,
                    ram_id: *ram_id,
                    shape: rc.root.logical_shape,
                    mode: rc.mode,
                });
            }
            move_set.insert(*ram_id, candidates);
        }
        anneal_circuit(
            archs,
            logical_circuit,
            &mut config,
            &move_set,
            &mut uids,
            &AnnealOptions {
                name: "L2",
                seed: circuit_id.into_inner() + num_circuits,
                effort: 1.0,
                allow_early_exit: true,
                enable_save_best: true,
                quench_fraction: 1.0,
            },
        );
    }

    let shared = share_physical_rams(archs, &mut config);
    tracing::debug!(%circuit_id, shared, "circuit solved");
    Ok(config)
}

/// Solve every circuit on a fan-out/fan-in worker pool and merge the results
/// by circuit id. Workers share only the read-only architecture table.
pub fn solve_all_circuits(
    archs: &RamArchs,
    logical_circuits: &BTreeMap<CircuitId, LogicalCircuit>,
    options: &SolverOptions,
) -> Result<AllCircuitConfig, SolveError> {
    let num_circuits = logical_circuits.len() as u64;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.unwrap_or(0))
        .build()?;
    let configs: Result<Vec<CircuitConfig>, SolveError> = pool.install(|| {
        logical_circuits
            .values()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|lc| solve_single_circuit(archs, lc, num_circuits, options))
            .collect()
    });

    let mut acc = AllCircuitConfig::default();
    for cc in configs? {
        acc.insert_circuit_config(cc);
    }
    Ok(acc)
}

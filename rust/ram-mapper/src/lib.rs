//! Area-driven mapper from logical RAMs onto FPGA physical RAM blocks.
//!
//! A circuit needs a set of *logical RAMs*, each with a shape and a port
//! mode; the FPGA offers *physical RAM blocks* (LUT-RAMs and Block-RAMs of
//! various sizes, described by [`RamArchs`]). For every logical RAM the mapper
//! picks a block type and a tiling (how many blocks in parallel for width,
//! how many in series for depth), and may split the RAM in two or share one
//! true-dual-port block between two single-port RAMs. The objective is the
//! total tile area of the chip, including the soft logic that serial
//! compositions need for write decoding and read multiplexing.
//!
//! ## Mapping a circuit
//!
//! ```rust
//! use ram_mapper::{
//!     solve_all_circuits, CircuitId, LogicalCircuit, LogicalRam, RamArchs, RamId, RamMode,
//!     RamShape, SolverOptions,
//! };
//! use std::collections::BTreeMap;
//!
//! let archs = RamArchs::default_archs();
//!
//! let ram = LogicalRam::new(
//!     CircuitId::from(0),
//!     RamId::from(0),
//!     RamMode::SimpleDualPort,
//!     RamShape::new(12, 45)?,
//! );
//! let mut rams = BTreeMap::new();
//! rams.insert(ram.ram_id(), ram);
//! let circuit = LogicalCircuit::new(CircuitId::from(0), rams, 100);
//! let mut circuits = BTreeMap::new();
//! circuits.insert(circuit.circuit_id(), circuit);
//!
//! let mapping = solve_all_circuits(&archs, &circuits, &SolverOptions::default())?;
//! assert!(mapping.serialize().starts_with("// Num_Circuits 1"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Pipeline
//!
//! Per circuit (see [`solve_single_circuit`]): a greedy initial assignment,
//! simulated annealing over candidate leaf swaps, a cliff-splitting transform
//! that opens width-wasteful leaves for per-arm refinement, a second annealing
//! pass with best-tracking, and the true-dual-port sharing pass. Circuits are
//! independent and solved on a worker pool; a fixed seed makes the whole run
//! reproducible.

pub mod candidate;
pub mod driver;
pub mod extra_lut;
pub mod qor;

mod arch;
mod config;
mod logical_circuit;
mod logical_ram;
mod mode;
mod shape;
mod solve;

pub use arch::*;
pub use config::*;
pub use logical_circuit::*;
pub use logical_ram::*;
pub use mode::*;
pub use shape::*;
pub use solve::*;

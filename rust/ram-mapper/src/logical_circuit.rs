use crate::{
    logical_ram::{self, GroupedLogicalRams, RamFileError},
    CircuitId, LogicalRam, RamId,
};
use anyhow::Context;
use getset::{CopyGetters, Getters};
use std::{
    collections::BTreeMap,
    fs,
    io::{self, BufRead},
    path::Path,
};

/// One circuit of the benchmark set: its logical RAMs and its logic-block
/// usage. Read-only input to the mapper.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct LogicalCircuit {
    #[getset(get_copy = "pub")]
    circuit_id: CircuitId,
    #[getset(get = "pub")]
    rams: BTreeMap<RamId, LogicalRam>,
    #[getset(get_copy = "pub")]
    num_logic_blocks: u64,
}

impl LogicalCircuit {
    pub fn new(
        circuit_id: CircuitId,
        rams: BTreeMap<RamId, LogicalRam>,
        num_logic_blocks: u64,
    ) -> Self {
        Self {
            circuit_id,
            rams,
            num_logic_blocks,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitFileError {
    #[error("{reason} (at line {line_num})")]
    LogicBlockFile {
        line_num: usize,
        reason: LogicBlockErrorReason,
    },
    #[error(transparent)]
    RamFile(#[from] RamFileError),
    #[error("Circuit {circuit_id} has logical RAMs but no logic-block count")]
    MissingLogicBlockCount { circuit_id: CircuitId },
    #[error("Circuit {circuit_id} has a logic-block count but no logical RAMs")]
    MissingRams { circuit_id: CircuitId },
}

#[derive(Debug, thiserror::Error)]
pub enum LogicBlockErrorReason {
    #[error("Expected `circuit num_logic_blocks` row, found: {0:?}")]
    InvalidRow(String),
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("Duplicate circuit id {0}")]
    DuplicateCircuit(CircuitId),
}

/// Parse the logic-block usage list: one header line, then one
/// `circuit num_logic_blocks` row per circuit.
pub fn parse_logic_block_counts(
    lines: impl Iterator<Item = String>,
) -> Result<BTreeMap<CircuitId, u64>, CircuitFileError> {
    let mut counts = BTreeMap::new();
    let mut rows = lines
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());
    // Header line: "Circuit #Logic_blocks".
    rows.next();
    for (line_num, line) in rows {
        let at = |reason| CircuitFileError::LogicBlockFile { line_num, reason };
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [circuit_id, num_logic_blocks] = fields[..] else {
            return Err(at(LogicBlockErrorReason::InvalidRow(line.to_string())));
        };
        let circuit_id = CircuitId::from(
            circuit_id
                .parse::<u64>()
                .map_err(|e| at(LogicBlockErrorReason::ParseInt(e)))?,
        );
        let num_logic_blocks = num_logic_blocks
            .parse::<u64>()
            .map_err(|e| at(LogicBlockErrorReason::ParseInt(e)))?;
        if counts.insert(circuit_id, num_logic_blocks).is_some() {
            return Err(at(LogicBlockErrorReason::DuplicateCircuit(circuit_id)));
        }
    }
    Ok(counts)
}

/// Join grouped logical RAMs with logic-block counts. The two inputs must
/// cover exactly the same circuits.
pub fn join_circuits(
    grouped_rams: GroupedLogicalRams,
    logic_blocks: &BTreeMap<CircuitId, u64>,
) -> Result<BTreeMap<CircuitId, LogicalCircuit>, CircuitFileError> {
    if let Some(circuit_id) = logic_blocks
        .keys()
        .find(|circuit_id| !grouped_rams.contains_key(circuit_id))
    {
        return Err(CircuitFileError::MissingRams {
            circuit_id: *circuit_id,
        });
    }
    grouped_rams
        .into_iter()
        .map(|(circuit_id, rams)| {
            let num_logic_blocks = logic_blocks
                .get(&circuit_id)
                .copied()
                .ok_or(CircuitFileError::MissingLogicBlockCount { circuit_id })?;
            Ok((
                circuit_id,
                LogicalCircuit::new(circuit_id, rams, num_logic_blocks),
            ))
        })
        .collect()
}

/// Read and join `logic_block_count.txt` and `logical_rams.txt`.
pub fn read_logical_circuits(
    logic_block_path: impl AsRef<Path>,
    logical_ram_path: impl AsRef<Path>,
) -> anyhow::Result<BTreeMap<CircuitId, LogicalCircuit>> {
    let logic_block_path = logic_block_path.as_ref();
    tracing::info!("Reading logic-block counts from {}", logic_block_path.display());
    let file = fs::File::open(logic_block_path)
        .with_context(|| format!("Failed to read {}", logic_block_path.display()))?;
    let reader = io::BufReader::new(file);
    let logic_blocks = parse_logic_block_counts(reader.lines().map_while(|line| line.ok()))
        .with_context(|| format!("Malformed logic-block file {}", logic_block_path.display()))?;

    let grouped_rams = logical_ram::read_grouped_logical_rams(logical_ram_path)?;
    let circuits = join_circuits(grouped_rams, &logic_blocks)?;
    Ok(circuits)
}

use crate::{RamMode, RamModeError, RamShape, ShapeError};
use anyhow::Context;
use derive_more::{Deref, From};
use getset::CopyGetters;
use std::{
    collections::BTreeMap,
    fmt, fs,
    io::{self, BufRead},
    path::Path,
};

/// ID of a circuit in the benchmark set.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref)]
pub struct CircuitId(u64);

impl CircuitId {
    pub fn into_inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CircuitId({})", self.0)
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ID of a logical RAM within its circuit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref)]
pub struct RamId(u64);

impl RamId {
    pub fn into_inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RamId({})", self.0)
    }
}

impl fmt::Display for RamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A memory required by a user circuit. Read-only input to the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
pub struct LogicalRam {
    #[getset(get_copy = "pub")]
    circuit_id: CircuitId,
    #[getset(get_copy = "pub")]
    ram_id: RamId,
    #[getset(get_copy = "pub")]
    mode: RamMode,
    #[getset(get_copy = "pub")]
    shape: RamShape,
}

impl LogicalRam {
    pub fn new(circuit_id: CircuitId, ram_id: RamId, mode: RamMode, shape: RamShape) -> Self {
        Self {
            circuit_id,
            ram_id,
            mode,
            shape,
        }
    }
}

/// Logical RAMs grouped by circuit, each group keyed by RAM id.
pub type GroupedLogicalRams = BTreeMap<CircuitId, BTreeMap<RamId, LogicalRam>>;

#[derive(Debug, thiserror::Error)]
#[error("{reason} (at line {line_num})")]
pub struct RamFileError {
    pub line_num: usize,
    pub reason: RamFileErrorReason,
}

#[derive(Debug, thiserror::Error)]
pub enum RamFileErrorReason {
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Expected `Num_Circuits <N>` banner, found: {0:?}")]
    InvalidBanner(String),
    #[error("Expected `circuit ram mode depth width` row, found: {0:?}")]
    InvalidRow(String),
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
    #[error(transparent)]
    Mode(#[from] RamModeError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("Duplicate RAM id {ram_id} in circuit {circuit_id}")]
    DuplicateRam { circuit_id: CircuitId, ram_id: RamId },
    #[error("Banner declares {expected} circuits but rows cover {found}")]
    CircuitCountMismatch { expected: usize, found: usize },
}

impl RamFileErrorReason {
    fn at(self, line_num: usize) -> RamFileError {
        RamFileError {
            line_num,
            reason: self,
        }
    }
}

/// Read a `logical_rams.txt` file.
pub fn read_grouped_logical_rams(path: impl AsRef<Path>) -> anyhow::Result<GroupedLogicalRams> {
    let path = path.as_ref();
    tracing::info!("Reading logical RAMs from {}", path.display());
    let file =
        fs::File::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let reader = io::BufReader::new(file);
    let grouped = parse_grouped_logical_rams(reader.lines().map_while(|line| line.ok()))
        .with_context(|| format!("Malformed logical RAM file {}", path.display()))?;
    Ok(grouped)
}

/// Parse the logical-RAM list: a `Num_Circuits N` banner, one header line,
/// then one row per RAM.
pub fn parse_grouped_logical_rams(
    lines: impl Iterator<Item = String>,
) -> Result<GroupedLogicalRams, RamFileError> {
    let mut lines = lines
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (banner_line_num, banner) = lines
        .next()
        .ok_or(RamFileErrorReason::UnexpectedEof.at(0))?;
    let num_circuits = parse_banner(&banner).map_err(|reason| reason.at(banner_line_num))?;

    // Header line: "Circuit RamID Mode Depth Width".
    lines
        .next()
        .ok_or(RamFileErrorReason::UnexpectedEof.at(banner_line_num))?;

    let mut grouped = GroupedLogicalRams::new();
    for (line_num, line) in lines {
        let ram = parse_row(&line).map_err(|reason| reason.at(line_num))?;
        let circuit = grouped.entry(ram.circuit_id()).or_default();
        if circuit.insert(ram.ram_id(), ram).is_some() {
            return Err(RamFileErrorReason::DuplicateRam {
                circuit_id: ram.circuit_id(),
                ram_id: ram.ram_id(),
            }
            .at(line_num));
        }
    }

    if grouped.len() != num_circuits {
        return Err(RamFileErrorReason::CircuitCountMismatch {
            expected: num_circuits,
            found: grouped.len(),
        }
        .at(banner_line_num));
    }
    Ok(grouped)
}

fn parse_banner(line: &str) -> Result<usize, RamFileErrorReason> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields[..] {
        ["Num_Circuits", count] => Ok(count.parse()?),
        _ => Err(RamFileErrorReason::InvalidBanner(line.to_string())),
    }
}

fn parse_row(line: &str) -> Result<LogicalRam, RamFileErrorReason> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [circuit_id, ram_id, mode, depth, width] = fields[..] else {
        return Err(RamFileErrorReason::InvalidRow(line.to_string()));
    };
    Ok(LogicalRam::new(
        CircuitId::from(circuit_id.parse::<u64>()?),
        RamId::from(ram_id.parse::<u64>()?),
        mode.parse()?,
        RamShape::new(width.parse()?, depth.parse()?)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Num_Circuits 2
Circuit\tRamID\tMode\t\tDepth\tWidth
0\t0\tSimpleDualPort\t45\t12
0\t1\tROM\t\t256\t8

1\t0\tTrueDualPort\t1024\t32
";

    #[test]
    fn parse_sample() {
        let grouped =
            parse_grouped_logical_rams(SAMPLE.lines().map(|s| s.to_string())).unwrap();
        assert_eq!(grouped.len(), 2);
        let c0 = &grouped[&CircuitId::from(0)];
        assert_eq!(c0.len(), 2);
        let ram = &c0[&RamId::from(0)];
        assert_eq!(ram.mode(), RamMode::SimpleDualPort);
        assert_eq!(ram.shape(), RamShape::new(12, 45).unwrap());
        let c1 = &grouped[&CircuitId::from(1)];
        assert_eq!(c1[&RamId::from(0)].mode(), RamMode::TrueDualPort);
    }

    #[test]
    fn banner_mismatch_is_fatal() {
        let text = SAMPLE.replace("Num_Circuits 2", "Num_Circuits 3");
        let err = parse_grouped_logical_rams(text.lines().map(|s| s.to_string())).unwrap_err();
        assert!(matches!(
            err.reason,
            RamFileErrorReason::CircuitCountMismatch {
                expected: 3,
                found: 2
            }
        ));
        assert_eq!(err.line_num, 1);
    }

    #[test]
    fn bad_row_names_line() {
        let text = SAMPLE.replace("0\t1\tROM\t\t256\t8", "0\t1\tROM\t\t256");
        let err = parse_grouped_logical_rams(text.lines().map(|s| s.to_string())).unwrap_err();
        assert_eq!(err.line_num, 4);
        assert!(matches!(err.reason, RamFileErrorReason::InvalidRow(_)));
    }

    #[test]
    fn unknown_mode_is_fatal() {
        let text = SAMPLE.replace("TrueDualPort", "QuadPort");
        let err = parse_grouped_logical_rams(text.lines().map(|s| s.to_string())).unwrap_err();
        assert!(matches!(err.reason, RamFileErrorReason::Mode(_)));
    }
}

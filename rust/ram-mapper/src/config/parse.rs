//! Parser for the mapping text format, the inverse of
//! [`AllCircuitConfig::serialize`]. Used by round-trip checks and external
//! tooling that re-reads a produced mapping.

use super::{
    AllCircuitConfig, CircuitConfig, ConfigError, LogicalRamConfig, PhysicalRamConfig, RamConfig,
    SplitDimension,
};
use crate::{
    CircuitId, PhysicalRamUid, RamArchId, RamId, RamMode, RamModeError, RamShape, RamShapeFit,
    ShapeError,
};

#[derive(Debug, thiserror::Error)]
#[error("{reason} (at line {line_num})")]
pub struct MappingParseError {
    pub line_num: usize,
    pub reason: MappingParseReason,
}

#[derive(Debug, thiserror::Error)]
pub enum MappingParseReason {
    #[error("Expected `// Num_Circuits <N>` banner, found: {0:?}")]
    InvalidBanner(String),
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Expected token {expected:?}, found {found:?}")]
    ExpectedToken {
        expected: &'static str,
        found: String,
    },
    #[error("Expected a physical config or a split dimension, found {0:?}")]
    ExpectedNode(String),
    #[error("Trailing tokens after a complete node: {0:?}")]
    TrailingTokens(String),
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
    #[error(transparent)]
    Mode(#[from] RamModeError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("Banner declares {expected} circuits but the body holds {found}")]
    CircuitCountMismatch { expected: usize, found: usize },
    #[error("Declared extra-LUT count {declared} does not match computed {computed}")]
    ExtraLutMismatch { declared: u64, computed: u64 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MappingParseReason {
    fn at(self, line_num: usize) -> MappingParseError {
        MappingParseError {
            line_num,
            reason: self,
        }
    }
}

struct Cursor<'a> {
    /// `(line number, non-blank line)` pairs, in order.
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line))
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();
        Cursor { lines, pos: 0 }
    }

    fn next(&mut self) -> Result<(usize, &'a str), MappingParseError> {
        let last_line = self.lines.last().map(|(n, _)| *n).unwrap_or(0);
        let item = self
            .lines
            .get(self.pos)
            .copied()
            .ok_or(MappingParseReason::UnexpectedEof.at(last_line))?;
        self.pos += 1;
        Ok(item)
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.lines.len()
    }
}

struct Tokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
    line_num: usize,
}

impl<'a> Tokens<'a> {
    fn next(&mut self) -> Result<&'a str, MappingParseError> {
        self.iter
            .next()
            .ok_or(MappingParseReason::UnexpectedEof.at(self.line_num))
    }

    fn expect(&mut self, expected: &'static str) -> Result<(), MappingParseError> {
        let found = self.next()?;
        if found != expected {
            return Err(MappingParseReason::ExpectedToken {
                expected,
                found: found.to_string(),
            }
            .at(self.line_num));
        }
        Ok(())
    }

    fn int(&mut self) -> Result<u64, MappingParseError> {
        let token = self.next()?;
        token
            .parse()
            .map_err(|e| MappingParseReason::ParseInt(e).at(self.line_num))
    }

    fn keyed_int(&mut self, key: &'static str) -> Result<u64, MappingParseError> {
        self.expect(key)?;
        self.int()
    }

    fn finish(mut self) -> Result<(), MappingParseError> {
        let rest: Vec<&str> = self.iter.by_ref().collect();
        if !rest.is_empty() {
            return Err(MappingParseReason::TrailingTokens(rest.join(" ")).at(self.line_num));
        }
        Ok(())
    }
}

impl AllCircuitConfig {
    /// Parse a whole mapping file, the inverse of [`AllCircuitConfig::serialize`].
    pub fn parse(text: &str) -> Result<Self, MappingParseError> {
        parse_all_circuit_config(text)
    }
}

/// Parse a whole mapping file.
pub fn parse_all_circuit_config(text: &str) -> Result<AllCircuitConfig, MappingParseError> {
    let mut cursor = Cursor::new(text);

    let (banner_line_num, banner) = cursor.next()?;
    let declared_circuits = parse_banner(banner).ok_or_else(|| {
        MappingParseReason::InvalidBanner(banner.to_string()).at(banner_line_num)
    })?;

    let mut acc = AllCircuitConfig::default();
    while !cursor.is_empty() {
        let (line_num, _) = cursor.lines[cursor.pos];
        let rc = parse_ram_config(&mut cursor)?;
        let circuit_id = rc.circuit_id;
        if !acc.circuits.contains_key(&circuit_id) {
            acc.insert_circuit_config(CircuitConfig::new(circuit_id));
        }
        acc.circuits
            .get_mut(&circuit_id)
            .expect("just inserted")
            .insert_ram_config(rc)
            .map_err(|e| MappingParseReason::Config(e).at(line_num))?;
    }

    if acc.circuits().len() != declared_circuits {
        return Err(MappingParseReason::CircuitCountMismatch {
            expected: declared_circuits,
            found: acc.circuits().len(),
        }
        .at(banner_line_num));
    }
    Ok(acc)
}

fn parse_banner(line: &str) -> Option<usize> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields[..] {
        ["//", "Num_Circuits", count] => count.parse().ok(),
        _ => None,
    }
}

fn parse_ram_config(cursor: &mut Cursor) -> Result<RamConfig, MappingParseError> {
    let (line_num, line) = cursor.next()?;
    let mut tokens = Tokens {
        iter: line.split_whitespace(),
        line_num,
    };
    let circuit_id = CircuitId::from(tokens.int()?);
    let ram_id = RamId::from(tokens.int()?);
    let declared_extra_luts = tokens.int()?;
    let root = parse_lrc(tokens, cursor)?;

    // The logical mode is not serialized, and a shared leaf reports
    // TrueDualPort even when its RAM is single-port. Recover the mode that
    // explains the extra-LUT column, trying the first leaf's mode first so
    // unshared mappings keep their exact mode.
    let first = root.first_leaf_mode();
    let mode = std::iter::once(first)
        .chain(RamMode::ALL)
        .find(|mode| root.extra_lut_count(*mode) == declared_extra_luts)
        .ok_or_else(|| {
            MappingParseReason::ExtraLutMismatch {
                declared: declared_extra_luts,
                computed: root.extra_lut_count(first),
            }
            .at(line_num)
        })?;
    let rc = RamConfig {
        circuit_id,
        ram_id,
        mode,
        root,
    };
    rc.verify()
        .map_err(|e| MappingParseReason::Config(e).at(line_num))?;
    Ok(rc)
}

/// Parse one `LW w LD d (prc | split)` node whose tokens start on the current
/// line; split arms continue on the following lines.
fn parse_lrc(mut tokens: Tokens, cursor: &mut Cursor) -> Result<LogicalRamConfig, MappingParseError> {
    let width = tokens.keyed_int("LW")?;
    let depth = tokens.keyed_int("LD")?;
    let logical_shape =
        RamShape::new(width, depth).map_err(|e| MappingParseReason::Shape(e).at(tokens.line_num))?;

    let node = tokens.next()?;
    match node {
        "ID" => {
            let uid = PhysicalRamUid::from(tokens.int()?);
            let num_series = tokens.keyed_int("S")?;
            let num_parallel = tokens.keyed_int("P")?;
            let ram_arch_id = RamArchId::from(tokens.keyed_int("Type")?);
            tokens.expect("Mode")?;
            let mode = tokens
                .next()?
                .parse()
                .map_err(|e| MappingParseReason::Mode(e).at(tokens.line_num))?;
            let w = tokens.keyed_int("W")?;
            let d = tokens.keyed_int("D")?;
            let physical_shape = RamShape::new(w, d)
                .map_err(|e| MappingParseReason::Shape(e).at(tokens.line_num))?;
            tokens.finish()?;
            Ok(LogicalRamConfig::leaf(
                logical_shape,
                PhysicalRamConfig {
                    uid,
                    fit: RamShapeFit::new(num_series, num_parallel),
                    ram_arch_id,
                    mode,
                    physical_shape,
                },
            ))
        }
        "series" | "parallel" => {
            let split = if node == "series" {
                SplitDimension::Series
            } else {
                SplitDimension::Parallel
            };
            tokens.finish()?;
            let left = parse_child(cursor)?;
            let right = parse_child(cursor)?;
            Ok(LogicalRamConfig::split(logical_shape, split, left, right))
        }
        other => Err(MappingParseReason::ExpectedNode(other.to_string()).at(tokens.line_num)),
    }
}

fn parse_child(cursor: &mut Cursor) -> Result<LogicalRamConfig, MappingParseError> {
    let (line_num, line) = cursor.next()?;
    let tokens = Tokens {
        iter: line.split_whitespace(),
        line_num,
    };
    parse_lrc(tokens, cursor)
}

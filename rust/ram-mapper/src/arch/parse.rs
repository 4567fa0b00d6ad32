use super::{RamArch, RamArchId, RamArchs};
use crate::ShapeError;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum ArchParseError {
    #[error("Empty architecture descriptor")]
    Empty,
    #[error("Unknown architecture group: {0}")]
    UnknownGroup(String),
    #[error("Group {group} expects {expected} integer parameters")]
    MissingParameters {
        group: &'static str,
        expected: usize,
    },
    #[error("Invalid integer in architecture descriptor: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("Ratio components must be positive: {a}:{b}")]
    ZeroRatio { a: u64, b: u64 },
}

fn check_ratio(a: u64, b: u64) -> Result<(u64, u64), ArchParseError> {
    if a == 0 || b == 0 {
        return Err(ArchParseError::ZeroRatio { a, b });
    }
    Ok((a, b))
}

fn take_ints<'a, const N: usize>(
    tokens: &mut impl Iterator<Item = &'a str>,
    group: &'static str,
) -> Result<[u64; N], ArchParseError> {
    let mut out = [0u64; N];
    for slot in &mut out {
        let token = tokens.next().ok_or(ArchParseError::MissingParameters {
            group,
            expected: N,
        })?;
        *slot = token.parse()?;
    }
    Ok(out)
}

pub(super) fn parse_descriptor(descriptor: &str) -> Result<RamArchs, ArchParseError> {
    let mut tokens = descriptor.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return Err(ArchParseError::Empty);
    }

    let mut ram_archs = BTreeMap::new();
    let mut next_id = 1u64;
    while let Some(group) = tokens.next() {
        let id = RamArchId::from(next_id);
        let arch = match group {
            "-l" => {
                let [a, b]: [u64; 2] = take_ints(&mut tokens, "-l")?;
                RamArch::lutram(id, check_ratio(a, b)?)
            }
            "-b" => {
                let [size, max_width, a, b]: [u64; 4] = take_ints(&mut tokens, "-b")?;
                RamArch::block_ram(
                    id,
                    crate::RamShape::from_size(size, max_width)?,
                    check_ratio(a, b)?,
                )
            }
            other => return Err(ArchParseError::UnknownGroup(other.to_string())),
        };
        ram_archs.insert(id, arch);
        next_id += 1;
    }
    Ok(RamArchs::new(ram_archs))
}

use proptest::prelude::*;
use std::{fmt, ops::BitOr, str::FromStr};

#[derive(Debug, thiserror::Error)]
#[error("Unknown RAM mode: {0}")]
pub struct RamModeError(String);

/// Port mode of a RAM.
///
/// The four atoms are disjoint; a physical architecture advertises the set of
/// atoms it supports via [`RamModeSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RamMode {
    /// One read port.
    Rom,
    /// One shared read/write port.
    SinglePort,
    /// One read port plus one write port.
    SimpleDualPort,
    /// Two independent read/write ports.
    TrueDualPort,
}

impl RamMode {
    pub const ALL: [RamMode; 4] = [
        RamMode::Rom,
        RamMode::SinglePort,
        RamMode::SimpleDualPort,
        RamMode::TrueDualPort,
    ];

    pub fn num_ports(&self) -> u64 {
        match self {
            RamMode::Rom | RamMode::SinglePort => 1,
            RamMode::SimpleDualPort | RamMode::TrueDualPort => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RamMode::Rom => "ROM",
            RamMode::SinglePort => "SinglePort",
            RamMode::SimpleDualPort => "SimpleDualPort",
            RamMode::TrueDualPort => "TrueDualPort",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            RamMode::Rom => 1 << 0,
            RamMode::SinglePort => 1 << 1,
            RamMode::SimpleDualPort => 1 << 2,
            RamMode::TrueDualPort => 1 << 3,
        }
    }
}

impl fmt::Display for RamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RamMode {
    type Err = RamModeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROM" => Ok(RamMode::Rom),
            "SinglePort" => Ok(RamMode::SinglePort),
            "SimpleDualPort" => Ok(RamMode::SimpleDualPort),
            "TrueDualPort" => Ok(RamMode::TrueDualPort),
            _ => Err(RamModeError(s.to_string())),
        }
    }
}

impl Arbitrary for RamMode {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;
    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(RamMode::Rom),
            Just(RamMode::SinglePort),
            Just(RamMode::SimpleDualPort),
            Just(RamMode::TrueDualPort),
        ]
        .boxed()
    }
}

/// Set of [`RamMode`] atoms.
///
/// ```rust
/// use ram_mapper::{RamMode, RamModeSet};
///
/// let set = RamModeSet::from(RamMode::Rom) | RamMode::SinglePort;
/// assert!(set.contains(RamMode::Rom));
/// assert!(!set.contains(RamMode::TrueDualPort));
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RamModeSet(u8);

impl RamModeSet {
    pub const EMPTY: RamModeSet = RamModeSet(0);

    pub fn contains(&self, mode: RamMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = RamMode> + '_ {
        RamMode::ALL.into_iter().filter(|mode| self.contains(*mode))
    }
}

impl From<RamMode> for RamModeSet {
    fn from(mode: RamMode) -> Self {
        RamModeSet(mode.bit())
    }
}

impl BitOr for RamModeSet {
    type Output = RamModeSet;
    fn bitor(self, rhs: Self) -> Self::Output {
        RamModeSet(self.0 | rhs.0)
    }
}

impl BitOr<RamMode> for RamModeSet {
    type Output = RamModeSet;
    fn bitor(self, rhs: RamMode) -> Self::Output {
        RamModeSet(self.0 | rhs.bit())
    }
}

impl fmt::Debug for RamModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RamModeSet({self})")
    }
}

impl fmt::Display for RamModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for mode in self.iter() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{mode}")?;
            first = false;
        }
        if first {
            write!(f, "(none)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_roundtrip() {
        for mode in RamMode::ALL {
            assert_eq!(mode.as_str().parse::<RamMode>().unwrap(), mode);
        }
        assert!("DualPort".parse::<RamMode>().is_err());
    }

    #[test]
    fn num_ports() {
        assert_eq!(RamMode::Rom.num_ports(), 1);
        assert_eq!(RamMode::SinglePort.num_ports(), 1);
        assert_eq!(RamMode::SimpleDualPort.num_ports(), 2);
        assert_eq!(RamMode::TrueDualPort.num_ports(), 2);
    }

    #[test]
    fn set_composition() {
        let set = RamModeSet::from(RamMode::Rom) | RamMode::SinglePort | RamMode::SimpleDualPort;
        assert!(set.contains(RamMode::SimpleDualPort));
        assert!(!set.contains(RamMode::TrueDualPort));
        assert_eq!(set.iter().count(), 3);
        assert_eq!(set.to_string(), "ROM|SinglePort|SimpleDualPort");
    }
}

use getset::CopyGetters;
use proptest::prelude::*;
use std::{cmp::Ordering, fmt};

/// Candidate fits with more than this many serial blocks are illegal.
pub const MAX_NUM_SERIES: u64 = 16;

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("RAM shape dimensions must be positive: W{width}xD{depth}")]
    ZeroDimension { width: u64, depth: u64 },
    #[error("Size {size} is not divisible by width {width}")]
    IndivisibleSize { size: u64, width: u64 },
}

/// Width and depth of a RAM, logical or physical.
///
/// Invariants
/// ----------
/// - `width` and `depth` are positive.
///
/// Ordering is lexicographic on `(size, width, depth)` so that shapes of equal
/// capacity tie-break on aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, CopyGetters)]
pub struct RamShape {
    #[getset(get_copy = "pub")]
    width: u64,
    #[getset(get_copy = "pub")]
    depth: u64,
}

impl RamShape {
    pub fn new(width: u64, depth: u64) -> Result<Self, ShapeError> {
        if width == 0 || depth == 0 {
            return Err(ShapeError::ZeroDimension { width, depth });
        }
        Ok(Self { width, depth })
    }

    /// Layout of a `size`-bit RAM at the given word width.
    pub fn from_size(size: u64, width: u64) -> Result<Self, ShapeError> {
        if width == 0 || size % width != 0 {
            return Err(ShapeError::IndivisibleSize { size, width });
        }
        Self::new(width, size / width)
    }

    pub fn size(&self) -> u64 {
        self.width * self.depth
    }

    /// How many copies of `smaller` tile this shape, in series (deeper) and in
    /// parallel (wider).
    pub fn fit(&self, smaller: &RamShape) -> RamShapeFit {
        RamShapeFit {
            num_series: self.depth.div_ceil(smaller.depth),
            num_parallel: self.width.div_ceil(smaller.width),
        }
    }
}

impl fmt::Display for RamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}xD{}={}", self.width, self.depth, self.size())
    }
}

impl Ord for RamShape {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.size(), self.width, self.depth).cmp(&(other.size(), other.width, other.depth))
    }
}

impl PartialOrd for RamShape {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Arbitrary for RamShape {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;
    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (1u64..=144, 1u64..=8192)
            .prop_map(|(width, depth)| RamShape { width, depth })
            .boxed()
    }
}

/// Tiling of a logical shape by copies of a smaller physical shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, CopyGetters)]
pub struct RamShapeFit {
    #[getset(get_copy = "pub")]
    num_series: u64,
    #[getset(get_copy = "pub")]
    num_parallel: u64,
}

impl RamShapeFit {
    pub fn new(num_series: u64, num_parallel: u64) -> Self {
        Self {
            num_series,
            num_parallel,
        }
    }

    /// Total number of physical blocks in the tiling.
    pub fn count(&self) -> u64 {
        self.num_series * self.num_parallel
    }

    pub fn is_legal(&self) -> bool {
        self.num_series <= MAX_NUM_SERIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_size() {
        let shape = RamShape::from_size(8192, 32).unwrap();
        assert_eq!(shape.width(), 32);
        assert_eq!(shape.depth(), 256);
        assert!(RamShape::from_size(8192, 3).is_err());
        assert!(RamShape::new(0, 4).is_err());
    }

    #[test]
    fn fit_rounds_up() {
        let logical = RamShape::new(12, 45).unwrap();
        let physical = RamShape::new(10, 64).unwrap();
        let fit = logical.fit(&physical);
        assert_eq!(fit.num_series(), 1);
        assert_eq!(fit.num_parallel(), 2);
        assert_eq!(fit.count(), 2);

        let physical = RamShape::new(20, 32).unwrap();
        let fit = logical.fit(&physical);
        assert_eq!(fit.num_series(), 2);
        assert_eq!(fit.num_parallel(), 1);
    }

    #[test]
    fn ordering_is_size_major() {
        let a = RamShape::new(4, 8).unwrap(); // 32 bits
        let b = RamShape::new(8, 8).unwrap(); // 64 bits
        let c = RamShape::new(2, 32).unwrap(); // 64 bits, narrower
        assert!(a < b);
        assert!(c < b);
        assert!(a < c);
    }

    proptest! {
        #[test]
        fn fit_covers_shape(logical: RamShape, physical: RamShape) {
            let fit = logical.fit(&physical);
            prop_assert!(fit.num_parallel() * physical.width() >= logical.width());
            prop_assert!(fit.num_series() * physical.depth() >= logical.depth());
        }
    }
}

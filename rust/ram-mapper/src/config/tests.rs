use super::*;
use crate::RamShapeFit;

fn shape(width: u64, depth: u64) -> RamShape {
    RamShape::new(width, depth).unwrap()
}

fn prc(
    uid: u64,
    num_series: u64,
    num_parallel: u64,
    arch: u64,
    mode: RamMode,
    width: u64,
    depth: u64,
) -> PhysicalRamConfig {
    PhysicalRamConfig {
        uid: PhysicalRamUid::from(uid),
        fit: RamShapeFit::new(num_series, num_parallel),
        ram_arch_id: RamArchId::from(arch),
        mode,
        physical_shape: shape(width, depth),
    }
}

fn simple_ram_config() -> RamConfig {
    RamConfig {
        circuit_id: CircuitId::from(1),
        ram_id: RamId::from(2),
        mode: RamMode::SimpleDualPort,
        root: LogicalRamConfig::leaf(
            shape(12, 45),
            prc(0, 1, 2, 1, RamMode::SimpleDualPort, 10, 64),
        ),
    }
}

fn two_level_ram_config() -> RamConfig {
    let lower = LogicalRamConfig::leaf(
        shape(30, 1024),
        prc(0, 1, 4, 2, RamMode::SinglePort, 8, 1024),
    );
    let upper = LogicalRamConfig::leaf(shape(30, 1), prc(1, 1, 2, 1, RamMode::SinglePort, 20, 32));
    RamConfig {
        circuit_id: CircuitId::from(3),
        ram_id: RamId::from(7),
        mode: RamMode::SinglePort,
        root: LogicalRamConfig::split(shape(30, 1025), SplitDimension::Series, lower, upper),
    }
}

#[test]
fn simple_serialize() {
    let rc = simple_ram_config();
    assert_eq!(
        rc.serialize(0),
        "1 2 0 LW 12 LD 45 ID 0 S 1 P 2 Type 1 Mode SimpleDualPort W 10 D 64"
    );
    rc.verify().unwrap();
}

#[test]
fn two_level_serialize() {
    let rc = two_level_ram_config();
    let expected = "3 7 31 LW 30 LD 1025 series\n    \
                    LW 30 LD 1024 ID 0 S 1 P 4 Type 2 Mode SinglePort W 8 D 1024\n    \
                    LW 30 LD 1 ID 1 S 1 P 2 Type 1 Mode SinglePort W 20 D 32";
    assert_eq!(rc.serialize(0), expected);
    rc.verify().unwrap();
}

#[test]
fn series_split_pays_a_depth_two_stitch() {
    let rc = two_level_ram_config();
    // Both arms are single-deep; the series node itself costs a 2:1 stage.
    assert_eq!(rc.extra_lut_count(), 31);
}

#[test]
fn two_level_block_count() {
    let rc = two_level_ram_config();
    let count = rc.block_count();
    assert_eq!(count.get(RamArchId::from(1)), 2);
    assert_eq!(count.get(RamArchId::from(2)), 4);
    assert_eq!(count.total(), 6);
}

#[test]
fn parallel_split_shares_the_write_decoder() {
    let mode = RamMode::SinglePort;
    let left = LogicalRamConfig::leaf(shape(20, 900), prc(0, 4, 1, 2, mode, 32, 256));
    let right = LogicalRamConfig::leaf(shape(10, 900), prc(1, 4, 1, 2, mode, 16, 512));
    let root = LogicalRamConfig::split(shape(30, 900), SplitDimension::Parallel, left, right);
    // Arms: (20 + 4) + (10 + 4); one write decoder is shared back.
    assert_eq!(root.extra_lut_count(mode), 24 + 14 - 4);

    // A deeper arm suppresses the credit.
    let leaf = LogicalRamConfig::leaf(shape(20, 900), prc(2, 4, 1, 2, mode, 32, 256));
    let nested = LogicalRamConfig::split(
        shape(10, 900),
        SplitDimension::Parallel,
        LogicalRamConfig::leaf(shape(5, 900), prc(3, 4, 1, 2, mode, 16, 512)),
        LogicalRamConfig::leaf(shape(5, 900), prc(4, 4, 1, 2, mode, 16, 512)),
    );
    let root = LogicalRamConfig::split(shape(30, 900), SplitDimension::Parallel, leaf, nested);
    let nested_count = (5 + 4) + (5 + 4) - 4;
    assert_eq!(root.extra_lut_count(mode), (20 + 4) + nested_count);
}

#[test]
fn unequal_series_suppresses_the_credit() {
    let mode = RamMode::SinglePort;
    let left = LogicalRamConfig::leaf(shape(20, 900), prc(0, 4, 1, 2, mode, 32, 256));
    let right = LogicalRamConfig::leaf(shape(10, 1024), prc(1, 2, 1, 2, mode, 16, 512));
    let root = LogicalRamConfig::split(shape(30, 900), SplitDimension::Parallel, left, right);
    assert_eq!(root.extra_lut_count(mode), (20 + 4) + (10 + 1));
}

#[test]
fn visit_leaves_is_left_to_right() {
    let rc = two_level_ram_config();
    let mut uids = Vec::new();
    rc.root.visit_leaves(&mut |lrc| {
        if let ConfigNode::Physical(prc) = &lrc.node {
            uids.push(prc.uid.into_inner());
        }
    });
    assert_eq!(uids, vec![0, 1]);
}

#[test]
fn unique_block_count_collapses_aliases() {
    let mut cc = CircuitConfig::new(CircuitId::from(0));
    let shared = prc(5, 1, 1, 2, RamMode::TrueDualPort, 16, 512);
    for ram_id in [0u64, 1] {
        cc.insert_ram_config(RamConfig {
            circuit_id: CircuitId::from(0),
            ram_id: RamId::from(ram_id),
            mode: RamMode::SinglePort,
            root: LogicalRamConfig::leaf(shape(16, 200), shared),
        })
        .unwrap();
    }
    assert_eq!(cc.block_count().get(RamArchId::from(2)), 2);
    assert_eq!(cc.unique_block_count().get(RamArchId::from(2)), 1);
}

#[test]
fn verify_rejects_uncovered_shape() {
    let rc = RamConfig {
        circuit_id: CircuitId::from(0),
        ram_id: RamId::from(0),
        mode: RamMode::Rom,
        root: LogicalRamConfig::leaf(shape(40, 45), prc(0, 1, 1, 1, RamMode::Rom, 20, 64)),
    };
    assert!(matches!(
        rc.verify(),
        Err(ConfigError::ShapeNotCovered { .. })
    ));
}

#[test]
fn verify_rejects_series_overflow() {
    let rc = RamConfig {
        circuit_id: CircuitId::from(0),
        ram_id: RamId::from(0),
        mode: RamMode::Rom,
        root: LogicalRamConfig::leaf(shape(8, 20000), prc(0, 20, 1, 2, RamMode::Rom, 8, 1024)),
    };
    assert!(matches!(
        rc.verify(),
        Err(ConfigError::SeriesLimitExceeded { num_series: 20 })
    ));
}

#[test]
fn verify_rejects_mismatched_parallel_arms() {
    let mode = RamMode::SinglePort;
    let left = LogicalRamConfig::leaf(shape(20, 900), prc(0, 4, 1, 2, mode, 32, 256));
    let right = LogicalRamConfig::leaf(shape(10, 800), prc(1, 4, 1, 2, mode, 16, 512));
    let rc = RamConfig {
        circuit_id: CircuitId::from(0),
        ram_id: RamId::from(0),
        mode,
        root: LogicalRamConfig::split(shape(30, 900), SplitDimension::Parallel, left, right),
    };
    assert!(matches!(
        rc.verify(),
        Err(ConfigError::ParallelDepthMismatch { .. })
    ));
}

#[test]
fn verify_rejects_unassigned_uid() {
    let mut leaf = prc(0, 1, 2, 1, RamMode::SimpleDualPort, 10, 64);
    leaf.uid = PhysicalRamUid::UNASSIGNED;
    let rc = RamConfig {
        circuit_id: CircuitId::from(1),
        ram_id: RamId::from(2),
        mode: RamMode::SimpleDualPort,
        root: LogicalRamConfig::leaf(shape(12, 45), leaf),
    };
    assert!(matches!(rc.verify(), Err(ConfigError::UnassignedUid)));
}

#[test]
fn serialize_parse_roundtrip() {
    let mut acc = AllCircuitConfig::default();
    let mut c1 = CircuitConfig::new(CircuitId::from(1));
    c1.insert_ram_config(simple_ram_config()).unwrap();
    acc.insert_circuit_config(c1);
    let mut c3 = CircuitConfig::new(CircuitId::from(3));
    c3.insert_ram_config(two_level_ram_config()).unwrap();
    acc.insert_circuit_config(c3);

    let text = acc.serialize();
    let parsed = AllCircuitConfig::parse(&text).unwrap();
    assert_eq!(parsed, acc);
    assert_eq!(parsed.serialize(), text);
}

#[test]
fn parse_rejects_wrong_extra_luts() {
    let text = "// Num_Circuits 1\n\
                1 2 5 LW 12 LD 45 ID 0 S 1 P 2 Type 1 Mode SimpleDualPort W 10 D 64\n";
    let err = AllCircuitConfig::parse(text).unwrap_err();
    assert!(matches!(
        err.reason,
        MappingParseReason::ExtraLutMismatch {
            declared: 5,
            computed: 0
        }
    ));
}

#[test]
fn parse_rejects_bad_banner() {
    let err = AllCircuitConfig::parse("Num_Circuits 1\n").unwrap_err();
    assert!(matches!(err.reason, MappingParseReason::InvalidBanner(_)));
}

#[test]
fn parse_rejects_count_mismatch() {
    let text = "// Num_Circuits 2\n\
                1 2 0 LW 12 LD 45 ID 0 S 1 P 2 Type 1 Mode SimpleDualPort W 10 D 64\n";
    let err = AllCircuitConfig::parse(text).unwrap_err();
    assert!(matches!(
        err.reason,
        MappingParseReason::CircuitCountMismatch {
            expected: 2,
            found: 1
        }
    ));
}

#[test]
fn block_count_equality_ignores_trailing_zeros() {
    let mut a = RamBlockCount::default();
    a.add(RamArchId::from(2), 8);
    let mut b = RamBlockCount::default();
    b.add(RamArchId::from(2), 8);
    b.add(RamArchId::from(3), 0);
    assert_eq!(a, b);
    b.add(RamArchId::from(3), 2);
    assert_ne!(a, b);
}

use super::*;
use crate::RamMode;

fn shape(width: u64, depth: u64) -> RamShape {
    RamShape::new(width, depth).unwrap()
}

#[test]
fn default_table() {
    let archs = RamArchs::default_archs();
    assert_eq!(archs.len(), 3);

    let lutram = archs.arch(RamArchId::from(1));
    assert!(lutram.is_lutram());
    assert_eq!(lutram.max_shape(), shape(20, 32));
    assert_eq!(lutram.shapes_for(RamMode::SinglePort), &[shape(20, 32), shape(10, 64)]);
    assert_eq!(lutram.lb_to_block_ratio(), (2, 1));
    assert_eq!(lutram.area(), 40_000);
    assert!(!lutram.supported_modes().contains(RamMode::TrueDualPort));

    let m8k = archs.arch(RamArchId::from(2));
    assert_eq!(m8k.size(), 8192);
    assert_eq!(m8k.max_shape(), shape(32, 256));
    assert_eq!(m8k.lb_to_block_ratio(), (10, 1));
    assert_eq!(m8k.area(), 96_506);

    let m128k = archs.arch(RamArchId::from(3));
    assert_eq!(m128k.size(), 131_072);
    assert_eq!(m128k.max_shape(), shape(128, 1024));
    assert_eq!(m128k.lb_to_block_ratio(), (300, 1));
    assert_eq!(m128k.area(), 850_543);
}

#[test]
fn block_ram_widths_descend() {
    let archs = RamArchs::default_archs();
    let m8k = archs.arch(RamArchId::from(2));
    let widths: Vec<u64> = m8k
        .shapes_for(RamMode::SinglePort)
        .iter()
        .map(|s| s.width())
        .collect();
    assert_eq!(widths, vec![32, 16, 8, 4, 2, 1]);
    for s in m8k.shapes_for(RamMode::SinglePort) {
        assert_eq!(s.size(), 8192);
    }
}

#[test]
fn true_dual_port_drops_widest_layout() {
    let archs = RamArchs::default_archs();
    for id in [2u64, 3] {
        let arch = archs.arch(RamArchId::from(id));
        let widest = arch.shapes_for(RamMode::SinglePort)[0];
        let tdp_widths: Vec<u64> = arch
            .shapes_for(RamMode::TrueDualPort)
            .iter()
            .map(|s| s.width())
            .collect();
        assert!(!tdp_widths.contains(&widest.width()));
        assert_eq!(tdp_widths[0], widest.width() / 2);
    }
}

#[test]
fn supply_rounding() {
    let archs = RamArchs::default_archs();
    // RAM supply rounds down, logic-block supply rounds up.
    let m8k = archs.arch(RamArchId::from(2));
    assert_eq!(m8k.block_count(9), 0);
    assert_eq!(m8k.block_count(10), 1);
    assert_eq!(m8k.block_count(32), 3);

    let lb = archs.lb_arch();
    assert_eq!(lb.lb_to_block_ratio(), (2, 1));
    assert_eq!(lb.block_count(32), 16);
    assert_eq!(lb.block_count(33), 17);
    assert_eq!(lb.block_count_from_luts(33), 4);
    assert_eq!(lb.block_count_from_luts(0), 0);
}

#[test]
fn lutram_partitions_against_regular_lb() {
    // -l 3 1: one of every four logic blocks is a LUTRAM slice.
    let archs = RamArchs::from_descriptor("-l 3 1").unwrap();
    let lutram = archs.arch(RamArchId::from(1));
    assert_eq!(lutram.lb_to_block_ratio(), (4, 1));
    assert_eq!(archs.lb_arch().lb_to_block_ratio(), (4, 3));
}

#[test]
fn no_lutram_architecture() {
    let archs = RamArchs::from_descriptor("-b 8192 32 10 1").unwrap();
    assert_eq!(archs.len(), 1);
    assert_eq!(archs.lb_arch().lb_to_block_ratio(), (1, 1));
}

#[test]
fn descriptor_regeneration() {
    for descriptor in [
        DEFAULT_ARCH_DESCRIPTOR,
        "-b 8192 32 10 1",
        "-b 16384 64 25 2 -l 2 1",
    ] {
        let archs = RamArchs::from_descriptor(descriptor).unwrap();
        let regenerated = archs.descriptor();
        assert_eq!(
            regenerated.split_whitespace().collect::<Vec<_>>(),
            descriptor.split_whitespace().collect::<Vec<_>>()
        );
        assert_eq!(RamArchs::from_descriptor(&regenerated).unwrap(), archs);
    }
}

#[test]
fn descriptor_errors() {
    assert!(matches!(
        RamArchs::from_descriptor(""),
        Err(ArchParseError::Empty)
    ));
    assert!(matches!(
        RamArchs::from_descriptor("-x 1 2"),
        Err(ArchParseError::UnknownGroup(_))
    ));
    assert!(matches!(
        RamArchs::from_descriptor("-b 8192 32"),
        Err(ArchParseError::MissingParameters { .. })
    ));
    assert!(RamArchs::from_descriptor("-l 0 1").is_err());
    // 8192 is not divisible by 33.
    assert!(RamArchs::from_descriptor("-b 8192 33 10 1").is_err());
}

#[test]
fn all_pow2_below_table() {
    assert_eq!(all_pow2_below(32), vec![32, 16, 8, 4, 2, 1]);
    assert_eq!(all_pow2_below(31), vec![16, 8, 4, 2, 1]);
    assert_eq!(all_pow2_below(1), vec![1]);
    assert_eq!(all_pow2_below(127), vec![64, 32, 16, 8, 4, 2, 1]);
}

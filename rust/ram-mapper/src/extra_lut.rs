//! LUT overhead of serial RAM compositions.
//!
//! Widening a logical RAM with parallel physical blocks is free. Deepening it
//! with `R` serial blocks costs soft logic on both ports: a `log2(R):R` write
//! decoder (one LUT per output, except the 1:2 case where one output is a
//! buffer) and, per logical data bit, an `R:1` read multiplexer built from
//! cascaded 4:1 muxes, each of which fills one 6-LUT.

use crate::RamMode;

/// LUTs of the write-side row decoder for `num_series` serial blocks.
pub fn write_decoder_luts(num_series: u64) -> u64 {
    match num_series {
        0 | 1 => 0,
        2 => 1,
        r => r,
    }
}

/// LUTs of the read-side `num_series:1` multiplexer for a single data bit.
pub fn read_mux_luts_per_bit(num_series: u64) -> u64 {
    match num_series {
        0 | 1 => 0,
        // The first 4:1 mux covers four inputs, every further cascaded mux
        // adds three more.
        r => (r - 1).div_ceil(3),
    }
}

/// LUTs of the read-side multiplexers across a `logical_width`-bit word.
pub fn read_mux_luts(num_series: u64, logical_width: u64) -> u64 {
    logical_width * read_mux_luts_per_bit(num_series)
}

/// Combine write-decoder and read-mux LUTs according to the port mode.
pub fn accumulate_extra_luts(write_luts: u64, read_luts: u64, mode: RamMode) -> u64 {
    match mode {
        RamMode::Rom => read_luts,
        RamMode::SinglePort | RamMode::SimpleDualPort => read_luts + write_luts,
        RamMode::TrueDualPort => 2 * (read_luts + write_luts),
    }
}

/// Total extra LUTs of one leaf: `num_series` serial physical blocks
/// implementing a `logical_width`-bit word in the given mode.
pub fn extra_luts(num_series: u64, logical_width: u64, mode: RamMode) -> u64 {
    if num_series <= 1 {
        return 0;
    }
    accumulate_extra_luts(
        write_decoder_luts(num_series),
        read_mux_luts(num_series, logical_width),
        mode,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_decoder_table() {
        assert_eq!(write_decoder_luts(1), 0);
        assert_eq!(write_decoder_luts(2), 1);
        for r in 3..=16 {
            assert_eq!(write_decoder_luts(r), r);
        }
    }

    #[test]
    fn read_mux_per_bit_table() {
        let expected = [0, 1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4, 5, 5, 5];
        for (r, want) in (1..=16).zip(expected) {
            assert_eq!(read_mux_luts_per_bit(r), want, "num_series={r}");
        }
    }

    #[test]
    fn single_block_is_free() {
        for mode in RamMode::ALL {
            assert_eq!(extra_luts(1, 128, mode), 0);
        }
    }

    #[test]
    fn eight_deep_thirty_wide() {
        assert_eq!(extra_luts(8, 30, RamMode::SinglePort), 3 * 30 + 8);
        assert_eq!(extra_luts(8, 30, RamMode::TrueDualPort), 2 * (3 * 30 + 8));
        assert_eq!(extra_luts(8, 30, RamMode::Rom), 3 * 30);
    }
}

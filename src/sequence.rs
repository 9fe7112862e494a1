//! Sequence and move-table primitives.
//!
//! Lookup tables are immutable, lazily-initialized statics: built once,
//! then read-only for the lifetime of the process.

lazy_static::lazy_static! {
    /// Maps an ASCII base to its complement. Entries other than ACGT map
    /// to 0 and must not be fed valid input.
    static ref COMPLEMENT_TABLE: [u8; 256] = {
        let mut table = [0u8; 256];
        table[b'A' as usize] = b'T';
        table[b'T' as usize] = b'A';
        table[b'C' as usize] = b'G';
        table[b'G' as usize] = b'C';
        table
    };

    /// Maps a phred+33 quality character to its error probability.
    static ref QCHAR_ERROR_TABLE: [f32; 256] = {
        let mut table = [0.0f32; 256];
        for q in 33..=127usize {
            let shifted = (q - 33) as f32;
            table[q] = 10.0f32.powf(-shifted / 10.0);
        }
        table
    };

    /// Maps an ASCII base to its integer code (A=0, C=1, G=2, T=3, else -1).
    static ref BASE_IDS: [i32; 256] = {
        let mut table = [-1i32; 256];
        table[b'A' as usize] = 0;
        table[b'C' as usize] = 1;
        table[b'G' as usize] = 2;
        table[b'T' as usize] = 3;
        table
    };
}

/// Reverse complement of an ASCII `ACGT` sequence.
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence
        .iter()
        .rev()
        .map(|&base| COMPLEMENT_TABLE[base as usize])
        .collect()
}

/// Integer code of a single base.
pub fn base_to_int(base: u8) -> i32 {
    BASE_IDS[base as usize]
}

/// Integer codes for a whole sequence.
pub fn sequence_to_ints(sequence: &[u8]) -> Vec<i32> {
    sequence.iter().map(|&b| base_to_int(b)).collect()
}

/// Mean q-score of a phred+33 quality string from `start_pos` onwards,
/// clamped to `[1, 50]`. Errors if `start_pos` is past the end.
pub fn mean_qscore(qstring: &[u8], start_pos: usize) -> anyhow::Result<f32> {
    if qstring.is_empty() {
        return Ok(0.0);
    }
    if start_pos >= qstring.len() {
        anyhow::bail!(
            "mean q-score start position ({}) is >= length of qstring ({})",
            start_pos,
            qstring.len()
        );
    }
    let total_error: f32 = qstring[start_pos..]
        .iter()
        .map(|&q| QCHAR_ERROR_TABLE[q as usize])
        .sum();
    let mean_error = total_error / (qstring.len() - start_pos) as f32;
    let mean_qscore = -10.0 * mean_error.log10();
    Ok(mean_qscore.clamp(1.0, 50.0))
}

/// Convert a move table to the signal sample index at which each base
/// starts, terminated by `signal_len`. The result has one entry per
/// flag=1 block plus the terminator.
pub fn moves_to_map(moves: &[u8], block_stride: usize, signal_len: usize) -> Vec<usize> {
    let mut seq_to_sig = Vec::with_capacity(moves.iter().filter(|&&m| m == 1).count() + 1);
    for (i, &m) in moves.iter().enumerate() {
        if m == 1 {
            seq_to_sig.push(i * block_stride);
        }
    }
    seq_to_sig.push(signal_len);
    seq_to_sig
}

/// Prefix sums of the move-table flags. `cum[i]` is the number of bases
/// started in blocks `0..=i`.
pub fn move_cum_sums(moves: &[u8]) -> Vec<u64> {
    let mut sums = Vec::with_capacity(moves.len());
    let mut acc = 0u64;
    for &m in moves {
        acc += u64::from(m);
        sums.push(acc);
    }
    sums
}

/// Number of trailing occurrences of `base` at the end of `sequence`.
pub fn count_trailing_chars(sequence: &[u8], base: u8) -> usize {
    sequence.iter().rev().take_while(|&&b| b == base).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ACGT"), b"ACGT".to_vec());
        assert_eq!(reverse_complement(b"AACCGGTT"), b"AACCGGTT".to_vec());
        assert_eq!(reverse_complement(b"AAAA"), b"TTTT".to_vec());
        assert_eq!(reverse_complement(b"GATTACA"), b"TGTAATC".to_vec());
        assert_eq!(reverse_complement(b""), Vec::<u8>::new());
    }

    #[test]
    fn test_base_to_int() {
        assert_eq!(base_to_int(b'A'), 0);
        assert_eq!(base_to_int(b'C'), 1);
        assert_eq!(base_to_int(b'G'), 2);
        assert_eq!(base_to_int(b'T'), 3);
        assert_eq!(base_to_int(b'N'), -1);
        assert_eq!(sequence_to_ints(b"ACGTN"), vec![0, 1, 2, 3, -1]);
    }

    #[test]
    fn test_mean_qscore_uniform() {
        // 'I' is phred+33 for q40.
        let q = mean_qscore(b"IIIIIIII", 0).unwrap();
        assert!((q - 40.0).abs() < 0.01, "got {q}");
    }

    #[test]
    fn test_mean_qscore_clamped_low() {
        // '!' is q0, error probability 1.0; clamp floor is 1.0.
        let q = mean_qscore(b"!!!!", 0).unwrap();
        assert!((q - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mean_qscore_start_past_end() {
        assert!(mean_qscore(b"III", 3).is_err());
        assert_eq!(mean_qscore(b"", 5).unwrap(), 0.0);
    }

    #[test]
    fn test_moves_to_map() {
        // Bases start at blocks 0, 2, 3 with stride 5.
        let map = moves_to_map(&[1, 0, 1, 1, 0], 5, 25);
        assert_eq!(map, vec![0, 10, 15, 25]);
    }

    #[test]
    fn test_move_cum_sums() {
        assert_eq!(move_cum_sums(&[1, 0, 1, 1, 0]), vec![1, 1, 2, 3, 3]);
        assert!(move_cum_sums(&[]).is_empty());
    }

    #[test]
    fn test_count_trailing_chars() {
        assert_eq!(count_trailing_chars(b"ACGTAAA", b'A'), 3);
        assert_eq!(count_trailing_chars(b"AAAA", b'A'), 4);
        assert_eq!(count_trailing_chars(b"ACGT", b'A'), 0);
        assert_eq!(count_trailing_chars(b"", b'A'), 0);
    }
}

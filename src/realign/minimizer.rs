//! Minimizer extraction and coarse overlap search.
//!
//! The query sequence is indexed by its minimizers; target minimizers are
//! matched against the index and the densest diagonal band of hits becomes
//! the overlap region handed to the fine aligner.

use crate::error::RealignError;
use std::collections::HashMap;

/// Default k-mer length for minimizer extraction.
pub const KMER_LEN: usize = 15;
/// Default window length: one minimizer per window of consecutive k-mers.
pub const WINDOW_LEN: usize = 10;

/// Hits further apart than this on the diagonal belong to different bands.
const MAX_DIAG_SPREAD: i64 = 48;
/// A band needs at least this many minimizer hits; a single stray shared
/// minimizer is treated as spurious.
const MIN_BAND_HITS: usize = 2;

/// Best coarse alignment region between two sequences. Half-open ranges,
/// transient and recomputed per realignment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub query_start: usize,
    pub query_end: usize,
    pub target_start: usize,
    pub target_end: usize,
}

/// splitmix64 finalizer; decorrelates lexicographically close k-mers so
/// window minima sample positions roughly uniformly.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// 2-bit pack a k-mer window; `None` if it contains a non-ACGT base.
#[inline]
fn pack_kmer(window: &[u8]) -> Option<u64> {
    let mut packed = 0u64;
    for &base in window {
        let code = match base {
            b'A' => 0u64,
            b'C' => 1,
            b'G' => 2,
            b'T' => 3,
            _ => return None,
        };
        packed = (packed << 2) | code;
    }
    Some(packed)
}

/// Extract `(hash, position)` minimizers: the minimum-hash k-mer of every
/// window of `w` consecutive k-mers, consecutive duplicates deduplicated.
pub fn minimizers(seq: &[u8], k: usize, w: usize) -> Vec<(u64, usize)> {
    if seq.len() < k {
        return Vec::new();
    }

    let hashes: Vec<Option<u64>> = seq
        .windows(k)
        .map(|win| pack_kmer(win).map(splitmix64))
        .collect();

    let mut out: Vec<(u64, usize)> = Vec::new();
    let window = w.min(hashes.len());
    for start in 0..=(hashes.len() - window) {
        let best = hashes[start..start + window]
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.map(|h| (h, start + i)))
            .min_by_key(|&(h, pos)| (h, pos));
        if let Some((hash, pos)) = best {
            if out.last().map(|&(_, p)| p) != Some(pos) {
                out.push((hash, pos));
            }
        }
    }
    out
}

/// Find the best-scoring single alignment region between `query` and
/// `target`, or `NoOverlap` when they share no usable minimizers.
pub fn find_overlap(query: &[u8], target: &[u8]) -> Result<Overlap, RealignError> {
    let query_mins = minimizers(query, KMER_LEN, WINDOW_LEN);
    let target_mins = minimizers(target, KMER_LEN, WINDOW_LEN);
    if query_mins.is_empty() || target_mins.is_empty() {
        return Err(RealignError::NoOverlap);
    }

    let mut index: HashMap<u64, Vec<usize>> = HashMap::with_capacity(query_mins.len());
    for &(hash, pos) in &query_mins {
        index.entry(hash).or_default().push(pos);
    }

    // (diagonal, query position, target position)
    let mut hits: Vec<(i64, usize, usize)> = Vec::new();
    for &(hash, tpos) in &target_mins {
        if let Some(qpositions) = index.get(&hash) {
            for &qpos in qpositions {
                hits.push((tpos as i64 - qpos as i64, qpos, tpos));
            }
        }
    }
    if hits.is_empty() {
        return Err(RealignError::NoOverlap);
    }
    hits.sort_unstable();

    // Densest run of hits within one diagonal band, two-pointer over the
    // diagonal-sorted list.
    let mut best_range = (0usize, 0usize);
    let mut lo = 0usize;
    for hi in 0..hits.len() {
        while hits[hi].0 - hits[lo].0 > MAX_DIAG_SPREAD {
            lo += 1;
        }
        if hi - lo + 1 > best_range.1 - best_range.0 {
            best_range = (lo, hi + 1);
        }
    }
    let band = &hits[best_range.0..best_range.1];
    if band.len() < MIN_BAND_HITS {
        log::debug!(
            "overlap search: best band has {} hit(s), below the {} required",
            band.len(),
            MIN_BAND_HITS
        );
        return Err(RealignError::NoOverlap);
    }

    let query_start = band.iter().map(|&(_, q, _)| q).min().unwrap_or(0);
    let query_end = band.iter().map(|&(_, q, _)| q).max().unwrap_or(0) + KMER_LEN;
    let target_start = band.iter().map(|&(_, _, t)| t).min().unwrap_or(0);
    let target_end = band.iter().map(|&(_, _, t)| t).max().unwrap_or(0) + KMER_LEN;

    log::debug!(
        "overlap search: {} hits, band query[{}..{}] target[{}..{}]",
        band.len(),
        query_start,
        query_end,
        target_start,
        target_end
    );

    Ok(Overlap {
        query_start,
        query_end: query_end.min(query.len()),
        target_start,
        target_end: target_end.min(target.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimizers_short_sequence() {
        assert!(minimizers(b"ACGT", KMER_LEN, WINDOW_LEN).is_empty());
    }

    #[test]
    fn test_minimizers_deterministic() {
        let seq = b"ACGTACGGTTACGATCGATCGGCTAGCTAGCATCGATCGATTACG";
        let a = minimizers(seq, KMER_LEN, WINDOW_LEN);
        let b = minimizers(seq, KMER_LEN, WINDOW_LEN);
        assert_eq!(a, b);
        assert!(!a.is_empty());
        // Positions are strictly increasing after dedup.
        for pair in a.windows(2) {
            assert!(pair[0].1 < pair[1].1);
        }
    }

    #[test]
    fn test_ambiguous_bases_skipped() {
        let seq = b"ACGTNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNNACGT";
        // Every window contains an N somewhere, but only k-mers free of N
        // may produce minimizers.
        for (_, pos) in minimizers(seq, KMER_LEN, WINDOW_LEN) {
            assert!(!seq[pos..pos + KMER_LEN].contains(&b'N'));
        }
    }

    #[test]
    fn test_identity_overlap() {
        let seq = b"CGATCGGCTAGCTAGCATCGATCGATTACGGATCAGCGGATATTTACGCGATGCTAGCATCGGCTA";
        let overlap = find_overlap(seq, seq).unwrap();
        assert_eq!(overlap.query_start, overlap.target_start);
        assert_eq!(overlap.query_end, overlap.target_end);
        assert!(overlap.query_end > overlap.query_start);
    }

    #[test]
    fn test_disjoint_sequences_no_overlap() {
        let query = b"CGATCGGCTAGCTAGCATCGATCGATTACGGATCAGCGGATATTTACGCGATGCTAGCATCGGCTA";
        let target = vec![b'T'; 60];
        assert_eq!(find_overlap(query, &target), Err(RealignError::NoOverlap));
    }
}

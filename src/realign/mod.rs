//! Signal-to-sequence realignment.
//!
//! Given a `(query, move table)` pair from the basecaller and a target
//! sequence that is an edited version of the query, produce a move table
//! consistent with the target: coarse minimizer overlap search, unit-cost
//! global alignment over the overlap, then move-table reconstruction.
//! Every invocation is independent; the engine holds no shared state.

pub mod minimizer;
pub mod moves;

pub use minimizer::{find_overlap, minimizers, Overlap};
pub use moves::{base_start_indices, reconstruct_moves};

use crate::error::RealignError;
use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;

/// Unit-cost scoring: 0 for a match, -1 for any edit. The alignment score
/// is then the negated edit distance.
fn unit_cost(a: u8, b: u8) -> i32 {
    if a == b {
        0
    } else {
        -1
    }
}

/// Result of a realignment call.
#[derive(Debug, Clone)]
pub struct RealignResult {
    /// Move table for the aligned target subsequence. The count of flag=1
    /// entries equals `overlap.target_end - overlap.target_start`.
    pub moves: Vec<u8>,
    /// Block offset of the aligned region in the original move table.
    pub moves_offset: usize,
    /// `overlap.target_start - 1`, the base offset downstream splicing
    /// code expects (-1 when the overlap starts at the first target base).
    pub target_start_offset: isize,
    /// The coarse alignment region the result covers.
    pub overlap: Overlap,
}

/// Realign `moves` (derived against `query`) to `target`.
pub fn realign_moves(
    query: &[u8],
    target: &[u8],
    moves: &[u8],
) -> Result<RealignResult, RealignError> {
    let overlap = find_overlap(query, target)?;
    realign_with_overlap(query, target, moves, overlap)
}

/// Fine alignment and reconstruction over an already-located overlap.
pub(crate) fn realign_with_overlap(
    query: &[u8],
    target: &[u8],
    moves: &[u8],
    overlap: Overlap,
) -> Result<RealignResult, RealignError> {
    if overlap.query_end <= overlap.query_start || overlap.target_end <= overlap.target_start {
        return Err(RealignError::DegenerateOverlap);
    }

    let query_component = &query[overlap.query_start..overlap.query_end];
    let target_component = &target[overlap.target_start..overlap.target_end];

    let mut aligner = Aligner::with_capacity(
        target_component.len(),
        query_component.len(),
        0,
        -1,
        unit_cost,
    );
    // x = target component, y = query component: Ins consumes target only,
    // Del consumes query only.
    let alignment = aligner.global(target_component, query_component);
    log::debug!(
        "realign: overlap query[{}..{}] target[{}..{}], edit distance {}",
        overlap.query_start,
        overlap.query_end,
        overlap.target_start,
        overlap.target_end,
        -alignment.score
    );

    let (new_moves, moves_offset) = reconstruct_moves(&alignment.operations, moves, &overlap);

    Ok(RealignResult {
        moves: new_moves,
        moves_offset,
        target_start_offset: overlap.target_start as isize - 1,
        overlap,
    })
}

/// Best infix match of `needle` inside `haystack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMatch {
    /// Half-open range of the match in `haystack`.
    pub start: usize,
    pub end: usize,
    /// Edit distance of the match.
    pub edits: usize,
}

/// Locate `needle` inside `haystack` by semiglobal unit-cost alignment:
/// the needle aligns end-to-end, the haystack locally. Used for
/// primer/flank boundary search.
pub fn locate(needle: &[u8], haystack: &[u8]) -> Option<SubMatch> {
    if needle.is_empty() || haystack.is_empty() {
        return None;
    }
    let mut aligner = Aligner::with_capacity(needle.len(), haystack.len(), 0, -1, unit_cost);
    let alignment = aligner.semiglobal(needle, haystack);
    let edits = alignment
        .operations
        .iter()
        .filter(|op| {
            matches!(
                op,
                AlignmentOperation::Subst | AlignmentOperation::Ins | AlignmentOperation::Del
            )
        })
        .count();
    Some(SubMatch {
        start: alignment.ystart,
        end: alignment.yend,
        edits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overlap_component_is_degenerate() {
        let seq = b"ACGTACGTACGTACGTACGT";
        let moves = vec![1u8; seq.len()];
        let empty_query = Overlap {
            query_start: 5,
            query_end: 5,
            target_start: 0,
            target_end: 10,
        };
        assert_eq!(
            realign_with_overlap(seq, seq, &moves, empty_query).unwrap_err(),
            RealignError::DegenerateOverlap
        );
        let empty_target = Overlap {
            query_start: 0,
            query_end: 10,
            target_start: 7,
            target_end: 7,
        };
        assert_eq!(
            realign_with_overlap(seq, seq, &moves, empty_target).unwrap_err(),
            RealignError::DegenerateOverlap
        );
    }

    #[test]
    fn test_locate_exact() {
        let hit = locate(b"GATTACA", b"CCCCGATTACACCCC").unwrap();
        assert_eq!(hit.start, 4);
        assert_eq!(hit.end, 11);
        assert_eq!(hit.edits, 0);
    }

    #[test]
    fn test_locate_with_mismatch() {
        let hit = locate(b"GATTACA", b"CCCCGATCACACCCC").unwrap();
        assert_eq!(hit.edits, 1);
        assert_eq!(hit.start, 4);
    }

    #[test]
    fn test_locate_empty_inputs() {
        assert!(locate(b"", b"ACGT").is_none());
        assert!(locate(b"ACGT", b"").is_none());
    }
}

//! Move-table reconstruction from an edit script.
//!
//! A base's signal footprint in the move table is one flag=1 block followed
//! by its trailing flag=0 blocks. The walk below consumes those runs from
//! the original table while emitting the edited sequence's table, keeping
//! the invariant that the emitted flag=1 count equals the number of target
//! bases covered by the edit script.

use super::minimizer::Overlap;
use bio::alignment::AlignmentOperation;

/// Block index at which each base starts: the positions of the flag=1
/// entries, in order.
pub fn base_start_indices(moves: &[u8]) -> Vec<usize> {
    moves
        .iter()
        .enumerate()
        .filter_map(|(i, &m)| (m == 1).then_some(i))
        .collect()
}

/// Walk the edit script left to right, consuming block runs from the
/// original move table starting at the base `overlap.query_start`.
///
/// Operation semantics (x = target component, y = query component):
/// - `Match`/`Subst`: copy one base's run unchanged; both cursors advance.
/// - `Ins` (base present only in the target): emit a lone flag=1 block; the
///   new base sits immediately after the previous one with no extra signal.
/// - `Del` (base present only in the query): emit the consumed run as all
///   flag=0 blocks; its signal folds into the neighboring retained base.
///
/// Returns the reconstructed table and the block offset of the first
/// consumed base in the original table.
pub fn reconstruct_moves(
    ops: &[AlignmentOperation],
    moves: &[u8],
    overlap: &Overlap,
) -> (Vec<u8>, usize) {
    let starts = base_start_indices(moves);
    debug_assert!(
        overlap.query_end <= starts.len(),
        "move table has {} bases, overlap needs {}",
        starts.len(),
        overlap.query_end
    );

    let run_end = |base: usize| {
        if base + 1 < starts.len() {
            starts[base + 1]
        } else {
            moves.len()
        }
    };

    let mut qbase = overlap.query_start;
    let moves_offset = starts.get(qbase).copied().unwrap_or(moves.len());
    // Reserve the block span of the consumed region.
    let span_end = run_end(overlap.query_end.saturating_sub(1));
    let mut new_moves: Vec<u8> = Vec::with_capacity(span_end.saturating_sub(moves_offset));

    for op in ops {
        match op {
            AlignmentOperation::Match | AlignmentOperation::Subst => {
                let run = run_end(qbase) - starts[qbase];
                new_moves.push(1);
                new_moves.extend(std::iter::repeat(0).take(run - 1));
                qbase += 1;
            }
            AlignmentOperation::Ins => {
                new_moves.push(1);
            }
            AlignmentOperation::Del => {
                let run = run_end(qbase) - starts[qbase];
                new_moves.extend(std::iter::repeat(0).take(run));
                qbase += 1;
            }
            AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
        }
    }

    (new_moves, moves_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use AlignmentOperation::{Del, Ins, Match, Subst};

    fn overlap(query_start: usize, query_end: usize) -> Overlap {
        Overlap {
            query_start,
            query_end,
            target_start: 0,
            target_end: query_end - query_start,
        }
    }

    #[test]
    fn test_base_start_indices() {
        assert_eq!(base_start_indices(&[1, 0, 0, 1, 1, 0]), vec![0, 3, 4]);
        assert!(base_start_indices(&[0, 0]).is_empty());
    }

    #[test]
    fn test_match_only_copies_runs() {
        // Three bases with runs of 2, 1, 3 blocks.
        let moves = [1, 0, 1, 1, 0, 0];
        let ops = [Match, Match, Match];
        let (new_moves, offset) = reconstruct_moves(&ops, &moves, &overlap(0, 3));
        assert_eq!(new_moves, moves.to_vec());
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_mismatch_keeps_signal_assignment() {
        let moves = [1, 0, 0, 1, 0];
        let ops = [Subst, Match];
        let (new_moves, _) = reconstruct_moves(&ops, &moves, &overlap(0, 2));
        assert_eq!(new_moves, vec![1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_insert_to_target_emits_lone_flag() {
        let moves = [1, 0, 1, 0];
        let ops = [Match, Ins, Match];
        let (new_moves, _) = reconstruct_moves(&ops, &moves, &overlap(0, 2));
        // The inserted base gets a single flag=1 block with no signal run.
        assert_eq!(new_moves, vec![1, 0, 1, 1, 0]);
        assert_eq!(new_moves.iter().filter(|&&m| m == 1).count(), 3);
    }

    #[test]
    fn test_insert_to_query_folds_run_to_zeros() {
        let moves = [1, 0, 1, 0, 0, 1];
        let ops = [Match, Del, Match];
        let (new_moves, _) = reconstruct_moves(&ops, &moves, &overlap(0, 3));
        // The dropped base's 3-block run survives as zeros only.
        assert_eq!(new_moves, vec![1, 0, 0, 0, 0, 1]);
        assert_eq!(new_moves.iter().filter(|&&m| m == 1).count(), 2);
    }

    #[test]
    fn test_offset_starts_at_query_start() {
        let moves = [1, 0, 1, 0, 0, 1, 1, 0];
        let ops = [Match, Match];
        let (new_moves, offset) = reconstruct_moves(&ops, &moves, &overlap(1, 3));
        assert_eq!(offset, 2);
        assert_eq!(new_moves, vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_flag_count_matches_target_length() {
        let moves = [1, 1, 0, 1, 0, 0, 1, 1, 0];
        // Target length = matches + substitutions + insertions = 6.
        let ops = [Match, Subst, Ins, Match, Del, Match, Ins];
        let (new_moves, _) = reconstruct_moves(&ops, &moves, &overlap(0, 5));
        assert_eq!(new_moves.iter().filter(|&&m| m == 1).count(), 6);
    }
}

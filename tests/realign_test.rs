//! End-to-end realignment checks: identity inputs, edited targets, and
//! inputs that share no usable overlap.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tailflow::realign::base_start_indices;
use tailflow::{realign_moves, RealignError};

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

fn random_sequence(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

/// Random move table with 1 to 4 blocks per base.
fn random_moves(rng: &mut StdRng, num_bases: usize) -> Vec<u8> {
    let mut moves = Vec::new();
    for _ in 0..num_bases {
        moves.push(1);
        for _ in 0..rng.gen_range(0..4) {
            moves.push(0);
        }
    }
    moves
}

/// End block of the run belonging to base `base`.
fn run_end(starts: &[usize], moves_len: usize, base: usize) -> usize {
    if base + 1 < starts.len() {
        starts[base + 1]
    } else {
        moves_len
    }
}

#[test]
fn identity_realign_preserves_move_runs() {
    let mut rng = StdRng::seed_from_u64(7);
    let seq = random_sequence(&mut rng, 150);
    let moves = random_moves(&mut rng, seq.len());

    let result = realign_moves(&seq, &seq, &moves).unwrap();
    let overlap = result.overlap;
    assert_eq!(overlap.query_start, overlap.target_start);
    assert_eq!(overlap.query_end, overlap.target_end);
    assert!(overlap.query_end > overlap.query_start);

    // Identical sequences align with matches only, so the reconstructed
    // table is exactly the original table's slice over the overlap.
    let starts = base_start_indices(&moves);
    let slice_start = starts[overlap.query_start];
    let slice_end = run_end(&starts, moves.len(), overlap.query_end - 1);
    assert_eq!(result.moves, moves[slice_start..slice_end].to_vec());
    assert_eq!(result.moves_offset, slice_start);
    assert_eq!(
        result.target_start_offset,
        overlap.target_start as isize - 1
    );
}

#[test]
fn edited_target_keeps_flag_count_invariant() {
    let mut rng = StdRng::seed_from_u64(11);
    let query = random_sequence(&mut rng, 300);
    let moves = random_moves(&mut rng, query.len());

    // Sparse edits: one substitution, one deletion, one insertion.
    let mut target = Vec::with_capacity(query.len() + 1);
    for (i, &base) in query.iter().enumerate() {
        match i {
            60 => target.push(if base == b'A' { b'C' } else { b'A' }),
            140 => {}
            220 => {
                target.push(base);
                target.push(b'G');
            }
            _ => target.push(base),
        }
    }

    let result = realign_moves(&query, &target, &moves).unwrap();
    let overlap = result.overlap;
    let flags = result.moves.iter().filter(|&&m| m == 1).count();
    assert_eq!(flags, overlap.target_end - overlap.target_start);

    let starts = base_start_indices(&moves);
    assert_eq!(result.moves_offset, starts[overlap.query_start]);
}

#[test]
fn unrelated_sequences_report_no_overlap() {
    let mut rng = StdRng::seed_from_u64(13);
    // Query free of T-runs, target is all T: no shared k-mers possible.
    let query: Vec<u8> = (0..120)
        .map(|_| [b'A', b'C', b'G'][rng.gen_range(0..3)])
        .collect();
    let target = vec![b'T'; 120];
    let moves = random_moves(&mut rng, query.len());

    assert_eq!(
        realign_moves(&query, &target, &moves).unwrap_err(),
        RealignError::NoOverlap
    );
}

#[test]
fn sequences_below_kmer_length_report_no_overlap() {
    let seq = b"ACGTACGTAC".to_vec();
    let moves = vec![1; seq.len()];
    assert_eq!(
        realign_moves(&seq, &seq, &moves).unwrap_err(),
        RealignError::NoOverlap
    );
}

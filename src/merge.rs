//! Hamming-distance merger: folds near-duplicate candidate barcodes into
//! their heavier representative.
//!
//! Sequencing errors produce slight variants of the true barcode — close
//! Hamming neighbors with strictly lower support. Merging removes the
//! lighter of any such pair, exactly once per pair.

use crate::cycles::Candidate;

/// Hamming distance between two equal-length byte strings. Returns `None`
/// if the lengths differ.
fn hamming(a: &[u8], b: &[u8]) -> Option<usize> {
    (a.len() == b.len()).then(|| a.iter().zip(b).filter(|(x, y)| x != y).count())
}

/// Removes candidates within `max_distance` Hamming distance of a heavier
/// candidate, keeping the heavier of each colliding pair.
///
/// Candidates are sorted ascending by weight first, so for any pair `(i,
/// j)` with `i < j` that collide, `i` (lighter) is always the one dropped.
/// A candidate is dropped at most once even if it collides with several
/// heavier candidates — this makes the pass idempotent.
#[must_use]
pub fn merge(mut candidates: Vec<Candidate>, max_distance: usize) -> Vec<Candidate> {
    candidates.sort_by_key(|c| c.weight);

    let mut dropped = vec![false; candidates.len()];
    for i in 0..candidates.len() {
        if dropped[i] {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if dropped[j] {
                continue;
            }
            if hamming(&candidates[i].sequence, &candidates[j].sequence)
                .is_some_and(|d| d <= max_distance)
            {
                dropped[i] = true;
                break;
            }
        }
    }

    candidates
        .into_iter()
        .zip(dropped)
        .filter_map(|(candidate, is_dropped)| (!is_dropped).then_some(candidate))
        .collect()
}

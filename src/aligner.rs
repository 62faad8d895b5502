use std::cmp::Reverse;

use ndarray::Array2;

use crate::{results::Strand, scoring::ScoreGrid};

/// The winning gapless alignment of one query/target pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BestAlignment {
    pub(crate) score: u32,
    pub(crate) offset: i32,
    pub(crate) overlap: u32,
    pub(crate) strand: Strand,
}

impl BestAlignment {
    /// Tie-break rule: higher score, then smaller |offset|, then the
    /// forward strand.
    #[inline]
    fn ranking(&self) -> (u32, Reverse<u32>, bool) {
        (
            self.score,
            Reverse(self.offset.unsigned_abs()),
            self.strand == Strand::Forward,
        )
    }
}

/// Number of query columns aligned to target columns at `offset`.
#[inline]
pub(crate) fn overlap_length(query_len: usize, target_len: usize, offset: i32) -> usize {
    let query_len = query_len as i64;
    let target_len = target_len as i64;
    let offset = i64::from(offset);

    query_len
        .min(target_len)
        .min(query_len + offset)
        .min(target_len - offset)
        .max(0) as usize
}

/// Offsets (and with reverse complement, strands) considered for a pair,
/// the multiple-testing budget of the p-value correction.
#[inline]
pub(crate) fn alignment_count(query_len: usize, target_len: usize, strands: usize) -> usize {
    (query_len + target_len - 1) * strands
}

/// Scan every offset of the quantized score matrix (and of the
/// reverse-complement query's matrix when given), keeping the best
/// alignment under the tie-break rule.
pub(crate) fn best_alignment(
    grid: &ScoreGrid,
    forward: &Array2<f32>,
    reverse: Option<&Array2<f32>>,
) -> BestAlignment {
    let mut best = None;
    scan_strand(grid, forward, Strand::Forward, &mut best);
    if let Some(reverse) = reverse {
        debug_assert_eq!(reverse.dim(), forward.dim());
        scan_strand(grid, reverse, Strand::Reverse, &mut best);
    }

    // both dimensions are at least 1, so at least one offset exists
    best.expect("at least one alignment")
}

fn scan_strand(
    grid: &ScoreGrid,
    scores: &Array2<f32>,
    strand: Strand,
    best: &mut Option<BestAlignment>,
) {
    let (query_len, target_len) = scores.dim();

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    for offset in -(query_len as i32 - 1)..=(target_len as i32 - 1) {
        let mut j = offset.min(0).unsigned_abs() as usize;
        // query column j aligns target column j + offset
        let mut k = (j as i64 + i64::from(offset)) as usize;
        let mut score = 0;
        let mut overlap = 0;
        while j < query_len && k < target_len {
            score += grid.quantize(scores[(j, k)]);
            overlap += 1;
            j += 1;
            k += 1;
        }

        debug_assert_eq!(
            overlap as usize,
            overlap_length(query_len, target_len, offset),
        );
        debug_assert!(overlap >= 1);

        let candidate = BestAlignment {
            score,
            offset,
            overlap,
            strand,
        };
        if best.map_or(true, |best| candidate.ranking() > best.ranking()) {
            *best = Some(candidate);
        }
    }
}

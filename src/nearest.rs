use ndarray::Array1;
use smallvec::SmallVec;

use crate::{
    null_model::NullModel,
    pvalue::sidak_correct,
    pwm::{Pwm, ALPHABET_LEN},
    scoring::ScoreGrid,
};

/// Approximate target classes for top-K pruning.
///
/// Targets are hashed into equal-width classes of their mean column score
/// against the database-wide mean column, so that targets likely to score
/// similarly share a class. Classes are visited in descending order of
/// their score ceiling, the "most promising first" cohort order.
#[derive(Debug)]
pub(crate) struct TargetBuckets {
    buckets: Vec<Bucket>,
}

#[derive(Debug)]
pub(crate) struct Bucket {
    pub(crate) members: SmallVec<[u32; 8]>,
    pub(crate) max_column_norm: f32,
    pub(crate) min_len: usize,
    pub(crate) max_len: usize,
}

impl Bucket {
    fn new() -> Self {
        Self {
            members: SmallVec::new(),
            max_column_norm: 0.,
            min_len: usize::MAX,
            max_len: 0,
        }
    }

    fn insert(&mut self, index: usize, target: &Pwm) {
        #[allow(clippy::cast_possible_truncation)]
        self.members.push(index as u32);
        let norm = target
            .column_norms()
            .into_iter()
            .fold(0f32, f32::max);
        self.max_column_norm = self.max_column_norm.max(norm);
        self.min_len = self.min_len.min(target.len());
        self.max_len = self.max_len.max(target.len());
    }
}

impl TargetBuckets {
    pub(crate) fn build(targets: &[Pwm], bins: usize) -> Self {
        debug_assert!(!targets.is_empty());
        debug_assert!(bins > 0);

        // database-wide mean column, the fixed reference profile
        let mut reference = Array1::<f32>::zeros(ALPHABET_LEN);
        let mut columns = 0usize;
        for target in targets {
            for k in 0..target.len() {
                reference += &target.column(k);
            }
            columns += target.len();
        }
        #[allow(clippy::cast_precision_loss)]
        {
            reference /= columns as f32;
        }

        let signatures: Vec<f32> = targets
            .iter()
            .map(|target| {
                let total: f32 = (0..target.len())
                    .map(|k| reference.dot(&target.column(k)))
                    .sum();
                #[allow(clippy::cast_precision_loss)]
                let mean = total / target.len() as f32;
                mean
            })
            .collect();

        let grid = ScoreGrid::from_scores(signatures.iter().copied(), bins);
        let mut buckets: Vec<Bucket> = (0..bins).map(|_| Bucket::new()).collect();
        for (index, &signature) in signatures.iter().enumerate() {
            buckets[grid.quantize(signature) as usize].insert(index, &targets[index]);
        }

        buckets.retain(|bucket| !bucket.members.is_empty());
        buckets.sort_unstable_by(|a, b| b.max_column_norm.total_cmp(&a.max_column_norm));

        Self { buckets }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    #[cfg(test)]
    fn member_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.members.len()).sum()
    }
}

/// Smallest p-value any target of the bucket could possibly reach
/// against this query.
///
/// Per-column scores are bounded by the Cauchy–Schwarz ceiling
/// `max ‖q_j‖ · max ‖t_k‖`, quantized on the query's own grid; the bound
/// then takes the best corrected tail over every feasible overlap with
/// the bucket's smallest alignment count. A whole bucket can be skipped
/// once K exact results beat this bound.
pub(crate) fn bucket_bound(
    bucket: &Bucket,
    query_len: usize,
    max_query_norm: f32,
    grid: &ScoreGrid,
    null: &NullModel,
    strands: usize,
) -> f64 {
    let ceiling = grid.quantize(max_query_norm * bucket.max_column_norm);
    let alignments = (query_len + bucket.min_len - 1) * strands;

    let mut best = 1f64;
    for overlap in 1..=query_len.min(bucket.max_len) {
        #[allow(clippy::cast_possible_truncation)]
        let score = ceiling * overlap as u32;
        let raw = null.tail_probability(overlap, score);
        best = best.min(sidak_correct(raw, alignments));
    }

    best
}

use itertools::{Itertools, MinMaxResult};
use ndarray::Array2;

use crate::pwm::Pwm;

/// Inner products of every query column against every target column,
/// laid out query-major so that gapless alignments are diagonals.
pub(crate) fn score_matrix(query: &Pwm, target: &Pwm) -> Array2<f32> {
    let mut scores = Array2::zeros((query.len(), target.len()));
    for j in 0..query.len() {
        let query_column = query.column(j);
        for k in 0..target.len() {
            scores[(j, k)] = query_column.dot(&target.column(k));
        }
    }

    scores
}

/// Equal-width quantization grid over the column scores observed for one
/// query against the whole target database.
///
/// The same edges produce observed alignment scores and the null
/// histograms; a degenerate grid (every score identical) maps everything
/// to bin 0.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreGrid {
    min: f32,
    max: f32,
    bins: usize,
}

impl ScoreGrid {
    pub(crate) fn from_scores<I>(scores: I, bins: usize) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        debug_assert!(bins > 0);

        let (min, max) = match scores.into_iter().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => (0., 0.),
            MinMaxResult::OneElement(score) => (score, score),
            MinMaxResult::MinMax(min, max) => (min, max),
        };

        Self { min, max, bins }
    }

    #[inline]
    pub(crate) fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    pub(crate) fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    /// Bin index in `[0, bins)`; scores at the upper bound fall into the
    /// last bin, scores outside the range are clamped.
    pub(crate) fn quantize(&self, score: f32) -> u32 {
        if self.is_degenerate() {
            return 0;
        }

        let span = f64::from(self.max) - f64::from(self.min);
        #[allow(clippy::cast_precision_loss)]
        let scaled = (f64::from(score) - f64::from(self.min)) * self.bins as f64 / span;
        #[allow(clippy::cast_possible_truncation)]
        let bin = scaled.floor() as i64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let bin = bin.clamp(0, self.bins as i64 - 1) as u32;
        bin
    }
}

/// Per-query-column counts of quantized scores across the target
/// database, the raw material of the null distribution.
#[derive(Debug)]
pub(crate) struct ColumnHistograms {
    counts: Vec<Vec<u64>>,
}

impl ColumnHistograms {
    pub(crate) fn new(query_len: usize, bins: usize) -> Self {
        Self {
            counts: vec![vec![0; bins]; query_len],
        }
    }

    /// Record one target's score matrix, and the reverse-complement
    /// query's matrix when reverse-strand scoring is enabled.
    ///
    /// Row `j` of the reverse matrix holds scores of the complemented
    /// query column `L - 1 - j`, so pooling it into histogram row
    /// `L - 1 - j` amounts to counting the target's complemented columns
    /// against the forward query.
    pub(crate) fn record(
        &mut self,
        grid: &ScoreGrid,
        forward: &Array2<f32>,
        reverse: Option<&Array2<f32>>,
    ) {
        let query_len = self.counts.len();
        debug_assert_eq!(forward.nrows(), query_len);

        for (j, row) in self.counts.iter_mut().enumerate() {
            for &score in forward.row(j) {
                row[grid.quantize(score) as usize] += 1;
            }
            if let Some(reverse) = reverse {
                for &score in reverse.row(query_len - 1 - j) {
                    row[grid.quantize(score) as usize] += 1;
                }
            }
        }
    }

    /// Normalized per-column distributions, one probability vector per
    /// query column.
    pub(crate) fn distributions(&self) -> Vec<Vec<f64>> {
        self.counts
            .iter()
            .map(|row| {
                let total: u64 = row.iter().sum();
                debug_assert!(total > 0);
                #[allow(clippy::cast_precision_loss)]
                let scale = (total as f64).recip();
                #[allow(clippy::cast_precision_loss)]
                let distribution: Vec<f64> =
                    row.iter().map(|&count| count as f64 * scale).collect();
                distribution
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn score_matrix_is_column_inner_products() {
        let query = Pwm::from_consensus(b"AC").unwrap();
        let target = Pwm::from_consensus(b"CA").unwrap();

        let scores = score_matrix(&query, &target);
        assert_eq!(scores, array![[0., 1.], [1., 0.]]);
    }

    #[test]
    fn score_matrix_handles_arbitrary_values() {
        let query = Pwm::new(array![[0.5], [0.5], [0.], [0.]]).unwrap();
        let target = Pwm::new(array![[1., 0.], [0., 1.], [0., 0.], [0., 0.]]).unwrap();

        let scores = score_matrix(&query, &target);
        assert_abs_diff_eq!(scores[(0, 0)], 0.5);
        assert_abs_diff_eq!(scores[(0, 1)], 0.5);
    }

    #[test]
    fn quantize_spans_the_range() {
        let grid = ScoreGrid::from_scores([0., 0.25, 1.], 4);
        assert_eq!(grid.quantize(0.), 0);
        assert_eq!(grid.quantize(0.25), 1);
        assert_eq!(grid.quantize(0.5), 2);
        assert_eq!(grid.quantize(0.99), 3);
        // the upper bound falls into the last bin
        assert_eq!(grid.quantize(1.), 3);
    }

    #[test]
    fn quantize_clamps_outliers() {
        let grid = ScoreGrid::from_scores([0., 1.], 10);
        assert_eq!(grid.quantize(-5.), 0);
        assert_eq!(grid.quantize(7.), 9);
    }

    #[test]
    fn degenerate_grid_maps_everything_to_zero() {
        let grid = ScoreGrid::from_scores([0.7, 0.7, 0.7], 100);
        assert!(grid.is_degenerate());
        assert_eq!(grid.quantize(0.7), 0);
        assert_eq!(grid.quantize(123.), 0);
    }

    #[test]
    fn histograms_count_every_target_column() {
        let query = Pwm::from_consensus(b"A").unwrap();
        let target = Pwm::from_consensus(b"AC").unwrap();
        let scores = score_matrix(&query, &target);

        let grid = ScoreGrid::from_scores(scores.iter().copied(), 2);
        let mut histograms = ColumnHistograms::new(query.len(), grid.bins());
        histograms.record(&grid, &scores, None);

        let distributions = histograms.distributions();
        assert_eq!(distributions.len(), 1);
        assert_abs_diff_eq!(distributions[0][0], 0.5);
        assert_abs_diff_eq!(distributions[0][1], 0.5);
    }

    #[test]
    fn reverse_matrix_pools_complemented_columns() {
        let query = Pwm::from_consensus(b"AC").unwrap();
        let rc_query = query.reverse_complement();
        let target = Pwm::from_consensus(b"AG").unwrap();

        let forward = score_matrix(&query, &target);
        let reverse = score_matrix(&rc_query, &target);

        let grid = ScoreGrid::from_scores(
            forward.iter().copied().chain(reverse.iter().copied()),
            2,
        );
        let mut histograms = ColumnHistograms::new(query.len(), grid.bins());
        histograms.record(&grid, &forward, Some(&reverse));

        // each row pools the two target columns and their complements
        let distributions = histograms.distributions();
        for row in &distributions {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.);
        }
        // query column A matches one of the four pooled columns (A, G and
        // their complements T, C), query column C only the complement of G
        assert_abs_diff_eq!(distributions[0][1], 0.25);
        assert_abs_diff_eq!(distributions[1][1], 0.25);
    }
}

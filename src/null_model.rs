//! Per-query null distributions over integer alignment scores.
//!
//! For every overlap length the distributions of the single-column scores
//! are convolved across each contiguous window of the query and the
//! per-window results are averaged, yielding one position-independent
//! distribution per length, stored as an upper-tail cumulative array.
//! Supports longer than `median_bins` are compressed into equi-width
//! super-bins; the compression width is a power of two so that rebinning
//! merges whole bins and every window of a given length lands on the same
//! grid.

/// Upper-tail score distributions for one query, one entry per overlap
/// length in `[1, query_len]`.
#[derive(Debug)]
pub(crate) struct NullModel {
    tails: Vec<Tail>,
}

#[derive(Debug)]
struct Tail {
    width: u32,
    upper: Vec<f64>,
}

impl NullModel {
    /// Build the per-length tails from normalized per-column score
    /// distributions, each of the same (bin) length.
    pub(crate) fn from_column_distributions(columns: &[Vec<f64>], median_bins: usize) -> Self {
        debug_assert!(!columns.is_empty());
        debug_assert!(median_bins > 0);

        let query_len = columns.len();
        let bins = columns[0].len();
        let mut sums: Vec<Vec<f64>> = vec![Vec::new(); query_len];

        for start in 0..query_len {
            let mut width = width_for(support(1, bins), median_bins);
            let mut dist = compress(columns[start].clone(), width as usize);
            accumulate(&mut sums[0], &dist);

            for (offset, column) in columns[start + 1..].iter().enumerate() {
                let length = offset + 2;
                let mut next = convolve(&dist, width, column);
                let next_width = width_for(support(length, bins), median_bins);
                if next_width > width {
                    next = compress(next, (next_width / width) as usize);
                }
                width = next_width;
                accumulate(&mut sums[length - 1], &next);
                dist = next;
            }
        }

        let tails = sums
            .into_iter()
            .enumerate()
            .map(|(index, mut sum)| {
                let length = index + 1;
                #[allow(clippy::cast_precision_loss)]
                let windows = (query_len - length + 1) as f64;
                for value in &mut sum {
                    *value /= windows;
                }

                let mut acc = 0.;
                for value in sum.iter_mut().rev() {
                    acc += *value;
                    *value = acc;
                }

                Tail {
                    width: width_for(support(length, bins), median_bins),
                    upper: sum,
                }
            })
            .collect();

        Self { tails }
    }

    /// Probability of an integer score sum of at least `score` for an
    /// alignment of the given overlap length.
    pub(crate) fn tail_probability(&self, overlap: usize, score: u32) -> f64 {
        debug_assert!(overlap >= 1 && overlap <= self.tails.len());

        let tail = &self.tails[overlap - 1];
        let index = ((score / tail.width) as usize).min(tail.upper.len() - 1);
        tail.upper[index]
    }
}

/// Integer support size for an overlap of `length` columns.
#[inline]
fn support(length: usize, bins: usize) -> usize {
    length * (bins - 1) + 1
}

/// Smallest power-of-two super-bin width keeping the compressed support
/// within `median_bins`.
fn width_for(support: usize, median_bins: usize) -> u32 {
    let mut width: u32 = 1;
    while (support + width as usize - 1) / width as usize > median_bins {
        width *= 2;
    }
    width
}

/// Merge `factor` adjacent bins; a factor of 1 is the identity.
fn compress(dist: Vec<f64>, factor: usize) -> Vec<f64> {
    if factor <= 1 {
        return dist;
    }

    dist.chunks(factor).map(|chunk| chunk.iter().sum()).collect()
}

/// Convolve a distribution living on super-bins of `width` raw score
/// units with one unit-width column distribution; the column's bins are
/// rounded to the nearest super-bin offset.
fn convolve(dist: &[f64], width: u32, column: &[f64]) -> Vec<f64> {
    let width = width as usize;
    let offsets: Vec<usize> = (0..column.len())
        .map(|bin| (2 * bin + width) / (2 * width))
        .collect();

    let mut out = vec![0.; dist.len() + offsets[column.len() - 1]];
    for (index, &mass) in dist.iter().enumerate() {
        if mass == 0. {
            continue;
        }
        for (&offset, &p) in offsets.iter().zip(column) {
            out[index + offset] += mass * p;
        }
    }

    out
}

fn accumulate(total: &mut Vec<f64>, dist: &[f64]) {
    if total.len() < dist.len() {
        total.resize(dist.len(), 0.);
    }
    for (total, value) in total.iter_mut().zip(dist) {
        *total += value;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn single_column_tail_is_the_reversed_cumulative() {
        let columns = vec![vec![0.25; 4]];
        let null = NullModel::from_column_distributions(&columns, 1000);

        assert_abs_diff_eq!(null.tail_probability(1, 0), 1.);
        assert_abs_diff_eq!(null.tail_probability(1, 1), 0.75);
        assert_abs_diff_eq!(null.tail_probability(1, 2), 0.5);
        assert_abs_diff_eq!(null.tail_probability(1, 3), 0.25);
    }

    #[test]
    fn two_columns_convolve_exactly() {
        // two fair coins over bins {0, 1}
        let columns = vec![vec![0.5, 0.5]; 2];
        let null = NullModel::from_column_distributions(&columns, 1000);

        assert_abs_diff_eq!(null.tail_probability(2, 0), 1.);
        assert_abs_diff_eq!(null.tail_probability(2, 1), 0.75);
        assert_abs_diff_eq!(null.tail_probability(2, 2), 0.25);
    }

    #[test]
    fn window_average_covers_every_contiguous_window() {
        // the length-1 null averages both columns
        let columns = vec![vec![1., 0.], vec![0., 1.]];
        let null = NullModel::from_column_distributions(&columns, 1000);

        assert_abs_diff_eq!(null.tail_probability(1, 0), 1.);
        assert_abs_diff_eq!(null.tail_probability(1, 1), 0.5);
    }

    #[test]
    fn tails_start_at_one_for_every_length() {
        let columns = vec![
            vec![0.1, 0.2, 0.3, 0.4],
            vec![0.4, 0.3, 0.2, 0.1],
            vec![0.25, 0.25, 0.25, 0.25],
        ];
        for median_bins in [2, 5, 1000] {
            let null = NullModel::from_column_distributions(&columns, median_bins);
            for overlap in 1..=columns.len() {
                assert_abs_diff_eq!(null.tail_probability(overlap, 0), 1., epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn compression_preserves_mass_and_monotonicity() {
        let columns = vec![vec![0.05; 20]; 6];
        let null = NullModel::from_column_distributions(&columns, 16);

        for overlap in 1..=columns.len() {
            assert_abs_diff_eq!(null.tail_probability(overlap, 0), 1., epsilon = 1e-12);

            let max_score = (overlap * 19) as u32;
            let mut previous = f64::INFINITY;
            for score in 0..=max_score {
                let tail = null.tail_probability(overlap, score);
                assert!(tail <= previous + 1e-12);
                previous = tail;
            }
        }
    }

    #[test]
    fn super_bin_width_is_a_power_of_two() {
        assert_eq!(width_for(100, 1000), 1);
        assert_eq!(width_for(1001, 1000), 2);
        assert_eq!(width_for(4001, 1000), 8);
        for support in [1, 17, 999, 12345] {
            let width = width_for(support, 37) as usize;
            assert!(width.is_power_of_two());
            assert!((support + width - 1) / width <= 37);
        }
    }

    #[test]
    fn compress_merges_whole_bins() {
        let dist = vec![0.1, 0.2, 0.3, 0.15, 0.25];
        let merged = compress(dist, 2);
        assert_eq!(merged.len(), 3);
        assert_abs_diff_eq!(merged[0], 0.3);
        assert_abs_diff_eq!(merged[1], 0.45);
        assert_abs_diff_eq!(merged[2], 0.25);
    }

    #[test]
    fn unit_width_convolution_is_exact() {
        let dist = vec![0.5, 0.5];
        let column = vec![0.25, 0.75];
        let out = convolve(&dist, 1, &column);
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0], 0.125);
        assert_abs_diff_eq!(out[1], 0.5);
        assert_abs_diff_eq!(out[2], 0.375);
    }
}

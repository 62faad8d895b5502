use std::fmt;

use ndarray::Array2;
use serde::Serialize;

/// Strand of the query that produced the winning alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,

    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    #[inline]
    pub fn is_reverse(self) -> bool {
        matches!(self, Self::Reverse)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => f.write_str("+"),
            Self::Reverse => f.write_str("-"),
        }
    }
}

/// One query/target comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    /// Index of the target in the searched database.
    pub target: usize,

    /// Corrected p-value of the best alignment.
    pub pvalue: f64,

    /// Integer score sum of the best alignment.
    pub score: u32,

    /// Shift of the query's first column relative to the target's first
    /// column.
    pub offset: i32,

    /// Number of aligned columns.
    pub overlap: u32,

    /// Query strand of the best alignment.
    pub strand: Strand,
}

/// Non-fatal conditions surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Warning {
    /// `nearest` exceeded the number of targets and was clamped.
    NearestTruncated { requested: usize, targets: usize },

    /// Every column score of this query was identical; all its scores
    /// fall in bin 0 and its p-values are 1.
    DegenerateScores { query: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NearestTruncated { requested, targets } => write!(
                f,
                "nearest = {requested} exceeds the {targets} available targets and was clamped",
            ),
            Self::DegenerateScores { query } => write!(
                f,
                "query {query} scores every target column identically; its p-values are 1",
            ),
        }
    }
}

/// Result matrices of a search, indexed by `(query, target)`, or by
/// `(query, rank)` in top-K mode, where rows are sorted by ascending
/// p-value and `target_indices` maps ranks back to targets.
#[derive(Debug)]
pub struct SearchOutput {
    pvalues: Array2<f64>,
    scores: Array2<u32>,
    offsets: Array2<i32>,
    overlaps: Array2<u32>,
    strands: Array2<Strand>,
    target_indices: Option<Array2<usize>>,
    warnings: Vec<Warning>,
}

impl SearchOutput {
    pub(crate) fn from_rows(
        rows: Vec<Vec<Hit>>,
        with_indices: bool,
        warnings: Vec<Warning>,
    ) -> Self {
        let queries = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|row| row.len() == width));

        let pvalues = Array2::from_shape_fn((queries, width), |(q, c)| rows[q][c].pvalue);
        let scores = Array2::from_shape_fn((queries, width), |(q, c)| rows[q][c].score);
        let offsets = Array2::from_shape_fn((queries, width), |(q, c)| rows[q][c].offset);
        let overlaps = Array2::from_shape_fn((queries, width), |(q, c)| rows[q][c].overlap);
        let strands = Array2::from_shape_fn((queries, width), |(q, c)| rows[q][c].strand);
        let target_indices = with_indices
            .then(|| Array2::from_shape_fn((queries, width), |(q, c)| rows[q][c].target));

        Self {
            pvalues,
            scores,
            offsets,
            overlaps,
            strands,
            target_indices,
            warnings,
        }
    }

    /// Corrected p-values in `[0, 1]`.
    #[inline]
    pub fn pvalues(&self) -> &Array2<f64> {
        &self.pvalues
    }

    /// Integer score sums of the best alignments.
    #[inline]
    pub fn scores(&self) -> &Array2<u32> {
        &self.scores
    }

    /// Winning offsets.
    #[inline]
    pub fn offsets(&self) -> &Array2<i32> {
        &self.offsets
    }

    /// Winning overlap lengths (at least 1).
    #[inline]
    pub fn overlaps(&self) -> &Array2<u32> {
        &self.overlaps
    }

    /// Winning strands.
    #[inline]
    pub fn strands(&self) -> &Array2<Strand> {
        &self.strands
    }

    /// Target indices per rank; present only in top-K mode.
    #[inline]
    pub fn target_indices(&self) -> Option<&Array2<usize>> {
        self.target_indices.as_ref()
    }

    /// Non-fatal diagnostics, in query order.
    #[inline]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Assemble the per-pair record at `(query, column)`.
    pub fn hit(&self, query: usize, column: usize) -> Hit {
        Hit {
            target: self
                .target_indices
                .as_ref()
                .map_or(column, |indices| indices[(query, column)]),
            pvalue: self.pvalues[(query, column)],
            score: self.scores[(query, column)],
            offset: self.offsets[(query, column)],
            overlap: self.overlaps[(query, column)],
            strand: self.strands[(query, column)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(target: usize, pvalue: f64) -> Hit {
        Hit {
            target,
            pvalue,
            score: 42,
            offset: -1,
            overlap: 3,
            strand: Strand::Forward,
        }
    }

    #[test]
    fn strand_display() {
        assert_eq!(Strand::Forward.to_string(), "+");
        assert_eq!(Strand::Reverse.to_string(), "-");
        assert!(Strand::Reverse.is_reverse());
        assert!(!Strand::Forward.is_reverse());
    }

    #[test]
    fn full_mode_hits_use_the_column_as_target() {
        let output =
            SearchOutput::from_rows(vec![vec![hit(0, 0.5), hit(1, 0.25)]], false, Vec::new());
        assert_eq!(output.pvalues().dim(), (1, 2));
        assert!(output.target_indices().is_none());

        let second = output.hit(0, 1);
        assert_eq!(second.target, 1);
        assert_eq!(second.pvalue, 0.25);
        assert_eq!(second.score, 42);
    }

    #[test]
    fn top_k_mode_keeps_target_indices() {
        let output = SearchOutput::from_rows(vec![vec![hit(7, 0.1)]], true, Vec::new());
        assert_eq!(output.target_indices().unwrap()[(0, 0)], 7);
        assert_eq!(output.hit(0, 0).target, 7);
    }

    #[test]
    fn warning_display() {
        let warning = Warning::NearestTruncated {
            requested: 10,
            targets: 3,
        };
        assert_eq!(
            warning.to_string(),
            "nearest = 10 exceeds the 3 available targets and was clamped",
        );
    }
}

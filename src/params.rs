use crate::Error;

/// Search configuration.
///
/// `Default` matches the documented defaults of the algorithm; none of
/// them is ever adjusted silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    /// Keep only the N targets with the smallest p-values per query.
    ///
    /// `None` returns the full query×target result matrices.
    pub nearest: Option<usize>,

    /// Number of bins used to quantize real column scores.
    pub score_bins: usize,

    /// Upper bound on the support of a convolved score distribution;
    /// longer supports are rebinned into equi-width super-bins.
    pub median_bins: usize,

    /// Number of approximate target classes used by the top-K selector.
    pub target_bins: usize,

    /// Capacity of the per-query null-model cache; 0 disables retention.
    pub cache_size: usize,

    /// Score the reverse complement of each query as well.
    pub reverse_complement: bool,

    /// Worker threads; `None` (or 0) uses all available cores.
    pub threads: Option<usize>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            nearest: None,
            score_bins: 100,
            median_bins: 1000,
            target_bins: 100,
            cache_size: 100,
            reverse_complement: true,
            threads: None,
        }
    }
}

impl Params {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("score_bins", self.score_bins),
            ("median_bins", self.median_bins),
            ("target_bins", self.target_bins),
        ] {
            if value == 0 {
                return Err(Error::InvalidParameter { name });
            }
        }

        if self.nearest == Some(0) {
            return Err(Error::InvalidParameter { name: "nearest" });
        }

        Ok(())
    }

    #[inline]
    pub(crate) fn strands(&self) -> usize {
        if self.reverse_complement {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let params = Params::default();
        assert_eq!(params.nearest, None);
        assert_eq!(params.score_bins, 100);
        assert_eq!(params.median_bins, 1000);
        assert_eq!(params.target_bins, 100);
        assert_eq!(params.cache_size, 100);
        assert!(params.reverse_complement);
        assert_eq!(params.threads, None);
    }

    #[test]
    fn zero_bins_are_rejected() {
        for field in ["score_bins", "median_bins", "target_bins"] {
            let mut params = Params::default();
            match field {
                "score_bins" => params.score_bins = 0,
                "median_bins" => params.median_bins = 0,
                _ => params.target_bins = 0,
            }
            assert!(matches!(
                params.validate(),
                Err(Error::InvalidParameter { name }) if name == field,
            ));
        }
    }

    #[test]
    fn zero_nearest_is_rejected() {
        let params = Params {
            nearest: Some(0),
            ..Params::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter { name: "nearest" }),
        ));
    }

    #[test]
    fn strand_count_follows_reverse_complement() {
        assert_eq!(Params::default().strands(), 2);
        let params = Params {
            reverse_complement: false,
            ..Params::default()
        };
        assert_eq!(params.strands(), 1);
    }
}

use std::{cmp::Ordering, collections::BinaryHeap, hash::Hasher};

use fnv::FnvHasher;
use rayon::prelude::*;

use crate::{
    aligner::{alignment_count, best_alignment},
    cache::LruCache,
    nearest::{bucket_bound, TargetBuckets},
    null_model::NullModel,
    params::Params,
    pvalue::sidak_correct,
    pwm::Pwm,
    results::{Hit, SearchOutput, Warning},
    scoring::{score_matrix, ColumnHistograms, ScoreGrid},
    Error,
};

/// The quantization grid and convolved null of one query against one
/// target database, the expensive per-query state worth caching.
#[derive(Debug)]
pub(crate) struct QueryNull {
    grid: ScoreGrid,
    null: NullModel,
    degenerate: bool,
}

/// The motif-comparison engine: validated parameters plus the bounded
/// null-model cache, reusable across searches.
#[derive(Debug)]
pub struct Tomtom {
    params: Params,
    cache: LruCache<QueryNull>,
}

impl Tomtom {
    pub fn new(params: Params) -> Result<Self, Error> {
        params.validate()?;
        let cache = LruCache::new(params.cache_size);

        Ok(Self { params, cache })
    }

    #[inline]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Compare every query against every target.
    ///
    /// Queries are scored independently on a work-stealing pool; the call
    /// blocks until all of them finish. Without `nearest` the output is
    /// the full query×target matrix set; with `nearest = K`, each row
    /// holds the K targets with the smallest p-values, sorted ascending.
    pub fn search(&self, queries: &[Pwm], targets: &[Pwm]) -> Result<SearchOutput, Error> {
        if queries.is_empty() {
            return Err(Error::EmptyQueries);
        }
        if targets.is_empty() {
            return Err(Error::EmptyTargets);
        }

        let mut warnings = Vec::new();
        let nearest = match self.params.nearest {
            Some(requested) if requested > targets.len() => {
                warnings.push(Warning::NearestTruncated {
                    requested,
                    targets: targets.len(),
                });
                Some(targets.len())
            }
            other => other,
        };

        let buckets = nearest.map(|_| TargetBuckets::build(targets, self.params.target_bins));
        let targets_digest = digest_targets(targets);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.threads.unwrap_or(0))
            .build()?;

        let rows: Vec<QueryRow> = pool.install(|| {
            queries
                .par_iter()
                .enumerate()
                .map(|(index, query)| {
                    self.handle_query(index, query, targets, targets_digest, nearest, buckets.as_ref())
                })
                .collect()
        });

        let mut hit_rows = Vec::with_capacity(rows.len());
        for row in rows {
            warnings.extend(row.warnings);
            hit_rows.push(row.hits);
        }

        Ok(SearchOutput::from_rows(hit_rows, nearest.is_some(), warnings))
    }

    fn handle_query(
        &self,
        index: usize,
        query: &Pwm,
        targets: &[Pwm],
        targets_digest: u64,
        nearest: Option<usize>,
        buckets: Option<&TargetBuckets>,
    ) -> QueryRow {
        let rc_query = self
            .params
            .reverse_complement
            .then(|| query.reverse_complement());

        let key = self.cache_key(query, targets_digest);
        let shared = self.cache.get_or_insert_with(key, || {
            build_query_null(query, rc_query.as_ref(), targets, &self.params)
        });

        let mut warnings = Vec::new();
        if shared.degenerate {
            warnings.push(Warning::DegenerateScores { query: index });
        }

        let hits = match (nearest, buckets) {
            (Some(keep), Some(buckets)) => {
                self.nearest_hits(query, rc_query.as_ref(), targets, &shared, keep, buckets)
            }
            _ => targets
                .iter()
                .enumerate()
                .map(|(target_index, target)| {
                    self.score_pair(query, rc_query.as_ref(), target, target_index, &shared)
                })
                .collect(),
        };

        QueryRow { hits, warnings }
    }

    fn score_pair(
        &self,
        query: &Pwm,
        rc_query: Option<&Pwm>,
        target: &Pwm,
        target_index: usize,
        shared: &QueryNull,
    ) -> Hit {
        let forward = score_matrix(query, target);
        let reverse = rc_query.map(|rc_query| score_matrix(rc_query, target));
        let best = best_alignment(&shared.grid, &forward, reverse.as_ref());

        let alignments = alignment_count(query.len(), target.len(), self.params.strands());
        let raw = shared.null.tail_probability(best.overlap as usize, best.score);

        Hit {
            target: target_index,
            pvalue: sidak_correct(raw, alignments),
            score: best.score,
            offset: best.offset,
            overlap: best.overlap,
            strand: best.strand,
        }
    }

    /// Exact scoring bucket by bucket; once K results are held, buckets
    /// whose optimistic bound cannot beat the current K-th best p-value
    /// are skipped whole.
    fn nearest_hits(
        &self,
        query: &Pwm,
        rc_query: Option<&Pwm>,
        targets: &[Pwm],
        shared: &QueryNull,
        keep: usize,
        buckets: &TargetBuckets,
    ) -> Vec<Hit> {
        let max_query_norm = query.column_norms().into_iter().fold(0f32, f32::max);

        let mut worst: BinaryHeap<RankedHit> = BinaryHeap::with_capacity(keep + 1);
        for bucket in buckets.iter() {
            if worst.len() == keep {
                let kth = worst.peek().expect("heap is non-empty").0.pvalue;
                let bound = bucket_bound(
                    bucket,
                    query.len(),
                    max_query_norm,
                    &shared.grid,
                    &shared.null,
                    self.params.strands(),
                );
                if bound > kth {
                    continue;
                }
            }

            for &member in &bucket.members {
                let target_index = member as usize;
                let hit = self.score_pair(
                    query,
                    rc_query,
                    &targets[target_index],
                    target_index,
                    shared,
                );

                if worst.len() < keep {
                    worst.push(RankedHit(hit));
                } else if worst
                    .peek()
                    .map_or(false, |peeked| RankedHit(hit.clone()) < *peeked)
                {
                    worst.pop();
                    worst.push(RankedHit(hit));
                }
            }
        }

        let mut hits: Vec<Hit> = worst.into_iter().map(|ranked| ranked.0).collect();
        hits.sort_unstable_by(rank_hits);
        hits
    }

    fn cache_key(&self, query: &Pwm, targets_digest: u64) -> u64 {
        let mut hasher = FnvHasher::default();
        hasher.write_u64(query.content_hash());
        hasher.write_u64(targets_digest);
        hasher.write_usize(self.params.score_bins);
        hasher.write_usize(self.params.median_bins);
        hasher.write_u8(u8::from(self.params.reverse_complement));
        hasher.finish()
    }
}

struct QueryRow {
    hits: Vec<Hit>,
    warnings: Vec<Warning>,
}

/// Score matrices against the whole database, the shared quantization
/// grid, pooled per-column histograms, and the convolved null.
fn build_query_null(
    query: &Pwm,
    rc_query: Option<&Pwm>,
    targets: &[Pwm],
    params: &Params,
) -> QueryNull {
    let forward: Vec<_> = targets
        .iter()
        .map(|target| score_matrix(query, target))
        .collect();
    let reverse: Option<Vec<_>> = rc_query.map(|rc_query| {
        targets
            .iter()
            .map(|target| score_matrix(rc_query, target))
            .collect()
    });

    let forward_scores = forward.iter().flat_map(|matrix| matrix.iter().copied());
    let reverse_scores = reverse
        .iter()
        .flat_map(|matrices| matrices.iter().flat_map(|matrix| matrix.iter().copied()));
    let grid = ScoreGrid::from_scores(forward_scores.chain(reverse_scores), params.score_bins);

    let mut histograms = ColumnHistograms::new(query.len(), grid.bins());
    for (index, matrix) in forward.iter().enumerate() {
        histograms.record(
            &grid,
            matrix,
            reverse.as_ref().map(|matrices| &matrices[index]),
        );
    }

    let null =
        NullModel::from_column_distributions(&histograms.distributions(), params.median_bins);

    QueryNull {
        degenerate: grid.is_degenerate(),
        grid,
        null,
    }
}

fn digest_targets(targets: &[Pwm]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write_usize(targets.len());
    for target in targets {
        hasher.write_u64(target.content_hash());
    }
    hasher.finish()
}

/// Heap ordering: the worst hit (largest p-value, then largest target
/// index) sits on top, ready to be displaced.
#[derive(Debug, Clone)]
struct RankedHit(Hit);

impl PartialEq for RankedHit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedHit {}

impl PartialOrd for RankedHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedHit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .pvalue
            .total_cmp(&other.0.pvalue)
            .then_with(|| self.0.target.cmp(&other.0.target))
    }
}

fn rank_hits(a: &Hit, b: &Hit) -> Ordering {
    a.pvalue
        .total_cmp(&b.pvalue)
        .then_with(|| a.target.cmp(&b.target))
}

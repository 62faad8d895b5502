//! Fast Tomtom-style comparison of DNA position-weight matrices.
//!
//! Given a set of query PWMs and a target database, every pair is scored
//! over all gapless offsets (optionally including the reverse complement
//! of the query), and the best integer score is converted into a p-value
//! using a per-query null distribution convolved from the column scores
//! of the whole database. Results come back as query×target matrices of
//! p-values, scores, offsets, overlaps and strands, or as the K nearest
//! targets per query.
//!
//! ```
//! use tomtom::{Params, Pwm, Tomtom};
//!
//! let queries = vec![Pwm::from_consensus(b"ACGT")?];
//! let targets = vec![
//!     Pwm::from_consensus(b"TTACGTTT")?,
//!     Pwm::from_consensus(b"CCCC")?,
//! ];
//!
//! let engine = Tomtom::new(Params::default())?;
//! let output = engine.search(&queries, &targets)?;
//! assert_eq!(output.pvalues().dim(), (1, 2));
//! assert!(output.pvalues()[(0, 0)] < output.pvalues()[(0, 1)]);
//! # Ok::<(), tomtom::Error>(())
//! ```
//!
//! Parsing of motif files and any command-line surface are left to
//! callers; the engine consumes already-built [`Pwm`] values.

mod aligner;
mod cache;
mod nearest;
mod null_model;
mod params;
mod pvalue;
mod pwm;
mod results;
mod scoring;
mod search;

pub use params::Params;
pub use pwm::{Base, InvalidBase, Pwm};
pub use results::{Hit, SearchOutput, Strand, Warning};
pub use search::Tomtom;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("PWM must have 4 rows and at least one column, got {rows}x{columns}")]
    InvalidShape { rows: usize, columns: usize },

    #[error("invalid nucleobase {0:?}")]
    InvalidBase(char),

    #[error("no query motifs provided")]
    EmptyQueries,

    #[error("no target motifs provided")]
    EmptyTargets,

    #[error("{name} must be greater than zero")]
    InvalidParameter { name: &'static str },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One-shot comparison of `queries` against `targets`.
///
/// Builds a throwaway [`Tomtom`] engine; keep one around instead when
/// searching repeatedly, so the per-query null models can be reused.
pub fn tomtom(queries: &[Pwm], targets: &[Pwm], params: &Params) -> Result<SearchOutput, Error> {
    Tomtom::new(params.clone())?.search(queries, targets)
}

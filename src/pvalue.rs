/// Šidák-style correction of a per-alignment tail probability for the
/// number of alignments considered: `1 - (1 - raw)^alignments`.
///
/// Evaluated in log space so that tiny tails survive the exponentiation,
/// and clamped to `[0, 1]`.
pub(crate) fn sidak_correct(raw: f64, alignments: usize) -> f64 {
    debug_assert!(alignments > 0);

    let raw = raw.clamp(0., 1.);
    if raw >= 1. {
        return 1.;
    }

    #[allow(clippy::cast_precision_loss)]
    let alignments = alignments as f64;
    (-(alignments * (1. - raw).ln()).exp_m1()).clamp(0., 1.)
}

//! Min-max rescaling of raw scores into `[0, max_score]`.

/// Scale `raw` linearly from `[min, max]` into `[0, max_score]`.
///
/// When `max == min` there is no signal and the result is 0. The division
/// is done in floating point and truncated, so only the actual maximum
/// reaches `max_score`. Differences are taken in floating point so the
/// full `i64` range is accepted.
pub fn normalize(raw: i64, min: i64, max: i64, max_score: i64) -> i64 {
    if max <= min {
        return 0;
    }
    let ratio = (raw as f64 - min as f64) / (max as f64 - min as f64);
    let score = (max_score as f64 * ratio) as i64;
    score.clamp(0, max_score)
}

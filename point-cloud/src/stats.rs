//! Scalar statistics over point coordinates.

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let sum: f64 = data.iter().sum();
    Some(sum / data.len() as f64)
}

/// Population standard deviation.
pub fn std(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Quantile with linear interpolation between closest ranks.
///
/// `q` is clamped to `[0, 1]`; `q = 0` and `q = 1` give the minimum and the
/// maximum. NaN values are ordered last.
pub fn quantile(data: &[f64], q: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(quantile_sorted(&sorted, q))
}

/// `(quantile(q_low), quantile(q_high))` with a single sort.
pub fn quantile_range(data: &[f64], q_low: f64, q_high: f64) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some((quantile_sorted(&sorted, q_low), quantile_sorted(&sorted, q_high)))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let q = if q.is_nan() { 0.5 } else { q.clamp(0.0, 1.0) };
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let t = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * t
}

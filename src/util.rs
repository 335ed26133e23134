//! Small numeric helpers for the end-of-session summary.

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;
    Some(variance.sqrt())
}

/// Bucket timestamps into whole-second counts from `start_ms` to
/// `end_ms` inclusive. Timestamps outside the range are dropped.
pub fn per_second_buckets(timestamps_ms: &[u64], start_ms: u64, end_ms: u64) -> Vec<f64> {
    if end_ms < start_ms {
        return Vec::new();
    }
    let seconds = ((end_ms - start_ms) / 1000 + 1) as usize;
    let mut buckets = vec![0.0; seconds];
    for &ts in timestamps_ms {
        if ts < start_ms || ts > end_ms {
            continue;
        }
        buckets[((ts - start_ms) / 1000) as usize] += 1.0;
    }
    buckets
}

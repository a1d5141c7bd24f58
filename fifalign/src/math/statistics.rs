//! Statistical helpers: median, mean, standard deviation.

/// Median of `data`, partially reordering it (quickselect).
///
/// Even-length inputs average the two middle values. NaNs are ordered last.
pub fn median_mut(data: &mut [f64]) -> f64 {
    debug_assert!(!data.is_empty());

    let len = data.len();
    let mid = len / 2;

    let (left_part, median, _) = data.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper = *median;
    if len & 1 == 1 {
        upper
    } else {
        let lower = left_part.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lower + upper) * 0.5
    }
}

/// Median without touching the input.
pub fn median(data: &[f64]) -> f64 {
    let mut scratch = data.to_vec();
    median_mut(&mut scratch)
}

#[inline]
pub fn mean(data: &[f64]) -> f64 {
    debug_assert!(!data.is_empty());
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(data: &[f64]) -> f64 {
    debug_assert!(!data.is_empty());
    let mu = mean(data);
    let var = data.iter().map(|&v| (v - mu) * (v - mu)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

/// Index and value of the first maximum.
pub fn argmax(data: &[f64]) -> (usize, f64) {
    debug_assert!(!data.is_empty());
    let mut best = (0, data[0]);
    for (i, &v) in data.iter().enumerate().skip(1) {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

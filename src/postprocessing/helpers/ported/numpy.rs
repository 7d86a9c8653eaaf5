/* PORTED NUMPY FUNCTIONS */

/// Returns the location of the maximum element in the array.
///
/// # Arguments
///
/// * `arr` - Input array.
///
/// # Returns
///
/// * The location of the first maximum element, or `None` if the array is empty.
///   NaN entries never win.
pub fn arg_max(arr: &[f32]) -> Option<usize> {
    arr.iter()
        .enumerate()
        .reduce(|(max_index, max_value), (current_index, current_value)| {
            if current_value > max_value || max_value.is_nan() {
                (current_index, current_value)
            } else {
                (max_index, max_value)
            }
        })
        .map(|(index, _)| index)
}

/// Limit a value to `[min, max]`. NaN maps to `min`.
pub fn clip(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Softmax over `logits / temperature`, renormalised to sum to 1.
///
/// # Arguments
///
/// * `logits` - Unnormalised log-probabilities.
/// * `temperature` - Divisor applied before exponentiation.
///
/// # Returns
///
/// * Probabilities, or `None` when no entry carries finite positive mass.
pub fn softmax(logits: &[f32], temperature: f64) -> Option<Vec<f64>> {
    let scaled: Vec<f64> = logits.iter().map(|&l| l as f64 / temperature).collect();
    let max = scaled
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }

    let exps: Vec<f64> = scaled
        .iter()
        .map(|&v| if v.is_nan() { 0.0 } else { (v - max).exp() })
        .collect();
    let sum: f64 = exps.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return None;
    }

    Some(exps.into_iter().map(|e| e / sum).collect())
}

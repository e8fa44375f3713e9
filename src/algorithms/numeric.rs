//! Small numeric helpers shared by the metric implementations.

/// Minimum of three values.
#[inline]
#[must_use]
pub fn min3<T: Ord>(a: T, b: T, c: T) -> T {
    a.min(b).min(c)
}

/// Clamp a score into [0, 1]. NaN maps to 0.
#[inline]
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// `numerator / denominator`, or 0 when the denominator is zero.
#[inline]
#[must_use]
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Integer variant of [`ratio`].
#[inline]
#[must_use]
pub fn count_ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Round to `digits` decimal places.
#[inline]
#[must_use]
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// `1 - distance / max_len`, treating two empty strings as identical.
#[inline]
#[must_use]
pub fn distance_to_similarity(distance: usize, max_len: usize) -> f64 {
    if max_len == 0 {
        1.0
    } else {
        1.0 - distance as f64 / max_len as f64
    }
}

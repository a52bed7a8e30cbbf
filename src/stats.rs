//! Summary statistics over similarity scores.

use num_traits::Float;
use std::iter::Sum;

/// Decimal places kept for reported similarity scores.
pub const SCORE_DECIMALS: i32 = 4;

/// Calculate the median.
pub fn median<F: Float + Sum>(numbers: &mut [F]) -> Option<F> {
    if numbers.is_empty() {
        return None;
    }
    let mid = numbers.len() / 2;
    if numbers.len() % 2 == 0 {
        numbers.select_nth_unstable_by(mid - 1, |a, b| a.total_cmp_float(b));
        let lower = numbers[mid - 1];
        numbers.select_nth_unstable_by(mid, |a, b| a.total_cmp_float(b));
        let upper = numbers[mid];
        Some((lower + upper) / (F::one() + F::one()))
    } else {
        numbers.select_nth_unstable_by(mid, |a, b| a.total_cmp_float(b));
        Some(numbers[mid])
    }
}

/// Calculate the minimum, ignoring NaN.
pub fn minimum<F: Float>(numbers: &[F]) -> Option<F> {
    numbers
        .iter()
        .copied()
        .filter(|x| !x.is_nan())
        .min_by(|a, b| a.total_cmp_float(b))
}

/// Calculate the mean.
pub fn mean<F: Float + Sum>(numbers: &[F]) -> Option<F> {
    if numbers.is_empty() {
        return None;
    }
    let sum: F = numbers.iter().copied().sum();
    F::from(numbers.len()).map(|n| sum / n)
}

/// Linearly interpolated quantile of *sorted* data, `q` in [0, 1].
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Round a score to [`SCORE_DECIMALS`] decimal places.
pub fn round_score(x: f64) -> f64 {
    let factor = 10f64.powi(SCORE_DECIMALS);
    (x * factor).round() / factor
}

/// The five-number summary drawn by a box-and-whisker plot, with 1.5 IQR
/// whiskers, outliers beyond them, and the mean.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub mean: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    pub fn new(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let median = quantile_sorted(&sorted, 0.5)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let mean = mean(&sorted)?;
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
        let inside = sorted.iter().filter(|&&x| x >= low_fence && x <= high_fence);
        let whisker_low = inside.clone().copied().next().unwrap_or(q1);
        let whisker_high = inside.copied().last().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&x| x < low_fence || x > high_fence)
            .collect();
        Some(Self {
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            mean,
            outliers,
        })
    }
}

/// Total ordering for floats, NaN sorting last.
trait TotalCmpFloat {
    fn total_cmp_float(&self, other: &Self) -> std::cmp::Ordering;
}

impl<F: Float> TotalCmpFloat for F {
    fn total_cmp_float(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap_or_else(|| {
            if self.is_nan() && !other.is_nan() {
                std::cmp::Ordering::Greater
            } else if !self.is_nan() && other.is_nan() {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_empty() {
        let mut numbers: Vec<f64> = vec![];
        assert_eq!(median(&mut numbers), None);
    }

    #[test]
    fn test_median_odd() {
        let mut numbers = vec![0.9, 1.0, 0.8];
        assert_eq!(median(&mut numbers), Some(0.9));
    }

    #[test]
    fn test_median_even() {
        let mut numbers = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(median(&mut numbers), Some(2.5));
    }

    #[test]
    fn test_minimum_and_mean() {
        assert_eq!(minimum(&[0.95, 0.9, f64::NAN, 0.95]), Some(0.9));
        assert_eq!(minimum::<f64>(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.123456), 0.1235);
        assert_eq!(round_score(0.9), 0.9);
        assert_eq!(round_score(1.0), 1.0);
    }

    #[test]
    fn test_quantiles() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&sorted, 0.25), Some(2.0));
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(3.0));
        assert_eq!(quantile_sorted(&[1.0, 2.0], 0.5), Some(1.5));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_box_summary_outliers() {
        let values = [0.97, 0.98, 0.99, 0.98, 0.97, 0.5];
        let summary = BoxSummary::new(&values).unwrap();
        assert_eq!(summary.outliers, vec![0.5]);
        assert_eq!(summary.whisker_low, 0.97);
        assert_eq!(summary.whisker_high, 0.99);
        assert!(BoxSummary::new(&[]).is_none());
    }
}

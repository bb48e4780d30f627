use crate::derive::{split_nulls, DerivedColumns};
use serde::Serialize;

pub const DELIVERY_LABEL: &str = "Delivery duration";
pub const ESTIMATE_LABEL: &str = "Estimate vs actual";

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub name: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            min: 0.0,
            q1: 0.0,
            median: 0.0,
            q3: 0.0,
            max: 0.0,
            lower_whisker: 0.0,
            upper_whisker: 0.0,
            outliers: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn from_values(name: impl Into<String>, values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Self::empty(name);
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let lower_fence = q1 - 1.5 * iqr;
        let upper_fence = q3 + 1.5 * iqr;

        let inside = sorted
            .iter()
            .copied()
            .filter(|v| *v >= lower_fence && *v <= upper_fence);
        let lower_whisker = inside.clone().next().unwrap_or(q1);
        let upper_whisker = inside.last().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < lower_fence || *v > upper_fence)
            .collect();

        Self {
            name: name.into(),
            count: sorted.len(),
            min: sorted[0],
            q1,
            median,
            q3,
            max: sorted[sorted.len() - 1],
            lower_whisker,
            upper_whisker,
            outliers,
        }
    }

    /// Lowest and highest point drawn (whiskers and outliers)
    pub fn extent(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Actual delivery time next to how far the promise was off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryComparison {
    pub delivery: BoxSummary,
    pub estimate_delta: BoxSummary,
}

impl DeliveryComparison {
    pub fn is_empty(&self) -> bool {
        self.delivery.is_empty() && self.estimate_delta.is_empty()
    }

    pub fn series(&self) -> [&BoxSummary; 2] {
        [&self.delivery, &self.estimate_delta]
    }

    /// Shared y range across both boxes, or None when both are empty
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.series()
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(BoxSummary::extent)
            .reduce(|(a_lo, a_hi), (b_lo, b_hi)| (a_lo.min(b_lo), a_hi.max(b_hi)))
    }
}

pub fn delivery_comparison(derived: &DerivedColumns) -> DeliveryComparison {
    let (delivery, _) = split_nulls(&derived.delivery_days);
    let (estimate, _) = split_nulls(&derived.estimate_delta_days);

    let to_f64 = |v: Vec<i64>| v.into_iter().map(|d| d as f64).collect::<Vec<_>>();
    DeliveryComparison {
        delivery: BoxSummary::from_values(DELIVERY_LABEL, &to_f64(delivery)),
        estimate_delta: BoxSummary::from_values(ESTIMATE_LABEL, &to_f64(estimate)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quartiles_interpolate() {
        let s = BoxSummary::from_values("d", &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.q1, 1.75);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.q3, 3.25);
        assert_eq!(s.count, 4);
    }

    #[test]
    fn test_outliers_beyond_whiskers() {
        let s = BoxSummary::from_values("d", &[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        assert_eq!(s.outliers, vec![100.0]);
        assert_eq!(s.upper_whisker, 5.0);
        assert_eq!(s.lower_whisker, 1.0);
        assert_eq!(s.max, 100.0);
    }

    #[test]
    fn test_empty_summary() {
        let s = BoxSummary::from_values("d", &[]);
        assert!(s.is_empty());
        assert!(s.outliers.is_empty());
    }

    #[test]
    fn test_bounds_skip_empty_series() {
        let cmp = DeliveryComparison {
            delivery: BoxSummary::from_values(DELIVERY_LABEL, &[2.0, 8.0]),
            estimate_delta: BoxSummary::empty(ESTIMATE_LABEL),
        };
        assert_eq!(cmp.bounds(), Some((2.0, 8.0)));
        assert!(!cmp.is_empty());
    }
}

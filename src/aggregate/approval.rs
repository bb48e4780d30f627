use crate::derive::DerivedColumns;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram of approval time in hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalHistogram {
    pub bins: Vec<HistogramBin>,
    pub min: f64,
    pub max: f64,
    /// Rows with a duration (sum of bin counts)
    pub valid: usize,
    /// Rows where either timestamp was null
    pub excluded: usize,
}

impl ApprovalHistogram {
    pub fn is_empty(&self) -> bool {
        self.valid == 0
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

pub fn approval_histogram(derived: &DerivedColumns, bins: usize) -> ApprovalHistogram {
    let (values, excluded) = derived.valid_approval_hours();
    histogram(&values, bins, excluded)
}

/// Bin `values` into `bins` equal-width buckets spanning the observed range.
///
/// The last bucket is closed on the right so the maximum is counted. A range of
/// zero width is widened to one unit centred on the value.
pub fn histogram(values: &[f64], bins: usize, excluded: usize) -> ApprovalHistogram {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let excluded = excluded + (values.len() - finite.len());

    if finite.is_empty() {
        return ApprovalHistogram {
            bins: Vec::new(),
            min: 0.0,
            max: 0.0,
            valid: 0,
            excluded,
        };
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in &finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let bins: Vec<HistogramBin> = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lo + width * i as f64,
            end: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count,
        })
        .collect();

    ApprovalHistogram {
        bins,
        min,
        max,
        valid: finite.len(),
        excluded,
    }
}

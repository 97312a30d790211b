use crate::libs::align::ArmAlignment;
use indexmap::IndexMap;

/// Mean of a sample, 0.0 when empty.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Median of a sample; the two middle values of an even-sized sample are
/// averaged.
pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Arm counts passing the fixed calibration thresholds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbaCounts {
    pub match_5: usize,
    pub match_10: usize,
    pub match_20: usize,
    pub mismatch_60: usize,
    pub mismatch_50: usize,
    pub mismatch_40: usize,
}

/// Whole-profile summary of one aligned pair.
#[derive(Debug, Clone)]
pub struct PairSummary {
    pub id: String,
    pub pair: String,
    pub total_score: f64,
    pub mean_score: f64,
    pub median_score: f64,
    pub total_adjusted: f64,
    pub mean_adjusted: f64,
    pub median_adjusted: f64,
    /// Present when at least one arm was calibrated.
    pub proba: Option<ProbaCounts>,
}

/// Collapses the per-arm records of one pair into a single summary row.
pub fn summarize(id: &str, pair: &str, results: &IndexMap<String, ArmAlignment>) -> PairSummary {
    let scores: Vec<f64> = results.values().map(|r| r.score).collect();
    let adjusted: Vec<f64> = results.values().map(|r| r.adjusted_score).collect();

    let calibrated: Vec<(f64, f64)> = results
        .values()
        .filter_map(|r| r.match_proba.zip(r.mismatch_proba))
        .collect();
    let proba = if calibrated.is_empty() {
        None
    } else {
        let mut counts = ProbaCounts::default();
        for (m, mm) in &calibrated {
            if *m <= 0.05 {
                counts.match_5 += 1;
            }
            if *m <= 0.10 {
                counts.match_10 += 1;
            }
            if *m <= 0.20 {
                counts.match_20 += 1;
            }
            if *mm <= 0.60 {
                counts.mismatch_60 += 1;
            }
            if *mm <= 0.50 {
                counts.mismatch_50 += 1;
            }
            if *mm <= 0.40 {
                counts.mismatch_40 += 1;
            }
        }
        Some(counts)
    };

    PairSummary {
        id: id.to_string(),
        pair: pair.to_string(),
        total_score: scores.iter().sum(),
        mean_score: mean(&scores),
        median_score: median(&scores),
        total_adjusted: adjusted.iter().sum(),
        mean_adjusted: mean(&adjusted),
        median_adjusted: median(&adjusted),
        proba,
    }
}

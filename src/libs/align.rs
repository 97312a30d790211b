use crate::libs::cn::STATES;
use crate::libs::error::CnpError;
use crate::libs::matrix::{MatrixSet, ScoreMatrix};
use crate::libs::profile::{Bin, Profile};
use crate::libs::segment::SegValue;
use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

/// Alignment record for one arm of a sample pair.
#[derive(Debug, Clone, Serialize)]
pub struct ArmAlignment {
    pub seq1: String,
    pub seq2: String,
    pub score: f64,
    pub adjusted_score: f64,
    pub seq1_gaps: usize,
    pub seq2_gaps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_proba: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch_proba: Option<f64>,
}

/// Per-arm null distributions of adjusted scores.
pub type NullScores = IndexMap<String, Vec<f64>>;

/// Reads a JSON object mapping arm labels to arrays of adjusted scores.
pub fn read_null_scores(infile: &str) -> Result<NullScores> {
    let reader = crate::reader(infile);
    let null: NullScores = serde_json::from_reader(reader)?;
    Ok(null)
}

fn score_pair(
    a: &SegValue,
    b: &SegValue,
    matrix: &ScoreMatrix,
    arm: &str,
) -> Result<f64, CnpError> {
    match (a, b) {
        (SegValue::State(x), SegValue::State(y)) => {
            matrix.get(*x, *y).ok_or(CnpError::MissingScore {
                a: x.code(),
                b: y.code(),
            })
        }
        (SegValue::Probs(p), SegValue::Probs(q)) => {
            let mut score = 0.0;
            for (i, x) in STATES.iter().enumerate() {
                for (j, y) in STATES.iter().enumerate() {
                    let weight = p[i] * q[j];
                    if weight > 0.0 {
                        let cell = matrix.get(*x, *y).ok_or(CnpError::MissingScore {
                            a: x.code(),
                            b: y.code(),
                        })?;
                        score += weight * cell;
                    }
                }
            }
            Ok(score)
        }
        _ => Err(CnpError::KindMismatch {
            arm: arm.to_string(),
        }),
    }
}

/// Global alignment of two binned arms with affine gap costs.
///
/// Three-matrix Gotoh recurrence; a gap of length `k` costs
/// `gap_open + (k - 1) * gap_extend`. Ties resolve towards the diagonal,
/// so equal-length arms under prohibitive penalties come back gapless.
pub fn align_arm(
    arm: &str,
    seq1: &[Bin],
    seq2: &[Bin],
    matrix: &ScoreMatrix,
    gap_open: f64,
    gap_extend: f64,
) -> Result<ArmAlignment, CnpError> {
    if seq1.is_empty() || seq2.is_empty() {
        return Err(CnpError::EmptyArm {
            arm: arm.to_string(),
        });
    }

    let m = seq1.len();
    let n = seq2.len();
    let width = n + 1;
    let idx = |i: usize, j: usize| i * width + j;

    let neg = f64::NEG_INFINITY;
    // h: best ending in a pair, e: gap in seq1, f: gap in seq2
    let mut h = vec![neg; (m + 1) * width];
    let mut e = vec![neg; (m + 1) * width];
    let mut f = vec![neg; (m + 1) * width];

    h[idx(0, 0)] = 0.0;
    for i in 1..=m {
        let cost = gap_open + (i as f64 - 1.0) * gap_extend;
        h[idx(i, 0)] = cost;
        f[idx(i, 0)] = cost;
    }
    for j in 1..=n {
        let cost = gap_open + (j as f64 - 1.0) * gap_extend;
        h[idx(0, j)] = cost;
        e[idx(0, j)] = cost;
    }

    for i in 1..=m {
        for j in 1..=n {
            let sub = score_pair(&seq1[i - 1].value, &seq2[j - 1].value, matrix, arm)?;

            e[idx(i, j)] = (h[idx(i, j - 1)] + gap_open).max(e[idx(i, j - 1)] + gap_extend);
            f[idx(i, j)] = (h[idx(i - 1, j)] + gap_open).max(f[idx(i - 1, j)] + gap_extend);
            h[idx(i, j)] = (h[idx(i - 1, j - 1)] + sub)
                .max(e[idx(i, j)])
                .max(f[idx(i, j)]);
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Layer {
        H,
        E,
        F,
    }

    let mut s1_rev: Vec<char> = vec![];
    let mut s2_rev: Vec<char> = vec![];
    let mut i = m;
    let mut j = n;
    let mut layer = Layer::H;

    while i > 0 || j > 0 {
        match layer {
            Layer::H => {
                let cur = h[idx(i, j)];
                if i > 0 && j > 0 {
                    let sub = score_pair(&seq1[i - 1].value, &seq2[j - 1].value, matrix, arm)?;
                    if cur == h[idx(i - 1, j - 1)] + sub {
                        s1_rev.push(seq1[i - 1].value.symbol());
                        s2_rev.push(seq2[j - 1].value.symbol());
                        i -= 1;
                        j -= 1;
                        continue;
                    }
                }
                if j > 0 && cur == e[idx(i, j)] {
                    layer = Layer::E;
                } else {
                    layer = Layer::F;
                }
            }
            Layer::E => {
                let cur = e[idx(i, j)];
                s1_rev.push('-');
                s2_rev.push(seq2[j - 1].value.symbol());
                let from_open = h[idx(i, j - 1)] + gap_open;
                j -= 1;
                // prefer closing the gap
                layer = if cur == from_open { Layer::H } else { Layer::E };
            }
            Layer::F => {
                let cur = f[idx(i, j)];
                s1_rev.push(seq1[i - 1].value.symbol());
                s2_rev.push('-');
                let from_open = h[idx(i - 1, j)] + gap_open;
                i -= 1;
                layer = if cur == from_open { Layer::H } else { Layer::F };
            }
        }
    }

    let seq1_out: String = s1_rev.iter().rev().collect();
    let seq2_out: String = s2_rev.iter().rev().collect();
    let score = h[idx(m, n)];
    let length = seq1_out.chars().count();

    Ok(ArmAlignment {
        seq1_gaps: seq1_out.chars().filter(|&c| c == '-').count(),
        seq2_gaps: seq2_out.chars().filter(|&c| c == '-').count(),
        seq1: seq1_out,
        seq2: seq2_out,
        score,
        adjusted_score: score / length as f64,
        match_proba: None,
        mismatch_proba: None,
    })
}

/// Empirical calibration of one record against a null distribution.
///
/// `match_proba` is the fraction of null scores at or above the observed
/// adjusted score, `mismatch_proba` the fraction below. An empty null
/// leaves both fields unset.
pub fn calibrate(rec: &mut ArmAlignment, null: &[f64]) {
    if null.is_empty() {
        return;
    }
    let total = null.len();
    let at_or_above = null.iter().filter(|&&s| s >= rec.adjusted_score).count();
    rec.match_proba = Some(at_or_above as f64 / total as f64);
    rec.mismatch_proba = Some((total - at_or_above) as f64 / total as f64);
}

/// Pairwise alignment of two profiles across their shared arms.
///
/// Arms are walked in the order of the first profile. Results become
/// available once [`align`](Self::align) has run.
#[derive(Debug)]
pub struct PairAlignment<'a> {
    profile1: &'a Profile,
    profile2: &'a Profile,
    results: Option<IndexMap<String, ArmAlignment>>,
}

impl<'a> PairAlignment<'a> {
    pub fn new(profile1: &'a Profile, profile2: &'a Profile) -> Self {
        PairAlignment {
            profile1,
            profile2,
            results: None,
        }
    }

    pub fn pair(&self) -> String {
        format!("{}_{}", self.profile1.id, self.profile2.id)
    }

    /// Aligns every arm of the pair, calibrating against `null` when a
    /// non-empty distribution exists for the arm.
    pub fn align(
        &mut self,
        matrix: &MatrixSet,
        gap_open: f64,
        gap_extend: f64,
        null: Option<&NullScores>,
    ) -> Result<(), CnpError> {
        let same_arms = self.profile1.arms.len() == self.profile2.arms.len()
            && self
                .profile1
                .arms
                .keys()
                .all(|arm| self.profile2.arms.contains_key(arm));
        if !same_arms {
            return Err(CnpError::ShapeMismatch {
                sample1: self.profile1.id.clone(),
                sample2: self.profile2.id.clone(),
                arms1: self.profile1.arms.len(),
                arms2: self.profile2.arms.len(),
            });
        }

        let mut results = IndexMap::new();
        for (arm, arm1) in &self.profile1.arms {
            let arm2 = &self.profile2.arms[arm];
            let scores = matrix.for_arm(arm).ok_or_else(|| CnpError::MissingMatrix {
                arm: arm.clone(),
            })?;
            let mut rec = align_arm(arm, &arm1.bins, &arm2.bins, scores, gap_open, gap_extend)?;
            if let Some(null) = null {
                if let Some(dist) = null.get(arm) {
                    calibrate(&mut rec, dist);
                }
            }
            results.insert(arm.clone(), rec);
        }

        self.results = Some(results);
        Ok(())
    }

    /// Per-arm records, failing before `align` has run.
    pub fn results(&self) -> Result<&IndexMap<String, ArmAlignment>, CnpError> {
        self.results.as_ref().ok_or(CnpError::NotAligned)
    }

    /// Records reordered by label; padded labels make this genomic order.
    pub fn sorted_results(&self) -> Result<IndexMap<String, ArmAlignment>, CnpError> {
        let results = self.results()?;
        let mut keys: Vec<&String> = results.keys().collect();
        keys.sort();
        Ok(keys
            .into_iter()
            .map(|k| (k.clone(), results[k].clone()))
            .collect())
    }
}

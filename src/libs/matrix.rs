use crate::libs::cn::{CnState, STATES};
use crate::libs::profile::Profile;
use crate::libs::segment::SegValue;
use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::io::{Read, Write};

/// Log-odds substitution matrix over the five copy number states.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMatrix {
    scores: [[Option<f64>; 5]; 5],
}

impl ScoreMatrix {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, a: CnState, b: CnState) -> Option<f64> {
        self.scores[a.index()][b.index()]
    }

    pub fn set(&mut self, a: CnState, b: CnState, score: f64) {
        self.scores[a.index()][b.index()] = Some(score);
    }

    /// True when every ordered state pair has a score.
    pub fn is_complete(&self) -> bool {
        self.scores.iter().all(|row| row.iter().all(|s| s.is_some()))
    }

    fn to_value(&self) -> Value {
        let mut rows = Map::new();
        for a in STATES {
            let mut cells = Map::new();
            for b in STATES {
                if let Some(score) = self.get(a, b) {
                    cells.insert(b.code().to_string(), Value::from(score));
                }
            }
            rows.insert(a.code().to_string(), Value::Object(cells));
        }
        Value::Object(rows)
    }

    fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(rows) = value else {
            bail!("matrix entry must be an object of state rows");
        };
        let mut matrix = ScoreMatrix::new();
        for (row_key, row) in rows {
            let a = state_key(row_key)?;
            let Value::Object(cells) = row else {
                bail!("matrix row {} must be an object", row_key);
            };
            for (col_key, cell) in cells {
                let b = state_key(col_key)?;
                let score = cell
                    .as_f64()
                    .ok_or_else(|| anyhow!("non-numeric score for {}/{}", row_key, col_key))?;
                matrix.set(a, b, score);
            }
        }
        Ok(matrix)
    }
}

fn state_key(key: &str) -> Result<CnState> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            CnState::from_code(c).ok_or_else(|| anyhow!("unknown state key {}", key))
        }
        _ => bail!("unknown state key {}", key),
    }
}

fn is_state_key(key: &str) -> bool {
    state_key(key).is_ok()
}

/// A single matrix shared by all arms, or one matrix per arm label.
#[derive(Debug, Clone)]
pub enum MatrixSet {
    Global(ScoreMatrix),
    PerArm(IndexMap<String, ScoreMatrix>),
}

impl MatrixSet {
    pub fn for_arm(&self, arm: &str) -> Option<&ScoreMatrix> {
        match self {
            MatrixSet::Global(m) => Some(m),
            MatrixSet::PerArm(map) => map.get(arm),
        }
    }

    /// Loads a matrix file. Top-level keys decide the layout: single-letter
    /// state codes mean one flat matrix, anything else is read per arm.
    pub fn from_file(infile: &str) -> Result<Self> {
        let mut reader = crate::reader(infile);
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(map) = &value else {
            bail!("matrix file must hold a JSON object");
        };

        if map.keys().all(|k| is_state_key(k)) {
            return Ok(MatrixSet::Global(ScoreMatrix::from_value(&value)?));
        }

        let mut arms = IndexMap::new();
        for (arm, entry) in map {
            arms.insert(arm.clone(), ScoreMatrix::from_value(entry)?);
        }
        Ok(MatrixSet::PerArm(arms))
    }

    /// JSON representation; object keys come out sorted, which for padded
    /// arm labels is also genomic order.
    pub fn to_json_value(&self) -> Value {
        match self {
            MatrixSet::Global(m) => m.to_value(),
            MatrixSet::PerArm(map) => {
                let mut obj = Map::new();
                for (arm, m) in map {
                    obj.insert(arm.clone(), m.to_value());
                }
                Value::Object(obj)
            }
        }
    }

    pub fn to_file(&self, outfile: &str) -> Result<()> {
        let mut writer = crate::writer(outfile);
        serde_json::to_writer_pretty(&mut writer, &self.to_json_value())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Replicates one matrix across the labels of `order`.
pub fn replicate(matrix: &ScoreMatrix, order: &[String]) -> MatrixSet {
    let mut map = IndexMap::new();
    for label in order {
        map.insert(label.clone(), matrix.clone());
    }
    MatrixSet::PerArm(map)
}

/// Estimates a substitution matrix from discrete profiles.
///
/// Ordered state pairs are counted over every bin position where all
/// profiles carry a call, Laplace-smoothed by one. Each pair then scores
/// twice the log2 ratio of its observed frequency over the frequency
/// expected from the marginal state frequencies. The result is symmetric
/// and complete.
pub fn build_matrix(profiles: &[Profile]) -> Result<ScoreMatrix> {
    if profiles.len() < 2 {
        bail!(
            "matrix estimation needs at least two profiles, got {}",
            profiles.len()
        );
    }

    // states per bin position, one entry per profile
    let mut columns: IndexMap<(String, i64, i64), Vec<CnState>> = IndexMap::new();
    for profile in profiles {
        for arm in profile.arms.values() {
            for bin in &arm.bins {
                let state = match &bin.value {
                    SegValue::State(s) => *s,
                    SegValue::Probs(_) => {
                        bail!("matrix estimation needs discrete calls, not probabilities")
                    }
                };
                columns
                    .entry((bin.chrom.clone(), bin.start, bin.end))
                    .or_default()
                    .push(state);
            }
        }
    }

    // keep positions every profile has a call for
    let d = profiles.len();
    columns.retain(|_, states| states.len() == d);
    let w = columns.len();
    if w == 0 {
        bail!("profiles share no bin positions");
    }

    let mut counts = [[1.0f64; 5]; 5];
    for states in columns.values() {
        for (i, a) in states.iter().enumerate() {
            for (j, b) in states.iter().enumerate() {
                if i != j {
                    counts[a.index()][b.index()] += 1.0;
                }
            }
        }
    }

    let n = (w * d * (d - 1) / 2) as f64;

    let mut observed = [[0.0f64; 5]; 5];
    for i in 0..5 {
        for j in 0..5 {
            observed[i][j] = counts[i][j] / n;
        }
    }

    // marginals: full weight for same-state pairs, half for mixed, then
    // halved again
    let mut marginal = [0.0f64; 5];
    for s in 0..5 {
        let mut numer = counts[s][s];
        for t in 0..5 {
            if t != s {
                numer += (counts[s][t] + counts[t][s]) / 2.0;
            }
        }
        marginal[s] = numer / n / 2.0;
    }

    let mut matrix = ScoreMatrix::new();
    for (i, a) in STATES.iter().enumerate() {
        for (j, b) in STATES.iter().enumerate() {
            let expected = if i == j {
                marginal[i] * marginal[i]
            } else {
                2.0 * marginal[i] * marginal[j]
            };
            matrix.set(*a, *b, 2.0 * (observed[i][j] / expected).log2());
        }
    }

    Ok(matrix)
}

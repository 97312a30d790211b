use std::fmt;

/// Discrete copy number states.
///
/// The five levels mirror CGHcall's call codes: amplification (+2), gain
/// (+1), normal (0), loss (-1) and double loss (-2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CnState {
    Amp,
    Gain,
    Normal,
    Loss,
    Del,
}

/// All states, in the order probability columns are laid out.
pub const STATES: [CnState; 5] = [
    CnState::Amp,
    CnState::Gain,
    CnState::Normal,
    CnState::Loss,
    CnState::Del,
];

/// Probability column names of a CGHcall export, in [`STATES`] order.
pub const PROB_COLUMNS: [&str; 5] = ["PROBAMP", "PROBGAIN", "PROBNORM", "PROBLOSS", "PROBDEL"];

impl CnState {
    /// One-letter code used in tables, sequences and matrix files.
    pub fn code(&self) -> char {
        match self {
            CnState::Amp => 'A',
            CnState::Gain => 'G',
            CnState::Normal => 'N',
            CnState::Loss => 'L',
            CnState::Del => 'D',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'A' => Some(CnState::Amp),
            'G' => Some(CnState::Gain),
            'N' => Some(CnState::Normal),
            'L' => Some(CnState::Loss),
            'D' => Some(CnState::Del),
            _ => None,
        }
    }

    /// Maps a CGHcall numeric call (-2..=2) to a state.
    pub fn from_call(call: i32) -> Option<Self> {
        match call {
            2 => Some(CnState::Amp),
            1 => Some(CnState::Gain),
            0 => Some(CnState::Normal),
            -1 => Some(CnState::Loss),
            -2 => Some(CnState::Del),
            _ => None,
        }
    }

    /// Position in [`STATES`], also the probability column index.
    pub fn index(&self) -> usize {
        match self {
            CnState::Amp => 0,
            CnState::Gain => 1,
            CnState::Normal => 2,
            CnState::Loss => 3,
            CnState::Del => 4,
        }
    }
}

impl fmt::Display for CnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Canonical autosomal arm labels: `chr01p, chr01q, ..., chr22q`.
///
/// Zero padding makes the lexicographic order of these labels identical to
/// their genomic order.
pub fn arm_order() -> Vec<String> {
    let mut order = Vec::with_capacity(44);
    for i in 1..=22 {
        order.push(format!("chr{:02}p", i));
        order.push(format!("chr{:02}q", i));
    }
    order
}

/// Whole-chromosome labels: `chr01, ..., chr22`.
pub fn chrom_order() -> Vec<String> {
    (1..=22).map(|i| format!("chr{:02}", i)).collect()
}

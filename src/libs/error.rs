use std::fmt;

/// Errors raised while building, scoring and aligning profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CnpError {
    /// The two profiles do not cover the same set of chromosome arms.
    ShapeMismatch {
        sample1: String,
        sample2: String,
        arms1: usize,
        arms2: usize,
    },
    /// No substitution matrix was supplied for an arm.
    MissingMatrix { arm: String },
    /// The substitution matrix lacks a score for an observed state pair.
    MissingScore { a: char, b: char },
    /// One side of an arm carries discrete states, the other probabilities.
    KindMismatch { arm: String },
    /// An arm without assigned bins cannot be aligned.
    EmptyArm { arm: String },
    /// Results were requested before `align` ran.
    NotAligned,
    /// A malformed segment or call table.
    BadTable { line: usize, message: String },
}

impl fmt::Display for CnpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CnpError::ShapeMismatch {
                sample1,
                sample2,
                arms1,
                arms2,
            } => {
                write!(
                    f,
                    "profiles {} and {} do not cover the same arm set ({} vs {} arms)",
                    sample1, sample2, arms1, arms2
                )
            }
            CnpError::MissingMatrix { arm } => {
                write!(f, "no substitution matrix for arm {}", arm)
            }
            CnpError::MissingScore { a, b } => {
                write!(f, "substitution matrix has no score for pair {}/{}", a, b)
            }
            CnpError::KindMismatch { arm } => {
                write!(f, "arm {} mixes discrete calls with probability bins", arm)
            }
            CnpError::EmptyArm { arm } => write!(f, "arm {} has no assigned bins", arm),
            CnpError::NotAligned => write!(f, "alignment has not been run yet"),
            CnpError::BadTable { line, message } => {
                write!(f, "table error at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for CnpError {}

use crate::libs::segment::{SegValue, Segment, SegmentTable};
use indexmap::IndexMap;

/// One fixed-width bin of an arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub value: SegValue,
}

/// All bins of one chromosome arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub chrom: String,
    pub bins: Vec<Bin>,
    /// Bin starts not covered by any segment.
    pub missing: usize,
}

impl Arm {
    /// Bins the rows of one arm. Bin starts step from the smallest row
    /// start up to and including the largest row end, which is itself the
    /// start of the last covered bin. A bin takes the value of the first
    /// row covering its start.
    pub fn from_rows(chrom: &str, bin_size: i64, rows: &[&Segment]) -> Self {
        if rows.is_empty() {
            return Arm {
                chrom: chrom.to_string(),
                bins: vec![],
                missing: 0,
            };
        }

        let arm_start = rows.iter().map(|r| r.start).min().unwrap_or(0);
        let arm_end = rows.iter().map(|r| r.end).max().unwrap_or(0);

        let mut bins = vec![];
        let mut missing = 0;
        let mut i = arm_start;
        while i <= arm_end {
            match rows.iter().find(|r| r.start <= i && i <= r.end) {
                Some(row) => bins.push(Bin {
                    chrom: chrom.to_string(),
                    start: i,
                    end: i + bin_size,
                    value: row.value.clone(),
                }),
                None => missing += 1,
            }
            i += bin_size;
        }

        Arm {
            chrom: chrom.to_string(),
            bins,
            missing,
        }
    }

    /// One-letter rendering of the binned arm.
    pub fn symbols(&self) -> String {
        self.bins.iter().map(|b| b.value.symbol()).collect()
    }
}

/// Binned per-arm view of one sample.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: String,
    pub bin_size: i64,
    pub arms: IndexMap<String, Arm>,
}

impl Profile {
    /// Bins a single-sample table. Arms keep the order of their first row.
    pub fn from_table(id: &str, bin_size: i64, table: &SegmentTable) -> Self {
        let mut groups: IndexMap<String, Vec<&Segment>> = IndexMap::new();
        for row in &table.rows {
            groups.entry(row.chrom.clone()).or_default().push(row);
        }

        let mut arms = IndexMap::new();
        for (chrom, rows) in &groups {
            arms.insert(chrom.clone(), Arm::from_rows(chrom, bin_size, rows));
        }

        Profile {
            id: id.to_string(),
            bin_size,
            arms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::cn::arm_order;
    use crate::libs::cn::CnState;
    use crate::libs::segment::{autoresolve, Fill};

    const BIN: i64 = 100_000;

    fn seg(chrom: &str, start: i64, end: i64, code: char) -> Segment {
        Segment {
            sample: "S1".to_string(),
            chrom: chrom.to_string(),
            start,
            end,
            num_mark: None,
            seg_mean: None,
            value: SegValue::State(CnState::from_code(code).unwrap()),
            fill: Fill::Observed,
        }
    }

    #[test]
    fn test_seven_bin_arm() {
        // N over four bins, G over one, N over two
        let table = SegmentTable {
            rows: vec![
                seg("chr01p", 0, 300_000, 'N'),
                seg("chr01p", 400_000, 400_000, 'G'),
                seg("chr01p", 500_000, 600_000, 'N'),
            ],
            has_probs: false,
        };
        let profile = Profile::from_table("S1", BIN, &table);
        let arm = &profile.arms["chr01p"];
        assert_eq!(arm.bins.len(), 7);
        assert_eq!(arm.missing, 0);
        assert_eq!(arm.symbols(), "NNNNGNN");
        assert_eq!(arm.bins[0].start, 0);
        assert_eq!(arm.bins[0].end, 100_000);
        assert_eq!(arm.bins[6].start, 600_000);
    }

    #[test]
    fn test_first_row_wins_overlap() {
        let table = SegmentTable {
            rows: vec![
                seg("chr02p", 0, 200_000, 'N'),
                seg("chr02p", 100_000, 300_000, 'G'),
            ],
            has_probs: false,
        };
        let profile = Profile::from_table("S1", BIN, &table);
        // bins 100000 and 200000 overlap both rows; the first row wins
        assert_eq!(profile.arms["chr02p"].symbols(), "NNNG");
    }

    #[test]
    fn test_missing_bins_counted() {
        let table = SegmentTable {
            rows: vec![
                seg("chr03q", 0, 100_000, 'G'),
                seg("chr03q", 400_000, 500_000, 'L'),
            ],
            has_probs: false,
        };
        let profile = Profile::from_table("S1", BIN, &table);
        let arm = &profile.arms["chr03q"];
        assert_eq!(arm.bins.len(), 4);
        assert_eq!(arm.missing, 2);
        assert_eq!(arm.symbols(), "GGLL");
    }

    #[test]
    fn test_resolved_arm_fully_covered() {
        let table = SegmentTable {
            rows: vec![
                seg("chr03p", 0, 300_000, 'N'),
                seg("chr03p", 800_000, 900_000, 'G'),
                seg("chr03q", 0, 100_000, 'G'),
                seg("chr03q", 400_000, 500_000, 'L'),
                seg("chr04p", 0, 100_000, 'N'),
                seg("chr04p", 300_000, 400_000, 'A'),
            ],
            has_probs: false,
        };
        let resolved = autoresolve(&table, BIN, &arm_order());
        let profile = Profile::from_table("S1", BIN, &resolved);
        for arm in profile.arms.values() {
            assert_eq!(arm.missing, 0, "{} should be fully covered", arm.chrom);
        }
        assert_eq!(profile.arms["chr03p"].symbols(), "NNNNNNGGGG");
        assert_eq!(profile.arms["chr03q"].symbols(), "GGGGLL");
        assert_eq!(profile.arms["chr04p"].symbols(), "NNNAA");
    }

    #[test]
    fn test_prob_bins() {
        let table = SegmentTable {
            rows: vec![Segment {
                sample: "T1".to_string(),
                chrom: "chr01".to_string(),
                start: 1,
                end: 100_001,
                num_mark: None,
                seg_mean: None,
                value: SegValue::Probs([0.02, 0.7, 0.2, 0.06, 0.02]),
                fill: Fill::Observed,
            }],
            has_probs: true,
        };
        let profile = Profile::from_table("T1", BIN, &table);
        let arm = &profile.arms["chr01"];
        assert_eq!(arm.bins.len(), 2);
        // argmax of the vector renders as G
        assert_eq!(arm.symbols(), "GG");
    }

    #[test]
    fn test_arm_order_follows_input() {
        let table = SegmentTable {
            rows: vec![
                seg("chr02q", 0, 100_000, 'N'),
                seg("chr01p", 0, 100_000, 'N'),
            ],
            has_probs: false,
        };
        let profile = Profile::from_table("S1", BIN, &table);
        let keys: Vec<&String> = profile.arms.keys().collect();
        assert_eq!(keys, vec!["chr02q", "chr01p"]);
    }
}

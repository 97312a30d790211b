use crate::libs::cn::{CnState, PROB_COLUMNS, STATES};
use crate::libs::error::CnpError;
use anyhow::Result;
use indexmap::IndexSet;
use std::io::Write;

/// Value carried by a segment or bin: a discrete call or a vector of
/// per-state probabilities in [`STATES`] order.
#[derive(Debug, Clone, PartialEq)]
pub enum SegValue {
    State(CnState),
    Probs([f64; 5]),
}

impl SegValue {
    /// One-letter rendering; probability values show their most likely
    /// state.
    pub fn symbol(&self) -> char {
        match self {
            SegValue::State(s) => s.code(),
            SegValue::Probs(p) => {
                let mut best = 0;
                for i in 1..5 {
                    if p[i] > p[best] {
                        best = i;
                    }
                }
                STATES[best].code()
            }
        }
    }
}

/// Provenance of a row after gap resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fill {
    #[default]
    Observed,
    /// The upstream segment was extended by one bin.
    Modified,
    /// A short gap filled with the upstream value.
    Previous,
    /// Left part of a wider gap, filled with the upstream value.
    FirstHalf,
    /// Right part of a wider gap, filled with the downstream value.
    SecondHalf,
}

impl Fill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fill::Observed => "",
            Fill::Modified => "modified",
            Fill::Previous => "previous",
            Fill::FirstHalf => "first_half",
            Fill::SecondHalf => "second_half",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "" | "NA" | "None" => Some(Fill::Observed),
            "modified" => Some(Fill::Modified),
            "previous" => Some(Fill::Previous),
            "first_half" => Some(Fill::FirstHalf),
            "second_half" => Some(Fill::SecondHalf),
            _ => None,
        }
    }
}

/// One row of a segment table.
///
/// Coordinates follow the bin-start convention: a segment covers every bin
/// whose start `i` satisfies `start <= i <= end`, so `end` is itself the
/// start of the last covered bin. Two segments are adjacent when
/// `next.start == prev.end + bin_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub sample: String,
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub num_mark: Option<i64>,
    pub seg_mean: Option<f64>,
    pub value: SegValue,
    pub fill: Fill,
}

/// An in-memory segment table, one row per contiguous segment.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    pub rows: Vec<Segment>,
    /// True when rows carry probability vectors instead of discrete calls.
    pub has_probs: bool,
}

fn clean(field: &str) -> &str {
    field.trim().trim_matches('"')
}

fn is_na(field: &str) -> bool {
    matches!(field, "" | "NA" | "None" | "nan" | "NaN")
}

impl SegmentTable {
    /// Reads a segment table. The delimiter, tab or comma, is sniffed from
    /// the header line.
    pub fn from_file(infile: &str) -> Result<Self> {
        let lines = crate::libs::io::read_lines(infile)?;
        Self::from_lines(&lines)
    }

    pub fn from_lines(lines: &[String]) -> Result<Self> {
        let (header_idx, header_line) = lines
            .iter()
            .enumerate()
            .find(|(_, line)| !line.trim().is_empty())
            .ok_or(CnpError::BadTable {
                line: 1,
                message: "empty table".to_string(),
            })?;

        let sep = if header_line.contains('\t') { '\t' } else { ',' };
        let header: Vec<&str> = header_line.split(sep).map(clean).collect();
        let col = |name: &str| header.iter().position(|h| *h == name);

        let required = |name: &str| {
            col(name).ok_or(CnpError::BadTable {
                line: header_idx + 1,
                message: format!("missing column {}", name),
            })
        };

        let id_col = required("ID")?;
        let chrom_col = required("chrom")?;
        let start_col = required("loc.start")?;
        let end_col = required("loc.end")?;
        let mark_col = col("num.mark");
        let mean_col = col("seg.mean");
        let fill_col = col("fill");

        let prob_cols: Option<Vec<usize>> = PROB_COLUMNS.iter().map(|name| col(name)).collect();
        let has_probs = prob_cols.is_some();
        let state_col = if has_probs { None } else { Some(required("state")?) };

        let mut rows = vec![];
        for (idx, line) in lines.iter().enumerate().skip(header_idx + 1) {
            if line.trim().is_empty() {
                continue;
            }
            let lineno = idx + 1;
            let fields: Vec<&str> = line.split(sep).map(clean).collect();
            let field = |c: usize| -> Result<&str, CnpError> {
                fields.get(c).copied().ok_or(CnpError::BadTable {
                    line: lineno,
                    message: format!("expected at least {} fields", c + 1),
                })
            };
            let parse_i64 = |c: usize| -> Result<i64, CnpError> {
                let s = field(c)?;
                s.parse().map_err(|_| CnpError::BadTable {
                    line: lineno,
                    message: format!("bad integer {}", s),
                })
            };

            let value = match (&prob_cols, state_col) {
                (Some(cols), _) => {
                    let mut probs = [0.0f64; 5];
                    for (k, c) in cols.iter().enumerate() {
                        let s = field(*c)?;
                        probs[k] = s.parse().map_err(|_| CnpError::BadTable {
                            line: lineno,
                            message: format!("bad probability {}", s),
                        })?;
                    }
                    SegValue::Probs(probs)
                }
                (None, Some(c)) => {
                    let s = field(c)?;
                    let code = s.chars().next().ok_or(CnpError::BadTable {
                        line: lineno,
                        message: "empty state".to_string(),
                    })?;
                    SegValue::State(CnState::from_code(code).ok_or(CnpError::BadTable {
                        line: lineno,
                        message: format!("unknown state {}", s),
                    })?)
                }
                (None, None) => unreachable!(),
            };

            let num_mark = match mark_col {
                Some(c) if !is_na(field(c)?) => Some(parse_i64(c)?),
                _ => None,
            };
            let seg_mean = match mean_col {
                Some(c) if !is_na(field(c)?) => {
                    let s = field(c)?;
                    Some(s.parse().map_err(|_| CnpError::BadTable {
                        line: lineno,
                        message: format!("bad seg.mean {}", s),
                    })?)
                }
                _ => None,
            };
            let fill = match fill_col {
                Some(c) => Fill::from_tag(field(c)?).ok_or(CnpError::BadTable {
                    line: lineno,
                    message: format!("unknown fill tag {}", field(c)?),
                })?,
                None => Fill::Observed,
            };

            rows.push(Segment {
                sample: field(id_col)?.to_string(),
                chrom: field(chrom_col)?.to_string(),
                start: parse_i64(start_col)?,
                end: parse_i64(end_col)?,
                num_mark,
                seg_mean,
                value,
                fill,
            });
        }

        Ok(SegmentTable { rows, has_probs })
    }

    /// Writes the table as TSV. Absent fields come out as empty strings.
    pub fn write(&self, outfile: &str) -> Result<()> {
        let mut writer = crate::writer(outfile);

        let mut header = vec!["ID", "chrom", "loc.start", "loc.end", "num.mark", "seg.mean"];
        if self.has_probs {
            header.extend(PROB_COLUMNS);
        } else {
            header.push("state");
        }
        header.push("fill");
        writer.write_fmt(format_args!("{}\n", header.join("\t")))?;

        for row in &self.rows {
            let mut fields = vec![
                row.sample.clone(),
                row.chrom.clone(),
                row.start.to_string(),
                row.end.to_string(),
                row.num_mark.map(|v| v.to_string()).unwrap_or_default(),
                row.seg_mean.map(|v| v.to_string()).unwrap_or_default(),
            ];
            match &row.value {
                SegValue::State(s) => fields.push(s.code().to_string()),
                SegValue::Probs(p) => {
                    fields.extend(p.iter().map(|v| v.to_string()));
                }
            }
            fields.push(row.fill.as_str().to_string());
            writer.write_fmt(format_args!("{}\n", fields.join("\t")))?;
        }

        Ok(())
    }

    /// Sample ids in order of first appearance.
    pub fn samples(&self) -> Vec<String> {
        let mut set = IndexSet::new();
        for row in &self.rows {
            set.insert(row.sample.clone());
        }
        set.into_iter().collect()
    }

    /// Rows of one sample, preserving input order.
    pub fn subset(&self, sample: &str) -> SegmentTable {
        SegmentTable {
            rows: self
                .rows
                .iter()
                .filter(|r| r.sample == sample)
                .cloned()
                .collect(),
            has_probs: self.has_probs,
        }
    }

    /// Drops rows whose chromosome label is outside `order`, returning
    /// the number of rows removed.
    pub fn retain_in_order(&mut self, order: &[String]) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| order.iter().any(|c| c == &r.chrom));
        before - self.rows.len()
    }
}

/// Fills coverage gaps so that every bin between the first and the last
/// segment of an arm is covered.
///
/// Rows are grouped per sample and per label of `order`; labels outside
/// `order` are dropped. Within a group, rows are sorted by start and each
/// gap is repaired according to the number of stranded bins it holds:
///
/// * one bin: the upstream segment is extended over it (`modified`)
/// * two bins: one filler row with the upstream value (`previous`)
/// * three or more: two filler rows, the left one with the upstream value
///   (`first_half`, taking the extra bin on odd counts) and the right one
///   with the downstream value (`second_half`)
///
/// Filler rows have no `num.mark` or `seg.mean`. Running the resolver on
/// its own output changes nothing.
pub fn autoresolve(table: &SegmentTable, bin_size: i64, order: &[String]) -> SegmentTable {
    let mut out = SegmentTable {
        rows: vec![],
        has_probs: table.has_probs,
    };

    for sample in table.samples() {
        for chrom in order {
            let mut rows: Vec<Segment> = table
                .rows
                .iter()
                .filter(|r| r.sample == sample && &r.chrom == chrom)
                .cloned()
                .collect();
            if rows.is_empty() {
                continue;
            }
            rows.sort_by_key(|r| r.start);

            let mut resolved: Vec<Segment> = vec![];
            for row in rows {
                let mut fillers: Vec<Segment> = vec![];
                if let Some(prev) = resolved.last_mut() {
                    let stranded = (row.start - prev.end) / bin_size - 1;
                    if stranded == 1 {
                        prev.end += bin_size;
                        prev.fill = Fill::Modified;
                    } else if stranded == 2 {
                        fillers.push(Segment {
                            sample: row.sample.clone(),
                            chrom: row.chrom.clone(),
                            start: prev.end + bin_size,
                            end: row.start - bin_size,
                            num_mark: None,
                            seg_mean: None,
                            value: prev.value.clone(),
                            fill: Fill::Previous,
                        });
                    } else if stranded > 2 {
                        let first = (stranded + 1) / 2;
                        fillers.push(Segment {
                            sample: row.sample.clone(),
                            chrom: row.chrom.clone(),
                            start: prev.end + bin_size,
                            end: prev.end + first * bin_size,
                            num_mark: None,
                            seg_mean: None,
                            value: prev.value.clone(),
                            fill: Fill::FirstHalf,
                        });
                        fillers.push(Segment {
                            sample: row.sample.clone(),
                            chrom: row.chrom.clone(),
                            start: prev.end + (first + 1) * bin_size,
                            end: row.start - bin_size,
                            num_mark: None,
                            seg_mean: None,
                            value: row.value.clone(),
                            fill: Fill::SecondHalf,
                        });
                    }
                }
                resolved.append(&mut fillers);
                resolved.push(row);
            }

            out.rows.append(&mut resolved);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::cn::arm_order;

    const BIN: i64 = 100_000;

    fn seg(sample: &str, chrom: &str, start: i64, end: i64, code: char) -> Segment {
        Segment {
            sample: sample.to_string(),
            chrom: chrom.to_string(),
            start,
            end,
            num_mark: Some(10),
            seg_mean: Some(0.1),
            value: SegValue::State(CnState::from_code(code).unwrap()),
            fill: Fill::Observed,
        }
    }

    fn table(rows: Vec<Segment>) -> SegmentTable {
        SegmentTable {
            rows,
            has_probs: false,
        }
    }

    #[test]
    fn test_parse_csv() {
        let lines: Vec<String> = vec![
            "ID,chrom,loc.start,loc.end,num.mark,seg.mean,state".to_string(),
            "S1,chr01p,0,300000,31,0.01,N".to_string(),
            "S1,chr01p,400000,400000,11,0.35,Gain".to_string(),
            "S2,chr01p,0,400000,42,,L".to_string(),
        ];
        let table = SegmentTable::from_lines(&lines).unwrap();
        assert!(!table.has_probs);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].sample, "S1");
        assert_eq!(table.rows[0].end, 300_000);
        // only the first letter of the state field counts
        assert_eq!(table.rows[1].value, SegValue::State(CnState::Gain));
        assert_eq!(table.rows[2].seg_mean, None);
        assert_eq!(table.samples(), vec!["S1".to_string(), "S2".to_string()]);
    }

    #[test]
    fn test_parse_quoted_with_index_column() {
        // R's write.csv quotes headers and adds an unnamed row-name column
        let lines: Vec<String> = vec![
            "\"\",\"ID\",\"chrom\",\"loc.start\",\"loc.end\",\"num.mark\",\"seg.mean\",\"state\""
                .to_string(),
            "\"1\",\"S1\",\"chr02q\",0,100000,NA,NA,\"N\"".to_string(),
        ];
        let table = SegmentTable::from_lines(&lines).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].chrom, "chr02q");
        assert_eq!(table.rows[0].num_mark, None);
    }

    #[test]
    fn test_parse_probs() {
        let lines: Vec<String> = vec![
            "ID\tchrom\tloc.start\tloc.end\tnum.mark\tseg.mean\tPROBAMP\tPROBGAIN\tPROBNORM\tPROBLOSS\tPROBDEL"
                .to_string(),
            "T1\tchr01\t1\t200001\t\t\t0.01\t0.04\t0.9\t0.04\t0.01".to_string(),
        ];
        let table = SegmentTable::from_lines(&lines).unwrap();
        assert!(table.has_probs);
        assert_eq!(
            table.rows[0].value,
            SegValue::Probs([0.01, 0.04, 0.9, 0.04, 0.01])
        );
    }

    #[test]
    fn test_parse_errors() {
        let lines: Vec<String> = vec!["chrom,loc.start,loc.end,state".to_string()];
        let err = SegmentTable::from_lines(&lines).unwrap_err();
        assert!(err.to_string().contains("missing column ID"));

        let lines: Vec<String> = vec![
            "ID,chrom,loc.start,loc.end,state".to_string(),
            "S1,chr01p,zero,100000,N".to_string(),
        ];
        let err = SegmentTable::from_lines(&lines).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let lines: Vec<String> = vec![
            "ID,chrom,loc.start,loc.end,state".to_string(),
            "S1,chr01p,0,100000,Q".to_string(),
        ];
        let err = SegmentTable::from_lines(&lines).unwrap_err();
        assert!(err.to_string().contains("unknown state"));
    }

    #[test]
    fn test_write_roundtrip() {
        let t = table(vec![
            seg("S1", "chr01p", 0, 300_000, 'N'),
            seg("S1", "chr01q", 0, 100_000, 'G'),
        ]);
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap().to_string();
        t.write(&path).unwrap();

        let back = SegmentTable::from_file(&path).unwrap();
        assert_eq!(back.rows, t.rows);
    }

    #[test]
    fn test_resolve_adjacent_untouched() {
        let t = table(vec![
            seg("S1", "chr01p", 0, 300_000, 'N'),
            seg("S1", "chr01p", 400_000, 400_000, 'G'),
        ]);
        let resolved = autoresolve(&t, BIN, &arm_order());
        assert_eq!(resolved.rows, t.rows);
    }

    #[test]
    fn test_resolve_extends_one_bin() {
        // one stranded bin at 200000
        let t = table(vec![
            seg("S1", "chr04p", 0, 100_000, 'N'),
            seg("S1", "chr04p", 300_000, 400_000, 'A'),
        ]);
        let resolved = autoresolve(&t, BIN, &arm_order());
        assert_eq!(resolved.rows.len(), 2);
        assert_eq!(resolved.rows[0].end, 200_000);
        assert_eq!(resolved.rows[0].fill, Fill::Modified);
        assert_eq!(resolved.rows[0].num_mark, Some(10));
    }

    #[test]
    fn test_resolve_single_filler() {
        // two stranded bins at 200000 and 300000
        let t = table(vec![
            seg("P1", "chr03q", 0, 100_000, 'G'),
            seg("P1", "chr03q", 400_000, 500_000, 'L'),
        ]);
        let resolved = autoresolve(&t, BIN, &arm_order());
        assert_eq!(resolved.rows.len(), 3);
        let filler = &resolved.rows[1];
        assert_eq!(filler.start, 200_000);
        assert_eq!(filler.end, 300_000);
        assert_eq!(filler.value, SegValue::State(CnState::Gain));
        assert_eq!(filler.fill, Fill::Previous);
        assert_eq!(filler.num_mark, None);
        assert_eq!(filler.seg_mean, None);
    }

    #[test]
    fn test_resolve_splits_even_gap() {
        // four stranded bins: 400000..700000
        let t = table(vec![
            seg("P1", "chr03p", 0, 300_000, 'N'),
            seg("P1", "chr03p", 800_000, 900_000, 'G'),
        ]);
        let resolved = autoresolve(&t, BIN, &arm_order());
        assert_eq!(resolved.rows.len(), 4);

        let left = &resolved.rows[1];
        assert_eq!((left.start, left.end), (400_000, 500_000));
        assert_eq!(left.value, SegValue::State(CnState::Normal));
        assert_eq!(left.fill, Fill::FirstHalf);

        let right = &resolved.rows[2];
        assert_eq!((right.start, right.end), (600_000, 700_000));
        assert_eq!(right.value, SegValue::State(CnState::Gain));
        assert_eq!(right.fill, Fill::SecondHalf);
    }

    #[test]
    fn test_resolve_splits_odd_gap() {
        // three stranded bins: 200000..400000, left half rounds up
        let t = table(vec![
            seg("P1", "chr05p", 0, 100_000, 'N'),
            seg("P1", "chr05p", 500_000, 600_000, 'D'),
        ]);
        let resolved = autoresolve(&t, BIN, &arm_order());
        assert_eq!(resolved.rows.len(), 4);

        let left = &resolved.rows[1];
        assert_eq!((left.start, left.end), (200_000, 300_000));
        assert_eq!(left.fill, Fill::FirstHalf);

        let right = &resolved.rows[2];
        assert_eq!((right.start, right.end), (400_000, 400_000));
        assert_eq!(right.value, SegValue::State(CnState::Del));
        assert_eq!(right.fill, Fill::SecondHalf);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let t = table(vec![
            seg("P1", "chr03p", 0, 300_000, 'N'),
            seg("P1", "chr03p", 800_000, 900_000, 'G'),
            seg("P1", "chr03q", 0, 100_000, 'G'),
            seg("P1", "chr03q", 400_000, 500_000, 'L'),
            seg("P1", "chr04p", 0, 100_000, 'N'),
            seg("P1", "chr04p", 300_000, 400_000, 'A'),
        ]);
        let once = autoresolve(&t, BIN, &arm_order());
        let twice = autoresolve(&once, BIN, &arm_order());
        assert_eq!(once.rows, twice.rows);
    }

    #[test]
    fn test_resolve_drops_unknown_labels() {
        let t = table(vec![
            seg("S1", "chr01p", 0, 100_000, 'N'),
            seg("S1", "chrX", 0, 100_000, 'N'),
            seg("S1", "23", 0, 100_000, 'N'),
        ]);
        let resolved = autoresolve(&t, BIN, &arm_order());
        assert_eq!(resolved.rows.len(), 1);
        assert_eq!(resolved.rows[0].chrom, "chr01p");
    }

    #[test]
    fn test_retain_in_order() {
        let mut t = table(vec![
            seg("S1", "chr01p", 0, 100_000, 'N'),
            seg("S1", "chrX", 0, 100_000, 'N'),
            seg("S2", "23", 0, 100_000, 'N'),
        ]);
        assert_eq!(t.retain_in_order(&arm_order()), 2);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].chrom, "chr01p");
        // nothing left to drop on a second pass
        assert_eq!(t.retain_in_order(&arm_order()), 0);
    }

    #[test]
    fn test_resolve_sorts_by_start() {
        let t = table(vec![
            seg("S1", "chr01p", 400_000, 500_000, 'G'),
            seg("S1", "chr01p", 0, 300_000, 'N'),
        ]);
        let resolved = autoresolve(&t, BIN, &arm_order());
        assert_eq!(resolved.rows[0].start, 0);
        assert_eq!(resolved.rows[1].start, 400_000);
    }

    #[test]
    fn test_resolve_groups_by_sample() {
        // same arm in two samples must not be mixed into one walk
        let t = table(vec![
            seg("S1", "chr01p", 0, 100_000, 'N'),
            seg("S2", "chr01p", 400_000, 500_000, 'G'),
        ]);
        let resolved = autoresolve(&t, BIN, &arm_order());
        assert_eq!(resolved.rows.len(), 2);
        assert!(resolved.rows.iter().all(|r| r.fill == Fill::Observed));
    }
}

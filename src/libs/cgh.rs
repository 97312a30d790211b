use crate::libs::cn::{CnState, PROB_COLUMNS};
use crate::libs::error::CnpError;
use crate::libs::segment::{Fill, SegValue, Segment, SegmentTable};
use anyhow::Result;
use indexmap::IndexMap;

/// One bin row of a CGHcall export.
#[derive(Debug, Clone)]
struct CghBin {
    chrom: String,
    start: i64,
    end: i64,
    value: SegValue,
}

/// `1` becomes `chr01`, `12` becomes `chr12`.
fn pad_chrom(raw: &str) -> String {
    if raw.len() == 1 {
        format!("chr0{}", raw)
    } else {
        format!("chr{}", raw)
    }
}

/// Splits a CGHcall bin label like `1:1-100000`.
fn parse_bin_label(label: &str, line: usize) -> Result<(String, i64, i64), CnpError> {
    let bad = |message: String| CnpError::BadTable { line, message };

    let (chrom, span) = label
        .split_once(':')
        .ok_or_else(|| bad(format!("bad bin label {}", label)))?;
    let (start, end) = span
        .split_once('-')
        .ok_or_else(|| bad(format!("bad bin label {}", label)))?;
    let start = start
        .trim()
        .parse()
        .map_err(|_| bad(format!("bad bin start {}", start)))?;
    let end = end
        .trim()
        .parse()
        .map_err(|_| bad(format!("bad bin end {}", end)))?;
    Ok((pad_chrom(chrom.trim()), start, end))
}

/// Folds the ordered bins of one sample into run-length segments.
///
/// A run breaks when the chromosome changes, when the next bin does not
/// start right after the current one, or when the value changes. Emitted
/// coordinates follow the bin-start convention: `loc.end` is the start of
/// the last bin of the run.
fn collapse(sample: &str, bins: &[CghBin]) -> Vec<Segment> {
    struct Run {
        chrom: String,
        first_start: i64,
        last_start: i64,
        last_end: i64,
        value: SegValue,
    }

    let emit = |run: &Run| Segment {
        sample: sample.to_string(),
        chrom: run.chrom.clone(),
        start: run.first_start,
        end: run.last_start,
        num_mark: None,
        seg_mean: None,
        value: run.value.clone(),
        fill: Fill::Observed,
    };

    let mut segments = vec![];
    let mut acc: Option<Run> = None;

    for bin in bins {
        match acc.as_mut() {
            Some(run)
                if run.chrom == bin.chrom
                    && bin.start == run.last_end + 1
                    && run.value == bin.value =>
            {
                run.last_start = bin.start;
                run.last_end = bin.end;
            }
            _ => {
                if let Some(run) = &acc {
                    segments.push(emit(run));
                }
                acc = Some(Run {
                    chrom: bin.chrom.clone(),
                    first_start: bin.start,
                    last_start: bin.start,
                    last_end: bin.end,
                    value: bin.value.clone(),
                });
            }
        }
    }
    if let Some(run) = &acc {
        segments.push(emit(run));
    }

    segments
}

fn clean(field: &str) -> &str {
    field.trim().trim_matches('"')
}

fn split_header(lines: &[String]) -> Result<(usize, char, Vec<String>), CnpError> {
    let (idx, line) = lines
        .iter()
        .enumerate()
        .find(|(_, line)| !line.trim().is_empty())
        .ok_or(CnpError::BadTable {
            line: 1,
            message: "empty table".to_string(),
        })?;
    let sep = if line.contains('\t') { '\t' } else { ',' };
    let header = line.split(sep).map(|f| clean(f).to_string()).collect();
    Ok((idx, sep, header))
}

/// Converts a wide CGHcall call table: one bin per row, the first column a
/// bin label, every further column a sample holding calls in -2..=2.
pub fn convert_calls(lines: &[String]) -> Result<SegmentTable> {
    let (header_idx, sep, header) = split_header(lines)?;
    if header.len() < 2 {
        return Err(CnpError::BadTable {
            line: header_idx + 1,
            message: "call table needs a bin column and at least one sample".to_string(),
        }
        .into());
    }
    let samples = &header[1..];

    let mut per_sample: IndexMap<String, Vec<CghBin>> = IndexMap::new();
    for sample in samples {
        per_sample.insert(sample.clone(), vec![]);
    }

    for (idx, line) in lines.iter().enumerate().skip(header_idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let lineno = idx + 1;
        let fields: Vec<&str> = line.split(sep).map(clean).collect();
        if fields.len() != header.len() {
            return Err(CnpError::BadTable {
                line: lineno,
                message: format!("expected {} fields, found {}", header.len(), fields.len()),
            }
            .into());
        }

        let (chrom, start, end) = parse_bin_label(fields[0], lineno)?;
        for (sample, field) in samples.iter().zip(&fields[1..]) {
            let call: i32 = field.parse().map_err(|_| CnpError::BadTable {
                line: lineno,
                message: format!("bad call {}", field),
            })?;
            let state = CnState::from_call(call).ok_or(CnpError::BadTable {
                line: lineno,
                message: format!("call {} outside -2..=2", call),
            })?;
            if let Some(bins) = per_sample.get_mut(sample) {
                bins.push(CghBin {
                    chrom: chrom.clone(),
                    start,
                    end,
                    value: SegValue::State(state),
                });
            }
        }
    }

    let mut rows = vec![];
    for (sample, bins) in &per_sample {
        rows.extend(collapse(sample, bins));
    }

    Ok(SegmentTable {
        rows,
        has_probs: false,
    })
}

/// Converts a long CGHcall probability table: one row per bin and sample,
/// with a bin label column, an `ID` column and the five `PROB*` columns.
pub fn convert_probs(lines: &[String]) -> Result<SegmentTable> {
    let (header_idx, sep, header) = split_header(lines)?;
    let col = |name: &str| header.iter().position(|h| h == name);

    let id_col = col("ID").ok_or(CnpError::BadTable {
        line: header_idx + 1,
        message: "missing column ID".to_string(),
    })?;
    let prob_cols: Option<Vec<usize>> = PROB_COLUMNS.iter().map(|name| col(name)).collect();
    let prob_cols = prob_cols.ok_or(CnpError::BadTable {
        line: header_idx + 1,
        message: "missing probability columns".to_string(),
    })?;

    let mut per_sample: IndexMap<String, Vec<CghBin>> = IndexMap::new();
    for (idx, line) in lines.iter().enumerate().skip(header_idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let lineno = idx + 1;
        let fields: Vec<&str> = line.split(sep).map(clean).collect();
        if fields.len() != header.len() {
            return Err(CnpError::BadTable {
                line: lineno,
                message: format!("expected {} fields, found {}", header.len(), fields.len()),
            }
            .into());
        }

        let (chrom, start, end) = parse_bin_label(fields[0], lineno)?;
        let mut probs = [0.0f64; 5];
        for (k, c) in prob_cols.iter().enumerate() {
            probs[k] = fields[*c].parse().map_err(|_| CnpError::BadTable {
                line: lineno,
                message: format!("bad probability {}", fields[*c]),
            })?;
        }

        per_sample
            .entry(fields[id_col].to_string())
            .or_default()
            .push(CghBin {
                chrom,
                start,
                end,
                value: SegValue::Probs(probs),
            });
    }

    let mut rows = vec![];
    for (sample, bins) in &per_sample {
        rows.extend(collapse(sample, bins));
    }

    Ok(SegmentTable {
        rows,
        has_probs: true,
    })
}

/// Reads a CGHcall export and dispatches on its header: probability
/// columns mean the long form, anything else the wide call form.
pub fn convert_file(infile: &str) -> Result<SegmentTable> {
    let lines = crate::libs::io::read_lines(infile)?;
    let (_, _, header) = split_header(&lines)?;
    if header.iter().any(|h| h == PROB_COLUMNS[0]) {
        convert_probs(&lines)
    } else {
        convert_calls(&lines)
    }
}

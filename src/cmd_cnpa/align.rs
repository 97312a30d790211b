use clap::*;
use itertools::Itertools;
use rayon::prelude::*;
use std::fs;
use std::io::Write;

use cnpa::libs::align::{NullScores, PairAlignment};
use cnpa::libs::profile::Profile;
use cnpa::libs::stats::PairSummary;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("align")
        .about("Arm-wise global alignment of every profile pair")
        .after_help(
            r###"
The input is one segment table holding every sample of the batch. Each
unordered sample pair is aligned arm by arm with affine gap costs; a gap
of length k costs `open + (k - 1) * extend`. The default penalties are
prohibitive, which forces gapless alignments on equal-length arms.

--matrix takes a substitution matrix in JSON, either one mapping per arm
(as written by `cnpa matrix`) or a single five-by-five mapping applied
everywhere. --null takes per-arm collections of adjusted scores from a
reference population; when given, every aligned arm with a non-empty
collection also reports `match_proba` (fraction of null scores at or
above the observed one) and `mismatch_proba` (fraction below).

Per pair, `<outdir>/<s1>_<s2>_alignment.json` holds the per-arm records
and `<outdir>/<s1>_<s2>_arms.tsv` the flat statistics. The batch summary
goes to `<outdir>/<id>_stats.tsv`. A failing pair is reported and skipped;
the remaining pairs still run, and the command exits nonzero afterwards.

Examples:
    1. Align every pair in a batch:
       cnpa align segments.tsv --matrix cohort.blosum.json

    2. Calibrate against a null population, eight threads:
       cnpa align segments.tsv --matrix cohort.blosum.json \
           --null null.json -p 8 --outdir batch7

    3. Permit gaps:
       cnpa align segments.tsv --matrix cohort.blosum.json \
           --open -12 --extend -3

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Segment table holding all samples (.csv/.tsv/.gz)"),
        )
        .arg(
            Arg::new("matrix")
                .long("matrix")
                .short('m')
                .num_args(1)
                .required(true)
                .help("Substitution matrix (.json)"),
        )
        .arg(
            Arg::new("null")
                .long("null")
                .num_args(1)
                .help("Per-arm null score collections (.json)"),
        )
        .arg(
            Arg::new("bin")
                .long("bin")
                .num_args(1)
                .default_value("100000")
                .value_parser(value_parser!(i64).range(1..))
                .help("Bin size in bp"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .num_args(1)
                .allow_hyphen_values(true)
                .default_value("-100000")
                .value_parser(value_parser!(f64))
                .help("Gap opening penalty"),
        )
        .arg(
            Arg::new("extend")
                .long("extend")
                .num_args(1)
                .allow_hyphen_values(true)
                .default_value("-100000")
                .value_parser(value_parser!(f64))
                .help("Gap extension penalty"),
        )
        .arg(
            Arg::new("whole")
                .long("whole")
                .action(ArgAction::SetTrue)
                .help("Expect whole-chromosome labels instead of arm labels"),
        )
        .arg(
            Arg::new("no_resolve")
                .long("no-resolve")
                .action(ArgAction::SetTrue)
                .help("Skip gap filling before the alignment"),
        )
        .arg(
            Arg::new("id")
                .long("id")
                .num_args(1)
                .default_value("PATIENT")
                .help("Batch identifier used in the summary"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .short('o')
                .num_args(1)
                .default_value("results")
                .help("Output location"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads for parallel processing"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let outdir = args.get_one::<String>("outdir").unwrap();
    let opt_id = args.get_one::<String>("id").unwrap();

    let opt_bin = *args.get_one::<i64>("bin").unwrap();
    let opt_open = *args.get_one::<f64>("open").unwrap();
    let opt_extend = *args.get_one::<f64>("extend").unwrap();

    let order = if args.get_flag("whole") {
        cnpa::libs::cn::chrom_order()
    } else {
        cnpa::libs::cn::arm_order()
    };

    let matrix =
        cnpa::libs::matrix::MatrixSet::from_file(args.get_one::<String>("matrix").unwrap())?;
    let null: Option<NullScores> = match args.get_one::<String>("null") {
        Some(path) => Some(cnpa::libs::align::read_null_scores(path)?),
        None => None,
    };

    // Set the number of threads for rayon
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;

    //----------------------------
    // Load profiles
    //----------------------------
    let mut table = cnpa::libs::segment::SegmentTable::from_file(infile)?;
    let dropped = table.retain_in_order(&order);
    if dropped > 0 {
        eprintln!(
            "Warning: dropped {} rows with chromosome labels outside the expected order",
            dropped
        );
    }
    if !args.get_flag("no_resolve") {
        table = cnpa::libs::segment::autoresolve(&table, opt_bin, &order);
    }

    let samples = table.samples();
    if samples.len() < 2 {
        return Err(anyhow::anyhow!(
            "need at least two samples, found {}",
            samples.len()
        ));
    }

    let mut profiles: Vec<Profile> = vec![];
    for sample in &samples {
        let subset = table.subset(sample);
        let profile = Profile::from_table(sample, opt_bin, &subset);
        for arm in profile.arms.values() {
            if arm.missing > 0 {
                eprintln!(
                    "Warning: sample {} arm {} has {} uncovered bins",
                    sample, arm.chrom, arm.missing
                );
            }
        }
        profiles.push(profile);
    }

    fs::create_dir_all(outdir)?;

    //----------------------------
    // Align all pairs
    //----------------------------
    let pairs: Vec<(&Profile, &Profile)> = profiles.iter().tuple_combinations().collect();
    let outcomes: Vec<(String, anyhow::Result<PairSummary>)> = pairs
        .par_iter()
        .map(|&(p1, p2)| {
            let mut alignment = PairAlignment::new(p1, p2);
            let pair = alignment.pair();
            let result = align_pair(&mut alignment, &matrix, opt_open, opt_extend, &null, outdir)
                .map(|results| cnpa::libs::stats::summarize(opt_id, &pair, &results));
            (pair, result)
        })
        .collect();

    //----------------------------
    // Batch summary
    //----------------------------
    let mut summaries = vec![];
    let mut failed = 0;
    for (pair, outcome) in outcomes {
        match outcome {
            Ok(summary) => summaries.push(summary),
            Err(err) => {
                failed += 1;
                eprintln!("Warning: pair {} failed: {}", pair, err);
            }
        }
    }
    write_stats(
        &format!("{}/{}_stats.tsv", outdir, opt_id),
        &summaries,
        null.is_some(),
    )?;

    if failed > 0 {
        return Err(anyhow::anyhow!(
            "{} of {} pairs failed",
            failed,
            pairs.len()
        ));
    }

    Ok(())
}

fn align_pair(
    alignment: &mut PairAlignment,
    matrix: &cnpa::libs::matrix::MatrixSet,
    gap_open: f64,
    gap_extend: f64,
    null: &Option<NullScores>,
    outdir: &str,
) -> anyhow::Result<indexmap::IndexMap<String, cnpa::libs::align::ArmAlignment>> {
    alignment.align(matrix, gap_open, gap_extend, null.as_ref())?;
    let results = alignment.sorted_results()?;
    let pair = alignment.pair();

    let mut json_writer = cnpa::writer(&format!("{}/{}_alignment.json", outdir, pair));
    serde_json::to_writer_pretty(&mut json_writer, &results)?;
    json_writer.write_all(b"\n")?;

    let mut writer = cnpa::writer(&format!("{}/{}_arms.tsv", outdir, pair));
    let mut header = vec!["arm", "score", "adjusted_score"];
    if null.is_some() {
        header.extend(["match_proba", "mismatch_proba"]);
    }
    writer.write_fmt(format_args!("{}\n", header.join("\t")))?;
    for (arm, rec) in &results {
        let mut fields = vec![
            arm.clone(),
            rec.score.to_string(),
            rec.adjusted_score.to_string(),
        ];
        if null.is_some() {
            fields.push(rec.match_proba.map(|v| v.to_string()).unwrap_or_default());
            fields.push(rec.mismatch_proba.map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_fmt(format_args!("{}\n", fields.join("\t")))?;
    }

    Ok(results)
}

fn write_stats(outfile: &str, summaries: &[PairSummary], with_proba: bool) -> anyhow::Result<()> {
    let mut writer = cnpa::writer(outfile);

    let mut header = vec![
        "id",
        "pair",
        "total_score",
        "mean_score",
        "median_score",
        "total_adjusted_score",
        "mean_adjusted_score",
        "median_adjusted_score",
    ];
    if with_proba {
        header.extend([
            "match_proba_5",
            "match_proba_10",
            "match_proba_20",
            "mismatch_proba_60",
            "mismatch_proba_50",
            "mismatch_proba_40",
        ]);
    }
    writer.write_fmt(format_args!("{}\n", header.join("\t")))?;

    for summary in summaries {
        let mut fields = vec![
            summary.id.clone(),
            summary.pair.clone(),
            summary.total_score.to_string(),
            summary.mean_score.to_string(),
            summary.median_score.to_string(),
            summary.total_adjusted.to_string(),
            summary.mean_adjusted.to_string(),
            summary.median_adjusted.to_string(),
        ];
        if with_proba {
            let proba = summary.proba.clone().unwrap_or_default();
            fields.push(proba.match_5.to_string());
            fields.push(proba.match_10.to_string());
            fields.push(proba.match_20.to_string());
            fields.push(proba.mismatch_60.to_string());
            fields.push(proba.mismatch_50.to_string());
            fields.push(proba.mismatch_40.to_string());
        }
        writer.write_fmt(format_args!("{}\n", fields.join("\t")))?;
    }

    Ok(())
}

use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("matrix")
        .about("Estimate a substitution matrix from a population of profiles")
        .after_help(
            r###"
Input files are segment tables with discrete states, as produced by
`cnpa convert` or `cnpa resolve`. Every sample in every file joins the
population; at least two samples are needed.

Scores follow the BLOSUM recipe on copy number states instead of residues:
ordered state pairs are counted over all bin positions covered by every
sample, with one pseudocount per pair, and each score is
`2 * log2(observed / expected)` under independence. The matrix is
symmetric; like pairs score positive, unlike pairs negative.

By default the same matrix is written once per chromosome arm, which is
the layout `cnpa align --matrix` expects. With --global a single
five-by-five mapping is written instead; both layouts are accepted on
input elsewhere.

Examples:
    1. Estimate from a cohort and write the per-arm layout:
       cnpa matrix cohort1.tsv cohort2.tsv -o cohort.blosum.json

    2. One flat matrix, whole-chromosome labels:
       cnpa matrix cohort.tsv --global --whole

"###,
        )
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Segment tables with discrete states"),
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
            Arg::new("whole")
                .long("whole")
                .action(ArgAction::SetTrue)
                .help("Replicate over whole-chromosome labels instead of arms"),
        )
        .arg(
            Arg::new("global")
                .long("global")
                .action(ArgAction::SetTrue)
                .help("Write one flat matrix instead of the per-arm layout"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let outfile = args.get_one::<String>("outfile").unwrap();
    let opt_bin = *args.get_one::<i64>("bin").unwrap();

    let order = if args.get_flag("whole") {
        cnpa::libs::cn::chrom_order()
    } else {
        cnpa::libs::cn::arm_order()
    };

    //----------------------------
    // Load the population
    //----------------------------
    let mut profiles = vec![];
    for infile in args.get_many::<String>("infiles").unwrap() {
        let table = cnpa::libs::segment::SegmentTable::from_file(infile)?;
        for sample in table.samples() {
            let subset = table.subset(&sample);
            let profile = cnpa::libs::profile::Profile::from_table(&sample, opt_bin, &subset);
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
    }

    //----------------------------
    // Estimate and write
    //----------------------------
    let matrix = cnpa::libs::matrix::build_matrix(&profiles)?;
    let set = if args.get_flag("global") {
        cnpa::libs::matrix::MatrixSet::Global(matrix)
    } else {
        cnpa::libs::matrix::replicate(&matrix, &order)
    };
    set.to_file(outfile)?;

    Ok(())
}

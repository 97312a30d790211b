use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("resolve")
        .about("Fill coverage gaps between segments of each chromosome arm")
        .after_help(
            r###"
The input is a segment table (.csv or .tsv, optionally gzipped) with the
columns `ID`, `chrom`, `loc.start` and `loc.end`, plus either a `state`
column or the five CGHcall `PROB*` columns.

Coordinates are bin starts: `loc.end` holds the start of the last bin a
segment covers, so adjacent segments satisfy `next.start == prev.end + bin`.

Gaps are repaired per sample and per chromosome arm:
* one stranded bin extends the upstream segment (`modified`)
* two stranded bins become one filler with the upstream value (`previous`)
* larger gaps are split between both neighbours (`first_half` and
  `second_half`); the upstream half takes the extra bin on odd counts

Rows with chromosome labels outside the expected order are dropped with a
warning. Running the command on its own output changes nothing.

Examples:
    1. Fill gaps in a Clonality-style table:
       cnpa resolve segments.csv -o resolved.tsv

    2. Whole-chromosome labels (chr01 .. chr22):
       cnpa resolve calls.tsv --whole

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input segment table (.csv/.tsv/.gz)"),
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
                .help("Expect whole-chromosome labels instead of arm labels"),
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
    let infile = args.get_one::<String>("infile").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();
    let opt_bin = *args.get_one::<i64>("bin").unwrap();

    let order = if args.get_flag("whole") {
        cnpa::libs::cn::chrom_order()
    } else {
        cnpa::libs::cn::arm_order()
    };

    let mut table = cnpa::libs::segment::SegmentTable::from_file(infile)?;
    let dropped = table.retain_in_order(&order);
    if dropped > 0 {
        eprintln!(
            "Warning: dropped {} rows with chromosome labels outside the expected order",
            dropped
        );
    }

    let resolved = cnpa::libs::segment::autoresolve(&table, opt_bin, &order);
    resolved.write(outfile)?;

    Ok(())
}

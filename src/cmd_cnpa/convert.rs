use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("convert")
        .about("Collapse a CGHcall export into a segment table")
        .after_help(
            r###"
Two CGHcall layouts are recognized by their header:

* wide call table: the first column holds bin labels like `1:1-100000`,
  every further column is a sample with calls in -2 .. 2
* long probability table: bin labels in the first column, a sample in
  `ID` and the five posterior columns `PROBAMP`, `PROBGAIN`, `PROBNORM`,
  `PROBLOSS` and `PROBDEL`

Calls map to states as 2=A, 1=G, 0=N, -1=L, -2=D. Runs of bins with the
same value collapse into one segment whose `loc.end` is the start of the
last merged bin. CGHcall works on whole chromosomes, so labels come out
as `chr01` .. `chr22`; rows on other chromosomes are dropped with a
warning, and gaps are filled at chromosome level unless --no-resolve is
given.

Examples:
    1. Convert a call matrix and fill gaps:
       cnpa convert calls.csv -o segments.tsv

    2. Keep gaps for later inspection:
       cnpa convert probs.tsv --no-resolve

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("CGHcall export (.csv/.tsv/.gz)"),
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
            Arg::new("no_resolve")
                .long("no-resolve")
                .action(ArgAction::SetTrue)
                .help("Skip gap filling after the collapse"),
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

    let order = cnpa::libs::cn::chrom_order();
    let mut table = cnpa::libs::cgh::convert_file(infile)?;
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
    table.write(outfile)?;

    Ok(())
}

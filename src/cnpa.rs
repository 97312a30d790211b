extern crate clap;
use clap::*;

mod cmd_cnpa;

fn main() -> anyhow::Result<()> {
    let app = Command::new("cnpa")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`cnpa` - Copy Number Profile Alignment")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_cnpa::align::make_subcommand())
        .subcommand(cmd_cnpa::convert::make_subcommand())
        .subcommand(cmd_cnpa::matrix::make_subcommand())
        .subcommand(cmd_cnpa::resolve::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Preparation:
    * convert - Collapse CGHcall exports into segment tables
    * resolve - Fill coverage gaps between segments
    * matrix  - Estimate a substitution matrix from a population

* Analysis:
    * align - Arm-wise global alignment of every profile pair

"###,
        );

    // Check which subcommand the user ran
    match app.get_matches().subcommand() {
        Some(("align", sub_matches)) => cmd_cnpa::align::execute(sub_matches),
        Some(("convert", sub_matches)) => cmd_cnpa::convert::execute(sub_matches),
        Some(("matrix", sub_matches)) => cmd_cnpa::matrix::execute(sub_matches),
        Some(("resolve", sub_matches)) => cmd_cnpa::resolve::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}

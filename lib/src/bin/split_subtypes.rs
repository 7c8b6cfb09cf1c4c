use clap::Parser;
use confluence_pheno::{header, pipeline, Config, Report};
use qu::ick_use::*;
use std::path::PathBuf;

/// Attach subtype calls to the derived cohort and write one phenotype file per subtype.
///
/// Expects `derive_cohort` (and `classify_subtypes`, unless a subtype file is configured) to have
/// been run with the same config.
#[derive(Parser)]
struct Opt {
    /// Config file (TOML). The built-in defaults are used if not given.
    #[clap(long, short)]
    config: Option<PathBuf>,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load_or_default(opt.config.as_deref())?;
    let cohort = pipeline::load_cohort(&config)?;
    let calls = pipeline::load_subtype_calls(&config)?;
    let mut report = Report::default();
    let files = pipeline::split_subtypes(&config, &cohort, &calls, &mut report)?;

    header("Subtype phenotype files");
    for (subtype, table) in files.iter() {
        println!("{}: {} participants", subtype.label(), table.len());
    }
    println!("{}", report.term_table().for_terminal());
    report.save(config.output_path("split_subtypes_summary.json"))?;
    Ok(())
}

use clap::Parser;
use confluence_pheno::{header, pipeline, Config, Report};
use qu::ick_use::*;
use std::path::PathBuf;

/// Add cancer site indicators and the breast cancer outcome to the phenotype extract, then drop
/// participants with competing cancer diagnoses.
#[derive(Parser)]
struct Opt {
    /// Config file (TOML). The built-in defaults are used if not given.
    #[clap(long, short)]
    config: Option<PathBuf>,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load_or_default(opt.config.as_deref())?;
    let mut report = Report::default();
    let cohort = pipeline::derive_cohort(&config, &mut report)?;

    header("Cohort");
    println!("participants: {}", cohort.len());
    println!("{}", report.term_table().for_terminal());
    report.save(config.output_path("derive_cohort_summary.json"))?;
    Ok(())
}

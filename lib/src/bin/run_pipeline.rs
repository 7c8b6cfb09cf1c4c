use clap::Parser;
use confluence_pheno::{header, pipeline, Config, Report};
use qu::ick_use::*;
use std::path::PathBuf;

/// Run every stage, from the raw extracts to the per-subtype phenotype files.
#[derive(Parser)]
struct Opt {
    /// Config file (TOML). The built-in defaults are used if not given.
    #[clap(long, short)]
    config: Option<PathBuf>,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load_or_default(opt.config.as_deref())?;
    event!(
        Level::INFO,
        "reading from \"{}\", writing to \"{}\"",
        config.input_dir.display(),
        config.output_dir.display()
    );
    let mut report = Report::default();
    pipeline::run(&config, &mut report)?;

    header("Summary");
    println!("{}", report.term_table().for_terminal());
    report.save(config.output_path("pipeline_summary.json"))?;
    Ok(())
}

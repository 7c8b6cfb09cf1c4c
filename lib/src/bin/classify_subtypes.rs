use clap::Parser;
use confluence_pheno::{header, pipeline, Config, Report, Subtype};
use qu::ick_use::*;
use std::path::PathBuf;

/// Filter the pathology extract to breast tumours and add ER-positive, ER-negative and
/// triple-negative indicators.
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
    let classified = pipeline::classify_subtypes(&config, &mut report)?;

    header("Subtype counts");
    for subtype in Subtype::ALL {
        let col = classified.column(subtype.indicator_column())?;
        println!("{}: {}", subtype.label(), classified.count_yes(&col));
    }
    println!("{}", report.term_table().for_terminal());
    report.save(config.output_path("classify_subtypes_summary.json"))?;
    Ok(())
}

//! The stages run end to end, reading and writing the files named in the config.
//!
//! Each stage saves its output (and, for filtering stages, a `.dropped.tsv` audit next to it) so
//! a run can be resumed from any intermediate file.
use crate::{
    config::Config,
    exclusion,
    outcome::{self, OUTCOME_COLUMN},
    partition::Partition,
    reconcile,
    report::Report,
    sites,
    subtypes::{self, Subtype},
    table::{Delimiter, Table},
    util, Result,
};
use anyhow::Context;
use qu::ick_use::*;
use std::path::{Path, PathBuf};

pub const SITES_FILE: &str = "updated_filtered_women_only_combined_baseline_and_endpoints.txt";
pub const OUTCOME_FILE: &str =
    "final_filtered_women_only_combined_baseline_and_endpoints_with_breast_cancer.txt";
pub const PREVALENT_EXCLUDED_FILE: &str = "phenotype_file_without_other_cancer_before_study.txt";
pub const COHORT_FILE: &str = "final_phenotype_file.txt";
pub const WITH_SUBTYPE_FILE: &str = "final_phenotype_file_with_subtype.txt";

/// Phenotype outputs are always tab separated.
const PHENOTYPE_OUT: Delimiter = Delimiter::Tab;

/// The phenotype file for one subtype.
pub fn subtype_file(subtype: Subtype) -> String {
    format!("final_phenotype_file_{}.txt", subtype.file_tag())
}

/// Pathology records restricted to the configured primary site.
pub fn primary_site_path(config: &Config) -> PathBuf {
    pathology_output(config, "primary_breast")
}

/// Pathology records with the subtype indicators added.
pub fn classification_path(config: &Config) -> PathBuf {
    pathology_output(config, "classification")
}

fn pathology_output(config: &Config, tag: &str) -> PathBuf {
    let name = config.pathology.file.file_name().unwrap_or_default();
    config.output_path(util::tagged(Path::new(name), tag))
}

/// Filter the pathology records to breast tumours and call subtypes.
pub fn classify_subtypes(config: &Config, report: &mut Report) -> Result<Table> {
    let pathology = &config.pathology;
    let delimiter = pathology.delimiter.written_as();
    let input = Table::load(
        "pathology",
        config.input_path(&pathology.file),
        pathology.delimiter,
    )?;

    let primary = subtypes::primary_site_filter(&input, pathology)
        .context("filtering pathology records by primary site")?;
    let path = primary_site_path(config);
    primary.save(&path, delimiter)?;
    report.table("primary site", input.len(), &primary, None, &path);

    let classified = subtypes::classify(&primary, pathology, config.vocabulary)
        .context("classifying receptor status")?;
    let path = classification_path(config);
    classified.save(&path, delimiter)?;
    report.table("subtype classification", primary.len(), &classified, None, &path);
    Ok(classified)
}

/// Derive the breast cancer cohort from the phenotype extract.
///
/// Fails before writing anything if a participant id appears twice.
pub fn derive_cohort(config: &Config, report: &mut Report) -> Result<Table> {
    let phenotype = &config.phenotype;
    let policy = config.vocabulary;
    let input = Table::load(
        "phenotype",
        config.input_path(&phenotype.file),
        phenotype.delimiter,
    )?;
    input.index_by(&input.column(&phenotype.id_column)?)?;

    let with_sites =
        sites::classify(&input, phenotype, policy).context("deriving cancer site indicators")?;
    let path = config.output_path(SITES_FILE);
    with_sites.save(&path, PHENOTYPE_OUT)?;
    report.table("cancer sites", input.len(), &with_sites, None, &path);

    let with_outcome = outcome::define(&with_sites, phenotype, policy)
        .context("defining breast cancer outcome")?;
    let path = config.output_path(OUTCOME_FILE);
    with_outcome.save(&path, PHENOTYPE_OUT)?;
    report.table(
        "outcome",
        with_sites.len(),
        &with_outcome,
        Some(OUTCOME_COLUMN),
        &path,
    );

    let prevalent = exclusion::exclude_prevalent(&with_outcome, phenotype, policy)
        .context("excluding other cancers before study")?;
    save_partition(
        config,
        report,
        "other cancer before study",
        &prevalent,
        PREVALENT_EXCLUDED_FILE,
        Some(OUTCOME_COLUMN),
    )?;

    let incident = exclusion::exclude_incident(&prevalent.kept, phenotype, policy)
        .context("excluding other cancers during follow-up")?;
    save_partition(
        config,
        report,
        "other cancer during follow-up",
        &incident,
        COHORT_FILE,
        Some(OUTCOME_COLUMN),
    )?;
    Ok(incident.kept)
}

/// Load the cohort saved by [`derive_cohort`].
pub fn load_cohort(config: &Config) -> Result<Table> {
    Table::load("cohort", config.output_path(COHORT_FILE), PHENOTYPE_OUT)
}

/// Load the subtype calls, either from the configured file or from the output of
/// [`classify_subtypes`]. Each participant may have at most one call.
pub fn load_subtype_calls(config: &Config) -> Result<Table> {
    let calls = match &config.subtypes.file {
        Some(file) => Table::load(
            "subtype calls",
            config.input_path(file),
            config.subtypes.delimiter,
        )?,
        None => Table::load(
            "subtype calls",
            classification_path(config),
            config.pathology.delimiter.written_as(),
        )?,
    };
    calls.index_by(&calls.column(&config.subtypes.id_column)?)?;
    Ok(calls)
}

/// Attach subtype calls to the cohort and write one phenotype file per subtype.
pub fn split_subtypes(
    config: &Config,
    cohort: &Table,
    calls: &Table,
    report: &mut Report,
) -> Result<Vec<(Subtype, Table)>> {
    let phenotype = &config.phenotype;
    let policy = config.vocabulary;

    let attached =
        reconcile::attach_subtypes(cohort, calls, phenotype, &config.subtypes, policy)
            .context("attaching subtype calls")?;
    save_partition(
        config,
        report,
        "subtype calls",
        &attached,
        WITH_SUBTYPE_FILE,
        Some(OUTCOME_COLUMN),
    )?;

    let mut out = Vec::with_capacity(Subtype::ALL.len());
    for subtype in Subtype::ALL {
        let split = reconcile::split(&attached.kept, subtype, phenotype, policy)
            .with_context(|| format!("building the {} phenotype file", subtype.label()))?;
        save_partition(
            config,
            report,
            subtype.label(),
            &split,
            &subtype_file(subtype),
            Some(subtype.outcome_column()),
        )?;
        out.push((subtype, split.kept));
    }
    Ok(out)
}

/// Run every stage.
pub fn run(config: &Config, report: &mut Report) -> Result<Vec<(Subtype, Table)>> {
    util::header("Subtype classification");
    let calls = match &config.subtypes.file {
        Some(file) => {
            event!(
                Level::INFO,
                "using subtype calls from \"{}\"",
                config.input_path(file).display()
            );
            load_subtype_calls(config)?
        }
        None => classify_subtypes(config, report)?,
    };
    util::header("Cohort");
    let cohort = derive_cohort(config, report)?;
    util::header("Subtypes");
    split_subtypes(config, &cohort, &calls, report)
}

fn save_partition(
    config: &Config,
    report: &mut Report,
    stage: &str,
    partition: &Partition,
    file: &str,
    outcome: Option<&str>,
) -> Result {
    let path = config.output_path(file);
    partition.save(&path, PHENOTYPE_OUT)?;
    report.partition(stage, partition, outcome, &path);
    Ok(())
}

use confluence_pheno::{pipeline, CohortError, Config, Delimiter, Report, Subtype, Table};
use std::{fs, path::Path};

const PHENOTYPE: &str = "\
FID  cancer_site cancer_diag ep_diy_p1232015483_combined_ep ep_diy_p1232015483_combined_datedeveloped ep_diy_p1781594777_combined_ep ep_diy_p1781594777_combined_datedeveloped ep_diy_p1176798249_combined_ep ep_diy_p1176798249_combined_datedeveloped
P1   5.0 1 NA NA         NA NA         1 2009-01-01
P2   0   1 1  2012-01-01 NA NA         0 NA
P3   NA  0 NA NA         1  2012-06-01 1 2011-01-01
P4   NA  0 1  2013-01-01 0  NA         1 2015-01-01
P5   NA  0 0  NA         0  NA         0 NA
P6   NA  0 1  2014-01-01 NA NA         0 NA
P7   NA  0 0  NA         0  NA         1 2016-01-01
";

const PATHOLOGY: &str = "\
ccvid,primary_site,status_er,status_pr,status_c_erbb2
P1,Breast,Strong positive (++/+++),Weak positive (+),Negative (-)
P4,Breast,Negative (-),Negative (-),Borderline result (+/-)
P9,Lung,Negative (-),Negative (-),Negative (-)
P3,Breast,Negative (-),Unknown,Unknown
";

fn setup(dir: &Path) -> Config {
    let input = dir.join("in");
    fs::create_dir_all(&input).unwrap();
    fs::write(
        input.join("filtered_women_only_combined_baseline_and_endpoints.txt"),
        PHENOTYPE,
    )
    .unwrap();
    fs::write(input.join("DAR-2025-00079.breast_filtered_header.csv"), PATHOLOGY).unwrap();

    let config_path = dir.join("config.toml");
    fs::write(
        &config_path,
        format!(
            "input_dir = {:?}\noutput_dir = {:?}\n",
            input,
            dir.join("out")
        ),
    )
    .unwrap();
    Config::load(&config_path).unwrap()
}

fn ids(table: &Table) -> Vec<String> {
    table.iter().map(|row| row[0].to_string()).collect()
}

fn cell(table: &Table, id: &str, column: &str) -> String {
    let col = table.column(column).unwrap();
    let row = table.iter().find(|row| &*row[0] == id).unwrap();
    col.get(row).to_string()
}

#[test]
fn full_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let mut report = Report::default();
    let files = pipeline::run(&config, &mut report).unwrap();

    // intermediate outputs
    let sites = Table::load(
        "sites",
        config.output_path(pipeline::SITES_FILE),
        Delimiter::Tab,
    )
    .unwrap();
    assert_eq!(cell(&sites, "P1", "cancer_Breast"), "1");
    assert_eq!(cell(&sites, "P1", "cancer_Lung"), "0");
    assert_eq!(cell(&sites, "P2", "cancer_Lung"), "1");
    assert_eq!(cell(&sites, "P5", "cancer_Lung"), "NA");

    let outcome = Table::load(
        "outcome",
        config.output_path(pipeline::OUTCOME_FILE),
        Delimiter::Tab,
    )
    .unwrap();
    assert_eq!(cell(&outcome, "P1", "breast_cancer_prevalent"), "1");
    assert_eq!(cell(&outcome, "P3", "breast_cancer"), "1");
    assert_eq!(cell(&outcome, "P5", "breast_cancer"), "0");
    assert_eq!(cell(&outcome, "P7", "breast_cancer"), "0");

    // P2 had lung cancer at enrollment
    let pass1 = Table::load(
        "pass1",
        config.output_path(pipeline::PREVALENT_EXCLUDED_FILE),
        Delimiter::Tab,
    )
    .unwrap();
    assert_eq!(ids(&pass1), ["P1", "P3", "P4", "P5", "P6", "P7"]);

    // P1 is protected as a prevalent case, P3's other cancer came first, P7 has nothing to
    // compare against
    let cohort = pipeline::load_cohort(&config).unwrap();
    assert_eq!(ids(&cohort), ["P1", "P4", "P5", "P6"]);
    let dropped = fs::read_to_string(config.output_path("final_phenotype_file.txt.dropped.tsv"))
        .unwrap();
    assert_eq!(
        dropped,
        "id\treason\n\
         P3\tincident_other_cancer:precedes_comparison\n\
         P7\tincident_other_cancer:no_comparison_date\n"
    );

    // subtype calls only cover breast tumours
    let calls = pipeline::load_subtype_calls(&config).unwrap();
    assert_eq!(ids(&calls), ["P1", "P4", "P3"]);
    assert_eq!(cell(&calls, "P3", "is_er_negative"), "1");
    assert_eq!(cell(&calls, "P3", "is_triple_negative"), "0");

    // P6 is a case without a subtype call
    let attached = Table::load(
        "attached",
        config.output_path(pipeline::WITH_SUBTYPE_FILE),
        Delimiter::Tab,
    )
    .unwrap();
    assert_eq!(ids(&attached), ["P1", "P4", "P5"]);

    let expected = [
        (Subtype::ErPositive, vec!["P1", "P5"]),
        (Subtype::ErNegative, vec!["P4", "P5"]),
        (Subtype::TripleNegative, vec!["P4", "P5"]),
    ];
    assert_eq!(files.len(), expected.len());
    for ((subtype, table), (expected_subtype, expected_ids)) in files.iter().zip(expected) {
        assert_eq!(*subtype, expected_subtype);
        assert_eq!(ids(table), expected_ids);
        let saved = Table::load(
            "split",
            config.output_path(pipeline::subtype_file(*subtype)),
            Delimiter::Tab,
        )
        .unwrap();
        assert_eq!(ids(&saved), expected_ids);
        assert!(!saved.has_column("breast_cancer"));
        assert!(!saved.has_column(subtype.indicator_column()));
        assert_eq!(cell(&saved, "P5", subtype.outcome_column()), "0");
    }
    assert_eq!(
        cell(&files[0].1, "P1", Subtype::ErPositive.outcome_column()),
        "1"
    );

    assert_eq!(report.stages.len(), 10);
    assert_eq!(report.stages.last().unwrap().rows_out, 2);
}

#[test]
fn stages_can_run_separately() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());

    let mut report = Report::default();
    pipeline::derive_cohort(&config, &mut report).unwrap();
    pipeline::classify_subtypes(&config, &mut report).unwrap();
    let files = pipeline::split_subtypes(
        &config,
        &pipeline::load_cohort(&config).unwrap(),
        &pipeline::load_subtype_calls(&config).unwrap(),
        &mut report,
    )
    .unwrap();
    assert_eq!(ids(&files[0].1), ["P1", "P5"]);
    assert!(pipeline::primary_site_path(&config)
        .ends_with("DAR-2025-00079.breast_filtered_header_primary_breast.csv"));
}

#[test]
fn unknown_vocabulary_fails_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path());
    fs::write(
        config.input_path(&config.pathology.file),
        "ccvid,primary_site,status_er,status_pr,status_c_erbb2\n\
         P1,Breast,Sort of positive,Negative (-),Negative (-)\n",
    )
    .unwrap();
    let err = pipeline::classify_subtypes(&config, &mut Report::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("Sort of positive"));

    config.vocabulary = confluence_pheno::VocabularyPolicy::Unknown;
    let classified = pipeline::classify_subtypes(&config, &mut Report::default()).unwrap();
    assert_eq!(cell(&classified, "P1", "is_er_positive_or_borderline"), "0");
}

#[test]
fn stage_with_unwritable_audit_leaves_no_cohort() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let cohort = config.output_path(pipeline::COHORT_FILE);
    fs::create_dir_all(config.output_path("final_phenotype_file.txt.dropped.tsv")).unwrap();

    assert!(pipeline::derive_cohort(&config, &mut Report::default()).is_err());
    assert!(!cohort.exists());
    // earlier stages completed
    assert!(config.output_path(pipeline::PREVALENT_EXCLUDED_FILE).exists());
}

#[test]
fn duplicate_participants_fail_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let duplicated = format!("{}P1   NA  0 0  NA         0  NA         0 NA\n", PHENOTYPE);
    fs::write(config.input_path(&config.phenotype.file), duplicated).unwrap();

    let err = pipeline::derive_cohort(&config, &mut Report::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CohortError>(),
        Some(CohortError::DuplicateId { id, .. }) if &**id == "P1"
    ));
    assert!(!config.output_path(pipeline::SITES_FILE).exists());
    assert!(!config.output_path(pipeline::COHORT_FILE).exists());
}

#[test]
fn duplicate_subtype_calls_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path());
    fs::write(
        config.input_path("calls.csv"),
        "ccvid,is_er_positive_or_borderline,is_er_negative,is_triple_negative\n\
         P1,1,0,0\n\
         P4,0,1,1\n\
         P1,0,1,0\n",
    )
    .unwrap();
    config.subtypes.file = Some("calls.csv".into());

    let err = pipeline::load_subtype_calls(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CohortError>(),
        Some(CohortError::DuplicateId { .. })
    ));
}

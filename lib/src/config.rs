//! Where to find the input files, and what their columns are called.
//!
//! Every setting has a default matching the CKB extract used for the Confluence project, so an
//! empty config file (or none at all) reproduces that layout.
use crate::{table::Delimiter, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// What to do with a value outside a field's vocabulary. Applied to every classifier alike.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyPolicy {
    /// Fail the stage.
    Reject,
    /// Treat the value as missing.
    Unknown,
}

impl Default for VocabularyPolicy {
    fn default() -> Self {
        VocabularyPolicy::Reject
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory input file names are relative to.
    pub input_dir: PathBuf,
    /// Directory all outputs are written to.
    pub output_dir: PathBuf,
    pub vocabulary: VocabularyPolicy,
    pub phenotype: PhenotypeConfig,
    pub pathology: PathologyConfig,
    pub subtypes: SubtypeSourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            vocabulary: VocabularyPolicy::default(),
            phenotype: PhenotypeConfig::default(),
            pathology: PathologyConfig::default(),
            subtypes: SubtypeSourceConfig::default(),
        }
    }
}

impl Config {
    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Config> {
            let text = fs::read_to_string(path)?;
            Ok(toml::from_str(&text)?)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading config \"{}\"", path.display()))
    }

    /// Load the config file if one was given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn input_path(&self, file: impl AsRef<Path>) -> PathBuf {
        self.input_dir.join(file)
    }

    pub fn output_path(&self, file: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(file)
    }
}

/// The columns of one follow-up event panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventColumns {
    /// 0/1 flag: the event happened during follow-up.
    pub occurred: String,
    /// Date the event was first recorded.
    pub date: String,
}

impl EventColumns {
    /// Columns of an endpoint from the extract's `ep_<name>_combined_*` naming.
    pub fn endpoint(name: &str) -> Self {
        EventColumns {
            occurred: format!("ep_{}_combined_ep", name),
            date: format!("ep_{}_combined_datedeveloped", name),
        }
    }
}

/// The baseline and endpoints table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhenotypeConfig {
    pub file: PathBuf,
    pub delimiter: Delimiter,
    pub id_column: String,
    pub cancer_site: String,
    pub cancer_diag: String,
    /// Invasive breast cancer (ICD-10 C50).
    pub breast_cancer_event: EventColumns,
    /// Carcinoma in situ of the breast (ICD-10 D05).
    pub carcinoma_event: EventColumns,
    /// Any other cancer.
    pub other_cancer_event: EventColumns,
}

impl Default for PhenotypeConfig {
    fn default() -> Self {
        PhenotypeConfig {
            file: PathBuf::from("filtered_women_only_combined_baseline_and_endpoints.txt"),
            delimiter: Delimiter::Whitespace,
            id_column: "FID".into(),
            cancer_site: "cancer_site".into(),
            cancer_diag: "cancer_diag".into(),
            breast_cancer_event: EventColumns::endpoint("diy_p1232015483"),
            carcinoma_event: EventColumns::endpoint("diy_p1781594777"),
            other_cancer_event: EventColumns::endpoint("diy_p1176798249"),
        }
    }
}

/// The pathology extract with receptor status per tumour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathologyConfig {
    pub file: PathBuf,
    pub delimiter: Delimiter,
    /// Rows are restricted to those where this column equals `primary_site_value`.
    pub primary_site: String,
    pub primary_site_value: String,
    pub status_er: String,
    pub status_pr: String,
    pub status_her2: String,
}

impl Default for PathologyConfig {
    fn default() -> Self {
        PathologyConfig {
            file: PathBuf::from("DAR-2025-00079.breast_filtered_header.csv"),
            delimiter: Delimiter::Comma,
            primary_site: "primary_site".into(),
            primary_site_value: "Breast".into(),
            status_er: "status_er".into(),
            status_pr: "status_pr".into(),
            status_her2: "status_c_erbb2".into(),
        }
    }
}

/// The table of subtype indicators joined onto the cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubtypeSourceConfig {
    /// Relative to `input_dir`. If unset, the classification written by `classify_subtypes` is
    /// used.
    pub file: Option<PathBuf>,
    pub delimiter: Delimiter,
    /// Participant id, matched against the phenotype table's `id_column`.
    pub id_column: String,
}

impl Default for SubtypeSourceConfig {
    fn default() -> Self {
        SubtypeSourceConfig {
            file: None,
            delimiter: Delimiter::Comma,
            id_column: "ccvid".into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.phenotype.id_column, "FID");
        assert_eq!(config.vocabulary, VocabularyPolicy::Reject);
        assert_eq!(
            config.phenotype.other_cancer_event.date,
            "ep_diy_p1176798249_combined_datedeveloped"
        );
        assert_eq!(config.pathology.status_her2, "status_c_erbb2");
    }

    #[test]
    fn partial_config() {
        let config: Config = toml::from_str(
            r#"
            output_dir = "out"
            vocabulary = "unknown"

            [phenotype]
            id_column = "csid"
            delimiter = "tab"

            [phenotype.other_cancer_event]
            occurred = "other"
            date = "other_date"

            [subtypes]
            file = "subtypes.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.output_path("x.txt"), PathBuf::from("out/x.txt"));
        assert_eq!(config.vocabulary, VocabularyPolicy::Unknown);
        assert_eq!(config.phenotype.id_column, "csid");
        assert_eq!(config.phenotype.delimiter, Delimiter::Tab);
        assert_eq!(config.phenotype.cancer_site, "cancer_site");
        assert_eq!(config.phenotype.other_cancer_event.occurred, "other");
        assert_eq!(config.subtypes.file, Some(PathBuf::from("subtypes.csv")));
        assert_eq!(config.subtypes.id_column, "ccvid");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("outptu_dir = \"x\"").is_err());
    }
}

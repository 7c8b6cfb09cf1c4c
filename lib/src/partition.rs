//! The result of a filtering stage: the rows kept, and who was dropped and why.
use crate::{
    error::CohortError,
    exclusion::Precedence,
    outcome::OUTCOME_COLUMN,
    sites::CancerSite,
    subtypes::Subtype,
    table::{Delimiter, Table},
    util, ArcStr, Result,
};
use qu::ick_use::*;
use std::{collections::BTreeMap, fmt, path::Path};

/// Why a participant was removed from the cohort.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DropReason {
    /// Had a cancer other than breast cancer recorded at enrollment.
    PrevalentOtherCancer(CancerSite),
    /// Developed another cancer during follow-up that can't be shown to come after breast cancer.
    IncidentOtherCancer(Precedence),
    /// A breast cancer case with no subtype information.
    NoSubtypeCall,
    /// A breast cancer case of a different (or unknown) subtype.
    SubtypeMismatch(Subtype),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DropReason::PrevalentOtherCancer(site) => {
                write!(f, "prevalent_other_cancer:{}", site.name())
            }
            DropReason::IncidentOtherCancer(precedence) => {
                write!(f, "incident_other_cancer:{}", precedence.code())
            }
            DropReason::NoSubtypeCall => f.write_str("no_subtype_call"),
            DropReason::SubtypeMismatch(subtype) => {
                write!(f, "subtype_mismatch:{}", subtype.code())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
    pub id: ArcStr,
    pub reason: DropReason,
}

#[derive(Debug, Clone)]
pub struct Partition {
    pub kept: Table,
    pub dropped: Vec<Dropped>,
}

impl Partition {
    /// Number of rows that went into the stage.
    pub fn input_len(&self) -> usize {
        self.kept.len() + self.dropped.len()
    }

    /// How many participants were dropped for each reason.
    pub fn reason_counts(&self) -> BTreeMap<DropReason, usize> {
        self.dropped.iter().fold(BTreeMap::new(), |mut map, d| {
            *map.entry(d.reason).or_insert(0) += 1;
            map
        })
    }

    /// Log how many rows were kept and why the rest were dropped.
    pub fn log(&self, stage: &str) {
        event!(
            Level::INFO,
            "{}: kept {} of {} rows",
            stage,
            self.kept.len(),
            self.input_len()
        );
        for (reason, count) in self.reason_counts() {
            event!(Level::INFO, "{}: dropped {} ({})", stage, count, reason);
        }
        if let Ok(outcome) = self.kept.column(OUTCOME_COLUMN) {
            event!(
                Level::INFO,
                "{}: entries with {} == 1 after filtering: {}",
                stage,
                OUTCOME_COLUMN,
                self.kept.count_yes(&outcome)
            );
        }
    }

    /// The dropped participants as a two column `id`/`reason` table.
    pub fn dropped_table(&self) -> Result<Table, CohortError> {
        let rows = self
            .dropped
            .iter()
            .map(|d| vec![d.id.clone(), ArcStr::from(d.reason.to_string())])
            .collect();
        Table::new(
            format!("{} dropped", self.kept.name()),
            vec![ArcStr::from("id"), ArcStr::from("reason")],
            rows,
        )
    }

    /// Write [`Self::dropped_table`] as a tab separated file.
    pub fn save_dropped(&self, path: impl AsRef<Path>) -> Result {
        self.dropped_table()?.save(path, Delimiter::Tab)
    }

    /// Save the dropped list next to `path`, then the kept rows at `path`.
    ///
    /// The audit goes first so that a stage whose audit can't be written leaves no output.
    pub fn save(&self, path: impl AsRef<Path>, delimiter: Delimiter) -> Result {
        let path = path.as_ref();
        self.save_dropped(dropped_path(path))?;
        self.kept.save(path, delimiter)
    }
}

/// Path of the audit file that goes with a stage output.
pub fn dropped_path(output: &Path) -> std::path::PathBuf {
    util::with_suffix(output, ".dropped.tsv")
}

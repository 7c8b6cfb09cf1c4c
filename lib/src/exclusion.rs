//! Remove participants whose other cancers confound the breast cancer outcome.
//!
//! This happens in two passes, in order:
//!
//! 1. **Prevalent.** Anyone who reported a cancer at enrollment at a site other than the breast is
//!    removed. There are no exceptions: such a participant is by definition not a prevalent
//!    breast cancer case.
//! 2. **Incident.** Anyone who developed another cancer during follow-up is removed if we can't
//!    show the other cancer came after their breast cancer. With `T_min` the earliest of the
//!    invasive and in-situ breast cancer dates (missing dates are skipped), the participant is a
//!    candidate for removal if the other cancer occurred and
//!    - (A) neither breast cancer date is known, or
//!    - (B) the other cancer's date is strictly before `T_min`, or
//!    - (C) neither breast cancer event is flagged as having occurred, whatever the dates say.
//!
//!    Candidates who are prevalent breast cancer cases are kept: their case status was fixed at
//!    enrollment, before any incident event.
//!
//! A participant dropped by the first pass is never seen by the second.
use crate::{
    config::{EventColumns, PhenotypeConfig, VocabularyPolicy},
    error::CohortError,
    outcome::PREVALENT_COLUMN,
    partition::{DropReason, Partition},
    sites::CancerSite,
    table::{Column, Table},
    tri::Tri,
};
use chrono::NaiveDateTime;

/// Which rule made an incident other cancer a reason for exclusion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// (A) No breast cancer date to compare against.
    NoComparisonDate,
    /// (B) The other cancer came first.
    PrecedesComparison,
    /// (C) No breast cancer event recorded at all.
    NoComparisonPanel,
}

impl Precedence {
    pub fn code(self) -> &'static str {
        match self {
            Precedence::NoComparisonDate => "no_comparison_date",
            Precedence::PrecedesComparison => "precedes_comparison",
            Precedence::NoComparisonPanel => "no_comparison_panel",
        }
    }
}

/// One follow-up event: whether it happened, and when.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct EventPanel {
    pub occurred: Tri,
    pub date: Option<NaiveDateTime>,
}

/// A participant's follow-up events relevant to exclusion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct IncidentHistory {
    pub other_cancer: EventPanel,
    pub breast_cancer: EventPanel,
    pub carcinoma: EventPanel,
}

impl IncidentHistory {
    /// The earliest breast cancer (invasive or in situ) date, ignoring missing dates.
    pub fn earliest_comparison(&self) -> Option<NaiveDateTime> {
        match (self.breast_cancer.date, self.carcinoma.date) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Whether either breast cancer event is known to have happened.
    pub fn has_comparison_panel(&self) -> bool {
        self.breast_cancer.occurred.is_yes() || self.carcinoma.occurred.is_yes()
    }

    /// If the other cancer makes this participant a candidate for exclusion, the first rule (in
    /// the order A, B, C) that applies.
    pub fn competing(&self) -> Option<Precedence> {
        if !self.other_cancer.occurred.is_yes() {
            return None;
        }
        let t_min = match self.earliest_comparison() {
            Some(t_min) => t_min,
            None => return Some(Precedence::NoComparisonDate),
        };
        if matches!(self.other_cancer.date, Some(t_other) if t_other < t_min) {
            return Some(Precedence::PrecedesComparison);
        }
        if !self.has_comparison_panel() {
            return Some(Precedence::NoComparisonPanel);
        }
        None
    }

    /// Apply the protected case rule on top of [`Self::competing`].
    pub fn drop_reason(&self, breast_cancer_prevalent: bool) -> Option<DropReason> {
        if breast_cancer_prevalent {
            return None;
        }
        self.competing().map(DropReason::IncidentOtherCancer)
    }
}

/// The first non-breast site flagged for a participant with a baseline cancer diagnosis.
pub fn prevalent_competing_site(
    cancer_diag: Tri,
    indicators: impl IntoIterator<Item = (CancerSite, Tri)>,
) -> Option<CancerSite> {
    if !cancer_diag.is_yes() {
        return None;
    }
    indicators
        .into_iter()
        .find(|(site, ind)| *site != CancerSite::Breast && ind.is_yes())
        .map(|(site, _)| site)
}

/// Pass 1: drop participants with a non-breast cancer at enrollment.
pub fn exclude_prevalent(
    table: &Table,
    config: &PhenotypeConfig,
    policy: VocabularyPolicy,
) -> Result<Partition, CohortError> {
    let id = table.column(&config.id_column)?;
    let diag = table.column(&config.cancer_diag)?;
    let sites = CancerSite::competing()
        .map(|site| table.column(&site.indicator_column()).map(|col| (site, col)))
        .collect::<Result<Vec<_>, _>>()?;

    let partition = table.partition(&id, |row, _| {
        let cancer_diag = table.flag(&diag, row, policy)?;
        let mut indicators = Vec::with_capacity(sites.len());
        for (site, col) in sites.iter() {
            indicators.push((*site, table.flag(col, row, policy)?));
        }
        Ok(prevalent_competing_site(cancer_diag, indicators).map(DropReason::PrevalentOtherCancer))
    })?;
    partition.log("other cancer before study");
    Ok(partition)
}

/// Pass 2: drop participants whose incident other cancer can't be shown to follow their breast
/// cancer, unless they are prevalent breast cancer cases.
pub fn exclude_incident(
    table: &Table,
    config: &PhenotypeConfig,
    policy: VocabularyPolicy,
) -> Result<Partition, CohortError> {
    let id = table.column(&config.id_column)?;
    let prevalent_col = table.column(PREVALENT_COLUMN)?;
    let other = PanelColumns::resolve(table, &config.other_cancer_event)?;
    let breast = PanelColumns::resolve(table, &config.breast_cancer_event)?;
    let carcinoma = PanelColumns::resolve(table, &config.carcinoma_event)?;

    let partition = table.partition(&id, |row, _| {
        let history = IncidentHistory {
            other_cancer: other.read(table, row, policy)?,
            breast_cancer: breast.read(table, row, policy)?,
            carcinoma: carcinoma.read(table, row, policy)?,
        };
        let prevalent = table.flag(&prevalent_col, row, policy)?;
        Ok(history.drop_reason(prevalent.is_yes()))
    })?;
    partition.log("incident other cancer");
    Ok(partition)
}

struct PanelColumns {
    occurred: Column,
    date: Column,
}

impl PanelColumns {
    fn resolve(table: &Table, columns: &EventColumns) -> Result<Self, CohortError> {
        Ok(PanelColumns {
            occurred: table.column(&columns.occurred)?,
            date: table.column(&columns.date)?,
        })
    }

    fn read(
        &self,
        table: &Table,
        row: usize,
        policy: VocabularyPolicy,
    ) -> Result<EventPanel, CohortError> {
        Ok(EventPanel {
            occurred: table.flag(&self.occurred, row, policy)?,
            date: table.date(&self.date, row, policy)?,
        })
    }
}

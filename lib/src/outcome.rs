//! The harmonised breast cancer outcome.
//!
//! Following the Confluence definition, a participant counts as a case if they had invasive
//! breast cancer at enrollment, or developed invasive (C50) or in-situ (D05) breast cancer during
//! follow-up.
use crate::{
    config::{PhenotypeConfig, VocabularyPolicy},
    error::CohortError,
    sites::CancerSite,
    table::{tri_field, Table},
    tri::Tri,
};
use qu::ick_use::*;

pub const PREVALENT_COLUMN: &str = "breast_cancer_prevalent";
pub const OUTCOME_COLUMN: &str = "breast_cancer";

/// The inputs to the outcome for one participant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OutcomeInputs {
    pub cancer_diag: Tri,
    pub breast_site: Tri,
    pub breast_cancer_event: Tri,
    pub carcinoma_event: Tri,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub breast_cancer_prevalent: bool,
    pub breast_cancer: bool,
}

impl OutcomeInputs {
    /// Breast cancer reported at baseline. Unknown on either side counts as no.
    pub fn prevalent(&self) -> bool {
        self.cancer_diag.is_yes() && self.breast_site.is_yes()
    }

    /// Any known-positive source makes a case. Unknown sources never do, so the outcome itself is
    /// never unknown.
    pub fn outcome(&self) -> Outcome {
        let breast_cancer_prevalent = self.prevalent();
        Outcome {
            breast_cancer_prevalent,
            breast_cancer: breast_cancer_prevalent
                || self.breast_cancer_event.is_yes()
                || self.carcinoma_event.is_yes(),
        }
    }
}

/// Add the `breast_cancer_prevalent` and `breast_cancer` columns.
///
/// Expects the site indicators from [`crate::sites::classify`].
pub fn define(
    table: &Table,
    config: &PhenotypeConfig,
    policy: VocabularyPolicy,
) -> Result<Table, CohortError> {
    let diag = table.column(&config.cancer_diag)?;
    let breast = table.column(&CancerSite::Breast.indicator_column())?;
    let bc_event = table.column(&config.breast_cancer_event.occurred)?;
    let carcinoma_event = table.column(&config.carcinoma_event.occurred)?;

    let mut prevalent = Vec::with_capacity(table.len());
    let mut cases = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let inputs = OutcomeInputs {
            cancer_diag: table.flag(&diag, row, policy)?,
            breast_site: table.flag(&breast, row, policy)?,
            breast_cancer_event: table.flag(&bc_event, row, policy)?,
            carcinoma_event: table.flag(&carcinoma_event, row, policy)?,
        };
        let outcome = inputs.outcome();
        prevalent.push(tri_field(outcome.breast_cancer_prevalent.into()));
        cases.push(tri_field(outcome.breast_cancer.into()));
    }

    let out = table
        .with_column(PREVALENT_COLUMN, prevalent)
        .with_column(OUTCOME_COLUMN, cases);
    let outcome_col = out.column(OUTCOME_COLUMN)?;
    event!(
        Level::INFO,
        "prevalent breast cancer: {}, breast cancer overall: {}",
        out.count_yes(&out.column(PREVALENT_COLUMN)?),
        out.count_yes(&outcome_col)
    );
    Ok(out)
}

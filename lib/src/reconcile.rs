//! Attach subtype calls to the cohort and split it into one phenotype file per subtype.
//!
//! Controls (`breast_cancer == 0`) pass through every step untouched; only cases are filtered.
use crate::{
    config::{PhenotypeConfig, SubtypeSourceConfig, VocabularyPolicy},
    error::CohortError,
    outcome::OUTCOME_COLUMN,
    partition::{DropReason, Partition},
    subtypes::Subtype,
    table::Table,
    tri::Tri,
};
use qu::ick_use::*;

/// Subtype indicators for one participant after the join.
///
/// All three are unknown for participants missing from the subtype table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SubtypeCall {
    pub er_positive: Tri,
    pub er_negative: Tri,
    pub triple_negative: Tri,
}

impl SubtypeCall {
    pub fn get(&self, subtype: Subtype) -> Tri {
        match subtype {
            Subtype::ErPositive => self.er_positive,
            Subtype::ErNegative => self.er_negative,
            Subtype::TripleNegative => self.triple_negative,
        }
    }

    /// No usable subtype information at all.
    pub fn is_unknown(&self) -> bool {
        Subtype::ALL.iter().all(|s| self.get(*s).is_unknown())
    }
}

/// Whether a row survives the "case without a subtype call" rule.
pub fn uninformative_case(breast_cancer: Tri, call: &SubtypeCall) -> Option<DropReason> {
    if breast_cancer.is_yes() && call.is_unknown() {
        Some(DropReason::NoSubtypeCall)
    } else {
        None
    }
}

/// Whether a row survives into the phenotype file for `subtype`.
///
/// Cases are kept only if they are known to be of this subtype.
pub fn subtype_mismatch(breast_cancer: Tri, call: &SubtypeCall, subtype: Subtype) -> Option<DropReason> {
    if breast_cancer.is_yes() && !call.get(subtype).is_yes() {
        Some(DropReason::SubtypeMismatch(subtype))
    } else {
        None
    }
}

/// Left join the subtype indicators onto the cohort, then drop cases with no subtype call.
pub fn attach_subtypes(
    cohort: &Table,
    subtypes: &Table,
    phenotype: &PhenotypeConfig,
    source: &SubtypeSourceConfig,
    policy: VocabularyPolicy,
) -> Result<Partition, CohortError> {
    let joined = cohort.left_join(
        &phenotype.id_column,
        subtypes,
        &source.id_column,
        &Subtype::indicator_columns(),
    )?;
    event!(
        Level::INFO,
        "{} of {} cohort rows matched a subtype call",
        count_matched(&joined)?,
        joined.len()
    );

    let id = joined.column(&phenotype.id_column)?;
    let reader = CallReader::new(&joined)?;
    let partition = joined.partition(&id, |row, _| {
        let (case, call) = reader.read(&joined, row, policy)?;
        Ok(uninformative_case(case, &call))
    })?;
    partition.log("subtype calls");
    Ok(partition)
}

/// Build the phenotype file for one subtype from the cohort with subtype calls attached.
///
/// Cases not known to be of `subtype` are dropped, `breast_cancer` is renamed to the subtype's
/// outcome column and the indicator columns are removed.
pub fn split(
    table: &Table,
    subtype: Subtype,
    phenotype: &PhenotypeConfig,
    policy: VocabularyPolicy,
) -> Result<Partition, CohortError> {
    let id = table.column(&phenotype.id_column)?;
    let reader = CallReader::new(table)?;
    let mut partition = table.partition(&id, |row, _| {
        let (case, call) = reader.read(table, row, policy)?;
        Ok(subtype_mismatch(case, &call, subtype))
    })?;
    partition.kept = partition
        .kept
        .rename_column(OUTCOME_COLUMN, subtype.outcome_column())?
        .drop_columns(&Subtype::indicator_columns());

    let outcome = partition.kept.column(subtype.outcome_column())?;
    event!(
        Level::INFO,
        "{} cases ({} == 1): {}",
        subtype.label(),
        subtype.outcome_column(),
        partition.kept.count_yes(&outcome)
    );
    partition.log(subtype.code());
    Ok(partition)
}

/// Resolved outcome and indicator columns.
struct CallReader {
    outcome: crate::table::Column,
    indicators: [crate::table::Column; 3],
}

impl CallReader {
    fn new(table: &Table) -> Result<Self, CohortError> {
        Ok(CallReader {
            outcome: table.column(OUTCOME_COLUMN)?,
            indicators: [
                table.column(Subtype::ErPositive.indicator_column())?,
                table.column(Subtype::ErNegative.indicator_column())?,
                table.column(Subtype::TripleNegative.indicator_column())?,
            ],
        })
    }

    fn read(
        &self,
        table: &Table,
        row: usize,
        policy: VocabularyPolicy,
    ) -> Result<(Tri, SubtypeCall), CohortError> {
        let [er_positive, er_negative, triple_negative] = &self.indicators;
        Ok((
            table.flag(&self.outcome, row, policy)?,
            SubtypeCall {
                er_positive: table.flag(er_positive, row, policy)?,
                er_negative: table.flag(er_negative, row, policy)?,
                triple_negative: table.flag(triple_negative, row, policy)?,
            },
        ))
    }
}

fn count_matched(joined: &Table) -> Result<usize, CohortError> {
    let cols = Subtype::indicator_columns()
        .iter()
        .map(|name| joined.column(name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(joined
        .iter()
        .filter(|row| cols.iter().any(|c| !crate::tri::is_missing(c.get(row))))
        .count())
}

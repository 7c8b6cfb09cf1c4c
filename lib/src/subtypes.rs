//! Code to classify breast tumours into molecular subtypes from their pathology record.
//!
//! The pathology extract has one row per tumour with a receptor status for each of oestrogen
//! (ER), progesterone (PR) and HER2. Each status is one of
//!
//! ```text
//! Strong positive (++/+++) | Weak positive (+) | Borderline result (+/-) | Negative (-) | Unknown
//! ```
//!
//! or missing. We derive three indicators, which are not mutually exclusive:
//!
//! 1. `is_er_positive_or_borderline`: ER strong, weak or borderline.
//! 2. `is_er_negative`: ER negative.
//! 3. `is_triple_negative`: ER negative, PR negative, and HER2 anything short of strong positive.
//!    Only the top HER2 category is treated as HER2 positive.
//!
//! Unknown and missing statuses count as "not this subtype" (0) rather than propagating as
//! unknown, so a participant present in the classification always has three known indicators.
//! Triple negative implies ER negative.
use crate::{
    config::{PathologyConfig, VocabularyPolicy},
    error::CohortError,
    table::{tri_field, Table},
    tri::Tri,
    Error,
};
use qu::ick_use::*;
use std::fmt;

/// A receptor status from the pathology record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Status {
    StrongPositive,
    WeakPositive,
    Borderline,
    Negative,
    Unknown,
}

impl std::str::FromStr for Status {
    type Err = Error;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        use Status::*;
        // The grading in brackets is optional.
        let label = match input.find('(') {
            Some(idx) => &input[..idx],
            None => input,
        };
        let label = label.trim().to_ascii_lowercase();
        Ok(match label.as_str() {
            "strong positive" => StrongPositive,
            "weak positive" => WeakPositive,
            "borderline result" | "borderline" => Borderline,
            "negative" => Negative,
            "unknown" => Unknown,
            _ => bail!("didn't recognise receptor status \"{}\"", input),
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Status {
    /// The label used in the pathology extract.
    pub fn label(self) -> &'static str {
        use Status::*;
        match self {
            StrongPositive => "Strong positive (++/+++)",
            WeakPositive => "Weak positive (+)",
            Borderline => "Borderline result (+/-)",
            Negative => "Negative (-)",
            Unknown => "Unknown",
        }
    }

    /// Any positive grading, including borderline.
    pub fn is_positive_or_borderline(self) -> bool {
        matches!(
            self,
            Status::StrongPositive | Status::WeakPositive | Status::Borderline
        )
    }

    pub fn is_negative(self) -> bool {
        self == Status::Negative
    }
}

/// The molecular subtypes we stratify breast cancer cases by.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Subtype {
    ErPositive,
    ErNegative,
    TripleNegative,
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Subtype {
    pub const ALL: [Subtype; 3] = [
        Subtype::ErPositive,
        Subtype::ErNegative,
        Subtype::TripleNegative,
    ];

    /// A human-readable label for the subtype.
    pub fn label(self) -> &'static str {
        use Subtype::*;
        match self {
            ErPositive => "ER positive (including borderline)",
            ErNegative => "ER negative",
            TripleNegative => "Triple negative (ER-, PR-, HER2-)",
        }
    }

    pub fn code(self) -> &'static str {
        use Subtype::*;
        match self {
            ErPositive => "er_positive",
            ErNegative => "er_negative",
            TripleNegative => "triple_negative",
        }
    }

    /// The indicator column written by [`classify`].
    pub fn indicator_column(self) -> &'static str {
        use Subtype::*;
        match self {
            ErPositive => "is_er_positive_or_borderline",
            ErNegative => "is_er_negative",
            TripleNegative => "is_triple_negative",
        }
    }

    /// What the outcome column is called in the subtype's phenotype file.
    pub fn outcome_column(self) -> &'static str {
        use Subtype::*;
        match self {
            ErPositive => "ER_positive_subtype",
            ErNegative => "ER_negative_subtype",
            TripleNegative => "triple_negative_subtype",
        }
    }

    /// Used to name the subtype's phenotype file.
    pub fn file_tag(self) -> &'static str {
        use Subtype::*;
        match self {
            ErPositive => "ER_positive",
            ErNegative => "ER_negative",
            TripleNegative => "triple_negative",
        }
    }

    pub fn indicator_columns() -> [&'static str; 3] {
        Self::ALL.map(Subtype::indicator_column)
    }
}

/// Receptor statuses of one tumour.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Receptors {
    pub er: Status,
    pub pr: Status,
    pub her2: Status,
}

impl Receptors {
    /// Whether the tumour belongs to `subtype`.
    pub fn is(&self, subtype: Subtype) -> bool {
        use Status::*;
        match subtype {
            Subtype::ErPositive => self.er.is_positive_or_borderline(),
            Subtype::ErNegative => self.er.is_negative(),
            Subtype::TripleNegative => {
                self.er.is_negative()
                    && self.pr.is_negative()
                    && matches!(self.her2, Negative | Borderline | WeakPositive)
            }
        }
    }
}

/// Keep only tumours whose primary site is the breast.
pub fn primary_site_filter(table: &Table, config: &PathologyConfig) -> Result<Table, CohortError> {
    let site = table.column(&config.primary_site)?;
    let out = table.filter(|row| site.get(row) == config.primary_site_value);
    event!(
        Level::INFO,
        "kept {} of {} pathology rows with {} == \"{}\"",
        out.len(),
        table.len(),
        config.primary_site,
        config.primary_site_value
    );
    Ok(out)
}

/// Add the three subtype indicator columns to the pathology table.
pub fn classify(
    table: &Table,
    config: &PathologyConfig,
    policy: VocabularyPolicy,
) -> Result<Table, CohortError> {
    let er = table.column(&config.status_er)?;
    let pr = table.column(&config.status_pr)?;
    let her2 = table.column(&config.status_her2)?;
    let parse = |s: &str| s.parse::<Status>().ok();

    let mut receptors = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        receptors.push(Receptors {
            er: table.read(&er, row, policy, parse)?.unwrap_or(Status::Unknown),
            pr: table.read(&pr, row, policy, parse)?.unwrap_or(Status::Unknown),
            her2: table.read(&her2, row, policy, parse)?.unwrap_or(Status::Unknown),
        });
    }

    let mut out = table.clone();
    for subtype in Subtype::ALL {
        let values = receptors
            .iter()
            .map(|r| tri_field(Tri::Known(r.is(subtype))))
            .collect();
        out = out.with_column(subtype.indicator_column(), values);
        event!(
            Level::INFO,
            "{}: {} tumours",
            subtype.label(),
            receptors.iter().filter(|r| r.is(subtype)).count()
        );
    }
    Ok(out)
}

//! Split the baseline `cancer_site` field into one indicator per site.
//!
//! `cancer_site` is only filled in for participants who reported a cancer at baseline, and holds
//! a single integer code. Downstream steps want to ask "did this participant have lung cancer"
//! without caring about the coding, so we derive one `cancer_<Site>` column for every site:
//!
//! - `1` if the participant's site is that site,
//! - `0` if the participant has a site, but a different one,
//! - `NA` if the participant has no site recorded.
//!
//! The indicators are independent: when the site is known exactly one of them is `1`.
use crate::{
    config::{PhenotypeConfig, VocabularyPolicy},
    error::CohortError,
    table::{tri_field, Table},
    tri::{parse_integral, Tri},
};
use qu::ick_use::*;
use std::fmt;

/// Anatomical sites recorded at baseline, in code order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CancerSite {
    Lung,
    Esophagus,
    Stomach,
    Liver,
    Intestine,
    Breast,
    Prostate,
    Cervix,
    Other,
}

impl CancerSite {
    pub const ALL: [CancerSite; 9] = [
        CancerSite::Lung,
        CancerSite::Esophagus,
        CancerSite::Stomach,
        CancerSite::Liver,
        CancerSite::Intestine,
        CancerSite::Breast,
        CancerSite::Prostate,
        CancerSite::Cervix,
        CancerSite::Other,
    ];

    /// The integer code used in the extract.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx))
            .copied()
    }

    pub fn name(self) -> &'static str {
        use CancerSite::*;
        match self {
            Lung => "Lung",
            Esophagus => "Esophagus",
            Stomach => "Stomach",
            Liver => "Liver",
            Intestine => "Intestine",
            Breast => "Breast",
            Prostate => "Prostate",
            Cervix => "Cervix",
            Other => "Other",
        }
    }

    /// Name of the derived indicator column.
    pub fn indicator_column(self) -> String {
        format!("cancer_{}", self.name())
    }

    /// Every site apart from breast.
    pub fn competing() -> impl Iterator<Item = CancerSite> {
        Self::ALL.into_iter().filter(|s| *s != CancerSite::Breast)
    }

    /// Parse a raw `cancer_site` value (missing values are handled by the caller).
    pub fn parse(input: &str) -> Option<Self> {
        parse_integral(input).and_then(Self::from_code)
    }
}

impl fmt::Display for CancerSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The indicator for `member` given a participant's recorded site.
pub fn indicator(site: Option<CancerSite>, member: CancerSite) -> Tri {
    match site {
        Some(site) => Tri::Known(site == member),
        None => Tri::Unknown,
    }
}

/// All indicators, in code order.
pub fn indicators(site: Option<CancerSite>) -> [Tri; 9] {
    CancerSite::ALL.map(|member| indicator(site, member))
}

/// Add a `cancer_<Site>` column to `table` for every site.
pub fn classify(
    table: &Table,
    config: &PhenotypeConfig,
    policy: VocabularyPolicy,
) -> Result<Table, CohortError> {
    let site_col = table.column(&config.cancer_site)?;
    let sites = (0..table.len())
        .map(|row| table.read(&site_col, row, policy, CancerSite::parse))
        .collect::<Result<Vec<_>, _>>()?;

    event!(
        Level::INFO,
        "non-missing entries in {}: {}",
        site_col.name(),
        sites.iter().filter(|s| s.is_some()).count()
    );

    let mut out = table.clone();
    for member in CancerSite::ALL {
        let values = sites
            .iter()
            .map(|site| tri_field(indicator(*site, member)))
            .collect();
        out = out.with_column(member.indicator_column(), values);
    }

    event!(
        Level::INFO,
        "rows with 1 in {}: {}",
        CancerSite::Breast.indicator_column(),
        sites
            .iter()
            .filter(|s| **s == Some(CancerSite::Breast))
            .count()
    );
    Ok(out)
}

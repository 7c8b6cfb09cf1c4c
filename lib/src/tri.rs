//! Three-valued logic for fields that may be missing.
//!
//! Biobank extracts mark missing values in a number of ways (empty cells, `NA`, `NaN`, `null`).
//! Every derived indicator in this crate is one of yes, no, or unknown, and it is important that
//! each comparison decides explicitly what to do with the unknown case rather than inheriting
//! whatever a dataframe library would do with a null.
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// The token written for unknown values.
pub const NA: &str = "NA";

/// A yes/no value that may be unknown.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Tri {
    Known(bool),
    #[default]
    Unknown,
}

impl Tri {
    pub const YES: Tri = Tri::Known(true);
    pub const NO: Tri = Tri::Known(false);

    /// Known to be true.
    pub fn is_yes(self) -> bool {
        matches!(self, Tri::Known(true))
    }

    /// Known to be false.
    pub fn is_no(self) -> bool {
        matches!(self, Tri::Known(false))
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Tri::Unknown)
    }

    /// The text written to output tables (`1`, `0` or `NA`).
    pub fn as_field(self) -> &'static str {
        match self {
            Tri::Known(true) => "1",
            Tri::Known(false) => "0",
            Tri::Unknown => NA,
        }
    }

    /// Parse a 0/1 flag, as written by the extract tools.
    ///
    /// Returns `None` if the value is present but isn't a flag. Missing values give
    /// `Some(Tri::Unknown)`.
    pub fn parse_flag(input: &str) -> Option<Tri> {
        if is_missing(input) {
            return Some(Tri::Unknown);
        }
        match parse_integral(input)? {
            0 => Some(Tri::NO),
            1 => Some(Tri::YES),
            _ => None,
        }
    }
}

impl From<bool> for Tri {
    fn from(from: bool) -> Self {
        Tri::Known(from)
    }
}

impl From<Option<bool>> for Tri {
    fn from(from: Option<bool>) -> Self {
        match from {
            Some(v) => Tri::Known(v),
            None => Tri::Unknown,
        }
    }
}

impl fmt::Display for Tri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_field())
    }
}

/// Whether a raw field counts as a missing value.
pub fn is_missing(input: &str) -> bool {
    let input = input.trim();
    input.is_empty()
        || input.eq_ignore_ascii_case("na")
        || input.eq_ignore_ascii_case("nan")
        || input.eq_ignore_ascii_case("null")
}

/// Parse an integer that may have been written as a float (e.g. `5.0`).
pub fn parse_integral(input: &str) -> Option<i64> {
    let input = input.trim();
    if let Ok(v) = input.parse::<i64>() {
        return Some(v);
    }
    let v = input.parse::<f64>().ok()?;
    if !v.is_finite() || v != v.trunc() {
        return None;
    }
    Some(v as i64)
}

/// Parse an event date. Date-only values are taken as midnight.
pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(input, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

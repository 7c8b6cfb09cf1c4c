//! Errors raised while deriving the cohort.
//!
//! All of these are fatal for the stage that raised them. Nothing is retried, and the stage's
//! output file is not written.
use crate::ArcStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CohortError {
    /// A column the stage needs is absent from the table.
    #[error("required column `{column}` not found in {table} table")]
    MissingColumn { table: ArcStr, column: ArcStr },

    /// A row has a different number of fields to the header.
    ///
    /// `row` counts data rows from 1. Blank lines in whitespace separated files are not counted.
    #[error("{table} table row {row}: expected {expected} fields, found {found}")]
    RaggedRow {
        table: ArcStr,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A categorical field holds a value outside its vocabulary.
    ///
    /// `row` counts data rows from 1 in the table being processed, which after filtering is not
    /// necessarily the line of the original file.
    #[error("{table} table row {row}: unrecognised value \"{value}\" in column `{column}`")]
    Vocabulary {
        table: ArcStr,
        column: ArcStr,
        row: usize,
        value: String,
    },

    /// An identifier appears more than once, so a join would fan out rows.
    #[error("participant id \"{id}\" appears more than once in column `{column}` of {table} table")]
    DuplicateId {
        table: ArcStr,
        column: ArcStr,
        id: ArcStr,
    },
}

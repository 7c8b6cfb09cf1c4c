//! A summary of what each stage of a run did, for the terminal and for the record.
use crate::{partition::Partition, table::Table, util, Result};
use anyhow::Context;
use itertools::Itertools;
use serde::Serialize;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use term_data_table::{Cell, Row, Table as TermTable};

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: String,
    pub rows_in: usize,
    pub rows_out: usize,
    /// Number of rows where the stage's outcome column is 1, if it has one.
    pub cases_out: Option<usize>,
    /// `reason: count` for every dropped row.
    pub dropped: Vec<(String, usize)>,
    pub output: PathBuf,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Report {
    pub stages: Vec<StageSummary>,
}

impl Report {
    /// Record a stage that transforms a table without dropping rows.
    pub fn table(
        &mut self,
        stage: impl Into<String>,
        rows_in: usize,
        out: &Table,
        outcome: Option<&str>,
        output: &Path,
    ) {
        self.stages.push(StageSummary {
            stage: stage.into(),
            rows_in,
            rows_out: out.len(),
            cases_out: cases(out, outcome),
            dropped: vec![],
            output: output.to_owned(),
        });
    }

    /// Record a filtering stage.
    pub fn partition(
        &mut self,
        stage: impl Into<String>,
        partition: &Partition,
        outcome: Option<&str>,
        output: &Path,
    ) {
        self.stages.push(StageSummary {
            stage: stage.into(),
            rows_in: partition.input_len(),
            rows_out: partition.kept.len(),
            cases_out: cases(&partition.kept, outcome),
            dropped: partition
                .reason_counts()
                .into_iter()
                .map(|(reason, count)| (reason.to_string(), count))
                .collect(),
            output: output.to_owned(),
        });
    }

    pub fn term_table(&self) -> TermTable<'static> {
        let mut table = TermTable::new().with_row(
            Row::new()
                .with_cell(Cell::from("Stage"))
                .with_cell(Cell::from("Rows in"))
                .with_cell(Cell::from("Rows out"))
                .with_cell(Cell::from("Cases"))
                .with_cell(Cell::from("Dropped"))
                .with_cell(Cell::from("Output")),
        );
        for stage in self.stages.iter() {
            let cases = match stage.cases_out {
                Some(n) => n.to_string(),
                None => "-".to_string(),
            };
            let dropped = stage
                .dropped
                .iter()
                .map(|(reason, count)| format!("{}: {}", reason, count))
                .join("\n");
            table.add_row(
                Row::new()
                    .with_cell(Cell::from(stage.stage.clone()))
                    .with_cell(Cell::from(stage.rows_in.to_string()))
                    .with_cell(Cell::from(stage.rows_out.to_string()))
                    .with_cell(Cell::from(cases))
                    .with_cell(Cell::from(dropped))
                    .with_cell(Cell::from(stage.output.display().to_string())),
            );
        }
        table
    }

    /// Save the report as pretty-printed JSON, replacing any existing file in one step.
    pub fn save(&self, path: impl AsRef<Path>) -> Result {
        fn inner(report: &Report, path: &Path) -> Result {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("could not create parent")?;
            }
            let tmp = util::with_suffix(path, ".partial");
            {
                let mut out = io::BufWriter::new(fs::File::create(&tmp)?);
                serde_json::to_writer_pretty(&mut out, report)?;
                out.flush()?;
            }
            fs::rename(&tmp, path)?;
            Ok(())
        }
        let path = path.as_ref();
        inner(self, path)
            .with_context(|| format!("unable to save report to \"{}\"", path.display()))
    }
}

fn cases(table: &Table, outcome: Option<&str>) -> Option<usize> {
    let col = table.column(outcome?).ok()?;
    Some(table.count_yes(&col))
}

//! An in-memory delimited table, addressed by column name.
//!
//! Phenotype extracts carry hundreds of columns, of which each stage reads a handful and adds a
//! few. Every output must contain all the input columns, so rather than deserializing into a
//! fixed struct we keep rows as text and parse the fields a stage needs through [`Column`]
//! handles.
use crate::{
    config::VocabularyPolicy,
    error::CohortError,
    partition::{DropReason, Dropped, Partition},
    tri::{self, Tri},
    util, ArcStr, Result,
};
use anyhow::Context;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs, io,
    ops::Deref,
    path::Path,
    sync::Arc,
};

pub type Record = Vec<ArcStr>;

static ONE: Lazy<ArcStr> = Lazy::new(|| ArcStr::from(Tri::YES.as_field()));
static ZERO: Lazy<ArcStr> = Lazy::new(|| ArcStr::from(Tri::NO.as_field()));
static NA: Lazy<ArcStr> = Lazy::new(|| ArcStr::from(tri::NA));

/// The shared text of a three-valued field.
pub fn tri_field(value: Tri) -> ArcStr {
    match value {
        Tri::Known(true) => ONE.clone(),
        Tri::Known(false) => ZERO.clone(),
        Tri::Unknown => NA.clone(),
    }
}

/// How fields are separated in a file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Tab,
    Comma,
    /// Any run of spaces or tabs. Fields cannot be quoted.
    Whitespace,
}

impl Delimiter {
    /// The delimiter a table read with `self` is saved with. Whitespace separated tables are
    /// written with tabs.
    pub fn written_as(self) -> Delimiter {
        match self {
            Delimiter::Whitespace => Delimiter::Tab,
            d => d,
        }
    }

    fn byte(self) -> u8 {
        match self.written_as() {
            Delimiter::Comma => b',',
            _ => b'\t',
        }
    }
}

/// A resolved column of a particular table.
#[derive(Debug, Clone)]
pub struct Column {
    name: ArcStr,
    idx: usize,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw text of this column in `row`.
    pub fn get<'r>(&self, row: &'r [ArcStr]) -> &'r str {
        &row[self.idx]
    }
}

/// The table itself. Cloning is cheap; rows are shared until modified.
#[derive(Debug, Clone)]
pub struct Table {
    name: ArcStr,
    headers: Vec<ArcStr>,
    rows: Arc<Vec<Record>>,
}

impl Table {
    /// Build a table from headers and rows, checking every row has one field per header.
    pub fn new(
        name: impl Into<ArcStr>,
        headers: Vec<ArcStr>,
        rows: Vec<Record>,
    ) -> Result<Self, CohortError> {
        let name = name.into();
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(CohortError::RaggedRow {
                    table: name,
                    row: idx + 1,
                    expected: headers.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Table {
            name,
            headers,
            rows: Arc::new(rows),
        })
    }

    /// Load a table with a header row from a delimited file.
    pub fn load(name: impl Into<ArcStr>, path: impl AsRef<Path>, delimiter: Delimiter) -> Result<Self> {
        fn inner(name: ArcStr, path: &Path, delimiter: Delimiter) -> Result<Table> {
            let (headers, rows) = match delimiter {
                Delimiter::Whitespace => read_whitespace(path)?,
                _ => read_delimited(path, delimiter)?,
            };
            Ok(Table::new(name, headers, rows)?)
        }
        let path = path.as_ref();
        let table = inner(name.into(), path, delimiter)
            .with_context(|| format!("while loading \"{}\"", path.display()))?;
        event!(
            Level::INFO,
            "loaded {} rows and {} columns from \"{}\"",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Save the table with a header row.
    ///
    /// The data is written to a temporary file next to `path` and renamed into place, so a
    /// failure never leaves a partial file behind.
    pub fn save(&self, path: impl AsRef<Path>, delimiter: Delimiter) -> Result {
        fn inner(table: &Table, path: &Path, delimiter: Delimiter) -> Result {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("could not create parent")?;
            }
            if util::path_exists(path)? {
                event!(
                    Level::WARN,
                    "overwriting existing file at \"{}\"",
                    path.display()
                );
            }
            let tmp = util::with_suffix(path, ".partial");
            {
                let mut out = csv::WriterBuilder::new()
                    .delimiter(delimiter.byte())
                    .from_path(&tmp)?;
                out.write_record(table.headers.iter().map(|h| h.as_bytes()))?;
                for row in table.rows.iter() {
                    out.write_record(row.iter().map(|f| f.as_bytes()))?;
                }
                out.flush()?;
            }
            if let Err(e) = fs::rename(&tmp, path) {
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
            Ok(())
        }
        let path = path.as_ref();
        inner(self, path, delimiter)
            .with_context(|| format!("unable to save data to \"{}\"", path.display()))
    }

    /// A short name for the table, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[ArcStr] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| &**h == name)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<Column, CohortError> {
        match self.headers.iter().position(|h| &**h == name) {
            Some(idx) => Ok(Column {
                name: self.headers[idx].clone(),
                idx,
            }),
            None => Err(CohortError::MissingColumn {
                table: self.name.clone(),
                column: name.into(),
            }),
        }
    }

    /// Parse a field from `row`, applying the vocabulary policy to unrecognised values.
    ///
    /// Missing values are `Ok(None)` whatever the policy.
    pub fn read<T>(
        &self,
        column: &Column,
        row: usize,
        policy: VocabularyPolicy,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<Option<T>, CohortError> {
        let value = column.get(&self.rows[row]);
        if tri::is_missing(value) {
            return Ok(None);
        }
        match parse(value) {
            Some(v) => Ok(Some(v)),
            None => match policy {
                VocabularyPolicy::Reject => Err(CohortError::Vocabulary {
                    table: self.name.clone(),
                    column: column.name.clone(),
                    row: row + 1,
                    value: value.to_owned(),
                }),
                VocabularyPolicy::Unknown => Ok(None),
            },
        }
    }

    /// Read a 0/1 flag.
    pub fn flag(
        &self,
        column: &Column,
        row: usize,
        policy: VocabularyPolicy,
    ) -> Result<Tri, CohortError> {
        Ok(self
            .read(column, row, policy, Tri::parse_flag)?
            .unwrap_or(Tri::Unknown))
    }

    /// Read a date.
    pub fn date(
        &self,
        column: &Column,
        row: usize,
        policy: VocabularyPolicy,
    ) -> Result<Option<NaiveDateTime>, CohortError> {
        self.read(column, row, policy, tri::parse_date)
    }

    /// Add a column, or replace its values if it already exists.
    ///
    /// # Panics
    ///
    /// Panics if `values` doesn't have one entry per row.
    pub fn with_column(&self, name: impl Into<ArcStr>, values: Vec<ArcStr>) -> Self {
        assert_eq!(values.len(), self.len(), "one value per row");
        let name = name.into();
        let mut headers = self.headers.clone();
        let existing = headers.iter().position(|h| *h == name);
        if existing.is_none() {
            headers.push(name);
        }
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                match existing {
                    Some(idx) => row[idx] = value,
                    None => row.push(value),
                }
                row
            })
            .collect();
        Table {
            name: self.name.clone(),
            headers,
            rows: Arc::new(rows),
        }
    }

    /// Rename a column. Data is shared with `self`.
    pub fn rename_column(&self, from: &str, to: impl Into<ArcStr>) -> Result<Self, CohortError> {
        let column = self.column(from)?;
        let mut headers = self.headers.clone();
        headers[column.idx] = to.into();
        Ok(Table {
            name: self.name.clone(),
            headers,
            rows: self.rows.clone(),
        })
    }

    /// Remove the named columns. Names that aren't present are ignored.
    pub fn drop_columns(&self, names: &[&str]) -> Self {
        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|idx| !names.contains(&&*self.headers[*idx]))
            .collect();
        Table {
            name: self.name.clone(),
            headers: keep.iter().map(|idx| self.headers[*idx].clone()).collect(),
            rows: Arc::new(
                self.rows
                    .iter()
                    .map(|row| keep.iter().map(|idx| row[*idx].clone()).collect())
                    .collect(),
            ),
        }
    }

    /// Get a table containing only rows that match the filter.
    pub fn filter(&self, f: impl Fn(&[ArcStr]) -> bool) -> Self {
        Table {
            name: self.name.clone(),
            headers: self.headers.clone(),
            rows: Arc::new(self.rows.iter().filter(|row| f(row)).cloned().collect()),
        }
    }

    /// Count rows where `column` is known to be 1.
    pub fn count_yes(&self, column: &Column) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(Tri::parse_flag(column.get(row)), Some(Tri::Known(true))))
            .count()
    }

    /// Map values of `column` to row indexes, failing if any value appears twice.
    ///
    /// Rows with a missing id are left out of the index.
    pub fn index_by(&self, column: &Column) -> Result<BTreeMap<ArcStr, usize>, CohortError> {
        let mut idx = BTreeMap::new();
        for (row_idx, row) in self.rows.iter().enumerate() {
            let id = &row[column.idx];
            if tri::is_missing(id) {
                continue;
            }
            if idx.insert(id.clone(), row_idx).is_some() {
                return Err(CohortError::DuplicateId {
                    table: self.name.clone(),
                    column: column.name.clone(),
                    id: id.clone(),
                });
            }
        }
        Ok(idx)
    }

    /// Left join `columns` of `right` onto this table.
    ///
    /// Every row of `self` appears exactly once in the output, in the same order. Rows with no
    /// match get `NA` in each joined column. Duplicate ids on either side are an error, since
    /// they would either fan out or silently pick one of the matching rows.
    pub fn left_join(
        &self,
        left_key: &str,
        right: &Table,
        right_key: &str,
        columns: &[&str],
    ) -> Result<Self, CohortError> {
        let left_key = self.column(left_key)?;
        let right_key = right.column(right_key)?;
        let right_cols = columns
            .iter()
            .map(|name| right.column(name))
            .collect::<Result<Vec<_>, _>>()?;
        self.index_by(&left_key)?;
        let right_idx = right.index_by(&right_key)?;

        let mut out = self.clone();
        for col in right_cols.iter() {
            let values = self
                .rows
                .iter()
                .map(|row| match right_idx.get(&row[left_key.idx]) {
                    Some(&ridx) => right.rows[ridx][col.idx].clone(),
                    None => NA.clone(),
                })
                .collect();
            out = out.with_column(col.name.clone(), values);
        }
        Ok(out)
    }

    /// Split rows into those kept and those dropped.
    ///
    /// `decide` is called with the row index and fields and returns a reason if the row should be
    /// dropped. `id` names the column identifying participants in the dropped list.
    pub fn partition(
        &self,
        id: &Column,
        mut decide: impl FnMut(usize, &[ArcStr]) -> Result<Option<DropReason>, CohortError>,
    ) -> Result<Partition, CohortError> {
        let mut kept = Vec::with_capacity(self.len());
        let mut dropped = Vec::new();
        for (row_idx, row) in self.rows.iter().enumerate() {
            match decide(row_idx, row)? {
                Some(reason) => dropped.push(Dropped {
                    id: row[id.idx].clone(),
                    reason,
                }),
                None => kept.push(row.clone()),
            }
        }
        Ok(Partition {
            kept: Table {
                name: self.name.clone(),
                headers: self.headers.clone(),
                rows: Arc::new(kept),
            },
            dropped,
        })
    }
}

impl Deref for Table {
    type Target = [Record];
    fn deref(&self) -> &Self::Target {
        &self.rows
    }
}

fn read_delimited(path: &Path, delimiter: Delimiter) -> Result<(Vec<ArcStr>, Vec<Record>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter.byte())
        .from_path(path)?;
    let headers = reader.headers()?.iter().map(ArcStr::from).collect();
    let rows = reader
        .records()
        .map(|rec| rec.map(|rec| rec.iter().map(ArcStr::from).collect()))
        .collect::<Result<Vec<Record>, _>>()?;
    Ok((headers, rows))
}

fn read_whitespace(path: &Path) -> Result<(Vec<ArcStr>, Vec<Record>)> {
    let reader = io::BufReader::new(fs::File::open(path)?);
    let mut lines = io::BufRead::lines(reader).filter(|line| match line {
        Ok(line) => !line.trim().is_empty(),
        Err(_) => true,
    });
    let headers = match lines.next() {
        Some(line) => line?.split_whitespace().map(ArcStr::from).collect(),
        None => bail!("file is empty"),
    };
    let rows = lines
        .map(|line| line.map(|line| line.split_whitespace().map(ArcStr::from).collect()))
        .collect::<io::Result<Vec<Record>>>()?;
    Ok((headers, rows))
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Build a table from string literals.
    pub(crate) fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            "test",
            headers.iter().map(|h| ArcStr::from(*h)).collect(),
            rows.iter()
                .map(|row| row.iter().map(|f| ArcStr::from(*f)).collect())
                .collect(),
        )
        .unwrap()
    }

    pub(crate) fn cell<'a>(table: &'a Table, id: &str, column: &str) -> &'a str {
        let id_col = table.column(&table.headers()[0]).unwrap();
        let col = table.column(column).unwrap();
        let row = table
            .iter()
            .find(|row| id_col.get(row) == id)
            .unwrap_or_else(|| panic!("no row with id {}", id));
        col.get(row)
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Table::new(
            "test",
            vec!["a".into(), "b".into()],
            vec![vec!["1".into()]],
        )
        .unwrap_err();
        assert!(matches!(err, CohortError::RaggedRow { row: 1, expected: 2, found: 1, .. }));
    }

    #[test]
    fn missing_column() {
        let t = table(&["id"], &[&["1"]]);
        assert!(matches!(
            t.column("nope"),
            Err(CohortError::MissingColumn { .. })
        ));
    }

    #[test]
    fn vocabulary_policy() {
        let t = table(&["id", "flag"], &[&["1", "7"], &["2", "NA"]]);
        let col = t.column("flag").unwrap();
        assert!(matches!(
            t.flag(&col, 0, VocabularyPolicy::Reject),
            Err(CohortError::Vocabulary { row: 1, .. })
        ));
        assert_eq!(t.flag(&col, 0, VocabularyPolicy::Unknown).unwrap(), Tri::Unknown);
        assert_eq!(t.flag(&col, 1, VocabularyPolicy::Reject).unwrap(), Tri::Unknown);
    }

    #[test]
    fn columns() {
        let t = table(&["id", "a", "b"], &[&["1", "x", "y"]]);
        let t = t.with_column("c", vec!["z".into()]);
        assert_eq!(cell(&t, "1", "c"), "z");
        let t = t.with_column("a", vec!["w".into()]);
        assert_eq!(t.headers().len(), 4);
        assert_eq!(cell(&t, "1", "a"), "w");
        let t = t.rename_column("a", "renamed").unwrap();
        assert!(!t.has_column("a"));
        assert_eq!(cell(&t, "1", "renamed"), "w");
        let t = t.drop_columns(&["b", "not_there"]);
        let headers: Vec<&str> = t.headers().iter().map(|h| &**h).collect();
        assert_eq!(headers, ["id", "renamed", "c"]);
    }

    #[test]
    fn left_join_keeps_every_row_once() {
        let left = table(&["FID", "x"], &[&["1", "a"], &["2", "b"], &["3", "c"]]);
        let right = table(&["ccvid", "s"], &[&["3", "1"], &["1", "0"], &["9", "1"]]);
        let joined = left.left_join("FID", &right, "ccvid", &["s"]).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(cell(&joined, "1", "s"), "0");
        assert_eq!(cell(&joined, "2", "s"), tri::NA);
        assert_eq!(cell(&joined, "3", "s"), "1");
        // order is preserved
        let ids: Vec<&str> = joined.iter().map(|r| &*r[0]).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn left_join_rejects_duplicates() {
        let left = table(&["FID"], &[&["1"]]);
        let right = table(&["ccvid", "s"], &[&["1", "1"], &["1", "0"]]);
        assert!(matches!(
            left.left_join("FID", &right, "ccvid", &["s"]),
            Err(CohortError::DuplicateId { .. })
        ));

        // the cohort side must be unique too
        let left = table(&["FID", "x"], &[&["1", "a"], &["2", "b"], &["1", "c"]]);
        let right = table(&["ccvid", "s"], &[&["1", "1"], &["2", "0"]]);
        match left.left_join("FID", &right, "ccvid", &["s"]) {
            Err(CohortError::DuplicateId { column, id, .. }) => {
                assert_eq!(&*column, "FID");
                assert_eq!(&*id, "1");
            }
            other => panic!("expected a duplicate id error, got {:?}", other),
        }
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let t = table(&["id", "a"], &[&["1", "x"], &["2", "NA"]]);
        t.save(&path, Delimiter::Tab).unwrap();
        assert!(!util::with_suffix(&path, ".partial").exists());
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id\ta\n1\tx\n2\tNA\n");
        let back = Table::load("back", &path, Delimiter::Tab).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(cell(&back, "2", "a"), "NA");
    }

    #[test]
    fn load_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "id  cancer_site\tcancer_diag\n1 5  1\n\n2\tNA 0\n").unwrap();
        let t = Table::load("pheno", &path, Delimiter::Whitespace).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(cell(&t, "1", "cancer_site"), "5");
        assert_eq!(cell(&t, "2", "cancer_diag"), "0");
    }

    #[test]
    fn ragged_row_counts_data_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "id a\n\n1 x\n\n\n2\n").unwrap();
        let err = Table::load("pheno", &path, Delimiter::Whitespace).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CohortError>(),
            Some(CohortError::RaggedRow { row: 2, expected: 2, found: 1, .. })
        ));
    }
}

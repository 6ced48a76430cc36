//! Domain model: an ordered table of named text columns.
//!
//! Every cell is kept as text exactly as read, so identifiers such as
//! `DISTRICT NUMBER` or `campus_number` never lose leading zeros. Numeric
//! interpretation is left to the transform that needs it.
//!
//! Column operations address columns by name and, for ranges, by their
//! current position, the way a dataframe does label slicing.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::error::{SchemaError, SchemaResult};

/// An ordered set of named columns over rows of text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Label used in error messages and logs
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table; short rows are padded with empty cells, long rows truncated.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            name: String::from("table"),
            headers,
            rows,
        }
    }

    /// Convenience constructor for literal tables.
    pub fn from_str_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.headers.len())
    }

    /// Position of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Position of a column that must exist.
    pub fn require_column(&self, name: &str) -> SchemaResult<usize> {
        self.column_index(name)
            .ok_or_else(|| SchemaError::MissingColumns {
                table: self.name.clone(),
                columns: vec![name.to_string()],
            })
    }

    /// Fail with every missing name at once rather than the first one.
    pub fn require_columns<I, S>(&self, names: I) -> SchemaResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let missing: Vec<String> = names
            .into_iter()
            .filter(|n| !self.has_column(n.as_ref()))
            .map(|n| n.as_ref().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns {
                table: self.name.clone(),
                columns: missing,
            })
        }
    }

    /// Drop named columns. Every name must exist.
    pub fn drop_columns<I, S>(&mut self, names: I) -> SchemaResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        self.require_columns(names.iter().map(|n| n.as_ref()))?;
        let targets: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|h| !targets.contains(h.as_str()))
            .collect();
        self.apply_column_mask(&keep);
        Ok(())
    }

    /// Drop every column whose name matches; returns the dropped names.
    pub fn drop_columns_where<F>(&mut self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let keep: Vec<bool> = self.headers.iter().map(|h| !pred(h)).collect();
        let dropped = self
            .headers
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(h, _)| h.clone())
            .collect();
        self.apply_column_mask(&keep);
        dropped
    }

    /// Drop the inclusive run of columns from `start` to `end`, by position.
    pub fn drop_range(&mut self, start: &str, end: &str) -> SchemaResult<Vec<String>> {
        let boundary = |column: &str| SchemaError::MissingRangeBoundary {
            column: column.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        };
        let from = self.column_index(start).ok_or_else(|| boundary(start))?;
        let to = self.column_index(end).ok_or_else(|| boundary(end))?;
        if to < from {
            return Err(SchemaError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let keep: Vec<bool> = (0..self.headers.len())
            .map(|i| i < from || i > to)
            .collect();
        let dropped = self.headers[from..=to].to_vec();
        self.apply_column_mask(&keep);
        Ok(dropped)
    }

    fn apply_column_mask(&mut self, keep: &[bool]) {
        let retain = |cells: &mut Vec<String>| {
            let mut i = 0;
            cells.retain(|_| {
                let k = keep[i];
                i += 1;
                k
            });
        };
        retain(&mut self.headers);
        for row in &mut self.rows {
            retain(row);
        }
    }

    /// Keep only rows for which `pred` holds.
    pub fn retain_rows<F>(&mut self, mut pred: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|r| pred(r));
    }

    /// Rewrite every value of one column.
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> SchemaResult<()>
    where
        F: FnMut(&str) -> String,
    {
        let idx = self.require_column(column)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    /// Rewrite every column name.
    pub fn rename_headers<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for h in &mut self.headers {
            *h = f(h);
        }
    }

    /// Apply a label mapping; returns how many columns were renamed.
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) -> usize {
        let mut renamed = 0;
        for h in &mut self.headers {
            if let Some(label) = mapping.get(h.as_str()) {
                *h = label.clone();
                renamed += 1;
            }
        }
        renamed
    }

    /// Names that occur more than once, in first-seen order.
    pub fn duplicate_headers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for h in &self.headers {
            if !seen.insert(h.as_str()) && !dupes.contains(h) {
                dupes.push(h.clone());
            }
        }
        dupes
    }

    /// Stack two tables row-wise, aligning columns by name.
    ///
    /// The result carries `self`'s columns followed by any columns only `other`
    /// has; cells a source table lacks are left empty.
    pub fn concat(&self, other: &Table) -> Table {
        let mut headers = self.headers.clone();
        for h in &other.headers {
            if !headers.contains(h) {
                headers.push(h.clone());
            }
        }

        let project = |table: &Table| -> Vec<Vec<String>> {
            let idx: Vec<Option<usize>> =
                headers.iter().map(|h| table.column_index(h)).collect();
            table
                .rows
                .iter()
                .map(|r| {
                    idx.iter()
                        .map(|i| i.map(|i| r[i].clone()).unwrap_or_default())
                        .collect()
                })
                .collect()
        };

        let mut rows = project(self);
        rows.extend(project(other));

        Table {
            name: self.name.clone(),
            headers,
            rows,
        }
    }

    /// Remove exact duplicate rows, keeping the first copy in place.
    /// Returns the number removed.
    ///
    /// Cells compare as text: `1902001` and `001902001` are different values
    /// here, so normalize numeric keys before calling this.
    pub fn dedup(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::with_capacity(before);
        self.rows.retain(|r| seen.insert(r.clone()));
        before - self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_str_rows(
            &["a", "b", "c", "d"],
            &[&["1", "2", "3", "4"], &["5", "6", "7", "8"]],
        )
        .with_name("sample")
    }

    #[test]
    fn test_short_rows_padded() {
        let t = Table::from_str_rows(&["a", "b"], &[&["1"]]);
        assert_eq!(t.rows()[0], vec!["1".to_string(), String::new()]);
    }

    #[test]
    fn test_require_columns_reports_all_missing() {
        let err = sample().require_columns(["a", "x", "y"]).unwrap_err();
        match err {
            SchemaError::MissingColumns { table, columns } => {
                assert_eq!(table, "sample");
                assert_eq!(columns, vec!["x", "y"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_drop_range_inclusive() {
        let mut t = sample();
        let dropped = t.drop_range("b", "c").unwrap();
        assert_eq!(dropped, vec!["b", "c"]);
        assert_eq!(t.headers(), &["a", "d"]);
        assert_eq!(t.rows()[1], vec!["5", "8"]);
    }

    #[test]
    fn test_drop_range_errors() {
        let mut t = sample();
        assert!(matches!(
            t.drop_range("b", "zz"),
            Err(SchemaError::MissingRangeBoundary { column, .. }) if column == "zz"
        ));
        assert!(matches!(
            t.drop_range("c", "a"),
            Err(SchemaError::InvertedRange { .. })
        ));
        assert_eq!(t.shape(), (2, 4));
    }

    #[test]
    fn test_drop_columns_where() {
        let mut t = Table::from_str_rows(&["GEN X", "gen y", "ALL X"], &[&["1", "2", "3"]]);
        let dropped = t.drop_columns_where(|h| h.to_lowercase().starts_with("gen"));
        assert_eq!(dropped, vec!["GEN X", "gen y"]);
        assert_eq!(t.headers(), &["ALL X"]);
    }

    #[test]
    fn test_concat_aligns_by_name() {
        let a = Table::from_str_rows(&["x", "y"], &[&["1", "2"]]);
        let b = Table::from_str_rows(&["y", "z"], &[&["3", "4"]]);
        let c = a.concat(&b);
        assert_eq!(c.headers(), &["x", "y", "z"]);
        assert_eq!(c.rows()[0], vec!["1", "2", ""]);
        assert_eq!(c.rows()[1], vec!["", "3", "4"]);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let mut t = Table::from_str_rows(
            &["k", "v"],
            &[&["a", "1"], &["b", "2"], &["a", "1"], &["a", "2"]],
        );
        assert_eq!(t.dedup(), 1);
        assert_eq!(t.rows()[1], vec!["b", "2"]);
        assert_eq!(t.rows()[2], vec!["a", "2"]);
    }

    #[test]
    fn test_rename_columns() {
        let mut t = sample();
        let mapping = HashMap::from([
            ("d".to_string(), "D".to_string()),
            ("zz".to_string(), "ZZ".to_string()),
        ]);
        assert_eq!(t.rename_columns(&mapping), 1);
        assert_eq!(t.headers(), &["a", "b", "c", "D"]);
        assert_eq!(t.rows()[0], vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_dedup_compares_text() {
        let mut t = Table::from_str_rows(&["campus"], &[&["1902001"], &["001902001"]]);
        assert_eq!(t.dedup(), 0);
    }

    #[test]
    fn test_duplicate_headers() {
        let t = Table::from_str_rows(&["a", "b", "a", "a"], &[]);
        assert_eq!(t.duplicate_headers(), vec!["a"]);
    }
}

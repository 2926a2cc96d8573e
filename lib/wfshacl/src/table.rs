//! Tabular query results.

use crate::error::EvaluationError;
use crate::term::decode_cell;
use oxrdf::Term;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// Suffix of the attributes holding a set of values per row.
pub const GROUP_MARKER: &str = "group";

/// A solution sequence: an ordered header and rows with one term per header position.
///
/// The first attribute is always the focus node column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Term>>,
}

impl Table {
    pub fn new(header: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a one column table.
    pub fn unary(name: impl Into<String>, values: impl IntoIterator<Item = Term>) -> Self {
        Self {
            header: vec![name.into()],
            rows: values.into_iter().map(|value| vec![value]).collect(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Term>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn arity(&self) -> usize {
        self.header.len()
    }

    pub fn is_unary(&self) -> bool {
        self.header.len() == 1
    }

    /// Position of the attribute `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|a| a == name)
    }

    /// Position of the first attribute whose name ends with `suffix`.
    pub fn column_by_suffix(&self, suffix: &str) -> Option<usize> {
        self.header.iter().position(|a| a.ends_with(suffix))
    }

    /// Appends a row. It must have one term per attribute.
    pub fn push(&mut self, row: Vec<Term>) -> Result<(), EvaluationError> {
        if row.len() != self.header.len() {
            return Err(EvaluationError::ArityMismatch {
                header: self.header.clone(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Appends the rows of `other` that are not already in this table.
    ///
    /// Columns are matched by name so both headers may list attributes in a different order.
    pub fn merge(&mut self, other: &Self) -> Result<(), EvaluationError> {
        let mapping = self
            .header
            .iter()
            .map(|name| {
                other
                    .column(name)
                    .ok_or_else(|| EvaluationError::HeaderMismatch {
                        expected: self.header.clone(),
                        actual: other.header.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen = self.rows.iter().cloned().collect::<FxHashSet<_>>();
        for row in &other.rows {
            let row = mapping.iter().map(|i| row[*i].clone()).collect::<Vec<_>>();
            if seen.insert(row.clone()) {
                self.rows.push(row);
            }
        }
        Ok(())
    }

    /// The terms of the first column, in row order.
    pub fn first_column(&self) -> impl Iterator<Item = &Term> {
        self.rows.iter().filter_map(|row| row.first())
    }

    /// Checks if `term` is a value of the first column.
    pub fn contains(&self, term: &Term) -> bool {
        self.first_column().any(|t| t == term)
    }

    /// Keeps only the given columns, in the given order.
    pub fn project(&self, columns: &[usize]) -> Self {
        Self {
            header: columns.iter().map(|i| self.header[*i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| columns.iter().map(|i| row[*i].clone()).collect())
                .collect(),
        }
    }

    /// Removes the rows at the given indices.
    pub fn remove_rows(&mut self, indices: &[usize]) {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        // Descending order keeps the remaining indices valid
        for index in indices.into_iter().rev() {
            if index < self.rows.len() {
                self.rows.remove(index);
            }
        }
    }

    /// Keeps only the rows at the given indices, preserving the row order.
    pub fn retain_rows(&mut self, indices: &[usize]) {
        let keep = indices.iter().copied().collect::<FxHashSet<_>>();
        let mut index = 0;
        self.rows.retain(|_| {
            let kept = keep.contains(&index);
            index += 1;
            kept
        });
    }

    /// Builds the grouped view of this table.
    pub fn regroup(&self) -> Result<GroupedTable<'_>, EvaluationError> {
        let mut grouped = GroupedTable {
            table: self,
            group_columns: Vec::new(),
            keys: Vec::new(),
            index: FxHashMap::default(),
        };
        grouped.regroup()?;
        Ok(grouped)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header.join("\t"))?;
        for row in &self.rows {
            for (i, term) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, "\t")?;
                }
                write!(f, "{term}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A [`Table`] indexed by its first column.
///
/// For every attribute whose name ends with [`GROUP_MARKER`] the index holds the deduplicated
/// decoded values of the attribute for each key.
#[derive(Debug)]
pub struct GroupedTable<'a> {
    table: &'a Table,
    group_columns: Vec<usize>,
    keys: Vec<Term>,
    index: FxHashMap<Term, GroupEntry>,
}

#[derive(Debug, Default)]
struct GroupEntry {
    rows: Vec<usize>,
    groups: Vec<Vec<Term>>,
}

impl GroupedTable<'_> {
    /// Rebuilds the index from the table content.
    pub fn regroup(&mut self) -> Result<(), EvaluationError> {
        self.group_columns = self
            .table
            .header
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, name)| name.ends_with(GROUP_MARKER))
            .map(|(i, _)| i)
            .collect();
        self.keys.clear();
        self.index.clear();
        for (row_index, row) in self.table.rows.iter().enumerate() {
            let Some(key) = row.first() else {
                continue;
            };
            let entry = self.index.entry(key.clone()).or_insert_with(|| {
                self.keys.push(key.clone());
                GroupEntry {
                    rows: Vec::new(),
                    groups: vec![Vec::new(); self.group_columns.len()],
                }
            });
            entry.rows.push(row_index);
            for (group, column) in entry.groups.iter_mut().zip(&self.group_columns) {
                for value in decode_cell(&row[*column])? {
                    if !group.contains(&value) {
                        group.push(value);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    /// The distinct values of the first column, in order of first occurrence.
    pub fn keys(&self) -> &[Term] {
        &self.keys
    }

    /// The indices of the rows with the given key.
    pub fn rows(&self, key: &Term) -> &[usize] {
        self.index.get(key).map_or(&[], |entry| &entry.rows)
    }

    /// The set of values of the grouped `column` for `key`.
    ///
    /// Returns an empty set for unknown keys and for columns that are not grouped.
    pub fn group(&self, key: &Term, column: usize) -> &[Term] {
        let Some(position) = self.group_columns.iter().position(|c| *c == column) else {
            return &[];
        };
        self.index
            .get(key)
            .map_or(&[], |entry| entry.groups[position].as_slice())
    }

    pub fn is_grouped(&self, column: usize) -> bool {
        self.group_columns.contains(&column)
    }
}

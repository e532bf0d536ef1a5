//! In-memory columnar particle table.
//!
//! A [`StarTable`] owns an ordered set of named, typed columns of equal
//! length. Column names are validated against the label catalogue on every
//! structural mutation unless the caller explicitly bypasses validation.
//! Structural operations either commit completely or leave the table
//! unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use relion_model::labels::IMAGE_NAME;
use relion_model::{CellValue, ColumnType, LabelCatalog, Result, StarError};

/// Preamble of a freshly constructed table: blank line, data block marker,
/// blank line, loop marker.
pub const DEFAULT_PREAMBLE: &[&str] = &["", "data_", "", "loop_"];

/// Default fill for newly added columns, cast to each column's type.
const DEFAULT_FILL: CellValue = CellValue::Integer(-1);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarTable {
    pub(crate) preamble: Vec<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) dtypes: Vec<ColumnType>,
    pub(crate) data: BTreeMap<String, Vec<CellValue>>,
    pub(crate) nrows: usize,
    pub(crate) origin: Option<PathBuf>,
    #[serde(skip)]
    pub(crate) catalog: LabelCatalog,
}

impl StarTable {
    /// Create an empty table with the default preamble.
    pub fn new() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.iter().map(|s| (*s).to_string()).collect(),
            columns: Vec::new(),
            dtypes: Vec::new(),
            data: BTreeMap::new(),
            nrows: 0,
            origin: None,
            catalog: LabelCatalog::new(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Declared types, index-aligned with [`Self::column_names`].
    pub fn column_types(&self) -> &[ColumnType] {
        &self.dtypes
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Declared type of a column, `None` if absent.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|idx| self.dtypes[idx])
    }

    /// Values of a column in row order, `None` if absent.
    pub fn column_values(&self, name: &str) -> Option<&[CellValue]> {
        self.data.get(name).map(Vec::as_slice)
    }

    /// Preamble lines re-emitted verbatim by the writer.
    pub fn preamble(&self) -> &[String] {
        &self.preamble
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// Path of the last loaded or stored file, informational only.
    pub fn origin_path(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn origin_dir(&self) -> Option<&Path> {
        self.origin.as_deref().and_then(Path::parent)
    }

    pub fn origin_file_name(&self) -> Option<&str> {
        self.origin
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
    }

    /// Add a validated column with the default fill on every row.
    ///
    /// Adding a name that already exists overwrites that column's data and
    /// type in place, keeping its position.
    pub fn add_column(&mut self, name: impl Into<String>) -> Result<()> {
        self.add_column_with(name, &DEFAULT_FILL)
    }

    /// Add a validated column with `fill` cast to the column type on every
    /// row.
    pub fn add_column_with(&mut self, name: impl Into<String>, fill: &CellValue) -> Result<()> {
        self.insert_scalar_column(name.into(), fill, false)
    }

    /// Add a validated column from per-row values; their count must equal
    /// the current number of rows.
    pub fn add_column_values(
        &mut self,
        name: impl Into<String>,
        values: Vec<CellValue>,
    ) -> Result<()> {
        self.insert_value_column("add_column", name.into(), values, false)
    }

    /// Add a column without catalogue validation; unrecognized names are
    /// typed real.
    pub fn add_column_unchecked(&mut self, name: impl Into<String>, fill: &CellValue) -> Result<()> {
        self.insert_scalar_column(name.into(), fill, true)
    }

    /// Sequence form of [`Self::add_column_unchecked`].
    pub fn add_column_values_unchecked(
        &mut self,
        name: impl Into<String>,
        values: Vec<CellValue>,
    ) -> Result<()> {
        self.insert_value_column("add_column", name.into(), values, true)
    }

    /// Remove a column; absent names are a no-op.
    pub fn del_column(&mut self, name: &str) {
        if let Some(idx) = self.column_index(name) {
            self.columns.remove(idx);
            self.dtypes.remove(idx);
            self.data.remove(name);
        }
    }

    /// Append one row from named values.
    ///
    /// Exactly one value per existing column is required. The whole row is
    /// validated and cast before anything is appended.
    pub fn add_row(&mut self, values: &[(&str, CellValue)]) -> Result<()> {
        const OP: &str = "add_row";
        if values.len() != self.columns.len() {
            return Err(StarError::column_count(OP, self.columns.len(), values.len()));
        }
        let mut supplied: BTreeMap<&str, &CellValue> = BTreeMap::new();
        for (name, value) in values {
            if !self.has_column(name) {
                return Err(StarError::unknown_column(OP, *name));
            }
            if supplied.insert(name, value).is_some() {
                return Err(StarError::invalid_argument(
                    OP,
                    format!("duplicate value for column '{name}'"),
                ));
            }
        }
        // supplied now covers every column exactly once
        let mut staged = Vec::with_capacity(self.columns.len());
        for (name, dtype) in self.columns.iter().zip(&self.dtypes) {
            let value = supplied[name.as_str()];
            let cast = value.cast_to(*dtype).map_err(|e| StarError::cast(OP, &e))?;
            staged.push(cast);
        }
        self.commit_row(staged);
        Ok(())
    }

    /// Append one row from values in column order.
    pub fn push_row(&mut self, values: Vec<CellValue>) -> Result<()> {
        const OP: &str = "push_row";
        if values.len() != self.columns.len() {
            return Err(StarError::column_count(OP, self.columns.len(), values.len()));
        }
        let mut staged = Vec::with_capacity(values.len());
        for (value, dtype) in values.iter().zip(&self.dtypes) {
            let cast = value.cast_to(*dtype).map_err(|e| StarError::cast(OP, &e))?;
            staged.push(cast);
        }
        self.commit_row(staged);
        Ok(())
    }

    /// Delete the rows at the given positions.
    ///
    /// Out-of-range indices are ignored and duplicates are harmless;
    /// surviving rows keep their relative order.
    pub fn del_rows(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        let mut keep = vec![true; self.nrows];
        for &idx in indices {
            if idx < self.nrows {
                keep[idx] = false;
            }
        }
        for values in self.data.values_mut() {
            let mut mask = keep.iter().copied();
            values.retain(|_| mask.next().unwrap_or(false));
        }
        let remaining = keep.iter().filter(|k| **k).count();
        debug!(removed = self.nrows - remaining, remaining, "Deleted rows");
        self.nrows = remaining;
    }

    /// Build a new table holding the given rows in the given order.
    ///
    /// Indices may repeat; each occurrence emits the row again. The new
    /// table shares no storage with this one.
    pub fn get_subset(&self, indices: &[usize]) -> Result<StarTable> {
        const OP: &str = "get_subset";
        for &idx in indices {
            if idx >= self.nrows {
                return Err(StarError::row_out_of_range(OP, idx, self.nrows));
            }
        }
        let mut data = BTreeMap::new();
        for (name, values) in &self.data {
            let mut rows = Vec::with_capacity(indices.len());
            for &idx in indices {
                rows.push(values[idx].clone());
            }
            data.insert(name.clone(), rows);
        }
        Ok(StarTable {
            preamble: self.preamble.clone(),
            columns: self.columns.clone(),
            dtypes: self.dtypes.clone(),
            data,
            nrows: indices.len(),
            origin: None,
            catalog: self.catalog.clone(),
        })
    }

    pub fn get_element(&self, name: &str, row: usize) -> Result<&CellValue> {
        const OP: &str = "get_element";
        let values = self
            .data
            .get(name)
            .ok_or_else(|| StarError::unknown_column(OP, name))?;
        values
            .get(row)
            .ok_or_else(|| StarError::row_out_of_range(OP, row, self.nrows))
    }

    /// Store `value` cast to the column's declared type.
    pub fn set_element(&mut self, name: &str, row: usize, value: &CellValue) -> Result<()> {
        const OP: &str = "set_element";
        let dtype = self
            .column_type(name)
            .ok_or_else(|| StarError::unknown_column(OP, name))?;
        let cast = value.cast_to(dtype).map_err(|e| StarError::cast(OP, &e))?;
        let nrows = self.nrows;
        let values = self
            .data
            .get_mut(name)
            .ok_or_else(|| StarError::unknown_column(OP, name))?;
        let slot = values
            .get_mut(row)
            .ok_or_else(|| StarError::row_out_of_range(OP, row, nrows))?;
        *slot = cast;
        Ok(())
    }

    /// Index of the first row whose value in `name` equals `value`.
    ///
    /// The probe is cast to the column's type first, so an integer probe
    /// matches a real column holding the same quantity.
    pub fn find_element(&self, name: &str, value: &CellValue) -> Result<usize> {
        self.find_element_from(name, value, 0)
    }

    /// As [`Self::find_element`], searching from `start` onward.
    pub fn find_element_from(&self, name: &str, value: &CellValue, start: usize) -> Result<usize> {
        const OP: &str = "find_element";
        let dtype = self
            .column_type(name)
            .ok_or_else(|| StarError::unknown_column(OP, name))?;
        let values = match self.data.get(name) {
            Some(values) => values,
            None => return Err(StarError::unknown_column(OP, name)),
        };
        let probe = match value.cast_to(dtype) {
            Ok(probe) => probe,
            Err(_) => return Err(StarError::not_found(OP, name, value.to_string())),
        };
        values
            .iter()
            .skip(start)
            .position(|v| *v == probe)
            .map(|pos| pos + start)
            .ok_or_else(|| StarError::not_found(OP, name, value.to_string()))
    }

    /// Replace an existing column's data in one call.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) -> Result<()> {
        const OP: &str = "set_column";
        let dtype = self
            .column_type(name)
            .ok_or_else(|| StarError::unknown_column(OP, name))?;
        if values.len() != self.nrows {
            return Err(StarError::length_mismatch(OP, name, self.nrows, values.len()));
        }
        let mut staged = Vec::with_capacity(values.len());
        for value in &values {
            staged.push(value.cast_to(dtype).map_err(|e| StarError::cast(OP, &e))?);
        }
        self.data.insert(name.to_string(), staged);
        Ok(())
    }

    /// Copy `src`'s values into `dst`, creating or overwriting `dst`.
    ///
    /// `dst` must be a catalogue-valid name; values are cast to its type.
    pub fn copy_column(&mut self, src: &str, dst: impl Into<String>) -> Result<()> {
        const OP: &str = "copy_column";
        let values = self
            .column_values(src)
            .ok_or_else(|| StarError::unknown_column(OP, src))?
            .to_vec();
        self.insert_value_column(OP, dst.into(), values, false)
    }

    /// Count the rows matching every `(name, value)` pair by equality.
    ///
    /// A name with no matching column makes every row a miss.
    pub fn count_matching(&self, criteria: &[(&str, CellValue)]) -> usize {
        let mut probes = Vec::with_capacity(criteria.len());
        for (name, value) in criteria {
            let Some(dtype) = self.column_type(name) else {
                return 0;
            };
            let Ok(probe) = value.cast_to(dtype) else {
                return 0;
            };
            let Some(values) = self.column_values(name) else {
                return 0;
            };
            probes.push((values, probe));
        }
        (0..self.nrows)
            .filter(|&row| probes.iter().all(|(values, probe)| values[row] == *probe))
            .count()
    }

    /// Whether both tables describe the same particles in the same order,
    /// judged by the particle-image identifier column.
    pub fn is_comparable(&self, other: &StarTable) -> bool {
        if self.nrows != other.nrows {
            return false;
        }
        match (self.column_values(IMAGE_NAME), other.column_values(IMAGE_NAME)) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        }
    }

    /// Deep copy retaining only the columns RELION itself understands.
    pub fn to_relion_subset(&self) -> StarTable {
        let mut copy = self.clone();
        let dropped: Vec<String> = self
            .columns
            .iter()
            .filter(|name| !self.catalog.is_relion_compatible(name))
            .cloned()
            .collect();
        for name in &dropped {
            copy.del_column(name);
        }
        copy
    }

    /// Distinct values of a column in order of first appearance.
    pub fn distinct_values(&self, name: &str) -> Option<Vec<CellValue>> {
        let values = self.column_values(name)?;
        let mut seen = BTreeSet::new();
        let mut distinct = Vec::new();
        for value in values {
            if seen.insert(value.to_string()) {
                distinct.push(value.clone());
            }
        }
        Some(distinct)
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == name)
    }

    fn commit_row(&mut self, staged: Vec<CellValue>) {
        for (name, value) in self.columns.iter().zip(staged) {
            if let Some(values) = self.data.get_mut(name) {
                values.push(value);
            }
        }
        self.nrows += 1;
    }

    fn insert_scalar_column(&mut self, name: String, fill: &CellValue, bypass: bool) -> Result<()> {
        const OP: &str = "add_column";
        let dtype = self.resolve_column_type(OP, &name, bypass)?;
        let cast = fill.cast_to(dtype).map_err(|e| StarError::cast(OP, &e))?;
        let values = vec![cast; self.nrows];
        self.install_column(name, dtype, values);
        Ok(())
    }

    fn insert_value_column(
        &mut self,
        op: &'static str,
        name: String,
        values: Vec<CellValue>,
        bypass: bool,
    ) -> Result<()> {
        let dtype = self.resolve_column_type(op, &name, bypass)?;
        if values.len() != self.nrows {
            return Err(StarError::length_mismatch(op, name, self.nrows, values.len()));
        }
        let mut staged = Vec::with_capacity(values.len());
        for value in &values {
            staged.push(value.cast_to(dtype).map_err(|e| StarError::cast(op, &e))?);
        }
        self.install_column(name, dtype, staged);
        Ok(())
    }

    fn resolve_column_type(&self, op: &'static str, name: &str, bypass: bool) -> Result<ColumnType> {
        match self.catalog.type_of(name) {
            Some(dtype) => Ok(dtype),
            None if bypass => Ok(ColumnType::Real),
            None => Err(StarError::schema(op, name)),
        }
    }

    fn install_column(&mut self, name: String, dtype: ColumnType, values: Vec<CellValue>) {
        match self.column_index(&name) {
            Some(idx) => {
                self.dtypes[idx] = dtype;
                self.data.insert(name, values);
            }
            None => {
                self.columns.push(name.clone());
                self.dtypes.push(dtype);
                self.data.insert(name, values);
            }
        }
    }
}

impl Default for StarTable {
    fn default() -> Self {
        Self::new()
    }
}

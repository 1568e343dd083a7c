/// BioRemPP Table Implementation
///
/// A Table is a named collection of equally long typed columns with a schema.
/// Tables are built once and then only read: every transformation (projection,
/// filtering, renaming, sorting, deduplication) returns a new table.
///
/// # Examples
///
/// ```
/// use biorempp::{Table, Schema, ColumnType, ColumnValue};
/// use std::collections::HashMap;
///
/// let schema = Schema::new(vec![
///     ("sample".to_string(), ColumnType::String, false),
///     ("ko".to_string(), ColumnType::String, false),
/// ]);
///
/// let mut table = Table::new("records".to_string(), schema);
///
/// let mut row = HashMap::new();
/// row.insert("sample".to_string(), ColumnValue::from("S1"));
/// row.insert("ko".to_string(), ColumnValue::from("K00001"));
/// table.append_row(row).unwrap();
///
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.get_value(0, "ko").unwrap().as_string(), Some("K00001"));
/// ```

use crate::column::{Column, ColumnType, ColumnValue, ValueKey};
use crate::error::{Error, TableError};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A row as a column-name to value map
pub type Row = HashMap<String, ColumnValue>;

/// Group key: one borrowed value per grouping column
pub type GroupKey<'a> = Vec<ValueKey<'a>>;

/// Table schema: ordered list of (name, type, nullable)
///
/// # Examples
///
/// ```
/// use biorempp::{Schema, ColumnType};
///
/// let schema = Schema::new(vec![
///     ("cpd".to_string(), ColumnType::String, false),
///     ("LD50".to_string(), ColumnType::Float64, true),
/// ]);
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.get_column_index("LD50"), Some(1));
/// assert_eq!(schema.missing_columns(&["cpd", "toxicity"]), vec!["toxicity".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnType, bool)>, // (name, type, nullable)
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnType, bool)>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _, _)| n == name)
    }

    /// Returns a tuple of (name, type, nullable) or None if index is out of bounds.
    pub fn get_column_info(&self, index: usize) -> Option<(&str, ColumnType, bool)> {
        self.columns.get(index).map(|(name, ty, nullable)| (name.as_str(), *ty, *nullable))
    }

    pub fn get_column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.iter().find(|(n, _, _)| n == name).map(|(_, ty, _)| *ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }

    /// Names from `required` that this schema lacks, in the order given
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.contains(name))
            .map(|name| name.to_string())
            .collect()
    }
}

/// Sort order for a sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Specification for sorting by a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
    /// Whether NULL values should be placed first or last
    pub nulls_first: bool,
}

impl SortKey {
    /// Ascending order, nulls last
    pub fn ascending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Ascending,
            nulls_first: false,
        }
    }

    /// Descending order, nulls last
    pub fn descending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Descending,
            nulls_first: false,
        }
    }
}

/// Immutable columnar table.
#[derive(Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Create an empty table with the given schema.
    pub fn new(name: String, schema: Schema) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|(col_name, ty, nullable)| Column::new(col_name.clone(), *ty, *nullable))
            .collect();

        Table {
            name,
            schema,
            columns,
            row_count: 0,
        }
    }

    /// Create a table with no columns and no rows
    pub fn empty(name: &str) -> Self {
        Table::new(name.to_string(), Schema::new(Vec::new()))
    }

    /// Assemble a table from prebuilt columns of equal length.
    pub fn from_columns(name: String, columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map_or(0, Column::len);

        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name()) {
                return Err(TableError::DuplicateColumn(col.name().to_string()));
            }
            if col.len() != row_count {
                return Err(TableError::RowWidth {
                    expected: row_count,
                    found: col.len(),
                });
            }
        }

        let schema = Schema::new(
            columns
                .iter()
                .map(|c| (c.name().to_string(), c.column_type(), c.is_nullable()))
                .collect(),
        );

        Ok(Table {
            name,
            schema,
            columns,
            row_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.get_column_names()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        let col_idx = self
            .schema
            .get_column_index(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
        Ok(&self.columns[col_idx])
    }

    /// Check that every required column is present.
    ///
    /// Raises `Error::Schema` naming every missing column.
    pub fn require(&self, required: &[&str]) -> Result<(), Error> {
        let missing = self.schema.missing_columns(required);
        if missing.is_empty() {
            return Ok(());
        }
        let err = Error::schema(self.name.clone(), missing);
        log::error!("{}", err);
        Err(err)
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<ColumnValue, TableError> {
        self.column(column)?.get(row)
    }

    pub fn get_row(&self, row: usize) -> Result<Row, TableError> {
        if row >= self.row_count {
            return Err(TableError::RowOutOfRange {
                row,
                len: self.row_count,
            });
        }

        let mut result = HashMap::with_capacity(self.columns.len());
        for col in &self.columns {
            result.insert(col.name().to_string(), col.get(row)?);
        }
        Ok(result)
    }

    /// Append a row given as a name to value map.
    ///
    /// Every schema column must have a value. The row is validated in full
    /// before anything is written, so a rejected row leaves the table unchanged.
    pub fn append_row(&mut self, mut row: Row) -> Result<(), TableError> {
        for col in &self.columns {
            let value = row
                .get(col.name())
                .ok_or_else(|| TableError::MissingValue(col.name().to_string()))?;
            col.validate_value(value)?;
        }

        for col in self.columns.iter_mut() {
            let value = row.remove(col.name()).unwrap_or(ColumnValue::Null);
            col.append(value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    /// Append a row given positionally in schema order.
    pub fn append_values(&mut self, values: Vec<ColumnValue>) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        for (col, value) in self.columns.iter().zip(values.iter()) {
            col.validate_value(value)?;
        }
        for (col, value) in self.columns.iter_mut().zip(values) {
            col.append(value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    pub fn iter_rows(&self) -> TableRowIterator<'_> {
        TableRowIterator { table: self, index: 0 }
    }

    /// Same data under a different table name
    pub fn with_name(&self, name: &str) -> Table {
        let mut table = self.clone();
        table.name = name.to_string();
        table
    }

    /// Zero-row table with this table's schema and column representations
    pub fn empty_like(&self) -> Table {
        Table {
            name: self.name.clone(),
            schema: self.schema.clone(),
            columns: self.columns.iter().map(Column::empty_like).collect(),
            row_count: 0,
        }
    }

    /// Gather rows by index, in the order given (indices may repeat).
    pub fn take_rows(&self, indices: &[usize]) -> Result<Table, TableError> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.take(indices))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Table {
            name: self.name.clone(),
            schema: self.schema.clone(),
            columns,
            row_count: indices.len(),
        })
    }

    /// Keep the rows for which `predicate(row_index)` holds, in order.
    pub fn filter<F>(&self, mut predicate: F) -> Result<Table, TableError>
    where
        F: FnMut(usize) -> Result<bool, TableError>,
    {
        let mut kept = Vec::new();
        for i in 0..self.row_count {
            if predicate(i)? {
                kept.push(i);
            }
        }
        self.take_rows(&kept)
    }

    /// Keep only the named columns, in the order given.
    pub fn project(&self, columns: &[&str]) -> Result<Table, TableError> {
        let picked = columns
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        let mut table = Table::from_columns(self.name.clone(), picked)?;
        table.row_count = self.row_count;
        Ok(table)
    }

    /// Borrowed key of `row` over the given column positions
    fn row_key(&self, row: usize, positions: &[usize]) -> Result<GroupKey<'_>, TableError> {
        positions.iter().map(|&p| self.columns[p].key(row)).collect()
    }

    fn positions(&self, columns: &[&str]) -> Result<Vec<usize>, TableError> {
        columns
            .iter()
            .map(|name| {
                self.schema
                    .get_column_index(name)
                    .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
            })
            .collect()
    }

    /// Drop duplicate rows, keeping the first occurrence.
    pub fn distinct(&self) -> Result<Table, TableError> {
        let all: Vec<usize> = (0..self.columns.len()).collect();
        self.distinct_positions(&all)
    }

    /// Drop rows whose values over `columns` repeat an earlier row.
    /// All columns are kept.
    pub fn distinct_on(&self, columns: &[&str]) -> Result<Table, TableError> {
        let positions = self.positions(columns)?;
        self.distinct_positions(&positions)
    }

    fn distinct_positions(&self, positions: &[usize]) -> Result<Table, TableError> {
        let mut seen: HashSet<GroupKey<'_>> = HashSet::with_capacity(self.row_count);
        let mut kept = Vec::new();
        for i in 0..self.row_count {
            if seen.insert(self.row_key(i, positions)?) {
                kept.push(i);
            }
        }
        self.take_rows(&kept)
    }

    /// Group row indices by the values of `columns`.
    ///
    /// Groups come back ordered by key. Rows with a NULL in any grouping
    /// column belong to no group.
    pub fn group_by(&self, columns: &[&str]) -> Result<BTreeMap<GroupKey<'_>, Vec<usize>>, TableError> {
        let positions = self.positions(columns)?;
        let mut groups: BTreeMap<GroupKey<'_>, Vec<usize>> = BTreeMap::new();
        for i in 0..self.row_count {
            let key = self.row_key(i, &positions)?;
            if key.iter().any(ValueKey::is_null) {
                continue;
            }
            groups.entry(key).or_default().push(i);
        }
        Ok(groups)
    }

    /// Rename columns through `renames` (old name to new name).
    ///
    /// Names absent from the table are ignored. A rename that produces two
    /// columns with the same name fails with `DuplicateColumn`.
    pub fn rename_columns(&self, renames: &BTreeMap<String, String>) -> Result<Table, TableError> {
        let columns = self
            .columns
            .iter()
            .map(|c| match renames.get(c.name()) {
                Some(new_name) => c.renamed(new_name),
                None => c.clone(),
            })
            .collect();

        let mut table = Table::from_columns(self.name.clone(), columns)?;
        table.row_count = self.row_count;
        Ok(table)
    }

    /// Stable sort by one or more keys.
    pub fn sort_by(&self, keys: &[SortKey]) -> Result<Table, TableError> {
        let resolved = keys
            .iter()
            .map(|k| self.column(&k.column).map(|c| (c, k)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut indices: Vec<usize> = (0..self.row_count).collect();
        let mut failure = None;
        indices.sort_by(|&a, &b| {
            for (col, key) in &resolved {
                let (va, vb) = match (col.key(a), col.key(b)) {
                    (Ok(va), Ok(vb)) => (va, vb),
                    (Err(e), _) | (_, Err(e)) => {
                        failure.get_or_insert(e);
                        return Ordering::Equal;
                    }
                };
                let ord = compare_keys(&va, &vb, key);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        if let Some(e) = failure {
            return Err(e);
        }
        self.take_rows(&indices)
    }

    // ========================================================================
    // Serialization Methods
    // ========================================================================

    /// Export table to CSV format.
    ///
    /// Header row followed by data rows. NULL values become empty fields.
    ///
    /// ```
    /// use biorempp::{Table, Schema, ColumnType, ColumnValue};
    ///
    /// let schema = Schema::new(vec![
    ///     ("sample".to_string(), ColumnType::String, false),
    ///     ("ko_count".to_string(), ColumnType::Int64, false),
    /// ]);
    /// let mut table = Table::new("counts".to_string(), schema);
    /// table.append_values(vec![ColumnValue::from("S1"), ColumnValue::Int64(3)]).unwrap();
    ///
    /// let csv = table.to_csv().unwrap();
    /// assert!(csv.starts_with("sample,ko_count\n"));
    /// assert!(csv.contains("S1,3"));
    /// ```
    pub fn to_csv(&self) -> Result<String, Error> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        let csv_error = |e: csv::Error| Error::processing(format!("CSV export of '{}'", self.name), e);

        writer.write_record(self.column_names()).map_err(csv_error)?;
        for i in 0..self.row_count {
            let record = self
                .columns
                .iter()
                .map(|c| c.get(i).map(|v| v.to_string()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| Error::processing(format!("CSV export of '{}'", self.name), e))?;
            writer.write_record(&record).map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::processing(format!("CSV export of '{}'", self.name), e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| Error::processing(format!("CSV export of '{}'", self.name), e))
    }

    /// Export table to JSON format (array of row objects).
    pub fn to_json(&self) -> Result<String, Error> {
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = (0..self.row_count)
            .map(|i| {
                self.columns
                    .iter()
                    .map(|c| {
                        let json_val = match c.get(i)? {
                            ColumnValue::Int64(n) => serde_json::Value::Number(n.into()),
                            ColumnValue::Float64(f) => serde_json::Number::from_f64(f)
                                .map(serde_json::Value::Number)
                                .unwrap_or(serde_json::Value::Null),
                            ColumnValue::String(s) => serde_json::Value::String(s),
                            ColumnValue::Bool(b) => serde_json::Value::Bool(b),
                            ColumnValue::Null => serde_json::Value::Null,
                        };
                        Ok((c.name().to_string(), json_val))
                    })
                    .collect::<Result<serde_json::Map<String, serde_json::Value>, TableError>>()
            })
            .collect::<Result<_, _>>()
            .map_err(|e| Error::processing(format!("JSON export of '{}'", self.name), e))?;

        serde_json::to_string_pretty(&rows)
            .map_err(|e| Error::processing(format!("JSON export of '{}'", self.name), e))
    }

    /// Create a table from a JSON array of row objects.
    ///
    /// Columns are the union of keys in first-seen order; a key missing from
    /// a row is NULL there. Column types come from the non-null values:
    /// integers give INT64, any other number gives FLOAT64, booleans give BOOL
    /// and strings give STRING. All columns are nullable. An empty array gives
    /// a table with no columns.
    ///
    /// ```
    /// use biorempp::Table;
    ///
    /// let json = r#"[{"sample": "S1", "ko": "K00001"}, {"sample": "S2"}]"#;
    /// let table = Table::from_json("records", json).unwrap();
    /// assert_eq!(table.len(), 2);
    /// assert!(table.get_value(1, "ko").unwrap().is_null());
    /// ```
    pub fn from_json(name: &str, json: &str) -> Result<Table, Error> {
        let parsed: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)
            .map_err(|e| Error::format_with(format!("Invalid JSON records for '{}'", name), e))?;

        let mut names: Vec<String> = Vec::new();
        for obj in &parsed {
            for key in obj.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let mut columns = Vec::with_capacity(names.len());
        for col_name in &names {
            let cells: Vec<&serde_json::Value> = parsed
                .iter()
                .map(|obj| obj.get(col_name).unwrap_or(&serde_json::Value::Null))
                .collect();

            let column_type = infer_json_type(col_name, &cells)?;
            let mut column = Column::with_capacity(col_name.clone(), column_type, true, cells.len());
            for cell in cells {
                let value = match cell {
                    serde_json::Value::Null => ColumnValue::Null,
                    serde_json::Value::Bool(b) => ColumnValue::Bool(*b),
                    serde_json::Value::String(s) => ColumnValue::String(s.clone()),
                    serde_json::Value::Number(n) if column_type == ColumnType::Int64 => {
                        n.as_i64().map(ColumnValue::Int64).unwrap_or(ColumnValue::Null)
                    }
                    serde_json::Value::Number(n) => n.as_f64().map(ColumnValue::Float64).unwrap_or(ColumnValue::Null),
                    other => {
                        return Err(Error::format(format!(
                            "Unsupported JSON value for column '{}': {}",
                            col_name, other
                        )))
                    }
                };
                column
                    .append(value)
                    .map_err(|e| Error::format_with(format!("Invalid JSON records for '{}'", name), e))?;
            }
            columns.push(column);
        }

        let mut table = Table::from_columns(name.to_string(), columns)
            .map_err(|e| Error::format_with(format!("Invalid JSON records for '{}'", name), e))?;
        table.row_count = parsed.len();
        Ok(table)
    }
}

fn infer_json_type(column: &str, cells: &[&serde_json::Value]) -> Result<ColumnType, Error> {
    let mut found: Option<ColumnType> = None;
    for cell in cells {
        let ty = match cell {
            serde_json::Value::Null => continue,
            serde_json::Value::Bool(_) => ColumnType::Bool,
            serde_json::Value::String(_) => ColumnType::String,
            serde_json::Value::Number(n) if n.is_i64() => ColumnType::Int64,
            serde_json::Value::Number(_) => ColumnType::Float64,
            _ => {
                return Err(Error::format(format!(
                    "Unsupported JSON value for column '{}': {}",
                    column, cell
                )))
            }
        };
        found = match (found, ty) {
            (None, ty) => Some(ty),
            (Some(a), b) if a == b => Some(a),
            (Some(ColumnType::Int64), ColumnType::Float64) | (Some(ColumnType::Float64), ColumnType::Int64) => {
                Some(ColumnType::Float64)
            }
            (Some(a), b) => {
                return Err(Error::format(format!(
                    "Mixed JSON value types in column '{}': {} and {}",
                    column, a, b
                )))
            }
        };
    }
    Ok(found.unwrap_or(ColumnType::String))
}

fn compare_keys(a: &ValueKey<'_>, b: &ValueKey<'_>, key: &SortKey) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) if key.nulls_first => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if key.nulls_first => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let base_cmp = a.cmp(b);
            match key.order {
                SortOrder::Ascending => base_cmp,
                SortOrder::Descending => base_cmp.reverse(),
            }
        }
    }
}

pub struct TableRowIterator<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Iterator for TableRowIterator<'a> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.table.row_count {
            None
        } else {
            let result = self.table.get_row(self.index).ok();
            self.index += 1;
            result
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.schema.len(),
            self.row_count
        )
    }
}

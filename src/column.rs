/// BioRemPP Column Implementation
///
/// A Column is an array-like random-access data container indexed by integer.
/// Each Column has a type specifying the type of every value stored.
///
/// # Categorical storage
///
/// String columns can be recast to a categorical representation backed by a
/// shared `StringInterner`. Rows then hold integer codes instead of owned
/// strings. Reads resolve codes back to the original text, so a categorical
/// column is observably identical to its plain counterpart.

use crate::error::TableError;
use crate::interner::{StringId, StringInterner};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    Bool,
}

impl ColumnType {
    /// Infer the narrowest type that parses every non-empty cell.
    ///
    /// Tries INT64, then FLOAT64, then BOOL, falling back to STRING.
    /// A column with no non-empty cell is STRING.
    pub fn infer<'a, I>(cells: I) -> ColumnType
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        let mut non_empty = cells.clone().into_iter().map(str::trim).filter(|c| !c.is_empty()).peekable();
        if non_empty.peek().is_none() {
            return ColumnType::String;
        }

        let all = |pred: fn(&str) -> bool| {
            cells
                .clone()
                .into_iter()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .all(pred)
        };

        if all(|c| c.parse::<i64>().is_ok()) {
            ColumnType::Int64
        } else if all(|c| c.parse::<f64>().is_ok()) {
            ColumnType::Float64
        } else if all(|c| c.eq_ignore_ascii_case("true") || c.eq_ignore_ascii_case("false")) {
            ColumnType::Bool
        } else {
            ColumnType::String
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int64 => "INT64",
            ColumnType::Float64 => "FLOAT64",
            ColumnType::String => "STRING",
            ColumnType::Bool => "BOOL",
        };
        f.write_str(name)
    }
}

/// Column value enum to support multiple types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Int64(i64),
    Float64(f64),
    String(String),
    Bool(bool),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Float64(v) => Some(*v),
            ColumnValue::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Type of a non-null value
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Int64(_) => Some(ColumnType::Int64),
            ColumnValue::Float64(_) => Some(ColumnType::Float64),
            ColumnValue::String(_) => Some(ColumnType::String),
            ColumnValue::Bool(_) => Some(ColumnType::Bool),
            ColumnValue::Null => None,
        }
    }

    /// Hashable, orderable view of this value
    pub fn key(&self) -> ValueKey<'_> {
        match self {
            ColumnValue::Int64(v) => ValueKey::Int(*v),
            ColumnValue::Float64(v) => ValueKey::Float(FloatKey(*v)),
            ColumnValue::String(v) => ValueKey::Str(v),
            ColumnValue::Bool(v) => ValueKey::Bool(*v),
            ColumnValue::Null => ValueKey::Null,
        }
    }

    /// Parse a text cell into a value of the given type. Empty cells are NULL.
    pub fn parse_text(text: &str, column_type: ColumnType) -> Result<ColumnValue, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(ColumnValue::Null);
        }

        match column_type {
            ColumnType::Int64 => trimmed
                .parse::<i64>()
                .map(ColumnValue::Int64)
                .map_err(|_| format!("Cannot parse '{}' as INT64", trimmed)),
            ColumnType::Float64 => trimmed
                .parse::<f64>()
                .map(ColumnValue::Float64)
                .map_err(|_| format!("Cannot parse '{}' as FLOAT64", trimmed)),
            ColumnType::Bool => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(ColumnValue::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(ColumnValue::Bool(false))
                } else {
                    Err(format!("Cannot parse '{}' as BOOL", trimmed))
                }
            }
            ColumnType::String => Ok(ColumnValue::String(trimmed.to_string())),
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Int64(v) => write!(f, "{}", v),
            ColumnValue::Float64(v) => write!(f, "{}", v),
            ColumnValue::String(v) => f.write_str(v),
            ColumnValue::Bool(v) => write!(f, "{}", v),
            ColumnValue::Null => Ok(()),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::String(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::String(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Int64(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Float64(value)
    }
}

/// Float wrapper with total ordering, usable as a hash key
#[derive(Debug, Clone, Copy)]
pub struct FloatKey(pub f64);

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for FloatKey {}

impl PartialOrd for FloatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Borrowed key for hashing, grouping and sorting cell values.
///
/// Plain and categorical columns produce equal keys for equal text.
/// Variant order defines the cross-type sort order (NULL first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(FloatKey),
    Str(&'a str),
}

impl ValueKey<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, ValueKey::Null)
    }

    pub fn to_value(&self) -> ColumnValue {
        match self {
            ValueKey::Null => ColumnValue::Null,
            ValueKey::Bool(v) => ColumnValue::Bool(*v),
            ValueKey::Int(v) => ColumnValue::Int64(*v),
            ValueKey::Float(v) => ColumnValue::Float64(v.0),
            ValueKey::Str(v) => ColumnValue::String((*v).to_string()),
        }
    }
}

#[derive(Clone)]
enum Storage {
    Plain(Vec<ColumnValue>),
    Categorical {
        codes: Vec<Option<StringId>>,
        dictionary: Arc<StringInterner>,
    },
}

/// Typed column with optional categorical storage.
pub struct Column {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    storage: Storage,
}

impl Column {
    pub fn new(name: String, column_type: ColumnType, nullable: bool) -> Self {
        Self::with_capacity(name, column_type, nullable, 0)
    }

    pub fn with_capacity(name: String, column_type: ColumnType, nullable: bool, capacity: usize) -> Self {
        Column {
            name,
            column_type,
            nullable,
            storage: Storage::Plain(Vec::with_capacity(capacity)),
        }
    }

    /// Build a column from values, validating each one
    pub fn from_values(
        name: &str,
        column_type: ColumnType,
        nullable: bool,
        values: Vec<ColumnValue>,
    ) -> Result<Self, TableError> {
        let mut column = Column::with_capacity(name.to_string(), column_type, nullable, values.len());
        for value in values {
            column.append(value)?;
        }
        Ok(column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Plain(values) => values.len(),
            Storage::Categorical { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this column stores category codes
    pub fn is_categorical(&self) -> bool {
        matches!(self.storage, Storage::Categorical { .. })
    }

    /// Category dictionary of a categorical column
    pub fn dictionary(&self) -> Option<&Arc<StringInterner>> {
        match &self.storage {
            Storage::Categorical { dictionary, .. } => Some(dictionary),
            Storage::Plain(_) => None,
        }
    }

    /// Validate value against the column type and nullability
    pub fn validate_value(&self, value: &ColumnValue) -> Result<(), TableError> {
        match value.column_type() {
            None if !self.nullable => Err(TableError::NotNullable(self.name.clone())),
            None => Ok(()),
            Some(found) if found == self.column_type => Ok(()),
            Some(found) => Err(TableError::TypeMismatch {
                column: self.name.clone(),
                expected: self.column_type.to_string(),
                found: found.to_string(),
            }),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), TableError> {
        if index >= self.len() {
            return Err(TableError::RowOutOfRange {
                row: index,
                len: self.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<ColumnValue, TableError> {
        Ok(self.key(index)?.to_value())
    }

    /// Borrowed key of the value at `index`
    pub fn key(&self, index: usize) -> Result<ValueKey<'_>, TableError> {
        self.check_index(index)?;
        let key = match &self.storage {
            Storage::Plain(values) => values[index].key(),
            Storage::Categorical { codes, dictionary } => match codes[index] {
                Some(code) => dictionary.resolve(code).map(ValueKey::Str).unwrap_or(ValueKey::Null),
                None => ValueKey::Null,
            },
        };
        Ok(key)
    }

    /// Borrowed text of a STRING cell; None for NULL or non-string cells
    pub fn get_str(&self, index: usize) -> Option<&str> {
        match self.key(index).ok()? {
            ValueKey::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Check if a value at index is null (fast path without cloning).
    #[inline]
    pub fn is_null_at(&self, index: usize) -> bool {
        match &self.storage {
            Storage::Plain(values) => values.get(index).map_or(false, ColumnValue::is_null),
            Storage::Categorical { codes, .. } => codes.get(index).map_or(false, Option::is_none),
        }
    }

    pub fn append(&mut self, value: ColumnValue) -> Result<(), TableError> {
        self.validate_value(&value)?;

        match &mut self.storage {
            Storage::Plain(values) => values.push(value),
            Storage::Categorical { codes, dictionary } => {
                let code = match value {
                    ColumnValue::String(ref s) => Some(Arc::make_mut(dictionary).intern(s)),
                    _ => None,
                };
                codes.push(code);
            }
        }
        Ok(())
    }

    /// Recast a STRING column to categorical storage.
    ///
    /// Values and row order are preserved. Non-string columns and columns
    /// that are already categorical are returned unchanged.
    pub fn to_categorical(&self) -> Column {
        let values = match &self.storage {
            Storage::Plain(values) if self.column_type == ColumnType::String => values,
            _ => return self.clone(),
        };

        let mut dictionary = StringInterner::new();
        let codes = values
            .iter()
            .map(|value| value.as_string().map(|s| dictionary.intern(s)))
            .collect();

        Column {
            name: self.name.clone(),
            column_type: self.column_type,
            nullable: self.nullable,
            storage: Storage::Categorical {
                codes,
                dictionary: Arc::new(dictionary),
            },
        }
    }

    /// Gather the rows at `indices` into a new column with the same
    /// representation. Categorical columns share their dictionary.
    pub fn take(&self, indices: &[usize]) -> Result<Column, TableError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(TableError::RowOutOfRange {
                row: bad,
                len: self.len(),
            });
        }

        let storage = match &self.storage {
            Storage::Plain(values) => Storage::Plain(indices.iter().map(|&i| values[i].clone()).collect()),
            Storage::Categorical { codes, dictionary } => Storage::Categorical {
                codes: indices.iter().map(|&i| codes[i]).collect(),
                dictionary: Arc::clone(dictionary),
            },
        };

        Ok(Column {
            name: self.name.clone(),
            column_type: self.column_type,
            nullable: self.nullable,
            storage,
        })
    }

    /// Same data under a new name
    pub fn renamed(&self, name: &str) -> Column {
        let mut column = self.clone();
        column.name = name.to_string();
        column
    }

    /// Empty column with this column's name, type and representation
    pub fn empty_like(&self) -> Column {
        let storage = match &self.storage {
            Storage::Plain(_) => Storage::Plain(Vec::new()),
            Storage::Categorical { dictionary, .. } => Storage::Categorical {
                codes: Vec::new(),
                dictionary: Arc::clone(dictionary),
            },
        };
        Column {
            name: self.name.clone(),
            column_type: self.column_type,
            nullable: self.nullable,
            storage,
        }
    }

    pub fn iter(&self) -> ColumnIterator<'_> {
        ColumnIterator {
            column: self,
            index: 0,
        }
    }
}

impl Clone for Column {
    fn clone(&self) -> Self {
        Column {
            name: self.name.clone(),
            column_type: self.column_type,
            nullable: self.nullable,
            storage: self.storage.clone(),
        }
    }
}

pub struct ColumnIterator<'a> {
    column: &'a Column,
    index: usize,
}

impl<'a> Iterator for ColumnIterator<'a> {
    type Item = ValueKey<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.column.key(self.index).ok();
        self.index += 1;
        result
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column {{ name: '{}', type: {:?}, nullable: {}, categorical: {}, len: {} }}",
            self.name,
            self.column_type,
            self.nullable,
            self.is_categorical(),
            self.len()
        )
    }
}

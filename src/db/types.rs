//! Query result types for shopinsight.
//!
//! Results are carried column-major (column list plus positional rows) and
//! serialized as an ordered list of records, one JSON object per row.

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Rows returned by one checked statement, in column-major form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Projected columns, in SELECT order.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data, each aligned with `columns`.
    pub rows: Vec<Row>,

    /// Wall time spent in the store.
    pub execution_time: Duration,

    /// Number of rows in the result.
    pub row_count: usize,
}

impl QueryResult {
    /// A result with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps decoded columns and rows; `row_count` follows `rows`.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            row_count,
        }
    }

    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// No rows matched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the keys used for each column when rows become records.
    ///
    /// A name that already appeared gets a numeric suffix (`item_id`,
    /// `item_id_2`) so no record loses a value to a key collision.
    pub fn record_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let mut key = column.name.clone();
            let mut n = 2;
            while keys.contains(&key) {
                key = format!("{}_{}", column.name, n);
                n += 1;
            }
            keys.push(key);
        }
        keys
    }

    /// Returns a serializable view of the rows as records.
    pub fn records(&self) -> Records<'_> {
        Records {
            keys: self.record_keys(),
            rows: &self.rows,
        }
    }

    /// Returns a records view limited to the first `limit` rows.
    pub fn records_limited(&self, limit: usize) -> Records<'_> {
        let end = limit.min(self.rows.len());
        Records {
            keys: self.record_keys(),
            rows: &self.rows[..end],
        }
    }
}

/// Ordered records view over a [`QueryResult`].
///
/// Serializes as `[{"col": value, ...}, ...]` with keys in column order.
pub struct Records<'a> {
    keys: Vec<String>,
    rows: &'a [Row],
}

impl Records<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct Record<'a> {
    keys: &'a [String],
    values: &'a [Value],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len()))?;
        for (key, value) in self.keys.iter().zip(self.values) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows {
            seq.serialize_element(&Record {
                keys: &self.keys,
                values: row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records().serialize(serializer)
    }
}

/// A projected column and the type name the store reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type as reported by the engine.
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Positional values, aligned with [`QueryResult::columns`].
pub type Row = Vec<Value>;

/// A decoded cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    Bool(bool),

    Int(i64),

    /// Floating point number, including decoded NUMERIC values.
    Float(f64),

    String(String),

    Date(NaiveDate),

    /// Timestamp without zone; zoned timestamps are normalized to UTC.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Returns the value as a float when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as an integer when it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

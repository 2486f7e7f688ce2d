//! Core data models for the pricing pipeline

use crate::error::{PricerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column names used across the pipeline
pub mod columns {
    pub const MAKE: &str = "Make";
    pub const TYPE: &str = "Type";
    pub const YEAR: &str = "Year";
    pub const ENGINE_SIZE: &str = "Engine_Size";
    pub const MILEAGE: &str = "Mileage";
    pub const REGION: &str = "Region";
    pub const GEAR_TYPE: &str = "Gear_Type";
    pub const ORIGIN: &str = "Origin";
    pub const OPTIONS: &str = "Options";

    pub const CAR_AGE: &str = "Car_Age";
    pub const IS_VINTAGE: &str = "IsVintage";
    pub const IS_BIG_ENGINE: &str = "IsBigEngine";

    pub const NEGOTIABLE: &str = "Negotiable";
    pub const MILEAGE_PER_YEAR: &str = "Mileage_per_Year";
    pub const UNNATURAL_HIGH_MILEAGE_FLAG: &str = "Unnatural_High_Mileage_Flag";

    pub const PREDICTED_PRICE: &str = "Predicted_Price";
}

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    /// Interpret a raw CSV cell.
    ///
    /// Numbers are only typed when their canonical form is the original text,
    /// so writing the cell back reproduces the input exactly.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = raw.parse::<i64>() {
            if i.to_string() == raw {
                return Value::Int(i);
            }
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() && format!("{:?}", f) == raw {
                return Value::Float(f);
            }
        }
        Value::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Value::Bool(_) | Value::Null => None,
        }
    }

    /// Integer view; floats are accepted only when they carry no fraction
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| Value::Float(s.trim().parse().ok()?).as_i64()),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            Value::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Ordered columns with positional rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table, checking every row against the header width
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PricerError::Shape(format!(
                "row {} has {} values, expected {}",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of a column, in row order
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Sub-table with the given columns in the given order
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(PricerError::schema(missing));
        }

        Ok(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Overwrite a column in place, or append it when it does not exist yet
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(PricerError::Shape(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Remove the named columns; names that are not present are ignored
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }

        retain_flagged(&mut self.columns, &keep);
        for row in &mut self.rows {
            retain_flagged(row, &keep);
        }
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Rows as JSON objects keyed by column name, in column order
    pub fn to_json_rows(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.clone(), serde_json::to_value(v).unwrap_or_default()))
                    .collect()
            })
            .collect()
    }
}

fn retain_flagged<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| *flags.next().unwrap_or(&true));
}

/// Single car record as entered through the form or the JSON API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarListing {
    #[serde(rename = "Make", alias = "make")]
    pub make: String,
    /// Vehicle model / trim
    #[serde(rename = "Type", alias = "model", alias = "type")]
    pub model: String,
    #[serde(rename = "Year", alias = "year")]
    pub year: i64,
    /// Liters
    #[serde(rename = "Engine_Size", alias = "engine_size")]
    pub engine_size: f64,
    /// Kilometers
    #[serde(rename = "Mileage", alias = "mileage")]
    pub mileage: i64,
    #[serde(rename = "Region", alias = "region")]
    pub region: String,
    #[serde(rename = "Gear_Type", alias = "gear_type")]
    pub gear_type: String,
    #[serde(rename = "Origin", alias = "origin")]
    pub origin: String,
    #[serde(rename = "Options", alias = "options")]
    pub options: String,
}

impl CarListing {
    /// One-row table in the raw column layout
    pub fn to_table(&self) -> Table {
        Table {
            columns: crate::schema::REQUIRED_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows: vec![vec![
                Value::from(self.make.as_str()),
                Value::from(self.model.as_str()),
                Value::Int(self.year),
                Value::Float(self.engine_size),
                Value::Int(self.mileage),
                Value::from(self.region.as_str()),
                Value::from(self.gear_type.as_str()),
                Value::from(self.origin.as_str()),
                Value::from(self.options.as_str()),
            ]],
        }
    }
}

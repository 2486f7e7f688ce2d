//! Reference data for selection choices
//!
//! Built once from the cleaned training extract and held read-only for the
//! life of the process. It never takes part in a prediction; it only bounds
//! what the single-car form offers.

use crate::error::{PricerError, Result};
use crate::models::{columns, CarListing, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

/// Columns offered as enumerated choices
pub const CHOICE_COLUMNS: [&str; 6] = [
    columns::MAKE,
    columns::TYPE,
    columns::REGION,
    columns::GEAR_TYPE,
    columns::ORIGIN,
    columns::OPTIONS,
];

/// Distinct values per choice column plus the observed year range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub choices: BTreeMap<String, Vec<String>>,
    pub min_year: i64,
    pub max_year: i64,
}

impl ReferenceData {
    pub fn load(path: &Path) -> Result<Self> {
        let table = super::read_table_from_path(path)?;
        let reference = Self::from_table(&table)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            min_year = reference.min_year,
            max_year = reference.max_year,
            "Reference data loaded"
        );
        Ok(reference)
    }

    /// Sorted distinct non-null values of each choice column and the year range
    pub fn from_table(table: &Table) -> Result<Self> {
        let mut required: Vec<&str> = CHOICE_COLUMNS.to_vec();
        required.push(columns::YEAR);
        crate::schema::ensure_columns(table, &required)?;

        let mut choices = BTreeMap::new();
        for column in CHOICE_COLUMNS {
            let distinct: BTreeSet<String> = table
                .column_values(column)
                .unwrap_or_default()
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| v.to_string())
                .collect();
            choices.insert(column.to_string(), distinct.into_iter().collect());
        }

        let years: Vec<i64> = table
            .column_values(columns::YEAR)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_i64())
            .collect();
        let (min_year, max_year) = match (years.iter().min(), years.iter().max()) {
            (Some(min), Some(max)) => (*min, *max),
            _ => {
                return Err(PricerError::Parse(
                    "Reference data has no usable Year values".to_string(),
                ))
            }
        };

        Ok(Self {
            choices,
            min_year,
            max_year,
        })
    }

    pub fn choices_for(&self, column: &str) -> &[String] {
        self.choices.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn form_spec(&self) -> FormSpec {
        FormSpec::from_reference(self)
    }
}

/// Bounded numeric input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeField<T> {
    pub min: T,
    pub max: T,
    pub step: T,
    pub default: T,
}

impl<T: PartialOrd + Copy> RangeField<T> {
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Inputs of the single-car form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSpec {
    pub choices: BTreeMap<String, Vec<String>>,
    pub year: RangeField<i64>,
    pub engine_size: RangeField<f64>,
    pub mileage: RangeField<i64>,
}

impl FormSpec {
    pub fn from_reference(reference: &ReferenceData) -> Self {
        Self {
            choices: reference.choices.clone(),
            year: RangeField {
                min: reference.min_year,
                max: reference.max_year,
                step: 1,
                default: (reference.max_year - 5).max(reference.min_year),
            },
            engine_size: RangeField {
                min: 1.0,
                max: 10.0,
                step: 0.1,
                default: 2.0,
            },
            mileage: RangeField {
                min: 0,
                max: 800_000,
                step: 1000,
                default: 80_000,
            },
        }
    }

    /// Check a listing against the bounds and choice lists, reporting every violation
    pub fn validate(&self, listing: &CarListing) -> Result<()> {
        let mut problems = Vec::new();

        if !self.year.contains(listing.year) {
            problems.push(format!(
                "Year {} outside {}..={}",
                listing.year, self.year.min, self.year.max
            ));
        }
        if !self.engine_size.contains(listing.engine_size) {
            problems.push(format!(
                "Engine_Size {} outside {}..={}",
                listing.engine_size, self.engine_size.min, self.engine_size.max
            ));
        }
        if !self.mileage.contains(listing.mileage) {
            problems.push(format!(
                "Mileage {} outside {}..={}",
                listing.mileage, self.mileage.min, self.mileage.max
            ));
        }

        let selected = [
            (columns::MAKE, &listing.make),
            (columns::TYPE, &listing.model),
            (columns::REGION, &listing.region),
            (columns::GEAR_TYPE, &listing.gear_type),
            (columns::ORIGIN, &listing.origin),
            (columns::OPTIONS, &listing.options),
        ];
        for (column, value) in selected {
            let allowed = self.choices.get(column).map(Vec::as_slice).unwrap_or(&[]);
            if !allowed.iter().any(|c| c == value) {
                problems.push(format!("{} '{}' is not one of the known choices", column, value));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PricerError::Validation(problems))
        }
    }
}

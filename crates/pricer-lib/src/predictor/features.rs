//! Feature engineering for price inference
//!
//! Derives the age and engine flags the model was trained on and removes
//! columns the model must not see. The transformation learns nothing from the
//! data, so the same engineer serves single and batch requests.

use crate::error::{PricerError, Result};
use crate::models::{columns, Table, Value};
use serde::{Deserialize, Serialize};

/// Reference year the model was trained against
pub const DEFAULT_CURRENT_YEAR: i64 = 2022;

/// Cars at least this old are flagged vintage
pub const DEFAULT_VINTAGE_CUTOFF: i64 = 30;

/// Engines strictly larger than this (liters) are flagged big
pub const DEFAULT_BIG_ENGINE_CUTOFF: f64 = 7.0;

/// Legacy and target-leaking columns removed before inference
pub const DROPPED_COLUMNS: [&str; 4] = [
    columns::NEGOTIABLE,
    columns::MILEAGE_PER_YEAR,
    columns::UNNATURAL_HIGH_MILEAGE_FLAG,
    columns::YEAR,
];

/// Parameters of the feature transformation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub current_year: i64,
    pub vintage_cutoff: i64,
    pub big_engine_cutoff: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            current_year: DEFAULT_CURRENT_YEAR,
            vintage_cutoff: DEFAULT_VINTAGE_CUTOFF,
            big_engine_cutoff: DEFAULT_BIG_ENGINE_CUTOFF,
        }
    }
}

/// Stateless raw-to-model feature transformation
#[derive(Debug, Clone, Copy)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn with_current_year(current_year: i64) -> Self {
        Self::new(FeatureConfig {
            current_year,
            ..FeatureConfig::default()
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Nothing to learn; returns the engineer unchanged
    pub fn fit(self, _table: &Table) -> Self {
        self
    }

    /// Engineered copy of `table`: same rows, derived columns appended,
    /// dropped columns removed. `Car_Age` is not clamped, so a `Year` past
    /// `current_year` gives a negative age.
    pub fn transform(&self, table: &Table) -> Result<Table> {
        let years = self.integer_column(table, columns::YEAR)?;
        let engine_sizes = self.numeric_column(table, columns::ENGINE_SIZE)?;

        let ages = years
            .iter()
            .enumerate()
            .map(|(row, year)| {
                self.config
                    .current_year
                    .checked_sub(*year)
                    .ok_or_else(|| invalid(columns::YEAR, row, &Value::Int(*year), "a model year"))
            })
            .collect::<Result<Vec<i64>>>()?;
        let vintage: Vec<Value> = ages
            .iter()
            .map(|age| Value::Bool(*age >= self.config.vintage_cutoff))
            .collect();
        let big_engine: Vec<Value> = engine_sizes
            .iter()
            .map(|size| Value::Bool(*size > self.config.big_engine_cutoff))
            .collect();

        let mut out = table.clone();
        out.set_column(columns::CAR_AGE, ages.into_iter().map(Value::Int).collect())?;
        out.set_column(columns::IS_VINTAGE, vintage)?;
        out.set_column(columns::IS_BIG_ENGINE, big_engine)?;
        out.drop_columns(&DROPPED_COLUMNS);

        Ok(out)
    }

    fn integer_column(&self, table: &Table, name: &str) -> Result<Vec<i64>> {
        let values = table
            .column_values(name)
            .ok_or_else(|| PricerError::schema(vec![name.to_string()]))?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.as_i64().ok_or_else(|| invalid(name, row, v, "integer")))
            .collect()
    }

    fn numeric_column(&self, table: &Table, name: &str) -> Result<Vec<f64>> {
        let values = table
            .column_values(name)
            .ok_or_else(|| PricerError::schema(vec![name.to_string()]))?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.as_f64().ok_or_else(|| invalid(name, row, v, "number")))
            .collect()
    }
}

fn invalid(column: &str, row: usize, value: &Value, expected: &'static str) -> PricerError {
    PricerError::InvalidValue {
        column: column.to_string(),
        row,
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::REQUIRED_COLUMNS;

    fn raw_row(year: i64, engine_size: f64) -> Vec<Value> {
        vec![
            "Toyota".into(),
            "Sedan".into(),
            Value::Int(year),
            Value::Float(engine_size),
            Value::Int(80_000),
            "Riyadh".into(),
            "Automatic".into(),
            "Saudi".into(),
            "Standard".into(),
        ]
    }

    fn raw_table(rows: &[(i64, f64)]) -> Table {
        Table::from_rows(
            REQUIRED_COLUMNS,
            rows.iter().map(|(y, e)| raw_row(*y, *e)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let engineer = FeatureEngineer::with_current_year(2022);
        let out = engineer.transform(&raw_table(&[(2018, 2.0)])).unwrap();

        assert_eq!(out.value(0, "Car_Age"), Some(&Value::Int(4)));
        assert_eq!(out.value(0, "IsVintage"), Some(&Value::Bool(false)));
        assert_eq!(out.value(0, "IsBigEngine"), Some(&Value::Bool(false)));
        assert!(!out.has_column("Year"));
        assert_eq!(
            out.columns(),
            [
                "Make",
                "Type",
                "Engine_Size",
                "Mileage",
                "Region",
                "Gear_Type",
                "Origin",
                "Options",
                "Car_Age",
                "IsVintage",
                "IsBigEngine"
            ]
        );
    }

    #[test]
    fn test_future_year_gives_negative_age() {
        let engineer = FeatureEngineer::with_current_year(2022);
        let out = engineer.transform(&raw_table(&[(2025, 2.0)])).unwrap();
        assert_eq!(out.value(0, "Car_Age"), Some(&Value::Int(-3)));
        assert_eq!(out.value(0, "IsVintage"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_vintage_boundary_is_inclusive() {
        let engineer = FeatureEngineer::with_current_year(2022);
        let out = engineer
            .transform(&raw_table(&[(1992, 2.0), (1993, 2.0), (1950, 2.0)]))
            .unwrap();
        assert_eq!(out.value(0, "IsVintage"), Some(&Value::Bool(true)));
        assert_eq!(out.value(1, "IsVintage"), Some(&Value::Bool(false)));
        assert_eq!(out.value(2, "IsVintage"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_big_engine_boundary_is_strict() {
        let engineer = FeatureEngineer::default();
        let out = engineer
            .transform(&raw_table(&[(2018, 7.0), (2018, 7.1), (2018, 1.0)]))
            .unwrap();
        assert_eq!(out.value(0, "IsBigEngine"), Some(&Value::Bool(false)));
        assert_eq!(out.value(1, "IsBigEngine"), Some(&Value::Bool(true)));
        assert_eq!(out.value(2, "IsBigEngine"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_custom_cutoffs() {
        let engineer = FeatureEngineer::new(FeatureConfig {
            current_year: 2024,
            vintage_cutoff: 10,
            big_engine_cutoff: 3.0,
        });
        let out = engineer.transform(&raw_table(&[(2014, 3.5)])).unwrap();
        assert_eq!(out.value(0, "Car_Age"), Some(&Value::Int(10)));
        assert_eq!(out.value(0, "IsVintage"), Some(&Value::Bool(true)));
        assert_eq!(out.value(0, "IsBigEngine"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_drop_list_removed_and_extras_kept() {
        let mut table = raw_table(&[(2018, 2.0), (2010, 4.6)]);
        table
            .set_column("Negotiable", vec![Value::Bool(false), Value::Bool(true)])
            .unwrap();
        table
            .set_column("Mileage_per_Year", vec![Value::Float(1.0), Value::Float(2.0)])
            .unwrap();
        table
            .set_column("Unnatural_High_Mileage_Flag", vec![Value::Int(0), Value::Int(1)])
            .unwrap();
        table
            .set_column("ID", vec![Value::Int(7), Value::Int(8)])
            .unwrap();

        let out = FeatureEngineer::default().transform(&table).unwrap();
        for dropped in DROPPED_COLUMNS {
            assert!(!out.has_column(dropped), "{} should be dropped", dropped);
        }
        assert_eq!(out.value(1, "ID"), Some(&Value::Int(8)));
    }

    #[test]
    fn test_input_is_not_mutated_and_rows_keep_order() {
        let table = raw_table(&[(2018, 2.0), (2000, 5.7), (2021, 1.6)]);
        let before = table.clone();

        let out = FeatureEngineer::default().transform(&table).unwrap();
        assert_eq!(table, before);
        assert_eq!(out.len(), table.len());
        let ages: Vec<_> = out.column_values("Car_Age").unwrap();
        assert_eq!(
            ages,
            vec![&Value::Int(4), &Value::Int(22), &Value::Int(1)]
        );
    }

    #[test]
    fn test_absent_legacy_columns_do_not_fail() {
        let table = raw_table(&[(2018, 2.0)]);
        assert!(!table.has_column("Negotiable"));
        assert!(FeatureEngineer::default().transform(&table).is_ok());
    }

    #[test]
    fn test_existing_derived_column_is_overwritten() {
        let mut table = raw_table(&[(2018, 2.0)]);
        table.set_column("Car_Age", vec![Value::Int(99)]).unwrap();

        let out = FeatureEngineer::default().transform(&table).unwrap();
        assert_eq!(out.value(0, "Car_Age"), Some(&Value::Int(4)));
        assert_eq!(
            out.columns().iter().filter(|c| *c == "Car_Age").count(),
            1
        );
    }

    #[test]
    fn test_missing_year_is_schema_error() {
        let mut table = raw_table(&[(2018, 2.0)]);
        table.drop_columns(&["Year"]);
        let err = FeatureEngineer::default().transform(&table).unwrap_err();
        assert_eq!(err.missing_columns().unwrap(), ["Year"]);
    }

    #[test]
    fn test_non_numeric_engine_size_is_reported() {
        let mut table = raw_table(&[(2018, 2.0), (2018, 2.0)]);
        table
            .set_column("Engine_Size", vec![Value::Float(2.0), "big".into()])
            .unwrap();
        match FeatureEngineer::default().transform(&table) {
            Err(PricerError::InvalidValue { column, row, value, .. }) => {
                assert_eq!(column, "Engine_Size");
                assert_eq!(row, 1);
                assert_eq!(value, "big");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_text_numbers_from_csv_are_accepted() {
        let mut table = raw_table(&[(2018, 2.0)]);
        table.set_column("Year", vec!["2018.0".into()]).unwrap();
        table.set_column("Engine_Size", vec!["2.50".into()]).unwrap();
        let out = FeatureEngineer::default().transform(&table).unwrap();
        assert_eq!(out.value(0, "Car_Age"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_out_of_range_year_is_invalid_value() {
        let table = raw_table(&[(2018, 2.0), (i64::MIN, 2.0)]);
        match FeatureEngineer::default().transform(&table) {
            Err(PricerError::InvalidValue { column, row, value, .. }) => {
                assert_eq!(column, "Year");
                assert_eq!(row, 1);
                assert_eq!(value, i64::MIN.to_string());
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_fit_returns_same_engineer() {
        let engineer = FeatureEngineer::with_current_year(2020);
        let table = raw_table(&[(2018, 2.0)]);
        let fitted = engineer.fit(&table);
        assert_eq!(fitted.config(), engineer.config());
        assert_eq!(fitted.transform(&table).unwrap(), engineer.transform(&table).unwrap());
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(REQUIRED_COLUMNS);
        let out = FeatureEngineer::default().transform(&table).unwrap();
        assert!(out.is_empty());
        assert!(out.has_column("Car_Age"));
    }
}

//! Pipeline tests for the prediction service
//!
//! These run the full validate → engineer → predict → merge path against a
//! linear stand-in model, so no ONNX artifact is needed.

#[cfg(test)]
mod service_tests {
    use crate::error::{PricerError, Result};
    use crate::models::{CarListing, Table, Value};
    use crate::predictor::{FeatureEngineer, PredictionService, PriceModel};
    use crate::schema::REQUIRED_COLUMNS;
    use std::sync::{Arc, Mutex};

    /// Linear price over engineered features; records the columns it was given
    #[derive(Default)]
    struct LinearModel {
        seen_columns: Mutex<Vec<Vec<String>>>,
    }

    impl PriceModel for LinearModel {
        fn predict(&self, features: &Table) -> Result<Vec<f64>> {
            self.seen_columns
                .lock()
                .unwrap()
                .push(features.columns().to_vec());

            (0..features.len())
                .map(|row| {
                    let num = |name: &str| {
                        features
                            .value(row, name)
                            .and_then(Value::as_f64)
                            .ok_or_else(|| PricerError::Prediction(format!("no {}", name)))
                    };
                    Ok(100_000.0 - 3_000.0 * num("Car_Age")? + 10_000.0 * num("Engine_Size")?
                        - 0.05 * num("Mileage")?
                        + 0.25)
                })
                .collect()
        }

        fn model_version(&self) -> &str {
            "linear-test"
        }
    }

    struct BrokenModel(Vec<f64>);

    impl PriceModel for BrokenModel {
        fn predict(&self, _features: &Table) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }

        fn model_version(&self) -> &str {
            "broken"
        }
    }

    fn listing() -> CarListing {
        CarListing {
            make: "Toyota".into(),
            model: "Sedan".into(),
            year: 2018,
            engine_size: 2.0,
            mileage: 80_000,
            region: "Riyadh".into(),
            gear_type: "Automatic".into(),
            origin: "Saudi".into(),
            options: "Standard".into(),
        }
    }

    fn upload() -> Table {
        let mut columns = vec!["ID"];
        columns.extend(REQUIRED_COLUMNS);
        columns.push("Price");

        let row = |id: &str, year: i64, engine: f64, mileage: i64| {
            vec![
                Value::from(id),
                "Toyota".into(),
                "Sedan".into(),
                Value::Int(year),
                Value::Float(engine),
                Value::Int(mileage),
                "Riyadh".into(),
                "Automatic".into(),
                "Saudi".into(),
                "Standard".into(),
                Value::Null,
            ]
        };
        Table::from_rows(
            columns,
            vec![
                row("a-1", 2018, 2.0, 80_000),
                row("a-2", 2010, 4.6, 210_000),
                row("a-3", 2021, 1.5, 12_000),
            ],
        )
        .unwrap()
    }

    fn service(model: Arc<dyn PriceModel>) -> PredictionService {
        PredictionService::new(FeatureEngineer::with_current_year(2022), model)
    }

    #[test]
    fn test_single_prediction_is_rounded() {
        let svc = service(Arc::new(LinearModel::default()));
        // 100000 - 12000 + 20000 - 4000 + 0.25
        assert_eq!(svc.predict_single(&listing()).unwrap(), 104_000.0);
    }

    #[test]
    fn test_single_and_batch_agree() {
        let svc = service(Arc::new(LinearModel::default()));
        let single = svc.predict_single(&listing()).unwrap();

        let batch = svc.predict_batch(&upload()).unwrap();
        assert_eq!(
            batch.value(0, "Predicted_Price"),
            Some(&Value::Int(single as i64))
        );
    }

    #[test]
    fn test_batch_round_trip_keeps_extra_columns() {
        let svc = service(Arc::new(LinearModel::default()));
        let original = upload();
        let out = svc.predict_batch(&original).unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(&out.columns()[..original.columns().len()], original.columns());
        assert_eq!(out.columns().last().unwrap(), "Predicted_Price");
        assert_eq!(
            out.column_values("ID").unwrap(),
            vec![&Value::from("a-1"), &Value::from("a-2"), &Value::from("a-3")]
        );
        assert!(out.has_column("Year"));
        assert!(out.has_column("Price"));
    }

    #[test]
    fn test_model_never_sees_caller_or_dropped_columns() {
        let model = Arc::new(LinearModel::default());
        let svc = service(model.clone());
        let mut table = upload();
        table
            .set_column(
                "Negotiable",
                vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)],
            )
            .unwrap();
        svc.predict_batch(&table).unwrap();

        let seen = model.seen_columns.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            vec![
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
    fn test_missing_column_halts_before_model() {
        let model = Arc::new(LinearModel::default());
        let svc = service(model.clone());
        let mut table = upload();
        table.drop_columns(&["Region"]);

        let err = svc.predict_batch(&table).unwrap_err();
        assert_eq!(err.missing_columns().unwrap(), ["Region"]);
        assert!(model.seen_columns.lock().unwrap().is_empty());
    }

    #[test]
    fn test_wrong_prediction_count_is_error() {
        let svc = service(Arc::new(BrokenModel(vec![1.0])));
        let err = svc.predict_batch(&upload()).unwrap_err();
        assert!(matches!(err, PricerError::Prediction(_)));
    }

    #[test]
    fn test_non_finite_prediction_is_error() {
        let svc = service(Arc::new(BrokenModel(vec![f64::NAN])));
        let err = svc.predict_single(&listing()).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_malformed_year_is_reported_not_priced() {
        let svc = service(Arc::new(LinearModel::default()));
        let mut table = upload();
        table
            .set_column("Year", vec![Value::Int(2018), "unknown".into(), Value::Int(2020)])
            .unwrap();

        match svc.predict_batch(&table) {
            Err(PricerError::InvalidValue { column, row, .. }) => {
                assert_eq!(column, "Year");
                assert_eq!(row, 1);
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_batch() {
        let svc = service(Arc::new(LinearModel::default()));
        let table = upload().head(0);
        let out = svc.predict_batch(&table).unwrap();
        assert!(out.is_empty());
        assert!(out.has_column("Predicted_Price"));
    }
}

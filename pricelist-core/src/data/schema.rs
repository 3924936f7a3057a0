use super::merge::LongitudinalDataset;
use crate::domain::CanonicalColumn;
use chrono::Datelike;
use polars::prelude::*;

/// Days between 0001-01-01 (CE) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Polars schema for the merged dataset
pub struct DatasetSchema;

impl DatasetSchema {
    /// Schema for a dataset carrying the given numeric columns.
    pub fn schema(columns: impl IntoIterator<Item = CanonicalColumn>) -> Schema {
        let mut fields = vec![
            Field::new("date".into(), DataType::Date),
            Field::new("symbol".into(), DataType::String),
        ];
        fields.extend(
            columns
                .into_iter()
                .filter(|c| c.is_numeric())
                .map(|c| Field::new(c.name().into(), DataType::Float64)),
        );
        Schema::from_iter(fields)
    }

    /// Build a DataFrame view. "No value" fields become nulls.
    pub fn to_dataframe(dataset: &LongitudinalDataset) -> Result<DataFrame, SchemaError> {
        let days: Vec<i32> = dataset
            .iter()
            .map(|r| r.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();
        let symbols: Vec<String> = dataset.iter().map(|r| r.symbol.clone()).collect();

        let mut columns = vec![
            Column::from(Series::new("date".into(), days).cast(&DataType::Date)?),
            Column::from(Series::new("symbol".into(), symbols)),
        ];
        for column in dataset.columns() {
            let values: Vec<Option<f64>> = dataset.iter().map(|r| r.value(column)).collect();
            columns.push(Column::from(Series::new(column.name().into(), values)));
        }

        let df = DataFrame::new(columns)?;
        Self::validate(&df, dataset.columns())?;
        Ok(df)
    }

    /// Validate DataFrame against schema
    pub fn validate(
        df: &DataFrame,
        columns: impl IntoIterator<Item = CanonicalColumn>,
    ) -> Result<(), SchemaError> {
        let expected = Self::schema(columns);
        let actual = df.schema();

        // Check all required columns exist
        for field in expected.iter_fields() {
            if !actual.contains(field.name()) {
                return Err(SchemaError::MissingColumn(field.name().to_string()));
            }
        }

        // Check data types match
        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("polars: {0}")]
    Polars(#[from] PolarsError),
}

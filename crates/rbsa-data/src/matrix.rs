//! Time-aligned matrix of asset returns.

use crate::error::{DataError, Result};
use crate::series::{ReturnSeries, check_strictly_increasing};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use polars::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Name of the date column used for DataFrame import and export.
pub const DATE_COLUMN: &str = "date";

/// Returns for a set of assets on a shared date index.
///
/// Rows are observations, columns are assets. After cleaning no value is
/// missing; before cleaning `NaN` marks a missing observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    dates: Vec<NaiveDate>,
    names: Vec<String>,
    values: Array2<f64>,
}

impl ReturnMatrix {
    /// Create a matrix, validating shape, index order and name uniqueness.
    pub fn new(dates: Vec<NaiveDate>, names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != dates.len() {
            return Err(DataError::DimensionMismatch {
                expected: dates.len(),
                actual: rows,
            });
        }
        if cols != names.len() {
            return Err(DataError::DimensionMismatch {
                expected: names.len(),
                actual: cols,
            });
        }
        check_strictly_increasing("return matrix", &dates)?;
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(DataError::DuplicateAsset(name.clone()));
            }
        }
        Ok(Self {
            dates,
            names,
            values,
        })
    }

    /// Outer-join several series on the union of their dates.
    ///
    /// Dates absent from a series become `NaN` in that column.
    pub fn from_series(series: &[ReturnSeries]) -> Result<Self> {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.dates().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut values = Array2::from_elem((dates.len(), series.len()), f64::NAN);
        for (j, s) in series.iter().enumerate() {
            for (d, v) in s.dates().iter().zip(s.values().iter()) {
                if let Ok(i) = dates.binary_search(d) {
                    values[[i, j]] = *v;
                }
            }
        }
        let names = series.iter().map(|s| s.name().to_string()).collect();
        Self::new(dates, names, values)
    }

    /// Time index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Asset names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Raw values, observations by assets.
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of observations.
    pub fn n_obs(&self) -> usize {
        self.values.nrows()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    /// Column position of an asset.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Whether the asset is part of the matrix.
    pub fn contains(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns of one asset.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|j| self.values.column(j))
    }

    /// One asset as a standalone series.
    pub fn series(&self, name: &str) -> Result<ReturnSeries> {
        let col = self
            .column(name)
            .ok_or_else(|| DataError::UnknownAsset(name.to_string()))?;
        ReturnSeries::new(name, self.dates.clone(), col.to_vec())
    }

    /// Sub-matrix with the given assets, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let j = self
                .column_index(name)
                .ok_or_else(|| DataError::UnknownAsset(name.to_string()))?;
            indices.push(j);
        }
        Ok(Self {
            dates: self.dates.clone(),
            names: indices.iter().map(|&j| self.names[j].clone()).collect(),
            values: self.values.select(Axis(1), &indices),
        })
    }

    /// Design matrix for the given assets, columns in the given order.
    pub fn design<S: AsRef<str>>(&self, names: &[S]) -> Result<Array2<f64>> {
        Ok(self.select(names)?.values)
    }

    /// Keep only the rows at the given positions.
    pub(crate) fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            names: self.names.clone(),
            values: self.values.select(Axis(0), rows),
        }
    }

    /// Drop every asset column with at least one missing value.
    pub fn drop_incomplete_columns(&self) -> Self {
        let keep: Vec<usize> = (0..self.n_assets())
            .filter(|&j| self.values.column(j).iter().all(|v| v.is_finite()))
            .collect();
        Self {
            dates: self.dates.clone(),
            names: keep.iter().map(|&j| self.names[j].clone()).collect(),
            values: self.values.select(Axis(1), &keep),
        }
    }

    /// Whether any value is missing.
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Same index and names with column-wise transformed values.
    pub(crate) fn map_columns(&self, mut f: impl FnMut(ArrayView1<'_, f64>) -> Array1<f64>) -> Self {
        let mut values = self.values.clone();
        for (j, mut col) in values.axis_iter_mut(Axis(1)).enumerate() {
            col.assign(&f(self.values.column(j)));
        }
        Self {
            dates: self.dates.clone(),
            names: self.names.clone(),
            values,
        }
    }

    /// Pearson correlation matrix of the asset columns.
    ///
    /// Pairs involving a zero-variance column have correlation 0.
    pub fn correlation(&self) -> Array2<f64> {
        let k = self.n_assets();
        let n = self.n_obs() as f64;
        let means = self
            .values
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(k));
        let centered = &self.values - &means.insert_axis(Axis(0));
        let cov = centered.t().dot(&centered) / n.max(1.0);
        let mut corr = Array2::zeros((k, k));
        for i in 0..k {
            for j in 0..k {
                let denom = (cov[[i, i]] * cov[[j, j]]).sqrt();
                corr[[i, j]] = if denom > 0.0 && denom.is_finite() {
                    (cov[[i, j]] / denom).clamp(-1.0, 1.0)
                } else if i == j {
                    1.0
                } else {
                    0.0
                };
            }
        }
        corr
    }

    /// Build a matrix from a DataFrame with a `date` column plus one numeric
    /// column per asset. Nulls become `NaN`.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let date_col = df.column(DATE_COLUMN)?.cast(&DataType::String)?;
        let dates = date_col
            .str()?
            .into_iter()
            .map(|d| {
                let d = d.ok_or_else(|| DataError::Parse("null date".to_string()))?;
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|e| DataError::Parse(format!("{d}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|n| n.as_str() != DATE_COLUMN)
            .map(|n| n.to_string())
            .collect();

        let mut values = Array2::from_elem((dates.len(), names.len()), f64::NAN);
        for (j, name) in names.iter().enumerate() {
            let column = df.column(name)?.cast(&DataType::Float64)?;
            for (i, v) in column.f64()?.into_iter().enumerate() {
                values[[i, j]] = v.unwrap_or(f64::NAN);
            }
        }
        Self::new(dates, names, values)
    }

    /// Export as a DataFrame with a `date` column followed by the assets.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self.dates.iter().map(|d| d.to_string()).collect();
        let mut columns: Vec<Column> = vec![Series::new(DATE_COLUMN.into(), dates).into()];
        for (j, name) in self.names.iter().enumerate() {
            let data: Vec<f64> = self.values.column(j).to_vec();
            columns.push(Series::new(name.as_str().into(), data).into());
        }
        let df = DataFrame::new(columns)?
            .lazy()
            .with_column(col(DATE_COLUMN).cast(DataType::Date))
            .collect()?;
        Ok(df)
    }
}

use super::ModelError;

/// Column-wise min-max scaling to `[0, 1]`, fit on a single customer's rows.
///
/// Missing cells are ignored while fitting and become `0.0` after transform. A column
/// whose observed values are all equal maps to `0.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct MinMaxScaler {
    bounds: Vec<Option<(f64, f64)>>,
}

impl MinMaxScaler {
    pub fn fit<const N: usize>(rows: &[[Option<f64>; N]]) -> Result<Self, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let mut bounds: Vec<Option<(f64, f64)>> = vec![None; N];
        for row in rows {
            for (column, cell) in row.iter().enumerate() {
                let Some(value) = cell else {
                    continue;
                };
                if !value.is_finite() {
                    return Err(ModelError::NonFiniteFeature { column });
                }
                bounds[column] = Some(match bounds[column] {
                    Some((min, max)) => (min.min(*value), max.max(*value)),
                    None => (*value, *value),
                });
            }
        }

        Ok(Self { bounds })
    }

    pub fn width(&self) -> usize {
        self.bounds.len()
    }

    pub fn transform<const N: usize>(
        &self,
        row: &[Option<f64>; N],
    ) -> Result<Vec<f64>, ModelError> {
        if N != self.width() {
            return Err(ModelError::DimensionMismatch { expected: self.width(), actual: N });
        }

        Ok(row
            .iter()
            .zip(&self.bounds)
            .map(|(cell, bounds)| match (cell, bounds) {
                (Some(value), Some((min, max))) if max > min => {
                    ((value - min) / (max - min)).clamp(0.0, 1.0)
                }
                _ => 0.0,
            })
            .collect())
    }

    pub fn fit_transform<const N: usize>(
        rows: &[[Option<f64>; N]],
    ) -> Result<Vec<Vec<f64>>, ModelError> {
        let scaler = Self::fit(rows)?;
        rows.iter().map(|row| scaler.transform(row)).collect()
    }
}

//! In-memory annotated data matrix: per-cell metadata (`obs`), gene names
//! (`var_names`) and a dense `n_obs x n_vars` expression matrix.
//!
//! Only key lookup lives here. Reading h5ad files is left to the caller.

use std::collections::HashMap;

use ndarray::Array2;
use polars::prelude::*;
use tracing::debug;

use crate::models::ObsSource;

#[derive(Debug, Clone)]
pub struct AnnotatedMatrix {
    obs: DataFrame,
    var_names: Vec<String>,
    var_lookup: HashMap<String, usize>,
    x: Array2<f64>,
}

impl AnnotatedMatrix {
    /// `x` must have one row per `obs` row and one column per var name.
    pub fn new(obs: DataFrame, var_names: Vec<String>, x: Array2<f64>) -> PolarsResult<Self> {
        if x.nrows() != obs.height() {
            return Err(PolarsError::ShapeMismatch(
                format!(
                    "expression matrix has {} rows but obs has {} observations",
                    x.nrows(),
                    obs.height()
                )
                .into(),
            ));
        }
        if x.ncols() != var_names.len() {
            return Err(PolarsError::ShapeMismatch(
                format!(
                    "expression matrix has {} columns but {} var names were given",
                    x.ncols(),
                    var_names.len()
                )
                .into(),
            ));
        }

        let mut var_lookup = HashMap::with_capacity(var_names.len());
        for (idx, name) in var_names.iter().enumerate() {
            if var_lookup.insert(name.clone(), idx).is_some() {
                return Err(PolarsError::Duplicate(
                    format!("var name '{name}' occurs more than once").into(),
                ));
            }
        }

        Ok(Self { obs, var_names, var_lookup, x })
    }

    pub fn n_obs(&self) -> usize {
        self.obs.height()
    }

    pub fn n_vars(&self) -> usize {
        self.var_names.len()
    }

    pub fn obs(&self) -> &DataFrame {
        &self.obs
    }

    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.var_lookup.get(name).copied()
    }

    fn in_obs(&self, key: &str) -> bool {
        self.obs.get_column_index(key).is_some()
    }
}

impl ObsSource for AnnotatedMatrix {
    /// Resolve each key to an obs column or to the expression of a gene, in request order.
    fn obs_df(&self, keys: &[&str]) -> PolarsResult<DataFrame> {
        let mut missing = Vec::new();
        for &key in keys {
            let in_obs = self.in_obs(key);
            let in_var = self.var_index(key).is_some();
            if in_obs && in_var {
                return Err(PolarsError::Duplicate(
                    format!("key '{key}' is both an obs column and a var name").into(),
                ));
            }
            if !in_obs && !in_var {
                missing.push(key);
            }
        }
        if !missing.is_empty() {
            return Err(PolarsError::ColumnNotFound(
                format!("could not find keys {missing:?} in obs columns or var_names").into(),
            ));
        }

        let mut columns = Vec::with_capacity(keys.len());
        for &key in keys {
            let column = match self.var_index(key) {
                Some(j) => {
                    let values = self.x.column(j).to_vec();
                    Column::from(Series::new(PlSmallStr::from(key), values))
                }
                None => self.obs.column(key)?.clone(),
            };
            columns.push(column);
        }

        debug!("Resolved {} keys against {} observations", keys.len(), self.n_obs());
        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use polars::df;

    fn pbmc_like() -> AnnotatedMatrix {
        let obs = df![
            "cell_type" => &["T", "T", "B", "B"],
            "batch" => &["b1", "b2", "b1", "b2"]
        ].unwrap();
        let x = array![
            [1.0, 5.0, 0.0],
            [2.0, 6.0, 0.0],
            [3.0, 7.0, 0.5],
            [4.0, 8.0, 1.5]
        ];
        AnnotatedMatrix::new(
            obs,
            vec!["CD3E".into(), "MS4A1".into(), "LYZ".into()],
            x,
        ).unwrap()
    }

    #[test]
    fn resolves_obs_columns_and_genes_in_request_order() {
        let adata = pbmc_like();
        let wide = adata.obs_df(&["MS4A1", "cell_type", "CD3E"]).unwrap();

        let names: Vec<&str> = wide.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["MS4A1", "cell_type", "CD3E"]);

        let ms4a1: Vec<f64> = wide.column("MS4A1").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(ms4a1, vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn lists_every_missing_key() {
        let adata = pbmc_like();
        let err = adata.obs_df(&["CD3E", "NOPE", "cluster"]).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, PolarsError::ColumnNotFound(_)));
        assert!(msg.contains("NOPE"));
        assert!(msg.contains("cluster"));
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let obs = df!["cell_type" => &["T", "B"]].unwrap();
        let x = array![[1.0], [2.0], [3.0]];
        let err = AnnotatedMatrix::new(obs, vec!["CD3E".into()], x).unwrap_err();
        assert!(matches!(err, PolarsError::ShapeMismatch(_)));
    }

    #[test]
    fn rejects_key_present_in_obs_and_var() {
        let obs = df!["CD3E" => &["hi", "lo"]].unwrap();
        let x = array![[1.0], [2.0]];
        let adata = AnnotatedMatrix::new(obs, vec!["CD3E".into()], x).unwrap();
        assert!(matches!(adata.obs_df(&["CD3E"]), Err(PolarsError::Duplicate(_))));
    }
}

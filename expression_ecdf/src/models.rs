use std::error::Error;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Wrap any foreign error (plotters, serde_json, io) into the crate-wide `PolarsError`.
pub fn polars_err(e: Box<dyn Error>) -> PolarsError {
    PolarsError::ComputeError(format!("{e}").into())
}

/// Genes to plot: either one name or a list of names.
///
/// Deserialises from a bare string or from an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneSelection {
    Single(String),
    Multiple(Vec<String>),
}

impl GeneSelection {
    /// Normalised view: a single gene becomes a one-element list.
    pub fn names(&self) -> Vec<&str> {
        match self {
            GeneSelection::Single(gene) => vec![gene.as_str()],
            GeneSelection::Multiple(genes) => genes.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GeneSelection::Single(_) => 1,
            GeneSelection::Multiple(genes) => genes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for GeneSelection {
    fn from(gene: &str) -> Self {
        GeneSelection::Single(gene.to_string())
    }
}

impl From<String> for GeneSelection {
    fn from(gene: String) -> Self {
        GeneSelection::Single(gene)
    }
}

impl From<Vec<String>> for GeneSelection {
    fn from(genes: Vec<String>) -> Self {
        GeneSelection::Multiple(genes)
    }
}

impl From<Vec<&str>> for GeneSelection {
    fn from(genes: Vec<&str>) -> Self {
        GeneSelection::Multiple(genes.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for GeneSelection {
    fn from(genes: &[&str]) -> Self {
        GeneSelection::Multiple(genes.iter().map(|g| g.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for GeneSelection {
    fn from(genes: [&str; N]) -> Self {
        GeneSelection::Multiple(genes.iter().map(|g| g.to_string()).collect())
    }
}

/// Anything that can hand out a wide per-observation table for a list of keys.
///
/// A missing key must surface as `PolarsError::ColumnNotFound`.
pub trait ObsSource {
    fn obs_df(&self, keys: &[&str]) -> PolarsResult<DataFrame>;
}

impl ObsSource for DataFrame {
    fn obs_df(&self, keys: &[&str]) -> PolarsResult<DataFrame> {
        self.select(keys.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn single_gene_normalises_to_one_element_list() {
        let single = GeneSelection::from("CD3E");
        let multiple = GeneSelection::from(vec!["CD3E"]);
        assert_eq!(single.names(), multiple.names());
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn gene_selection_deserialises_from_string_or_list() {
        let single: GeneSelection = serde_json::from_str("\"MS4A1\"").unwrap();
        assert_eq!(single, GeneSelection::Single("MS4A1".into()));

        let multiple: GeneSelection = serde_json::from_str("[\"MS4A1\", \"CD79A\"]").unwrap();
        assert_eq!(multiple.names(), vec!["MS4A1", "CD79A"]);
    }

    #[test]
    fn dataframe_source_reports_missing_column() {
        let df = df![
            "GeneA" => &[1.0, 2.0],
            "Type" => &["X", "Y"]
        ].unwrap();

        let wide = df.obs_df(&["Type", "GeneA"]).unwrap();
        assert_eq!(wide.width(), 2);

        let err = df.obs_df(&["GeneA", "GeneZ"]).unwrap_err();
        assert!(matches!(err, PolarsError::ColumnNotFound(_)));
    }
}

//! Wide (one column per gene) to long (one row per cell-gene pair) reshape,
//! and the choice of which long-form column drives columns, rows and colour.

use polars::prelude::*;
use tracing::debug;

/// Label column of the long table.
pub const GENE_COL: &str = "Gene";
/// Value column of the long table.
pub const VALUE_COL: &str = "Expression";

/// Which long-form column is mapped to facet columns, facet rows and hue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetMapping {
    pub col: String,
    pub hue: String,
    pub row: Option<String>,
}

impl FacetMapping {
    /// With a hue group: columns by group, colour by hue group, one row per gene.
    /// Without: one column per gene, colour by group.
    pub fn new(group: &str, hue_group: Option<&str>) -> Self {
        match hue_group {
            Some(hue) => Self {
                col: group.to_string(),
                hue: hue.to_string(),
                row: Some(GENE_COL.to_string()),
            },
            None => Self {
                col: GENE_COL.to_string(),
                hue: group.to_string(),
                row: None,
            },
        }
    }
}

/// Unpivot every non-id column of `wide` into (`Gene`, `Expression`) pairs.
///
/// Output columns are `id_vars..., Gene, Expression`, gene-major: all rows of
/// the first gene, then all rows of the next. Gene columns are strictly cast
/// to Float64.
pub fn melt_expression(wide: &DataFrame, id_vars: &[&str]) -> PolarsResult<DataFrame> {
    for id in id_vars {
        wide.column(id)?;
    }
    let value_vars: Vec<&str> = wide
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .filter(|name| !id_vars.contains(name))
        .collect();
    if value_vars.is_empty() {
        return Err(PolarsError::ComputeError(
            "nothing to melt: every column is an id column".into(),
        ));
    }

    let n = wide.height();
    let mut long: Option<DataFrame> = None;
    for gene in &value_vars {
        let mut columns = Vec::with_capacity(id_vars.len() + 2);
        for id in id_vars {
            columns.push(wide.column(id)?.clone());
        }
        let labels: Vec<&str> = std::iter::repeat(*gene).take(n).collect();
        columns.push(Column::from(Series::new(PlSmallStr::from(GENE_COL), labels)));
        columns.push(
            wide.column(gene)?
                .strict_cast(&DataType::Float64)?
                .with_name(PlSmallStr::from(VALUE_COL)),
        );

        let block = DataFrame::new(columns)?;
        match long.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&block)?;
            }
            None => long = Some(block),
        }
    }

    let long = long.unwrap_or_default();
    debug!(
        "Melted {} observations x {} genes into {} rows",
        n,
        value_vars.len(),
        long.height()
    );
    Ok(long)
}

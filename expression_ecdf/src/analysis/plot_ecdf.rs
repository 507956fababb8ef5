//! Reshape-and-plot entry point.
//!
//! ```ignore
//! let params = EcdfParams::new("cell_type", vec!["CD3E", "MS4A1"])
//!     .with_col_wrap(2)
//!     .with_return_df(true);
//! let plot = plot_ecdf(&adata, &params)?;
//! plot.grid().save("figures/ecdf.png")?;
//! ```

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::facet_grid::{FacetGrid, ValueAxis};
use crate::analysis::melt::{melt_expression, FacetMapping};
use crate::models::{polars_err, GeneSelection, ObsSource};
use crate::style::EcdfStyle;

/// Ticks pinned on the probability axis of every ECDF grid.
pub const PROBABILITY_TICKS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

fn default_height() -> f64 {
    5.0
}

/// Arguments of [`plot_ecdf`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcdfParams {
    /// Obs column used for facet columns (with a hue group) or for colour (without).
    pub group: String,
    pub genes: GeneSelection,
    /// Obs column coloured within each facet; puts one facet row per gene.
    #[serde(default)]
    pub hue_group: Option<String>,
    #[serde(default)]
    pub col_wrap: Option<usize>,
    /// Facet height in inches.
    #[serde(default = "default_height")]
    pub height: f64,
    /// Expression on the x axis instead of the y axis.
    #[serde(default)]
    pub plot_on_x: bool,
    /// Hand back the melted table alongside the grid.
    #[serde(default)]
    pub return_df: bool,
    #[serde(default)]
    pub style: EcdfStyle,
}

impl EcdfParams {
    pub fn new(group: impl Into<String>, genes: impl Into<GeneSelection>) -> Self {
        Self {
            group: group.into(),
            genes: genes.into(),
            hue_group: None,
            col_wrap: None,
            height: default_height(),
            plot_on_x: false,
            return_df: false,
            style: EcdfStyle::default(),
        }
    }

    pub fn with_hue_group(mut self, hue_group: impl Into<String>) -> Self {
        self.hue_group = Some(hue_group.into());
        self
    }

    pub fn with_col_wrap(mut self, col_wrap: usize) -> Self {
        self.col_wrap = Some(col_wrap);
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_plot_on_x(mut self, plot_on_x: bool) -> Self {
        self.plot_on_x = plot_on_x;
        self
    }

    pub fn with_return_df(mut self, return_df: bool) -> Self {
        self.return_df = return_df;
        self
    }

    pub fn with_style(mut self, style: EcdfStyle) -> Self {
        self.style = style;
        self
    }

    pub fn from_json(json: &str) -> PolarsResult<Self> {
        serde_json::from_str(json).map_err(|e| polars_err(Box::new(e)))
    }

    /// Keys pulled from the dataset: genes, then group, then hue group.
    pub fn selection(&self) -> Vec<&str> {
        let mut keys = self.genes.names();
        keys.push(self.group.as_str());
        if let Some(hue) = &self.hue_group {
            keys.push(hue.as_str());
        }
        keys
    }

    /// Columns kept as identifiers through the reshape.
    pub fn id_vars(&self) -> Vec<&str> {
        let mut ids = vec![self.group.as_str()];
        if let Some(hue) = &self.hue_group {
            ids.push(hue.as_str());
        }
        ids
    }
}

/// Result of [`plot_ecdf`]: the grid, plus the long table when it was requested.
#[derive(Debug, Clone)]
pub struct EcdfPlot {
    grid: FacetGrid,
    long_df: Option<DataFrame>,
}

impl EcdfPlot {
    pub fn grid(&self) -> &FacetGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut FacetGrid {
        &mut self.grid
    }

    pub fn long_df(&self) -> Option<&DataFrame> {
        self.long_df.as_ref()
    }

    pub fn into_parts(self) -> (FacetGrid, Option<DataFrame>) {
        (self.grid, self.long_df)
    }
}

/// Melt the selected genes of `adata` into long form and lay out a faceted ECDF grid.
///
/// A key missing from the dataset fails during extraction, before any layout work.
pub fn plot_ecdf<D: ObsSource + ?Sized>(adata: &D, params: &EcdfParams) -> PolarsResult<EcdfPlot> {
    if params.genes.is_empty() {
        return Err(PolarsError::ComputeError("at least one gene is required".into()));
    }

    let selection = params.selection();
    info!("Extracting {} columns for ECDF plot", selection.len());
    let wide = adata.obs_df(&selection)?;

    let long = melt_expression(&wide, &params.id_vars())?;
    info!(
        "Long-form expression table: {} rows ({} cells x {} genes)",
        long.height(),
        wide.height(),
        params.genes.len()
    );

    let mapping = FacetMapping::new(&params.group, params.hue_group.as_deref());
    let mut grid = FacetGrid::build(
        &long,
        &mapping,
        ValueAxis::from_plot_on_x(params.plot_on_x),
        params.col_wrap,
        params.height,
        &params.style,
    )?;
    grid.set_probability_ticks(&PROBABILITY_TICKS);

    Ok(EcdfPlot {
        grid,
        long_df: params.return_df.then_some(long),
    })
}

//! Facet grid: the explicit plot handle returned by [`plot_ecdf`].
//!
//! Holds the facet layout, one ECDF per (facet, hue level), the shared axis
//! ranges and the tick configuration. Drawing lives in `render.rs`.
//!
//! [`plot_ecdf`]: crate::analysis::plot_ecdf::plot_ecdf

use std::collections::HashMap;
use std::ops::Range;

use plotters::style::RGBColor;
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::ecdf::EcdfCurve;
use crate::analysis::melt::{FacetMapping, VALUE_COL};
use crate::helper_functions::{categorical_order, format_tick, level_labels, nice_ticks};
use crate::style::EcdfStyle;

/// Probability axis limits, shared by every facet.
pub const PROBABILITY_RANGE: (f64, f64) = (-0.05, 1.05);
/// Ticks used on the probability axis until [`FacetGrid::set_probability_ticks`] is called.
pub const AUTO_PROBABILITY_TICKS: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];
/// Width of the legend strip to the right of the grid.
pub const LEGEND_WIDTH_PX: u32 = 160;

/// Which screen axis carries the expression values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueAxis {
    Horizontal,
    Vertical,
}

impl ValueAxis {
    pub fn from_plot_on_x(plot_on_x: bool) -> Self {
        if plot_on_x { ValueAxis::Horizontal } else { ValueAxis::Vertical }
    }
}

#[derive(Debug, Clone)]
pub struct HueCurve {
    pub hue_index: usize,
    pub curve: EcdfCurve,
}

#[derive(Debug, Clone)]
pub struct Facet {
    /// Grid position, zero-based.
    pub row: usize,
    pub col: usize,
    pub title: String,
    pub curves: Vec<HueCurve>,
}

#[derive(Debug, Clone)]
pub struct FacetGrid {
    mapping: FacetMapping,
    nrows: usize,
    ncols: usize,
    facets: Vec<Facet>,
    hue_levels: Vec<String>,
    colours: Vec<RGBColor>,
    value_axis: ValueAxis,
    value_range: (f64, f64),
    probability_ticks: Option<Vec<f64>>,
    height: f64,
    style: EcdfStyle,
}

fn invalid(msg: String) -> PolarsError {
    PolarsError::InvalidOperation(msg.into())
}

fn check_positive(name: &str, value: f64) -> PolarsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("`{name}` must be positive and finite, got {value}")))
    }
}

fn levels_for(long: &DataFrame, var: &str, order: &Option<Vec<String>>) -> PolarsResult<Vec<String>> {
    match order {
        Some(levels) => Ok(levels.clone()),
        None => categorical_order(long.column(var)?),
    }
}

fn level_index(levels: &[String]) -> HashMap<&str, usize> {
    levels.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect()
}

fn lookup(index: &HashMap<&str, usize>, label: &Option<String>) -> Option<usize> {
    label.as_deref().and_then(|l| index.get(l).copied())
}

impl FacetGrid {
    /// Lay out a long-form table (`...ids, Gene, Expression`) according to `mapping`.
    pub fn build(
        long: &DataFrame,
        mapping: &FacetMapping,
        value_axis: ValueAxis,
        col_wrap: Option<usize>,
        height: f64,
        style: &EcdfStyle,
    ) -> PolarsResult<Self> {
        if mapping.row.is_some() && col_wrap.is_some() {
            return Err(invalid("Cannot use `row` and `col_wrap` together.".to_string()));
        }
        if col_wrap == Some(0) {
            return Err(invalid("`col_wrap` must be at least 1".to_string()));
        }
        check_positive("height", height)?;
        check_positive("aspect", style.aspect)?;
        check_positive("dpi", style.dpi)?;
        if !(0.0..=1.0).contains(&style.alpha) {
            return Err(invalid(format!("`alpha` must lie in [0, 1], got {}", style.alpha)));
        }
        let colours = style.palette.colours()?;

        let col_levels = levels_for(long, &mapping.col, &style.col_order)?;
        let hue_levels = levels_for(long, &mapping.hue, &style.hue_order)?;
        let row_levels = match &mapping.row {
            Some(row) => levels_for(long, row, &style.row_order)?,
            None => Vec::new(),
        };

        let col_labels = level_labels(long.column(&mapping.col)?)?;
        let hue_labels = level_labels(long.column(&mapping.hue)?)?;
        let row_labels = match &mapping.row {
            Some(row) => Some(level_labels(long.column(row)?)?),
            None => None,
        };
        let values = long.column(VALUE_COL)?.f64()?;

        let col_index = level_index(&col_levels);
        let hue_index = level_index(&hue_levels);
        let row_index = level_index(&row_levels);
        let mut buckets: HashMap<(usize, usize, usize), Vec<f64>> = HashMap::new();
        let mut skipped = 0usize;
        for (i, value) in values.into_iter().enumerate() {
            let row = match &row_labels {
                Some(labels) => lookup(&row_index, &labels[i]),
                None => Some(0),
            };
            match (row, lookup(&col_index, &col_labels[i]), lookup(&hue_index, &hue_labels[i]), value) {
                (Some(r), Some(c), Some(h), Some(v)) => buckets.entry((r, c, h)).or_default().push(v),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("Skipped {skipped} rows with a null value or a level outside the requested order");
        }

        let n_rows = if mapping.row.is_some() { row_levels.len() } else { 1 };
        let (nrows, ncols) = match col_wrap {
            Some(wrap) => (col_levels.len().div_ceil(wrap), col_levels.len().min(wrap)),
            None => (n_rows, col_levels.len()),
        };

        let mut facets = Vec::with_capacity(n_rows * col_levels.len());
        for r in 0..n_rows {
            for (c, col_level) in col_levels.iter().enumerate() {
                let (row, col) = match col_wrap {
                    Some(wrap) => (c / wrap, c % wrap),
                    None => (r, c),
                };
                let title = match &mapping.row {
                    Some(row_var) => format!(
                        "{} = {} | {} = {}",
                        row_var, row_levels[r], mapping.col, col_level
                    ),
                    None => format!("{} = {}", mapping.col, col_level),
                };
                let curves: Vec<HueCurve> = (0..hue_levels.len())
                    .filter_map(|h| {
                        let samples = buckets.get(&(r, c, h))?;
                        let curve = EcdfCurve::new(samples, style.complementary)?;
                        Some(HueCurve { hue_index: h, curve })
                    })
                    .collect();
                debug!("Facet '{}' holds {} curves", title, curves.len());
                facets.push(Facet { row, col, title, curves });
            }
        }

        let value_range = Self::padded_value_range(&facets);
        info!(
            "Built {}x{} facet grid ({} facets, {} hue levels)",
            nrows,
            ncols,
            facets.len(),
            hue_levels.len()
        );

        Ok(Self {
            mapping: mapping.clone(),
            nrows,
            ncols,
            facets,
            hue_levels,
            colours,
            value_axis,
            value_range,
            probability_ticks: None,
            height,
            style: style.clone(),
        })
    }

    /// Shared value limits over every curve, with a 5% margin.
    fn padded_value_range(facets: &[Facet]) -> (f64, f64) {
        let (lo, hi) = facets
            .iter()
            .flat_map(|f| f.curves.iter())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), hc| {
                (lo.min(hc.curve.min()), hi.max(hc.curve.max()))
            });
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        let span = hi - lo;
        if span <= 0.0 {
            (lo - 0.5, hi + 0.5)
        } else {
            (lo - 0.05 * span, hi + 0.05 * span)
        }
    }

    /// Fix the ticks of the probability axis. The axis is shared, so this applies to every facet.
    pub fn set_probability_ticks(&mut self, ticks: &[f64]) {
        self.probability_ticks = Some(ticks.to_vec());
    }

    /// Ticks explicitly set on the probability axis, if any.
    pub fn probability_ticks(&self) -> Option<&[f64]> {
        self.probability_ticks.as_deref()
    }

    /// Ticks a renderer should draw on the probability axis.
    pub fn effective_probability_ticks(&self) -> &[f64] {
        self.probability_ticks().unwrap_or(&AUTO_PROBABILITY_TICKS)
    }

    pub fn value_ticks(&self) -> Vec<f64> {
        nice_ticks(self.value_range.0, self.value_range.1, 5)
    }

    /// Data ranges of the (x, y) axes.
    pub fn axis_ranges(&self) -> (Range<f64>, Range<f64>) {
        let value = self.value_range.0..self.value_range.1;
        let probability = PROBABILITY_RANGE.0..PROBABILITY_RANGE.1;
        match self.value_axis {
            ValueAxis::Horizontal => (value, probability),
            ValueAxis::Vertical => (probability, value),
        }
    }

    /// Labelled ticks of the (x, y) axes. Probabilities print with two decimals.
    pub fn axis_ticks(&self) -> (Vec<(f64, String)>, Vec<(f64, String)>) {
        let value: Vec<(f64, String)> = self
            .value_ticks()
            .into_iter()
            .map(|v| (v, format_tick(v)))
            .collect();
        let probability: Vec<(f64, String)> = self
            .effective_probability_ticks()
            .iter()
            .map(|&p| (p, format!("{p:.2}")))
            .collect();
        match self.value_axis {
            ValueAxis::Horizontal => (value, probability),
            ValueAxis::Vertical => (probability, value),
        }
    }

    /// Descriptions of the (x, y) axes.
    pub fn axis_labels(&self) -> (&str, &str) {
        match self.value_axis {
            ValueAxis::Horizontal => (self.value_label(), self.probability_label()),
            ValueAxis::Vertical => (self.probability_label(), self.value_label()),
        }
    }

    /// Map a (value, proportion) point onto (x, y).
    pub fn orient(&self, value: f64, proportion: f64) -> (f64, f64) {
        match self.value_axis {
            ValueAxis::Horizontal => (value, proportion),
            ValueAxis::Vertical => (proportion, value),
        }
    }

    pub fn value_label(&self) -> &str {
        VALUE_COL
    }

    pub fn probability_label(&self) -> &str {
        "Proportion"
    }

    pub fn mapping(&self) -> &FacetMapping {
        &self.mapping
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn facet(&self, row: usize, col: usize) -> Option<&Facet> {
        self.facets.iter().find(|f| f.row == row && f.col == col)
    }

    pub fn hue_levels(&self) -> &[String] {
        &self.hue_levels
    }

    /// Palette colour of a hue level; the palette cycles.
    pub fn colour_for(&self, hue_index: usize) -> RGBColor {
        self.colours[hue_index % self.colours.len()]
    }

    pub fn value_axis(&self) -> ValueAxis {
        self.value_axis
    }

    pub fn value_range(&self) -> (f64, f64) {
        self.value_range
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn style(&self) -> &EcdfStyle {
        &self.style
    }

    pub fn legend_width_px(&self) -> u32 {
        if self.style.legend && !self.hue_levels.is_empty() {
            LEGEND_WIDTH_PX
        } else {
            0
        }
    }

    /// Figure size in pixels: `height * dpi` per facet row, `height * aspect * dpi` per column.
    pub fn size_px(&self) -> (u32, u32) {
        let facet_h = self.height * self.style.dpi;
        let facet_w = facet_h * self.style.aspect;
        let width = (facet_w * self.ncols.max(1) as f64).round() as u32 + self.legend_width_px();
        let height = (facet_h * self.nrows.max(1) as f64).round() as u32;
        (width.max(1), height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::melt::{melt_expression, GENE_COL};
    use polars::df;

    fn long_table() -> DataFrame {
        let wide = df![
            "GeneA" => &[1.0, 2.0, 3.0, 4.0],
            "GeneB" => &[5.0, 6.0, 7.0, 8.0],
            "Type" => &["X", "X", "Y", "Y"],
            "Batch" => &["b1", "b2", "b1", "b2"]
        ].unwrap();
        melt_expression(&wide, &["Type", "Batch"]).unwrap()
    }

    #[test]
    fn one_column_per_gene_without_hue_group() {
        let mapping = FacetMapping::new("Type", None);
        let grid = FacetGrid::build(&long_table(), &mapping, ValueAxis::Vertical, None, 5.0, &EcdfStyle::default()).unwrap();

        assert_eq!((grid.nrows(), grid.ncols()), (1, 2));
        assert_eq!(grid.hue_levels(), &["X".to_string(), "Y".to_string()]);

        let gene_b = grid.facet(0, 1).unwrap();
        assert_eq!(gene_b.title, format!("{GENE_COL} = GeneB"));
        assert_eq!(gene_b.curves.len(), 2);
        assert_eq!(gene_b.curves[1].curve.values(), &[7.0, 8.0]);
        assert_eq!(grid.size_px(), (1000 + LEGEND_WIDTH_PX, 500));
    }

    #[test]
    fn gene_rows_with_hue_group() {
        let mapping = FacetMapping::new("Type", Some("Batch"));
        let grid = FacetGrid::build(&long_table(), &mapping, ValueAxis::Horizontal, None, 3.0, &EcdfStyle::default()).unwrap();

        assert_eq!((grid.nrows(), grid.ncols()), (2, 2));
        let facet = grid.facet(1, 0).unwrap();
        assert_eq!(facet.title, "Gene = GeneB | Type = X");
        let per_batch: Vec<&[f64]> = facet.curves.iter().map(|hc| hc.curve.values()).collect();
        assert_eq!(per_batch, vec![&[5.0][..], &[6.0][..]]);
    }

    #[test]
    fn col_wrap_fills_rows_first() {
        let wide = df![
            "G1" => &[1.0], "G2" => &[2.0], "G3" => &[3.0],
            "Type" => &["X"]
        ].unwrap();
        let long = melt_expression(&wide, &["Type"]).unwrap();
        let mapping = FacetMapping::new("Type", None);
        let grid = FacetGrid::build(&long, &mapping, ValueAxis::Vertical, Some(2), 5.0, &EcdfStyle::default()).unwrap();

        assert_eq!((grid.nrows(), grid.ncols()), (2, 2));
        assert_eq!(grid.facets().len(), 3);
        assert_eq!(grid.facet(1, 0).unwrap().title, "Gene = G3");
        assert!(grid.facet(1, 1).is_none());
    }

    #[test]
    fn col_wrap_and_row_facets_conflict() {
        let mapping = FacetMapping::new("Type", Some("Batch"));
        let err = FacetGrid::build(&long_table(), &mapping, ValueAxis::Vertical, Some(2), 5.0, &EcdfStyle::default()).unwrap_err();
        assert!(matches!(err, PolarsError::InvalidOperation(_)));
    }

    #[test]
    fn rejects_bad_sizes() {
        let mapping = FacetMapping::new("Type", None);
        let long = long_table();
        assert!(FacetGrid::build(&long, &mapping, ValueAxis::Vertical, None, 0.0, &EcdfStyle::default()).is_err());
        assert!(FacetGrid::build(&long, &mapping, ValueAxis::Vertical, Some(0), 5.0, &EcdfStyle::default()).is_err());

        let style = EcdfStyle { aspect: f64::NAN, ..EcdfStyle::default() };
        assert!(FacetGrid::build(&long, &mapping, ValueAxis::Vertical, None, 5.0, &style).is_err());
    }

    #[test]
    fn hue_order_restricts_and_reorders() {
        let mapping = FacetMapping::new("Type", None);
        let style = EcdfStyle { hue_order: Some(vec!["Y".into()]), ..EcdfStyle::default() };
        let grid = FacetGrid::build(&long_table(), &mapping, ValueAxis::Vertical, None, 5.0, &style).unwrap();

        assert_eq!(grid.hue_levels(), &["Y".to_string()]);
        let gene_a = grid.facet(0, 0).unwrap();
        assert_eq!(gene_a.curves.len(), 1);
        assert_eq!(gene_a.curves[0].curve.values(), &[3.0, 4.0]);
    }

    #[test]
    fn shared_value_range_and_ticks() {
        let mapping = FacetMapping::new("Type", None);
        let mut grid = FacetGrid::build(&long_table(), &mapping, ValueAxis::Vertical, None, 5.0, &EcdfStyle::default()).unwrap();

        let (lo, hi) = grid.value_range();
        assert!((lo - 0.65).abs() < 1e-9);
        assert!((hi - 8.35).abs() < 1e-9);

        assert_eq!(grid.probability_ticks(), None);
        assert_eq!(grid.effective_probability_ticks(), &AUTO_PROBABILITY_TICKS);
        grid.set_probability_ticks(&[0.0, 0.5, 1.0]);
        assert_eq!(grid.probability_ticks(), Some(&[0.0, 0.5, 1.0][..]));
    }

    #[test]
    fn axis_ticks_follow_orientation() {
        let mapping = FacetMapping::new("Type", None);
        let mut grid = FacetGrid::build(&long_table(), &mapping, ValueAxis::Horizontal, None, 5.0, &EcdfStyle::default()).unwrap();
        grid.set_probability_ticks(&[0.0, 0.25, 0.5, 0.75, 1.0]);

        let (x_ticks, y_ticks) = grid.axis_ticks();
        let y_labels: Vec<&str> = y_ticks.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(y_labels, vec!["0.00", "0.25", "0.50", "0.75", "1.00"]);
        let x_labels: Vec<&str> = x_ticks.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(x_labels, vec!["2", "4", "6", "8"]);
        assert_eq!(grid.axis_labels(), ("Expression", "Proportion"));
        assert_eq!(grid.axis_ranges().1, PROBABILITY_RANGE.0..PROBABILITY_RANGE.1);
    }

    #[test]
    fn near_equal_values_give_finite_ticks() {
        let wide = df![
            "G" => &[1.0, 1.0 + f64::EPSILON],
            "T" => &["X", "Y"]
        ].unwrap();
        let long = melt_expression(&wide, &["T"]).unwrap();
        let mapping = FacetMapping::new("T", None);
        let grid = FacetGrid::build(&long, &mapping, ValueAxis::Horizontal, None, 5.0, &EcdfStyle::default()).unwrap();

        let (lo, hi) = grid.value_range();
        let ticks = grid.value_ticks();
        assert!(!ticks.is_empty() && ticks.len() <= 6);
        assert!(ticks.iter().all(|t| (lo..=hi).contains(t)));
    }

    #[test]
    fn orientation_swaps_axes() {
        let mapping = FacetMapping::new("Type", None);
        let long = long_table();
        let vertical = FacetGrid::build(&long, &mapping, ValueAxis::from_plot_on_x(false), None, 5.0, &EcdfStyle::default()).unwrap();
        let horizontal = FacetGrid::build(&long, &mapping, ValueAxis::from_plot_on_x(true), None, 5.0, &EcdfStyle::default()).unwrap();
        assert_eq!(vertical.orient(3.0, 0.25), (0.25, 3.0));
        assert_eq!(horizontal.orient(3.0, 0.25), (3.0, 0.25));
    }
}

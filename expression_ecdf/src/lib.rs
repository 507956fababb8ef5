//! Faceted ECDF plots of single-cell gene expression.
//!
//! Genes are pulled out of an annotated matrix (or any [`ObsSource`]),
//! melted into one row per cell-gene pair, and laid out as a grid of
//! empirical cumulative distribution curves faceted and coloured by
//! categorical cell metadata.

pub mod models;
pub mod data_handling;
pub mod helper_functions;
pub mod analysis;
pub mod style;

pub use analysis::facet_grid::{Facet, FacetGrid, HueCurve, ValueAxis};
pub use analysis::melt::{FacetMapping, GENE_COL, VALUE_COL};
pub use analysis::plot_ecdf::{plot_ecdf, EcdfParams, EcdfPlot, PROBABILITY_TICKS};
pub use data_handling::annotated_matrix::AnnotatedMatrix;
pub use models::{GeneSelection, ObsSource};
pub use style::{EcdfStyle, Palette};

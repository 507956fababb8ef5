pub mod ecdf;
pub mod melt;
pub mod facet_grid;
pub mod render;
pub mod plot_ecdf;

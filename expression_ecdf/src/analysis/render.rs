use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use polars::prelude::*;
use tracing::info;

use crate::analysis::facet_grid::{Facet, FacetGrid};
use crate::models::polars_err;

const MARGIN_PX: i32 = 10;
const TITLE_HEIGHT_PX: i32 = 24;
const X_LABEL_AREA_PX: i32 = 40;
const Y_LABEL_AREA_PX: i32 = 50;
const TICK_PX: i32 = 5;

fn text_style(size: f64, h: HPos, v: VPos) -> TextStyle<'static> {
    ("sans-serif", size).into_font().color(&BLACK).pos(Pos::new(h, v))
}

impl FacetGrid {
    /// Render to `path`. `.svg` files use the SVG backend, anything else is a bitmap (PNG).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PolarsResult<()> {
        let path = path.as_ref();
        let size = self.size_px();
        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("svg"))
            .unwrap_or(false);

        info!("Rendering {}x{} px ECDF grid to {}", size.0, size.1, path.display());
        if is_svg {
            self.draw(SVGBackend::new(path, size).into_drawing_area())
        } else {
            self.draw(BitMapBackend::new(path, size).into_drawing_area())
        }
    }

    /// Render into an in-memory SVG document.
    pub fn to_svg_string(&self) -> PolarsResult<String> {
        let mut svg = String::new();
        self.draw(SVGBackend::with_string(&mut svg, self.size_px()).into_drawing_area())?;
        Ok(svg)
    }

    fn draw<DB: DrawingBackend>(&self, root: DrawingArea<DB, Shift>) -> PolarsResult<()>
    where
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).map_err(|e| polars_err(Box::new(e)))?;

        let (width, _) = root.dim_in_pixel();
        let legend_width = self.legend_width_px();
        let (grid_area, legend_area) = root.split_horizontally(width.saturating_sub(legend_width));

        if self.nrows() > 0 && self.ncols() > 0 {
            let panels = grid_area.split_evenly((self.nrows(), self.ncols()));
            for facet in self.facets() {
                self.draw_facet(&panels[facet.row * self.ncols() + facet.col], facet)?;
            }
        }
        if legend_width > 0 {
            self.draw_legend(&legend_area)?;
        }

        root.present().map_err(|e| polars_err(Box::new(e)))?;
        Ok(())
    }

    /// One facet: title, left and bottom spines, ticks, curves.
    ///
    /// Every piece of text is placed at a fixed anchor, so nothing here
    /// measures glyphs and the SVG backend never needs a font.
    fn draw_facet<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>, facet: &Facet) -> PolarsResult<()>
    where
        DB::ErrorType: 'static,
    {
        let (width, _) = area.dim_in_pixel();
        area.draw(&Text::new(
            facet.title.clone(),
            (width as i32 / 2, MARGIN_PX),
            text_style(16.0, HPos::Center, VPos::Top),
        ))
        .map_err(|e| polars_err(Box::new(e)))?;

        let (x_range, y_range) = self.axis_ranges();
        let mut chart = ChartBuilder::on(area)
            .margin(MARGIN_PX)
            .margin_top(MARGIN_PX + TITLE_HEIGHT_PX)
            .x_label_area_size(X_LABEL_AREA_PX)
            .y_label_area_size(Y_LABEL_AREA_PX)
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(|e| polars_err(Box::new(e)))?;

        // chart coordinates are absolute, `area` draws relative to its corner
        let (base_x, base_y) = area.get_base_pixel();
        let to_area = |x: f64, y: f64| {
            let (px, py) = chart.backend_coord(&(x, y));
            (px - base_x, py - base_y)
        };
        let (left, bottom) = to_area(x_range.start, y_range.start);
        let (right, top) = to_area(x_range.end, y_range.end);

        area.draw(&PathElement::new(vec![(left, top), (left, bottom), (right, bottom)], BLACK.stroke_width(1)))
            .map_err(|e| polars_err(Box::new(e)))?;

        let (x_ticks, y_ticks) = self.axis_ticks();
        let tick_font = text_style(12.0, HPos::Center, VPos::Top);
        for (x, label) in x_ticks {
            let (px, _) = to_area(x, y_range.start);
            area.draw(&PathElement::new(vec![(px, bottom), (px, bottom + TICK_PX)], BLACK.stroke_width(1)))
                .map_err(|e| polars_err(Box::new(e)))?;
            area.draw(&Text::new(label, (px, bottom + TICK_PX + 2), tick_font.clone()))
                .map_err(|e| polars_err(Box::new(e)))?;
        }
        let tick_font = text_style(12.0, HPos::Right, VPos::Center);
        for (y, label) in y_ticks {
            let (_, py) = to_area(x_range.start, y);
            area.draw(&PathElement::new(vec![(left - TICK_PX, py), (left, py)], BLACK.stroke_width(1)))
                .map_err(|e| polars_err(Box::new(e)))?;
            area.draw(&Text::new(label, (left - TICK_PX - 2, py), tick_font.clone()))
                .map_err(|e| polars_err(Box::new(e)))?;
        }

        let (x_desc, y_desc) = self.axis_labels();
        area.draw(&Text::new(
            x_desc.to_string(),
            ((left + right) / 2, bottom + TICK_PX + 20),
            text_style(13.0, HPos::Center, VPos::Top),
        ))
        .map_err(|e| polars_err(Box::new(e)))?;
        area.draw(&Text::new(
            y_desc.to_string(),
            (MARGIN_PX, (top + bottom) / 2),
            text_style(13.0, HPos::Center, VPos::Top).transform(FontTransform::Rotate270),
        ))
        .map_err(|e| polars_err(Box::new(e)))?;

        let v_lo = self.value_range().0;
        let line_width = self.style().line_width;
        let alpha = self.style().alpha;
        for hc in &facet.curves {
            let colour = self.colour_for(hc.hue_index);
            let path: Vec<(f64, f64)> = hc
                .curve
                .step_points(v_lo)
                .into_iter()
                .map(|(value, proportion)| self.orient(value, proportion))
                .collect();
            chart
                .draw_series(LineSeries::new(path, colour.mix(alpha).stroke_width(line_width)))
                .map_err(|e| polars_err(Box::new(e)))?;
        }
        Ok(())
    }

    fn draw_legend<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> PolarsResult<()>
    where
        DB::ErrorType: 'static,
    {
        area.draw(&Text::new(
            self.mapping().hue.clone(),
            (10, 20),
            ("sans-serif", 16).into_font(),
        ))
        .map_err(|e| polars_err(Box::new(e)))?;

        let stroke = self.style().line_width.max(2);
        for (i, level) in self.hue_levels().iter().enumerate() {
            let y = 45 + 22 * i as i32;
            let colour = self.colour_for(i);
            area.draw(&PathElement::new(vec![(10, y), (34, y)], colour.stroke_width(stroke)))
                .map_err(|e| polars_err(Box::new(e)))?;
            area.draw(&Text::new(level.clone(), (40, y - 7), ("sans-serif", 14).into_font()))
                .map_err(|e| polars_err(Box::new(e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::facet_grid::{FacetGrid, ValueAxis};
    use crate::analysis::melt::{melt_expression, FacetMapping};
    use crate::analysis::plot_ecdf::{plot_ecdf, EcdfParams, PROBABILITY_TICKS};
    use crate::style::EcdfStyle;
    use polars::df;

    /// plotters writes each text node on its own line.
    fn has_text(svg: &str, text: &str) -> bool {
        svg.contains(&format!(">\n{text}\n</text>"))
    }

    fn wide() -> polars::prelude::DataFrame {
        df![
            "CD3E" => &[0.0, 1.2, 2.5, 0.1],
            "MS4A1" => &[3.0, 0.2, 0.0, 4.1],
            "Type" => &["T", "T", "B", "B"]
        ].unwrap()
    }

    fn grid() -> FacetGrid {
        let long = melt_expression(&wide(), &["Type"]).unwrap();
        let mapping = FacetMapping::new("Type", None);
        FacetGrid::build(&long, &mapping, ValueAxis::Horizontal, None, 3.0, &EcdfStyle::default()).unwrap()
    }

    #[test]
    fn svg_shows_titles_and_fixed_probability_ticks() {
        for plot_on_x in [true, false] {
            let params = EcdfParams::new("Type", vec!["CD3E", "MS4A1"]).with_plot_on_x(plot_on_x);
            let plot = plot_ecdf(&wide(), &params).unwrap();
            assert_eq!(plot.grid().probability_ticks(), Some(&PROBABILITY_TICKS[..]));

            let svg = plot.grid().to_svg_string().unwrap();
            assert!(svg.starts_with("<svg"));
            for text in ["Gene = CD3E", "Gene = MS4A1", "0.25", "0.75", "Proportion", "Expression"] {
                assert!(has_text(&svg, text), "missing {text} in svg");
            }
            // legend
            assert!(has_text(&svg, "Type"));
            assert!(has_text(&svg, "B"));
        }
    }

    #[test]
    fn unset_ticks_fall_back_to_fifths() {
        let svg = grid().to_svg_string().unwrap();
        assert!(has_text(&svg, "0.20"));
        assert!(!has_text(&svg, "0.25"));
    }

    #[test]
    fn saves_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecdf.svg");
        grid().save(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(has_text(&written, "Gene = CD3E"));
    }

    #[test]
    #[ignore = "rasterising text needs system fonts"]
    fn saves_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecdf.png");
        grid().save(&path).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}

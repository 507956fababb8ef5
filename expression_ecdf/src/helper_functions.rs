use std::cmp::Ordering;
use std::collections::HashSet;

use plotters::style::RGBColor;
use polars::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber driven by `RUST_LOG` (falls back to `info`).
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// String label of every row of a grouping column, `None` for nulls.
pub fn level_labels(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    let as_str = column.cast(&DataType::String)?;
    let labels = as_str.str()?;
    Ok(labels.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Distinct levels of a grouping column.
///
/// Numeric columns are sorted ascending, everything else keeps the order in
/// which a level first appears. Nulls never form a level.
pub fn categorical_order(column: &Column) -> PolarsResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for label in level_labels(column)?.into_iter().flatten() {
        if seen.insert(label.clone()) {
            order.push(label);
        }
    }

    let dtype = column.dtype();
    if dtype.is_integer() || dtype.is_float() {
        order.sort_by(|a, b| {
            let a = a.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.parse::<f64>().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        });
    }
    Ok(order)
}

/// Round-number ticks covering `[lo, hi]`, roughly `target` of them.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 || target == 0 {
        return vec![lo];
    }

    let raw_step = span / target as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let step = match raw_step / magnitude {
        n if n <= 1.0 => 1.0,
        n if n <= 2.0 => 2.0,
        n if n <= 2.5 => 2.5,
        n if n <= 5.0 => 5.0,
        _ => 10.0,
    } * magnitude;

    // past 2^52 neighbouring multiples of `step` are no longer distinct floats
    let first = (lo / step).ceil();
    if !first.is_finite() || first.abs() > 2f64.powi(52) {
        return vec![lo, hi];
    }

    // snap to the step's decimal precision so 0.1 * 3 prints as 0.3
    let scale = 10f64.powi((-step.log10().floor()).max(0.0) as i32 + 1);
    let snap = |t: f64| {
        let snapped = (t * scale).round() / scale;
        if snapped.is_finite() { snapped } else { t }
    };

    let count = (span / step).ceil() as usize + 1;
    let mut ticks = Vec::with_capacity(count);
    for k in 0..=count {
        let tick = snap((first + k as f64) * step);
        if tick > hi + step * 1e-9 {
            break;
        }
        // avoid printing "-0"
        ticks.push(if tick.abs() < step * 1e-9 { 0.0 } else { tick });
    }
    ticks
}

/// Compact tick label: integers without decimals, otherwise up to four decimals.
pub fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        return format!("{:.0}", value.round() + 0.0);
    }
    let text = format!("{value:.4}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_colour(hex: &str) -> PolarsResult<RGBColor> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PolarsError::ComputeError(
            format!("invalid colour '{hex}', expected #rrggbb").into(),
        ));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|e| PolarsError::ComputeError(format!("invalid colour '{hex}': {e}").into()))
    };
    Ok(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

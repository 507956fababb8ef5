//! Styling options forwarded to the ECDF renderer.
//!
//! Every field has a default, so a JSON object only has to name what it
//! changes. Unknown option names are rejected.

use plotters::style::RGBColor;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::helper_functions::parse_hex_colour;
use crate::models::polars_err;

const TAB10: [RGBColor; 10] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0x7f, 0x7f, 0x7f),
    RGBColor(0xbc, 0xbd, 0x22),
    RGBColor(0x17, 0xbe, 0xcf),
];

const DEEP: [RGBColor; 10] = [
    RGBColor(0x4c, 0x72, 0xb0),
    RGBColor(0xdd, 0x84, 0x52),
    RGBColor(0x55, 0xa8, 0x68),
    RGBColor(0xc4, 0x4e, 0x52),
    RGBColor(0x81, 0x72, 0xb3),
    RGBColor(0x93, 0x78, 0x60),
    RGBColor(0xda, 0x8b, 0xc3),
    RGBColor(0x8c, 0x8c, 0x8c),
    RGBColor(0xcc, 0xb9, 0x74),
    RGBColor(0x64, 0xb5, 0xcd),
];

/// Hue colours: a named palette or an explicit list of `#rrggbb` codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Palette {
    Named(String),
    Colours(Vec<String>),
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Named("tab10".to_string())
    }
}

impl Palette {
    pub fn colours(&self) -> PolarsResult<Vec<RGBColor>> {
        match self {
            Palette::Named(name) => match name.as_str() {
                "tab10" => Ok(TAB10.to_vec()),
                "deep" => Ok(DEEP.to_vec()),
                other => Err(PolarsError::ComputeError(
                    format!("unknown palette '{other}', expected 'tab10' or 'deep'").into(),
                )),
            },
            Palette::Colours(codes) => {
                if codes.is_empty() {
                    return Err(PolarsError::ComputeError("palette has no colours".into()));
                }
                codes.iter().map(|c| parse_hex_colour(c)).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EcdfStyle {
    /// Facet width = height * aspect.
    pub aspect: f64,
    pub palette: Palette,
    pub line_width: u32,
    pub alpha: f64,
    pub legend: bool,
    /// Plot `1 - F(x)` instead of `F(x)`.
    pub complementary: bool,
    pub hue_order: Option<Vec<String>>,
    pub col_order: Option<Vec<String>>,
    pub row_order: Option<Vec<String>>,
    /// Pixels per inch of facet height.
    pub dpi: f64,
}

impl Default for EcdfStyle {
    fn default() -> Self {
        Self {
            aspect: 1.0,
            palette: Palette::default(),
            line_width: 2,
            alpha: 1.0,
            legend: true,
            complementary: false,
            hue_order: None,
            col_order: None,
            row_order: None,
            dpi: 100.0,
        }
    }
}

impl EcdfStyle {
    pub fn from_json(json: &str) -> PolarsResult<Self> {
        serde_json::from_str(json).map_err(|e| polars_err(Box::new(e)))
    }
}

use crate::date_range::DateWindow;
use serde::{Deserialize, Serialize};
use std::fmt;
use wfr_utils::dates::{format_label_date, format_label_range};

/// Raw value the upstream products use for "no physical measurement".
pub const SENTINEL: f64 = -9999.0;

/// The three physical quantities fused per point.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    Temperature,
    Vegetation,
    Precipitation,
}

impl Variable {
    pub const ALL: [Variable; 3] = [
        Variable::Temperature,
        Variable::Vegetation,
        Variable::Precipitation,
    ];
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variable::Temperature => "temperature",
            Variable::Vegetation => "vegetation index",
            Variable::Precipitation => "precipitation",
        };
        f.write_str(name)
    }
}

/// How images inside a window are combined into one value per pixel.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean,
    Sum,
}

impl Aggregation {
    /// Reduce the observations of one pixel. `None` when there are none.
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let total: f64 = values.iter().sum();
        match self {
            Aggregation::Sum => Some(total),
            Aggregation::Mean => Some(total / values.len() as f64),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
        }
    }
}

/// Raw-to-physical conversion rule, paired with the validity test for the
/// raw encoding.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    /// Kelvin scaled by 50 to Celsius: `raw * 0.02 - 273.15`.
    /// Raw values at or below zero are invalid.
    ScaledKelvin { scale: f64, offset: f64 },
    /// `raw * scale`, clamped into `[min, max]`.
    ScaledClamped { scale: f64, min: f64, max: f64 },
    /// Already in physical units.
    Identity,
}

impl Conversion {
    /// Convert a raw sample. `None` means invalid, never a numeric default.
    pub fn to_physical(&self, raw: Option<f64>) -> Option<f64> {
        let raw = raw.filter(|value| value.is_finite() && *value != SENTINEL)?;
        match *self {
            Conversion::ScaledKelvin { scale, offset } => {
                if raw <= 0.0 {
                    None
                } else {
                    Some(raw * scale + offset)
                }
            }
            Conversion::ScaledClamped { scale, min, max } => Some((raw * scale).clamp(min, max)),
            Conversion::Identity => Some(raw),
        }
    }
}

/// How the selected window is rendered for display.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStyle {
    /// The day the search settled on, e.g. `20-September-2024`
    EndDate,
    /// Both bounds, e.g. `21-Aug-2024 to 20-Sep-2024`
    Range,
}

/// Per-source acquisition configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub variable: Variable,
    /// Upstream image collection, e.g. `MODIS/061/MOD11A1`
    pub collection: String,
    /// Band selected from the collection
    pub band: String,
    pub aggregation: Aggregation,
    pub window_days: u32,
    pub step_days: u32,
    /// Furthest offset (in days before now) the search will try
    pub horizon_days: u32,
    pub conversion: Conversion,
    pub unit: String,
    pub label_style: LabelStyle,
}

impl SourceSpec {
    /// MODIS Terra daily land-surface temperature, 8-day mean composite.
    pub fn temperature() -> SourceSpec {
        SourceSpec {
            variable: Variable::Temperature,
            collection: String::from("MODIS/061/MOD11A1"),
            band: String::from("LST_Day_1km"),
            aggregation: Aggregation::Mean,
            window_days: 8,
            step_days: 1,
            horizon_days: 30,
            conversion: Conversion::ScaledKelvin {
                scale: 0.02,
                offset: -273.15,
            },
            unit: String::from("°C"),
            label_style: LabelStyle::EndDate,
        }
    }

    /// MODIS 16-day vegetation index.
    pub fn vegetation() -> SourceSpec {
        SourceSpec {
            variable: Variable::Vegetation,
            collection: String::from("MODIS/061/MOD13Q1"),
            band: String::from("NDVI"),
            aggregation: Aggregation::Mean,
            window_days: 16,
            step_days: 1,
            horizon_days: 60,
            conversion: Conversion::ScaledClamped {
                scale: 0.0001,
                min: -1.0,
                max: 1.0,
            },
            unit: String::new(),
            label_style: LabelStyle::EndDate,
        }
    }

    /// CHIRPS daily rainfall, summed over 30 days. Publication lags a few days.
    pub fn precipitation() -> SourceSpec {
        SourceSpec {
            variable: Variable::Precipitation,
            collection: String::from("UCSB-CHG/CHIRPS/DAILY"),
            band: String::from("precipitation"),
            aggregation: Aggregation::Sum,
            window_days: 30,
            step_days: 1,
            horizon_days: 15,
            conversion: Conversion::Identity,
            unit: String::from("mm"),
            label_style: LabelStyle::Range,
        }
    }

    /// The fixed catalogue, in fusion order.
    pub fn catalogue() -> [SourceSpec; 3] {
        [
            SourceSpec::temperature(),
            SourceSpec::vegetation(),
            SourceSpec::precipitation(),
        ]
    }

    pub fn to_physical(&self, raw: Option<f64>) -> Option<f64> {
        self.conversion.to_physical(raw)
    }

    pub fn label(&self, window: &DateWindow) -> String {
        match self.label_style {
            LabelStyle::EndDate => format_label_date(&window.end),
            LabelStyle::Range => format_label_range(&window.start, &window.end),
        }
    }
}

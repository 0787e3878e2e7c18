use crate::{date_range::DateWindow, source::Variable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw per-point values as returned by an adapter, keyed by point index.
/// `None` is a masked or absent pixel.
pub type RawSamples = BTreeMap<usize, Option<f64>>;

/// The window a backward search settled on, with the raw samples taken from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationWindow {
    pub variable: Variable,
    pub source_id: String,
    pub window: DateWindow,
    /// Days between "now" and the window end
    pub offset_days: u32,
    /// Number of images the adapter counted inside the window
    pub image_count: usize,
    pub label: String,
    pub samples: RawSamples,
}

impl ObservationWindow {
    /// Raw value for a point, `None` when the point was masked or not returned.
    pub fn raw(&self, index: usize) -> Option<f64> {
        self.samples.get(&index).copied().flatten()
    }
}

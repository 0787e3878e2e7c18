//! Multi-source fusion.
//!
//! Runs one backward search per source, converts the sampled raw values to
//! physical units and fills the gaps with the cohort median. Gathering all
//! three series completes before any imputation starts.

use crate::impute::impute_with_median;
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;
use wfr_source::{
    error::{AcquisitionError, AdapterError, Result},
    search::{search, SearchOptions},
    ObservationWindow, SamplePoint, SourceAdapter, SourceSpec, Variable,
};

/// The three physical quantities for one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalReading {
    pub temperature_c: f64,
    /// Vegetation index in `[-1, 1]`
    pub ndvi: f64,
    /// Precipitation accumulated over its window
    pub rain_mm: f64,
}

/// Labels of the windows every record in a run was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowLabels {
    pub temperature: String,
    pub vegetation: String,
    pub precipitation: String,
}

/// Which variables of a record were filled from the cohort median.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImputedFields {
    pub temperature: bool,
    pub vegetation: bool,
    pub precipitation: bool,
}

impl ImputedFields {
    pub fn any(&self) -> bool {
        self.temperature || self.vegetation || self.precipitation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedRecord {
    pub index: usize,
    pub reading: PhysicalReading,
    pub imputed: ImputedFields,
    /// Shared by every record of the run
    pub windows: Arc<WindowLabels>,
}

/// Source catalogue and search knobs for one fusion run.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionPlan {
    pub temperature: SourceSpec,
    pub vegetation: SourceSpec,
    pub precipitation: SourceSpec,
    pub options: SearchOptions,
}

impl Default for FusionPlan {
    fn default() -> Self {
        let [temperature, vegetation, precipitation] = SourceSpec::catalogue();
        FusionPlan {
            temperature,
            vegetation,
            precipitation,
            options: SearchOptions::default(),
        }
    }
}

/// Acquire, convert and impute all three variables for `points`.
///
/// Fails without partial output when the session is not authenticated, when
/// any source is unavailable within its horizon, or when a variable has no
/// valid value at any point.
pub async fn fuse<A: SourceAdapter>(
    adapter: &A,
    points: &[SamplePoint],
    now: NaiveDate,
    plan: &FusionPlan,
) -> Result<Vec<FusedRecord>> {
    if points.is_empty() {
        return Err(AcquisitionError::NoPoints);
    }
    adapter.authenticate().await.map_err(|err| match err {
        AdapterError::Authentication(message) => AcquisitionError::Authentication(message),
        other => AcquisitionError::Authentication(other.to_string()),
    })?;

    // the searches are independent; errors are inspected in catalogue order
    // so the reported failure does not depend on completion order
    let (temperature, vegetation, precipitation) = futures::join!(
        search(adapter, &plan.temperature, points, now, &plan.options),
        search(adapter, &plan.vegetation, points, now, &plan.options),
        search(adapter, &plan.precipitation, points, now, &plan.options),
    );
    let temperature = temperature?;
    let vegetation = vegetation?;
    let precipitation = precipitation?;

    let mut temperature_c = convert(&plan.temperature, &temperature, points);
    let mut ndvi = convert(&plan.vegetation, &vegetation, points);
    let mut rain_mm = convert(&plan.precipitation, &precipitation, points);

    let imputed: Vec<ImputedFields> = (0..points.len())
        .map(|i| ImputedFields {
            temperature: temperature_c[i].is_none(),
            vegetation: ndvi[i].is_none(),
            precipitation: rain_mm[i].is_none(),
        })
        .collect();

    for (variable, values) in [
        (Variable::Temperature, &mut temperature_c),
        (Variable::Vegetation, &mut ndvi),
        (Variable::Precipitation, &mut rain_mm),
    ] {
        let filled = impute_with_median(values, variable)?;
        if filled > 0 {
            info!(
                "{}: {} of {} points filled with the cohort median",
                variable,
                filled,
                points.len()
            );
        }
    }

    let windows = Arc::new(WindowLabels {
        temperature: temperature.label,
        vegetation: vegetation.label,
        precipitation: precipitation.label,
    });

    let records = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            // imputation succeeded for all three variables, every slot is filled
            let reading = PhysicalReading {
                temperature_c: temperature_c[i].unwrap_or_default(),
                ndvi: ndvi[i].unwrap_or_default(),
                rain_mm: rain_mm[i].unwrap_or_default(),
            };
            FusedRecord {
                index: point.index,
                reading,
                imputed: imputed[i],
                windows: Arc::clone(&windows),
            }
        })
        .collect();
    Ok(records)
}

/// Physical values in point order, `None` where the raw sample is invalid.
fn convert(
    spec: &SourceSpec,
    observation: &ObservationWindow,
    points: &[SamplePoint],
) -> Vec<Option<f64>> {
    points
        .iter()
        .map(|point| spec.to_physical(observation.raw(point.index)))
        .collect()
}

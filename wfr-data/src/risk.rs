//! Wildfire risk scoring.
//!
//! Each physical reading is mapped onto `[0, 1]` "danger" components that
//! are blended into a 0-100 probability. The risk level is a threshold on
//! that probability; the drought status is an independent threshold on raw
//! precipitation.

use crate::fusion::{FusedRecord, PhysicalReading};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("invalid scoring policy: {0}")]
    Invalid(String),

    #[error("failed to parse scoring policy: {0}")]
    Parse(String),
}

/// Every constant the score depends on.
///
/// `Default` is the authoritative policy: 40% temperature, 40% rain deficit,
/// 20% vegetation deficit; HIGH above 70, MEDIUM above 50; drought bands at
/// 10/50/100 mm of rain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub weight_temperature: f64,
    pub weight_rain: f64,
    pub weight_vegetation: f64,
    /// Temperature (°C) at which the temperature component starts rising
    pub temperature_floor_c: f64,
    /// Degrees above the floor at which the component saturates
    pub temperature_span_c: f64,
    /// Rainfall (mm over the window) at which the rain deficit reaches zero
    pub rain_saturation_mm: f64,
    pub high_above: f64,
    pub medium_above: f64,
    pub very_dry_below_mm: f64,
    pub dry_below_mm: f64,
    pub normal_below_mm: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weight_temperature: 0.4,
            weight_rain: 0.4,
            weight_vegetation: 0.2,
            temperature_floor_c: 25.0,
            temperature_span_c: 15.0,
            rain_saturation_mm: 300.0,
            high_above: 70.0,
            medium_above: 50.0,
            very_dry_below_mm: 10.0,
            dry_below_mm: 50.0,
            normal_below_mm: 100.0,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let weights = [
            self.weight_temperature,
            self.weight_rain,
            self.weight_vegetation,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PolicyError::Invalid(format!(
                "weights must be finite and non-negative, got {weights:?}"
            )));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(PolicyError::Invalid(format!(
                "weights must sum to 1.0, got {total}"
            )));
        }
        if !self.temperature_floor_c.is_finite() {
            return Err(PolicyError::Invalid(format!(
                "temperature_floor_c must be finite, got {}",
                self.temperature_floor_c
            )));
        }
        if !self.temperature_span_c.is_finite() || self.temperature_span_c <= 0.0 {
            return Err(PolicyError::Invalid(format!(
                "temperature_span_c must be > 0, got {}",
                self.temperature_span_c
            )));
        }
        if !self.rain_saturation_mm.is_finite() || self.rain_saturation_mm <= 0.0 {
            return Err(PolicyError::Invalid(format!(
                "rain_saturation_mm must be > 0, got {}",
                self.rain_saturation_mm
            )));
        }
        if !(0.0..=100.0).contains(&self.medium_above)
            || !(0.0..=100.0).contains(&self.high_above)
            || self.medium_above >= self.high_above
        {
            return Err(PolicyError::Invalid(format!(
                "level thresholds must satisfy 0 <= medium ({}) < high ({}) <= 100",
                self.medium_above, self.high_above
            )));
        }
        if !(self.very_dry_below_mm < self.dry_below_mm
            && self.dry_below_mm < self.normal_below_mm)
        {
            return Err(PolicyError::Invalid(format!(
                "drought thresholds must increase, got {} / {} / {}",
                self.very_dry_below_mm, self.dry_below_mm, self.normal_below_mm
            )));
        }
        Ok(())
    }

    /// Load overrides from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: ScoringPolicy =
            serde_json::from_str(json).map_err(|e| PolicyError::Parse(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bands are evaluated high to low with exclusive lower bounds.
    pub fn classify(probability_pct: f64, policy: &ScoringPolicy) -> RiskLevel {
        if probability_pct > policy.high_above {
            RiskLevel::High
        } else if probability_pct > policy.medium_above {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroughtStatus {
    VeryDry,
    Dry,
    Normal,
    Wet,
    NoData,
}

impl DroughtStatus {
    pub fn classify(rain_mm: Option<f64>, policy: &ScoringPolicy) -> DroughtStatus {
        match rain_mm.filter(|rain| !rain.is_nan()) {
            None => DroughtStatus::NoData,
            Some(rain) if rain < policy.very_dry_below_mm => DroughtStatus::VeryDry,
            Some(rain) if rain < policy.dry_below_mm => DroughtStatus::Dry,
            Some(rain) if rain < policy.normal_below_mm => DroughtStatus::Normal,
            Some(_) => DroughtStatus::Wet,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DroughtStatus::VeryDry => "VERY_DRY",
            DroughtStatus::Dry => "DRY",
            DroughtStatus::Normal => "NORMAL",
            DroughtStatus::Wet => "WET",
            DroughtStatus::NoData => "NO_DATA",
        }
    }
}

impl fmt::Display for DroughtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Normalized danger components, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub heat: f64,
    pub rain_deficit: f64,
    pub vegetation_deficit: f64,
}

impl RiskComponents {
    pub fn from_reading(reading: &PhysicalReading, policy: &ScoringPolicy) -> RiskComponents {
        RiskComponents {
            heat: unit_clamp(
                (reading.temperature_c - policy.temperature_floor_c) / policy.temperature_span_c,
            ),
            rain_deficit: unit_clamp(1.0 - reading.rain_mm / policy.rain_saturation_mm),
            vegetation_deficit: unit_clamp(1.0 - reading.ndvi.clamp(0.0, 1.0)),
        }
    }

    /// Weighted blend as a percentage rounded to one decimal.
    ///
    /// Exact halves round to the even tenth (62.5 -> 62, 187.5 -> 188 before
    /// the final division), matching pandas `round(1)`.
    pub fn probability_pct(&self, policy: &ScoringPolicy) -> f64 {
        let blended = policy.weight_temperature * self.heat
            + policy.weight_rain * self.rain_deficit
            + policy.weight_vegetation * self.vegetation_deficit;
        (blended * 1000.0).round_ties_even() / 10.0
    }
}

fn unit_clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub index: usize,
    pub probability_pct: f64,
    pub level: RiskLevel,
    pub drought: DroughtStatus,
    pub components: RiskComponents,
}

/// Score one physical reading. Pure: no state besides the policy.
pub fn score_reading(index: usize, reading: &PhysicalReading, policy: &ScoringPolicy) -> RiskRecord {
    let components = RiskComponents::from_reading(reading, policy);
    let probability_pct = components.probability_pct(policy);
    RiskRecord {
        index,
        probability_pct,
        level: RiskLevel::classify(probability_pct, policy),
        drought: DroughtStatus::classify(Some(reading.rain_mm), policy),
        components,
    }
}

pub fn score(record: &FusedRecord, policy: &ScoringPolicy) -> RiskRecord {
    score_reading(record.index, &record.reading, policy)
}

/// Score a run, keeping point order.
pub fn score_all(records: &[FusedRecord], policy: &ScoringPolicy) -> Vec<RiskRecord> {
    records.iter().map(|record| score(record, policy)).collect()
}

/// Highest probability first; ties by ascending point index.
pub fn by_priority(a: &RiskRecord, b: &RiskRecord) -> Ordering {
    b.probability_pct
        .total_cmp(&a.probability_pct)
        .then(a.index.cmp(&b.index))
}

pub fn rank(records: &mut [RiskRecord]) {
    records.sort_by(by_priority);
}

/// Headline counts for a scored run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Index and probability of the riskiest point
    pub peak: Option<(usize, f64)>,
}

impl RiskSummary {
    pub fn from_records(records: &[RiskRecord]) -> RiskSummary {
        let mut summary = RiskSummary {
            total: records.len(),
            ..RiskSummary::default()
        };
        for record in records {
            match record.level {
                RiskLevel::High => summary.high += 1,
                RiskLevel::Medium => summary.medium += 1,
                RiskLevel::Low => summary.low += 1,
            }
            let is_peak = match summary.peak {
                None => true,
                Some((index, probability)) => match record.probability_pct.total_cmp(&probability) {
                    Ordering::Greater => true,
                    Ordering::Equal => record.index < index,
                    Ordering::Less => false,
                },
            };
            if is_peak {
                summary.peak = Some((record.index, record.probability_pct));
            }
        }
        summary
    }
}

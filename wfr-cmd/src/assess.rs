//! Acquire, fuse and score observations for a set of sites.

use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use log::info;
use serde::Serialize;
use std::io::Write;
use wfr_data::{RiskAssessment, RiskSession, ScoringPolicy};
use wfr_source::{
    api::{HttpAdapter, HttpAdapterConfig},
    fixture::FixtureAdapter,
    SourceAdapter, Site,
};
use wfr_utils::dates::parse_date;

/// One line of the assessment CSV.
#[derive(Debug, Serialize)]
struct AssessmentRow<'a> {
    index: usize,
    name: &'a str,
    region: &'a str,
    latitude: f64,
    longitude: f64,
    temperature_c: String,
    ndvi: String,
    rain_mm: String,
    probability_pct: String,
    level: &'static str,
    drought: &'static str,
    imputed: bool,
    temperature_window: &'a str,
    vegetation_window: &'a str,
    precipitation_window: &'a str,
}

/// Run a full assessment and write it, riskiest site first.
///
/// Observations come from `fixture` when given, otherwise from the sampling
/// service configured through `WFR_API_URL` and `WFR_API_TOKEN`.
pub async fn run_assess(
    points_csv: &str,
    output_csv: &str,
    fixture: Option<&str>,
    as_of: Option<&str>,
    policy: ScoringPolicy,
) -> anyhow::Result<()> {
    let sites_data = std::fs::read_to_string(points_csv)
        .with_context(|| format!("Failed to read sites CSV {}", points_csv))?;
    let sites = Site::parse_sites_csv(&sites_data)?;
    let now = match as_of {
        Some(date) => parse_date(date)?,
        None => Local::now().naive_local().date(),
    };

    info!(
        "Assessing {} sites as of {} ({})",
        sites.len(),
        now,
        fixture.unwrap_or("sampling service")
    );

    let assessment = match fixture {
        Some(path) => {
            let fixture_data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read fixture CSV {}", path))?;
            let adapter = FixtureAdapter::parse_fixture_csv(&fixture_data)?;
            assess(adapter, &sites, now, policy).await?
        }
        None => {
            let config = HttpAdapterConfig::from_env()?;
            let adapter = HttpAdapter::new(config)?;
            assess(adapter, &sites, now, policy).await?
        }
    };

    let file = std::fs::File::create(output_csv)
        .with_context(|| format!("Failed to create {}", output_csv))?;
    write_assessment(file, &sites, &assessment)?;

    match assessment.summary.peak {
        Some((index, probability)) => info!(
            "Assessment complete. Output: {} (peak {:.1}% at {})",
            output_csv,
            probability,
            sites.get(index).map_or("?", |site| site.name.as_str())
        ),
        None => info!("Assessment complete. Output: {}", output_csv),
    }
    Ok(())
}

/// Score every site through a fresh session over `adapter`.
pub async fn assess<A: SourceAdapter>(
    adapter: A,
    sites: &[Site],
    now: NaiveDate,
    policy: ScoringPolicy,
) -> anyhow::Result<RiskAssessment> {
    let mut session = RiskSession::new(adapter, Site::points(sites), policy)?;
    let assessment = session.refresh(now).await?;
    Ok(assessment.clone())
}

/// Write `assessment` as CSV, highest probability first.
pub fn write_assessment<W: Write>(
    writer: W,
    sites: &[Site],
    assessment: &RiskAssessment,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (fused, risk) in assessment.ranked() {
        let site = sites
            .get(fused.index)
            .ok_or_else(|| anyhow!("No site for point index {}", fused.index))?;
        wtr.serialize(AssessmentRow {
            index: fused.index,
            name: &site.name,
            region: &site.region,
            latitude: site.point.latitude,
            longitude: site.point.longitude,
            temperature_c: format!("{:.2}", fused.reading.temperature_c),
            ndvi: format!("{:.4}", fused.reading.ndvi),
            rain_mm: format!("{:.1}", fused.reading.rain_mm),
            probability_pct: format!("{:.1}", risk.probability_pct),
            level: risk.level.code(),
            drought: risk.drought.code(),
            imputed: fused.imputed.any(),
            temperature_window: &fused.windows.temperature,
            vegetation_window: &fused.windows.vegetation,
            precipitation_window: &fused.windows.precipitation,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

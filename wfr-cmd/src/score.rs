//! Offline scoring of readings that are already in physical units.

use anyhow::{bail, Context};
use log::info;
use serde::{Deserialize, Serialize};
use std::io::Write;
use wfr_data::{
    risk::{rank, score_reading},
    PhysicalReading, RiskRecord, ScoringPolicy,
};

#[derive(Debug, Deserialize)]
struct ReadingRow {
    index: usize,
    temperature_c: f64,
    ndvi: f64,
    rain_mm: f64,
}

#[derive(Debug, Serialize)]
struct ScoreRow {
    index: usize,
    probability_pct: String,
    level: &'static str,
    drought: &'static str,
    heat: String,
    rain_deficit: String,
    vegetation_deficit: String,
}

pub fn run_score(input_csv: &str, output_csv: &str, policy: &ScoringPolicy) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(input_csv)
        .with_context(|| format!("Failed to read readings CSV {}", input_csv))?;
    let records = score_csv(&data, policy)?;
    let file = std::fs::File::create(output_csv)
        .with_context(|| format!("Failed to create {}", output_csv))?;
    write_scores(file, &records)?;
    info!("Scored {} readings. Output: {}", records.len(), output_csv);
    Ok(())
}

/// Score every row of a `index,temperature_c,ndvi,rain_mm` CSV, riskiest first.
///
/// Rows carrying NaN or infinite values are rejected.
pub fn score_csv(csv_object: &str, policy: &ScoringPolicy) -> anyhow::Result<Vec<RiskRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_object.as_bytes());
    let mut records = Vec::new();
    for (line, row) in rdr.deserialize::<ReadingRow>().enumerate() {
        let row = row.with_context(|| format!("Bad reading on row {}", line + 1))?;
        if ![row.temperature_c, row.ndvi, row.rain_mm]
            .iter()
            .all(|value| value.is_finite())
        {
            bail!("Non-finite reading on row {} (index {})", line + 1, row.index);
        }
        let reading = PhysicalReading {
            temperature_c: row.temperature_c,
            ndvi: row.ndvi,
            rain_mm: row.rain_mm,
        };
        records.push(score_reading(row.index, &reading, policy));
    }
    rank(&mut records);
    Ok(records)
}

pub fn write_scores<W: Write>(writer: W, records: &[RiskRecord]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(ScoreRow {
            index: record.index,
            probability_pct: format!("{:.1}", record.probability_pct),
            level: record.level.code(),
            drought: record.drought.code(),
            heat: format!("{:.3}", record.components.heat),
            rain_deficit: format!("{:.3}", record.components.rain_deficit),
            vegetation_deficit: format!("{:.3}", record.components.vegetation_deficit),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

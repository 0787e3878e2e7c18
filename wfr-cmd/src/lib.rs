//! Command implementations for WFR CLI.
//!
//! Provides subcommands for acquiring observations at a set of sites and
//! scoring them, plus an offline scorer for readings that are already in
//! physical units.

use anyhow::Context;
use clap::Subcommand;
use wfr_data::ScoringPolicy;

pub mod assess;
pub mod score;

#[derive(Subcommand)]
pub enum Command {
    /// Acquire temperature, vegetation and rainfall for every site and write ranked risk scores
    Assess {
        /// Sites CSV with columns name,region,latitude,longitude
        #[arg(short = 'p', long)]
        points: String,

        /// Output path for the ranked assessment CSV
        #[arg(short = 'o', long)]
        output: String,

        /// Read observations from a fixture CSV instead of the sampling service
        #[arg(long)]
        fixture: Option<String>,

        /// Search backward from this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        as_of: Option<String>,

        /// JSON file overriding scoring weights and thresholds
        #[arg(long)]
        policy: Option<String>,
    },

    /// Score readings already in physical units
    Score {
        /// CSV with columns index,temperature_c,ndvi,rain_mm
        #[arg(short = 'i', long)]
        input: String,

        /// Output path for the ranked scores CSV
        #[arg(short = 'o', long)]
        output: String,

        /// JSON file overriding scoring weights and thresholds
        #[arg(long)]
        policy: Option<String>,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Assess {
            points,
            output,
            fixture,
            as_of,
            policy,
        } => {
            let policy = load_policy(policy.as_deref())?;
            assess::run_assess(&points, &output, fixture.as_deref(), as_of.as_deref(), policy)
                .await
        }
        Command::Score {
            input,
            output,
            policy,
        } => {
            let policy = load_policy(policy.as_deref())?;
            score::run_score(&input, &output, &policy)
        }
    }
}

/// The default policy, or the one stored at `path`.
pub fn load_policy(path: Option<&str>) -> anyhow::Result<ScoringPolicy> {
    let Some(path) = path else {
        return Ok(ScoringPolicy::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file {}", path))?;
    let policy = ScoringPolicy::from_json(&json)
        .with_context(|| format!("Invalid scoring policy in {}", path))?;
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_without_path() {
        assert_eq!(load_policy(None).unwrap(), ScoringPolicy::default());
    }

    #[test]
    fn test_policy_file_overrides_thresholds() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/policy_strict.json");
        let policy = load_policy(Some(path)).unwrap();
        assert_eq!(policy.high_above, 60.0);
        assert_eq!(policy.medium_above, 40.0);
        assert_eq!(policy.weight_temperature, 0.4);
    }

    #[test]
    fn test_missing_policy_file() {
        let err = load_policy(Some("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}

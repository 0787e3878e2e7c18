use crate::{
    fusion::{fuse, FusedRecord, FusionPlan, WindowLabels},
    risk::{by_priority, score_all, PolicyError, RiskRecord, RiskSummary, ScoringPolicy},
};
use chrono::NaiveDate;
use log::{info, warn};
use wfr_source::{error::AcquisitionError, SamplePoint, SourceAdapter};

/// Result of one acquisition run. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub as_of: NaiveDate,
    /// Fused readings, in point order
    pub fused: Vec<FusedRecord>,
    /// Scores, in point order
    pub risks: Vec<RiskRecord>,
    pub summary: RiskSummary,
}

impl RiskAssessment {
    pub fn build(as_of: NaiveDate, fused: Vec<FusedRecord>, policy: &ScoringPolicy) -> Self {
        let risks = score_all(&fused, policy);
        let summary = RiskSummary::from_records(&risks);
        RiskAssessment {
            as_of,
            fused,
            risks,
            summary,
        }
    }

    pub fn labels(&self) -> Option<&WindowLabels> {
        self.fused.first().map(|record| record.windows.as_ref())
    }

    /// Pairs of fused reading and score, riskiest first.
    pub fn ranked(&self) -> Vec<(&FusedRecord, &RiskRecord)> {
        let mut order: Vec<usize> = (0..self.risks.len()).collect();
        order.sort_by(|&a, &b| by_priority(&self.risks[a], &self.risks[b]));
        order
            .into_iter()
            .map(|position| (&self.fused[position], &self.risks[position]))
            .collect()
    }
}

/// Caller-owned handle over an adapter and a point set.
///
/// Nothing is cached between refreshes: each call to [`RiskSession::refresh`]
/// acquires every source again and replaces the held assessment.
pub struct RiskSession<A> {
    adapter: A,
    points: Vec<SamplePoint>,
    policy: ScoringPolicy,
    plan: FusionPlan,
    latest: Option<RiskAssessment>,
}

impl<A: SourceAdapter> RiskSession<A> {
    pub fn new(
        adapter: A,
        points: Vec<SamplePoint>,
        policy: ScoringPolicy,
    ) -> Result<Self, PolicyError> {
        Self::with_plan(adapter, points, policy, FusionPlan::default())
    }

    pub fn with_plan(
        adapter: A,
        points: Vec<SamplePoint>,
        policy: ScoringPolicy,
        plan: FusionPlan,
    ) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(RiskSession {
            adapter,
            points,
            policy,
            plan,
            latest: None,
        })
    }

    /// Run a full acquisition as of `now`.
    ///
    /// On failure the previous assessment is dropped as well, so a caller
    /// never mistakes an old cycle for the current one.
    pub async fn refresh(&mut self, now: NaiveDate) -> Result<&RiskAssessment, AcquisitionError> {
        self.latest = None;
        let fused = match fuse(&self.adapter, &self.points, now, &self.plan).await {
            Ok(fused) => fused,
            Err(err) => {
                warn!("cannot compute risk for {}: {}", now, err);
                return Err(err);
            }
        };
        let assessment = RiskAssessment::build(now, fused, &self.policy);
        info!(
            "{} points scored: {} high, {} medium, {} low",
            assessment.summary.total,
            assessment.summary.high,
            assessment.summary.medium,
            assessment.summary.low
        );
        Ok(self.latest.insert(assessment))
    }

    pub fn latest(&self) -> Option<&RiskAssessment> {
        self.latest.as_ref()
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{DroughtStatus, RiskLevel};
    use wfr_source::fixture::FixtureAdapter;

    // point 0: 32 °C, NDVI 0.3, 40 mm; point 1: masked temperature; point 2: hot and dry
    const FIXTURE: &str = "\
collection,band,date,index,value
MODIS/061/MOD11A1,LST_Day_1km,2024-09-17,0,15257.5
MODIS/061/MOD11A1,LST_Day_1km,2024-09-17,1,-9999
MODIS/061/MOD11A1,LST_Day_1km,2024-09-17,2,15650
MODIS/061/MOD13Q1,NDVI,2024-09-01,0,3000
MODIS/061/MOD13Q1,NDVI,2024-09-01,1,7000
MODIS/061/MOD13Q1,NDVI,2024-09-01,2,1000
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-01,0,25
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-01,1,120
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-01,2,1
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-08,0,15
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-08,1,80
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-08,2,2
";

    fn points() -> Vec<SamplePoint> {
        (0..3)
            .map(|index| SamplePoint {
                index,
                latitude: 0.5,
                longitude: 101.5,
            })
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 20).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_scores_every_point() {
        let adapter = FixtureAdapter::parse_fixture_csv(FIXTURE).unwrap();
        let mut session = RiskSession::new(adapter, points(), ScoringPolicy::default()).unwrap();
        assert!(session.latest().is_none());

        let assessment = session.refresh(today()).await.unwrap();
        assert_eq!(assessment.risks.len(), 3);

        let first = &assessment.risks[0];
        assert_eq!(first.probability_pct, 67.3);
        assert_eq!(first.level, RiskLevel::Medium);
        assert_eq!(first.drought, DroughtStatus::Dry);

        // masked temperature filled with the median of 32.0 and 39.85
        assert!(assessment.fused[1].imputed.temperature);
        assert!((assessment.fused[1].reading.temperature_c - 35.925).abs() < 1e-9);
        assert_eq!(assessment.risks[1].drought, DroughtStatus::Wet);

        assert_eq!(assessment.risks[2].level, RiskLevel::High);
        assert_eq!(assessment.risks[2].drought, DroughtStatus::VeryDry);
        assert_eq!(assessment.summary.peak.map(|(index, _)| index), Some(2));

        let ranked: Vec<usize> = assessment.ranked().iter().map(|(f, _)| f.index).collect();
        assert_eq!(ranked[0], 2);
        assert_eq!(
            assessment.labels().map(|l| l.temperature.as_str()),
            Some("20-September-2024")
        );
    }

    #[tokio::test]
    async fn test_refresh_is_deterministic() {
        let adapter = FixtureAdapter::parse_fixture_csv(FIXTURE).unwrap();
        let mut session = RiskSession::new(adapter, points(), ScoringPolicy::default()).unwrap();
        let first = session.refresh(today()).await.unwrap().clone();
        let second = session.refresh(today()).await.unwrap().clone();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_previous_assessment() {
        let adapter = FixtureAdapter::parse_fixture_csv(FIXTURE).unwrap();
        let mut session = RiskSession::new(adapter, points(), ScoringPolicy::default()).unwrap();
        session.refresh(today()).await.unwrap();
        assert!(session.latest().is_some());

        // two months later the fixture holds nothing within any horizon
        let later = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let result = session.refresh(later).await;
        assert!(matches!(
            result,
            Err(AcquisitionError::SourceUnavailable { .. })
        ));
        assert!(session.latest().is_none());
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let adapter = FixtureAdapter::default();
        let policy = ScoringPolicy {
            weight_temperature: 0.9,
            ..ScoringPolicy::default()
        };
        assert!(RiskSession::new(adapter, points(), policy).is_err());
    }
}

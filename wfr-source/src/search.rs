//! Bounded backward window search.
//!
//! Publication latency differs per product and is not known up front, so
//! the search slides a fixed-length window back from "now" one step at a
//! time and settles on the first window that holds at least one image.
//! It never keeps looking for a better window once one is found.

use crate::{
    adapter::{SampleRequest, SourceAdapter},
    date_range::{BackwardOffsets, DateWindow},
    error::{AcquisitionError, AdapterError, Result},
    observation::{ObservationWindow, RawSamples},
    point::SamplePoint,
    source::SourceSpec,
};
use chrono::{Days, NaiveDate};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::timeout;

/// Default deadline for one search iteration (count + query).
pub const DEFAULT_ITERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs shared by every search in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub iteration_timeout: Duration,
    /// Sampling resolution in metres
    pub scale_m: u32,
    pub tile_scale: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            iteration_timeout: DEFAULT_ITERATION_TIMEOUT,
            scale_m: 1000,
            tile_scale: 4,
        }
    }
}

/// Find the most recent window of `spec` that holds data and sample it.
///
/// Transient adapter failures and timeouts count as "no data at this
/// offset". An authentication failure aborts immediately. Exhausting the
/// horizon yields [`AcquisitionError::SourceUnavailable`].
pub async fn search<A: SourceAdapter>(
    adapter: &A,
    spec: &SourceSpec,
    points: &[SamplePoint],
    now: NaiveDate,
    options: &SearchOptions,
) -> Result<ObservationWindow> {
    for offset in BackwardOffsets::new(spec.step_days, spec.horizon_days) {
        let Some(window) = now
            .checked_sub_days(Days::new(u64::from(offset)))
            .and_then(|end| DateWindow::ending_at(end, spec.window_days))
        else {
            break;
        };

        let probe = timeout(
            options.iteration_timeout,
            probe_window(adapter, spec, &window, points, options),
        )
        .await
        .unwrap_or(Err(AdapterError::Timeout {
            seconds: options.iteration_timeout.as_secs(),
        }));

        match probe {
            Ok(Some((image_count, samples))) => {
                let label = spec.label(&window);
                info!(
                    "{}: {} images between {} and {} (offset {} days)",
                    spec.variable, image_count, window.start, window.end, offset
                );
                return Ok(ObservationWindow {
                    variable: spec.variable,
                    source_id: spec.collection.clone(),
                    window,
                    offset_days: offset,
                    image_count,
                    label,
                    samples,
                });
            }
            Ok(None) => {
                debug!(
                    "{}: no images between {} and {}",
                    spec.variable, window.start, window.end
                );
            }
            Err(AdapterError::Authentication(message)) => {
                return Err(AcquisitionError::Authentication(message));
            }
            Err(err) => {
                warn!(
                    "{}: offset {} days skipped: {}",
                    spec.variable, offset, err
                );
            }
        }
    }

    Err(AcquisitionError::SourceUnavailable {
        source_id: spec.collection.clone(),
        horizon_days: spec.horizon_days,
    })
}

/// One iteration: count images, and only when there are some, sample them.
async fn probe_window<A: SourceAdapter>(
    adapter: &A,
    spec: &SourceSpec,
    window: &DateWindow,
    points: &[SamplePoint],
    options: &SearchOptions,
) -> std::result::Result<Option<(usize, RawSamples)>, AdapterError> {
    let image_count = adapter
        .count(&spec.collection, &spec.band, window)
        .await?;
    if image_count == 0 {
        return Ok(None);
    }
    let request = SampleRequest {
        collection: &spec.collection,
        band: &spec.band,
        window: *window,
        aggregation: spec.aggregation,
        scale_m: options.scale_m,
        tile_scale: options.tile_scale,
    };
    let samples = adapter.query(&request, points).await?;
    Ok(Some((image_count, samples)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Variable;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 20).unwrap()
    }

    fn points() -> Vec<SamplePoint> {
        vec![
            SamplePoint {
                index: 0,
                latitude: 0.45,
                longitude: 101.33,
            },
            SamplePoint {
                index: 1,
                latitude: 0.39,
                longitude: 101.85,
            },
        ]
    }

    /// Data shows up once the window ends at least `latency` days before now.
    struct LaggedAdapter {
        latency: u32,
        failing_offsets: HashSet<u32>,
        visited: Mutex<Vec<u32>>,
    }

    impl LaggedAdapter {
        fn new(latency: u32) -> Self {
            LaggedAdapter {
                latency,
                failing_offsets: HashSet::new(),
                visited: Mutex::new(Vec::new()),
            }
        }

        fn offset_of(window: &DateWindow) -> u32 {
            (today() - window.end).num_days() as u32
        }
    }

    impl SourceAdapter for LaggedAdapter {
        async fn authenticate(&self) -> std::result::Result<(), AdapterError> {
            Ok(())
        }

        async fn count(
            &self,
            _collection: &str,
            _band: &str,
            window: &DateWindow,
        ) -> std::result::Result<usize, AdapterError> {
            let offset = Self::offset_of(window);
            self.visited.lock().unwrap().push(offset);
            if self.failing_offsets.contains(&offset) {
                return Err(AdapterError::Transient("connection reset".into()));
            }
            Ok(if offset >= self.latency { 3 } else { 0 })
        }

        async fn query(
            &self,
            request: &SampleRequest<'_>,
            points: &[SamplePoint],
        ) -> std::result::Result<RawSamples, AdapterError> {
            let offset = Self::offset_of(&request.window) as f64;
            Ok(points
                .iter()
                .map(|point| (point.index, Some(15000.0 + offset)))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_first_hit_wins() {
        let adapter = LaggedAdapter::new(4);
        let spec = SourceSpec::temperature();
        let found = search(&adapter, &spec, &points(), today(), &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(found.offset_days, 4);
        assert_eq!(found.window.end, NaiveDate::from_ymd_opt(2024, 9, 16).unwrap());
        assert_eq!(found.window.start, NaiveDate::from_ymd_opt(2024, 9, 8).unwrap());
        assert_eq!(found.variable, Variable::Temperature);
        assert_eq!(found.image_count, 3);
        assert_eq!(found.raw(1), Some(15004.0));
        assert_eq!(found.label, "16-September-2024");
        assert_eq!(*adapter.visited.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_data_at_offset_zero() {
        let adapter = LaggedAdapter::new(0);
        let spec = SourceSpec::vegetation();
        let found = search(&adapter, &spec, &points(), today(), &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(found.offset_days, 0);
        assert_eq!(found.window.len_days(), 16);
    }

    #[tokio::test]
    async fn test_horizon_exhaustion() {
        let adapter = LaggedAdapter::new(u32::MAX);
        let spec = SourceSpec::precipitation();
        let result = search(&adapter, &spec, &points(), today(), &SearchOptions::default()).await;
        assert_eq!(
            result,
            Err(AcquisitionError::SourceUnavailable {
                source_id: String::from("UCSB-CHG/CHIRPS/DAILY"),
                horizon_days: 15,
            })
        );
        // offsets 0..=15 inclusive
        assert_eq!(adapter.visited.lock().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_data_exactly_at_horizon_is_found() {
        let adapter = LaggedAdapter::new(15);
        let spec = SourceSpec::precipitation();
        let found = search(&adapter, &spec, &points(), today(), &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(found.offset_days, 15);
        assert_eq!(found.label, "06-Aug-2024 to 05-Sep-2024");
    }

    #[tokio::test]
    async fn test_transient_errors_move_to_next_offset() {
        let mut adapter = LaggedAdapter::new(1);
        adapter.failing_offsets.insert(1);
        adapter.failing_offsets.insert(2);
        let spec = SourceSpec::temperature();
        let found = search(&adapter, &spec, &points(), today(), &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(found.offset_days, 3);
        // each offset is tried exactly once
        assert_eq!(*adapter.visited.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    struct RejectingAdapter {
        calls: Mutex<u32>,
    }

    impl SourceAdapter for RejectingAdapter {
        async fn authenticate(&self) -> std::result::Result<(), AdapterError> {
            Err(AdapterError::Authentication("session expired".into()))
        }

        async fn count(
            &self,
            _collection: &str,
            _band: &str,
            _window: &DateWindow,
        ) -> std::result::Result<usize, AdapterError> {
            *self.calls.lock().unwrap() += 1;
            Err(AdapterError::Authentication("session expired".into()))
        }

        async fn query(
            &self,
            _request: &SampleRequest<'_>,
            _points: &[SamplePoint],
        ) -> std::result::Result<RawSamples, AdapterError> {
            Err(AdapterError::Authentication("session expired".into()))
        }
    }

    #[tokio::test]
    async fn test_authentication_failure_aborts() {
        let adapter = RejectingAdapter {
            calls: Mutex::new(0),
        };
        let spec = SourceSpec::temperature();
        let result = search(&adapter, &spec, &points(), today(), &SearchOptions::default()).await;
        assert_eq!(
            result,
            Err(AcquisitionError::Authentication("session expired".into()))
        );
        assert_eq!(*adapter.calls.lock().unwrap(), 1);
    }

    /// Hangs on the most recent window only.
    struct SlowAdapter;

    impl SourceAdapter for SlowAdapter {
        async fn authenticate(&self) -> std::result::Result<(), AdapterError> {
            Ok(())
        }

        async fn count(
            &self,
            _collection: &str,
            _band: &str,
            window: &DateWindow,
        ) -> std::result::Result<usize, AdapterError> {
            if window.end == today() {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(1)
        }

        async fn query(
            &self,
            _request: &SampleRequest<'_>,
            points: &[SamplePoint],
        ) -> std::result::Result<RawSamples, AdapterError> {
            Ok(points.iter().map(|point| (point.index, Some(40.0))).collect())
        }
    }

    #[tokio::test]
    async fn test_timed_out_iteration_is_a_miss() {
        let options = SearchOptions {
            iteration_timeout: Duration::from_millis(50),
            ..SearchOptions::default()
        };
        let spec = SourceSpec::precipitation();
        let found = search(&SlowAdapter, &spec, &points(), today(), &options)
            .await
            .unwrap();
        assert_eq!(found.offset_days, 1);
    }
}

//! Offline adapter replaying a table of daily per-point observations.
//!
//! Table columns: `collection,band,date,index,value`. A row with an empty
//! value means the image exists but the pixel is masked (cloud, fill).

use crate::{
    adapter::{SampleRequest, SourceAdapter},
    date_range::DateWindow,
    error::{AcquisitionError, AdapterError, Result},
    observation::RawSamples,
    point::SamplePoint,
};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct FixtureRow {
    collection: String,
    band: String,
    date: NaiveDate,
    index: usize,
    value: Option<f64>,
}

/// Images of one collection/band: date -> (point index -> raw value).
type ImageStack = BTreeMap<NaiveDate, BTreeMap<usize, Option<f64>>>;

#[derive(Debug, Clone, Default)]
pub struct FixtureAdapter {
    stacks: BTreeMap<(String, String), ImageStack>,
}

impl FixtureAdapter {
    pub fn parse_fixture_csv(csv_object: &str) -> Result<FixtureAdapter> {
        let mut adapter = FixtureAdapter::default();
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_object.as_bytes());
        for row in rdr.deserialize::<FixtureRow>() {
            let row = row.map_err(|e| AcquisitionError::Fixture(e.to_string()))?;
            adapter
                .stacks
                .entry((row.collection, row.band))
                .or_default()
                .entry(row.date)
                .or_default()
                .insert(row.index, row.value);
        }
        Ok(adapter)
    }

    fn images_in<'a>(
        &'a self,
        collection: &str,
        band: &str,
        window: &'a DateWindow,
    ) -> impl Iterator<Item = &'a BTreeMap<usize, Option<f64>>> + 'a {
        self.stacks
            .get(&(collection.to_string(), band.to_string()))
            .into_iter()
            .flat_map(move |stack| stack.range(window.start..window.end).map(|(_, image)| image))
    }
}

impl SourceAdapter for FixtureAdapter {
    async fn authenticate(&self) -> std::result::Result<(), AdapterError> {
        Ok(())
    }

    async fn count(
        &self,
        collection: &str,
        band: &str,
        window: &DateWindow,
    ) -> std::result::Result<usize, AdapterError> {
        let dates: HashSet<NaiveDate> = match self
            .stacks
            .get(&(collection.to_string(), band.to_string()))
        {
            Some(stack) => stack.keys().copied().collect(),
            None => return Ok(0),
        };
        Ok(window.days().filter(|day| dates.contains(day)).count())
    }

    async fn query(
        &self,
        request: &SampleRequest<'_>,
        points: &[SamplePoint],
    ) -> std::result::Result<RawSamples, AdapterError> {
        let images: Vec<&BTreeMap<usize, Option<f64>>> = self
            .images_in(request.collection, request.band, &request.window)
            .collect();
        Ok(points
            .iter()
            .map(|point| {
                let values: Vec<f64> = images
                    .iter()
                    .filter_map(|image| image.get(&point.index).copied().flatten())
                    .collect();
                (point.index, request.aggregation.reduce(&values))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Aggregation;

    const FIXTURE: &str = "\
collection,band,date,index,value
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-10,0,4.5
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-10,1,
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-11,0,1.5
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-11,1,
UCSB-CHG/CHIRPS/DAILY,precipitation,2024-09-12,0,2.0
MODIS/061/MOD13Q1,NDVI,2024-09-05,0,6000
MODIS/061/MOD13Q1,NDVI,2024-09-05,1,4000
";

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    fn points() -> Vec<SamplePoint> {
        (0..3)
            .map(|index| SamplePoint {
                index,
                latitude: 0.5,
                longitude: 101.5,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_count_is_half_open() {
        let adapter = FixtureAdapter::parse_fixture_csv(FIXTURE).unwrap();
        let window = DateWindow {
            start: date(10),
            end: date(12),
        };
        let count = adapter
            .count("UCSB-CHG/CHIRPS/DAILY", "precipitation", &window)
            .await
            .unwrap();
        assert_eq!(count, 2);
        let count = adapter
            .count("MODIS/061/MOD11A1", "LST_Day_1km", &window)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_query_sums_present_values() {
        let adapter = FixtureAdapter::parse_fixture_csv(FIXTURE).unwrap();
        let request = SampleRequest {
            collection: "UCSB-CHG/CHIRPS/DAILY",
            band: "precipitation",
            window: DateWindow {
                start: date(1),
                end: date(20),
            },
            aggregation: Aggregation::Sum,
            scale_m: 1000,
            tile_scale: 4,
        };
        let samples = adapter.query(&request, &points()).await.unwrap();
        assert_eq!(samples.get(&0), Some(&Some(8.0)));
        // masked in every image
        assert_eq!(samples.get(&1), Some(&None));
        // never observed
        assert_eq!(samples.get(&2), Some(&None));
    }

    #[test]
    fn test_rejects_bad_rows() {
        let bad = "collection,band,date,index,value\nX,Y,not-a-date,0,1\n";
        assert!(matches!(
            FixtureAdapter::parse_fixture_csv(bad),
            Err(AcquisitionError::Fixture(_))
        ));
    }
}

use crate::error::{AcquisitionError, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

/// A geographic location sampled by every source in a run.
///
/// `index` is assigned by the point provider and is the join key for every
/// downstream record.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct SamplePoint {
    pub index: usize,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// A sample point together with the administrative names it was loaded with.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Site {
    pub point: SamplePoint,
    /// Village (or other unit) name
    pub name: String,
    /// Regency / district the unit belongs to
    pub region: String,
}

impl Site {
    /// Parse a CSV string of sites into a vector of Sites.
    ///
    /// Expected CSV columns: name, region, latitude, longitude.
    /// Indices follow row order starting at zero.
    pub fn parse_sites_csv(csv_object: &str) -> Result<Vec<Site>> {
        let mut site_list: Vec<Site> = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .from_reader(csv_object.as_bytes());
        for (index, row) in rdr.records().enumerate() {
            let record = row.map_err(|e| AcquisitionError::PointParse(e.to_string()))?;
            let field = |position: usize, name: &str| -> Result<String> {
                record
                    .get(position)
                    .map(|value| value.trim().to_string())
                    .ok_or_else(|| {
                        AcquisitionError::PointParse(format!("row {index}: missing {name}"))
                    })
            };
            let name = field(0, "name")?;
            let region = field(1, "region")?;
            let latitude = parse_coordinate(&field(2, "latitude")?, 90.0, index)?;
            let longitude = parse_coordinate(&field(3, "longitude")?, 180.0, index)?;
            site_list.push(Site {
                point: SamplePoint {
                    index,
                    latitude,
                    longitude,
                },
                name,
                region,
            });
        }
        Ok(site_list)
    }

    pub fn points(sites: &[Site]) -> Vec<SamplePoint> {
        sites.iter().map(|site| site.point).collect()
    }
}

fn parse_coordinate(value: &str, limit: f64, index: usize) -> Result<f64> {
    let parsed = value
        .parse::<f64>()
        .map_err(|e| AcquisitionError::PointParse(format!("row {index}: {value:?}: {e}")))?;
    if !parsed.is_finite() || parsed.abs() > limit {
        return Err(AcquisitionError::PointParse(format!(
            "row {index}: coordinate {parsed} outside ±{limit}"
        )));
    }
    Ok(parsed)
}

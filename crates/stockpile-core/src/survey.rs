//! Survey snapshot payload

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::grid::{GridError, PointGrid};
use crate::point::{retain_finite, Point};

/// One survey snapshot as produced by the scanning pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyPayload {
    /// Samples used to build the surface mesh
    #[serde(default)]
    pub surface_points: Vec<RawSample>,
    /// Two-level column document (`{"<x>": {"<y>": [point, ...]}}`)
    #[serde(default)]
    pub array: Value,
    #[serde(default, deserialize_with = "lenient_number")]
    pub avg_disappeared_quality: Option<f64>,
}

/// A sample as it arrives on the wire; numeric fields may be missing or junk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(default, deserialize_with = "lenient_number")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub z: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub quality: Option<f64>,
}

impl RawSample {
    /// Convert into a point if every coordinate is present
    pub fn to_point(&self) -> Option<Point> {
        Some(Point {
            x: self.x?,
            y: self.y?,
            z: self.z?,
            color: self.color.clone(),
            quality: self.quality,
        })
    }
}

impl From<Point> for RawSample {
    fn from(p: Point) -> Self {
        Self {
            x: Some(p.x),
            y: Some(p.y),
            z: Some(p.z),
            color: p.color,
            quality: p.quality,
        }
    }
}

impl SurveyPayload {
    /// Surface samples with finite coordinates, plus the number dropped
    pub fn surface_samples(&self) -> (Vec<Point>, usize) {
        let present: Vec<Point> = self.surface_points.iter().filter_map(RawSample::to_point).collect();
        let missing = self.surface_points.len() - present.len();
        let (kept, non_finite) = retain_finite(present);
        (kept, missing + non_finite)
    }

    /// Build the column grid; a payload without a column document yields an empty grid
    pub fn grid(&self) -> Result<PointGrid, GridError> {
        if self.array.is_null() {
            return Ok(PointGrid::new());
        }
        PointGrid::build(&self.array)
    }

    pub fn avg_disappeared_quality(&self) -> Option<f64> {
        self.avg_disappeared_quality.filter(|q| q.is_finite())
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

//! Scanned sample points

use serde::{Deserialize, Serialize};

/// A single scanned sample: horizontal position, elevation and quality tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Hex color encoding the quality bucket (e.g. `#FFE066`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Raw quality score, when the producer reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            color: None,
            quality: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// True when all three coordinates are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Drop samples with non-finite coordinates, returning the survivors and
/// how many were discarded.
pub fn retain_finite(points: impl IntoIterator<Item = Point>) -> (Vec<Point>, usize) {
    let mut dropped = 0;
    let kept = points
        .into_iter()
        .filter(|p| {
            let keep = p.is_finite();
            if !keep {
                dropped += 1;
            }
            keep
        })
        .collect();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_finite_counts_dropped() {
        let points = vec![
            Point::new(0.0, 0.0, 1.0),
            Point::new(f64::NAN, 0.0, 1.0),
            Point::new(1.0, f64::INFINITY, 1.0),
            Point::new(2.0, 0.0, 3.0).with_color("#FFE066"),
        ];

        let (kept, dropped) = retain_finite(points);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 2);
        assert_eq!(kept[1].color.as_deref(), Some("#FFE066"));
    }

    #[test]
    fn test_point_json_omits_missing_tags() {
        let json = serde_json::to_string(&Point::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y":2.0,"z":3.0}"#);

        let parsed: Point =
            serde_json::from_str(r##"{"x":1,"y":2,"z":3,"color":"#a059e0","quality":41.5}"##)
                .unwrap();
        assert_eq!(parsed.quality, Some(41.5));
        assert_eq!(parsed.color.as_deref(), Some("#a059e0"));
    }
}

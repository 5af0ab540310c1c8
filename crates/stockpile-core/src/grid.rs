//! Column-indexed point grid
//!
//! Samples are bucketed by their exact horizontal position (x, y). Each
//! column is a stack ordered by ascending elevation, so its last sample is
//! always the current surface at that location.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::point::Point;

#[derive(Error, Debug, PartialEq)]
pub enum GridError {
    #[error("malformed column document: {0}")]
    MalformedInput(String),
}

/// Exact-match grid coordinate with a total order.
///
/// `-0.0` is folded into `0.0` so both land in the same column.
#[derive(Debug, Clone, Copy)]
pub struct Coord(f64);

impl Coord {
    pub fn new(value: f64) -> Self {
        if value == 0.0 {
            Self(0.0)
        } else {
            Self(value)
        }
    }
}

impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Coord {}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type Column = Vec<Point>;

/// Sparse x -> y -> depth-ordered column index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointGrid {
    columns: BTreeMap<Coord, BTreeMap<Coord, Column>>,
}

impl PointGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a two-level column document (`{"<x>": {"<y>": [point, ...]}}`).
    ///
    /// JSON arrays are accepted at either level with their indices as keys.
    pub fn build(doc: &Value) -> Result<Self, GridError> {
        let mut grid = Self::new();

        for (x_key, rows) in entries(doc, "column document")? {
            let x = parse_key(&x_key)?;
            for (y_key, samples) in entries(rows, "row")? {
                let y = parse_key(&y_key)?;
                let Value::Array(samples) = samples else {
                    return Err(GridError::MalformedInput(format!(
                        "column ({x_key}, {y_key}) is not an array"
                    )));
                };
                let mut column = samples
                    .iter()
                    .map(parse_sample)
                    .collect::<Result<Column, _>>()?;
                if column.is_empty() {
                    continue;
                }
                sort_by_z(&mut column);
                grid.columns
                    .entry(Coord::new(x))
                    .or_default()
                    .insert(Coord::new(y), column);
            }
        }

        Ok(grid)
    }

    /// Insert samples, truncating each touched column above the new sample.
    ///
    /// Every existing sample with a strictly greater z is discarded before
    /// the new one is appended. A sample identical to one already in the
    /// column is not appended a second time.
    pub fn update<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = Point>,
    {
        for sample in samples {
            let column = self
                .columns
                .entry(Coord::new(sample.x))
                .or_default()
                .entry(Coord::new(sample.y))
                .or_default();

            column.retain(|existing| existing.z <= sample.z);
            if !column.contains(&sample) {
                column.push(sample);
            }
            sort_by_z(column);
        }
    }

    /// One sample per column: the one with the greatest elevation
    pub fn top(&self) -> Vec<Point> {
        self.columns
            .values()
            .flat_map(|rows| rows.values())
            .filter_map(|column| column.last().cloned())
            .collect()
    }

    /// Every sample in every column at `x`, ordered by (y, z)
    pub fn section(&self, x: f64) -> Vec<Point> {
        let Some(rows) = self.columns.get(&Coord::new(x)) else {
            return Vec::new();
        };
        let mut points: Vec<Point> = rows.values().flatten().cloned().collect();
        points.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.z.total_cmp(&b.z)));
        points
    }

    pub fn all_points(&self) -> Vec<Point> {
        self.columns
            .values()
            .flat_map(|rows| rows.values())
            .flatten()
            .cloned()
            .collect()
    }

    pub fn column(&self, x: f64, y: f64) -> Option<&[Point]> {
        self.columns
            .get(&Coord::new(x))
            .and_then(|rows| rows.get(&Coord::new(y)))
            .map(Vec::as_slice)
    }

    pub fn column_count(&self) -> usize {
        self.columns.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Distinct x closest to `world_x`; on a tie the first one seen wins.
pub fn nearest_column_x(top: &[Point], world_x: f64) -> Option<f64> {
    let mut seen: Vec<f64> = Vec::new();
    for point in top {
        if !seen.iter().any(|x| Coord::new(*x) == Coord::new(point.x)) {
            seen.push(point.x);
        }
    }

    seen.into_iter().fold(None, |best, x| match best {
        Some(b) if (b - world_x).abs() <= (x - world_x).abs() => Some(b),
        _ => Some(x),
    })
}

fn sort_by_z(column: &mut Column) {
    column.sort_by(|a, b| a.z.total_cmp(&b.z));
}

fn entries<'a>(value: &'a Value, what: &str) -> Result<Vec<(String, &'a Value)>, GridError> {
    match value {
        Value::Object(map) => Ok(object_entries(map)),
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect()),
        other => Err(GridError::MalformedInput(format!(
            "{what} must be an object, found {}",
            kind(other)
        ))),
    }
}

fn object_entries(map: &Map<String, Value>) -> Vec<(String, &Value)> {
    map.iter().map(|(k, v)| (k.clone(), v)).collect()
}

fn parse_key(key: &str) -> Result<f64, GridError> {
    key.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GridError::MalformedInput(format!("column key {key:?} is not numeric")))
}

fn parse_sample(value: &Value) -> Result<Point, GridError> {
    let Value::Object(fields) = value else {
        return Err(GridError::MalformedInput(format!(
            "sample must be an object, found {}",
            kind(value)
        )));
    };

    let coord = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| GridError::MalformedInput(format!("sample is missing numeric {name}")))
    };

    Ok(Point {
        x: coord("x")?,
        y: coord("y")?,
        z: coord("z")?,
        color: fields.get("color").and_then(Value::as_str).map(str::to_string),
        quality: fields.get("quality").and_then(Value::as_f64),
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(x: f64, y: f64, z: f64) -> Point {
        Point::new(x, y, z)
    }

    fn two_column_doc() -> Value {
        json!({
            "0": {
                "0": [
                    {"x": 0, "y": 0, "z": 4},
                    {"x": 0, "y": 0, "z": 1},
                    {"x": 0, "y": 0, "z": 9}
                ],
                "5": [{"x": 0, "y": 5, "z": 2}]
            },
            "10": {
                "0": [{"x": 10, "y": 0, "z": 7, "color": "#A259FF", "quality": 44}]
            }
        })
    }

    #[test]
    fn test_build_sorts_columns_by_elevation() {
        let grid = PointGrid::build(&two_column_doc()).unwrap();
        let column = grid.column(0.0, 0.0).unwrap();
        let zs: Vec<f64> = column.iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![1.0, 4.0, 9.0]);
        assert_eq!(grid.column_count(), 3);
    }

    #[test]
    fn test_build_accepts_array_levels() {
        let doc = json!([[[{"x": 0, "y": 0, "z": 3}]], {"2": [{"x": 1, "y": 2, "z": 1}]}]);
        let grid = PointGrid::build(&doc).unwrap();
        assert!(grid.column(0.0, 0.0).is_some());
        assert!(grid.column(1.0, 2.0).is_some());
    }

    #[test]
    fn test_build_skips_empty_columns() {
        let doc = json!({"1": {"1": [], "2": [{"x": 1, "y": 2, "z": 0}]}});
        let grid = PointGrid::build(&doc).unwrap();
        assert!(grid.column(1.0, 1.0).is_none());
        assert_eq!(grid.column_count(), 1);
    }

    #[test]
    fn test_build_rejects_malformed_documents() {
        assert!(matches!(
            PointGrid::build(&json!({"abc": {"0": []}})),
            Err(GridError::MalformedInput(_))
        ));
        assert!(matches!(
            PointGrid::build(&json!({"0": {"0": [{"x": 0, "y": 0}]}})),
            Err(GridError::MalformedInput(_))
        ));
        assert!(matches!(
            PointGrid::build(&json!({"0": {"0": 5}})),
            Err(GridError::MalformedInput(_))
        ));
        assert!(matches!(
            PointGrid::build(&json!("nope")),
            Err(GridError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_top_returns_max_per_column() {
        let grid = PointGrid::build(&two_column_doc()).unwrap();
        let mut top: Vec<(f64, f64, f64)> = grid.top().iter().map(|p| (p.x, p.y, p.z)).collect();
        top.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(top, vec![(0.0, 0.0, 9.0), (0.0, 5.0, 2.0), (10.0, 0.0, 7.0)]);
    }

    #[test]
    fn test_section_orders_by_y_then_z() {
        let grid = PointGrid::build(&two_column_doc()).unwrap();
        let section: Vec<(f64, f64)> = grid.section(0.0).iter().map(|p| (p.y, p.z)).collect();
        assert_eq!(section, vec![(0.0, 1.0), (0.0, 4.0), (0.0, 9.0), (5.0, 2.0)]);
        assert!(grid.section(42.0).is_empty());
    }

    #[test]
    fn test_update_truncates_above_new_sample() {
        let doc = json!({"0": {"0": [{"x": 0, "y": 0, "z": 10, "color": "#FFE066"}]}});
        let mut grid = PointGrid::build(&doc).unwrap();
        assert_eq!(grid.top()[0].z, 10.0);

        grid.update([sample(0.0, 0.0, 5.0)]);

        let column = grid.column(0.0, 0.0).unwrap();
        assert_eq!(column.len(), 1);
        assert_eq!(grid.top()[0].z, 5.0);
    }

    #[test]
    fn test_update_keeps_samples_at_or_below() {
        let mut grid = PointGrid::new();
        grid.update([sample(1.0, 1.0, 2.0), sample(1.0, 1.0, 4.0), sample(1.0, 1.0, 6.0)]);
        grid.update([sample(1.0, 1.0, 4.0).with_color("#2CD9C5")]);

        let zs: Vec<f64> = grid.column(1.0, 1.0).unwrap().iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![2.0, 4.0, 4.0]);
    }

    #[test]
    fn test_update_is_idempotent() {
        let samples = vec![
            sample(0.0, 0.0, 5.0),
            sample(0.0, 0.0, 3.0),
            sample(0.0, 1.0, 8.0),
            sample(2.0, 0.0, 1.0),
        ];

        let mut once = PointGrid::build(&two_column_doc()).unwrap();
        once.update(samples.clone());

        let mut twice = once.clone();
        twice.update(samples);

        assert_eq!(once.top(), twice.top());
        assert_eq!(once.section(0.0), twice.section(0.0));
        assert_eq!(once.section(2.0), twice.section(2.0));
    }

    #[test]
    fn test_negative_zero_shares_column() {
        let mut grid = PointGrid::new();
        grid.update([sample(-0.0, 0.0, 1.0), sample(0.0, -0.0, 2.0)]);
        assert_eq!(grid.column_count(), 1);
        assert_eq!(grid.top()[0].z, 2.0);
    }

    #[test]
    fn test_all_points_counts_every_sample() {
        let grid = PointGrid::build(&two_column_doc()).unwrap();
        assert_eq!(grid.all_points().len(), 5);
    }

    #[test]
    fn test_nearest_column_x() {
        let top = vec![
            sample(100.0, 0.0, 1.0),
            sample(150.0, 0.0, 1.0),
            sample(100.0, 5.0, 1.0),
            sample(200.0, 0.0, 1.0),
        ];
        assert_eq!(nearest_column_x(&top, 123.4), Some(100.0));
        assert_eq!(nearest_column_x(&top, 190.0), Some(200.0));
        // Equidistant: the first distinct x encountered wins
        assert_eq!(nearest_column_x(&top, 125.0), Some(100.0));
        assert_eq!(nearest_column_x(&[], 1.0), None);
    }
}

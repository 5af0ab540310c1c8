//! Surface mesh documents
//!
//! The viewer receives the reconstructed surface as a serialized renderable
//! object. Only mesh-shaped documents can be displayed; the loader checks the
//! structure and never looks at the vertex values themselves.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::grid::Coord;
use crate::point::Point;
use crate::quality::parse_hex_color;

#[derive(Error, Debug, PartialEq)]
pub enum SurfaceError {
    #[error("expected a mesh object, found {0}")]
    NotAMesh(&'static str),
    #[error("mesh {name:?} is degenerate: {reason}")]
    Degenerate { name: String, reason: String },
    #[error("invalid points: {0} sample(s) have non-finite coordinates")]
    InvalidPoints(usize),
}

/// Serialized renderable object, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SceneObjectDocument {
    Mesh(MeshDocument),
    Points {
        #[serde(default)]
        name: String,
        positions: Vec<[f32; 3]>,
    },
    Group {
        #[serde(default)]
        name: String,
        #[serde(default)]
        children: Vec<SceneObjectDocument>,
    },
}

impl SceneObjectDocument {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mesh(_) => "mesh",
            Self::Points { .. } => "point cloud",
            Self::Group { .. } => "group",
        }
    }

    /// Load the document as a displayable mesh
    pub fn into_mesh(self) -> Result<MeshDocument, SurfaceError> {
        match self {
            Self::Mesh(mesh) => {
                mesh.validate()?;
                Ok(mesh)
            }
            other => Err(SurfaceError::NotAMesh(other.kind())),
        }
    }
}

/// Triangle mesh with optional per-vertex sRGB colors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshDocument {
    #[serde(default)]
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<[f32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
}

impl MeshDocument {
    pub fn validate(&self) -> Result<(), SurfaceError> {
        let degenerate = |reason: String| SurfaceError::Degenerate {
            name: self.name.clone(),
            reason,
        };

        if self.positions.is_empty() {
            return Err(degenerate("no vertices".to_string()));
        }
        if let Some(colors) = &self.colors {
            if colors.len() != self.positions.len() {
                return Err(degenerate(format!(
                    "{} colors for {} vertices",
                    colors.len(),
                    self.positions.len()
                )));
            }
        }
        match &self.indices {
            Some(indices) => {
                if indices.is_empty() || indices.len() % 3 != 0 {
                    return Err(degenerate(format!("{} indices", indices.len())));
                }
                if let Some(bad) = indices.iter().find(|&&i| i as usize >= self.positions.len()) {
                    return Err(degenerate(format!("index {bad} out of range")));
                }
            }
            None if self.positions.len() % 3 != 0 => {
                return Err(degenerate(format!("{} vertices", self.positions.len())));
            }
            None => {}
        }
        Ok(())
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Triangle corners in draw order
    pub fn triangles(&self) -> Vec<[[f32; 3]; 3]> {
        let corner = |i: usize| self.positions[i];
        match &self.indices {
            Some(indices) => indices
                .chunks_exact(3)
                .map(|t| [corner(t[0] as usize), corner(t[1] as usize), corner(t[2] as usize)])
                .collect(),
            None => self
                .positions
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect(),
        }
    }

    /// Flatten indexed geometry into a plain triangle list with matching colors
    pub fn expanded(&self) -> (Vec<[f32; 3]>, Option<Vec<[f32; 3]>>) {
        let Some(indices) = &self.indices else {
            return (self.positions.clone(), self.colors.clone());
        };
        let positions = indices.iter().map(|&i| self.positions[i as usize]).collect();
        let colors = self
            .colors
            .as_ref()
            .map(|c| indices.iter().map(|&i| c[i as usize]).collect());
        (positions, colors)
    }
}

const DEFAULT_VERTEX_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Triangulate surface samples laid out on a regular (x, y) lattice.
///
/// Each lattice cell whose four corners are all present becomes two
/// triangles. Corner colors come from the samples' color tags.
pub fn triangulate(name: impl Into<String>, points: &[Point]) -> Result<MeshDocument, SurfaceError> {
    let invalid = points.iter().filter(|p| !p.is_finite()).count();
    if invalid > 0 {
        return Err(SurfaceError::InvalidPoints(invalid));
    }

    let xs: Vec<Coord> = points.iter().map(|p| Coord::new(p.x)).collect::<BTreeSet<_>>().into_iter().collect();
    let ys: Vec<Coord> = points.iter().map(|p| Coord::new(p.y)).collect::<BTreeSet<_>>().into_iter().collect();

    let mut lookup: BTreeMap<(Coord, Coord), &Point> = BTreeMap::new();
    for p in points {
        lookup.entry((Coord::new(p.x), Coord::new(p.y))).or_insert(p);
    }

    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut push = |p: &Point| {
        positions.push([p.x as f32, p.y as f32, p.z as f32]);
        colors.push(
            p.color
                .as_deref()
                .and_then(parse_hex_color)
                .unwrap_or(DEFAULT_VERTEX_COLOR),
        );
    };

    for i in 0..xs.len().saturating_sub(1) {
        for j in 0..ys.len().saturating_sub(1) {
            let corners = (
                lookup.get(&(xs[i], ys[j])),
                lookup.get(&(xs[i + 1], ys[j])),
                lookup.get(&(xs[i], ys[j + 1])),
                lookup.get(&(xs[i + 1], ys[j + 1])),
            );
            if let (Some(p1), Some(p2), Some(p3), Some(p4)) = corners {
                for p in [*p1, *p2, *p3, *p2, *p4, *p3] {
                    push(p);
                }
            }
        }
    }

    Ok(MeshDocument {
        name: name.into(),
        positions,
        colors: Some(colors),
        indices: None,
    })
}

//! Stockpile Core - survey data model for the stockpile viewer
//!
//! This crate provides the rendering-independent pieces of the viewer:
//! - Scanned sample points and their quality buckets
//! - The column-indexed point grid with top-surface and section views
//! - Surface mesh documents, their structural loader and grid triangulation
//! - The on-disk snapshot catalog and the auto-advance polling state machine

pub mod catalog;
pub mod feed;
pub mod grid;
pub mod point;
pub mod quality;
pub mod surface;
pub mod survey;

pub use catalog::{CatalogError, NextSnapshot, SnapshotCatalog, SnapshotEntry};
pub use feed::{load_next, AdvanceRequest, AutoAdvance, FeedError, LoadedSnapshot, SnapshotSource};
pub use grid::{nearest_column_x, Coord, GridError, PointGrid};
pub use point::{retain_finite, Point};
pub use quality::{parse_hex_color, QualityBucket};
pub use surface::{triangulate, MeshDocument, SceneObjectDocument, SurfaceError};
pub use survey::{RawSample, SurveyPayload};

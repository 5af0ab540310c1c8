//! Procedural builders for everything on stage except the surface itself

pub mod enclosure;
pub mod fog;
pub mod guide_lines;
pub mod indicators;
pub mod label;
pub mod trolley;

pub use enclosure::Enclosure;
pub use fog::{Fog, FogField};
pub use guide_lines::{GuideLines, LabelInfo};
pub use indicators::{Arrow, Ramp};
pub use label::{LabelSprite, LabelText};
pub use trolley::{Follower, Trolley};

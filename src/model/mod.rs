//! Data models for the annotation session.

mod annotation;
mod category;
pub mod geometry;
mod scene;

pub use annotation::{Annotation, DrawingState, GestureOutcome, parse_attributes};
pub use category::{CategoryId, CategoryRegistry};
pub use geometry::{BBox, Point};
pub use scene::SceneMetadata;

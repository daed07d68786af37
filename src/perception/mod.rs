//! Screen perception: UI-dump parsing, grid overlay, annotation and
//! stagnation detection.
pub mod annotator;
pub mod geometry;
pub mod grid;
pub mod screen_model;
pub mod stagnation;

pub use geometry::Rect;
pub use grid::SubArea;
pub use screen_model::{ElementCategory, InteractiveElement};

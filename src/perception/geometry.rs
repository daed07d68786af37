//! Bounding-box parsing and rectangle math for the screen model.
use serde::{Deserialize, Serialize};

use crate::errors::{DroidClawError, DroidClawResult};

/// Absolute device-pixel rectangle, top-left inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Parses a uiautomator bounds attribute of the form `[x1,y1][x2,y2]`.
    pub fn parse_bounds(s: &str) -> DroidClawResult<Rect> {
        let malformed = || DroidClawError::MalformedBounds(s.to_string());

        let inner = s
            .strip_prefix('[')
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(malformed)?;
        let (first, second) = inner.split_once("][").ok_or_else(malformed)?;

        let parse_pair = |pair: &str| -> DroidClawResult<(i32, i32)> {
            let (x, y) = pair.split_once(',').ok_or_else(malformed)?;
            let x = x.trim().parse::<i32>().map_err(|_| malformed())?;
            let y = y.trim().parse::<i32>().map_err(|_| malformed())?;
            Ok((x, y))
        };

        let (left, top) = parse_pair(first)?;
        let (right, bottom) = parse_pair(second)?;
        Ok(Rect::new(left, top, right, bottom))
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> i64 {
        (self.width().max(0) as i64) * (self.height().max(0) as i64)
    }

    /// Integer center, matching the tap coordinate used for dispatch.
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    /// Intersection-over-union in [0, 1]; zero when the rectangles do not
    /// overlap. The union carries a small epsilon floor so degenerate
    /// rectangles cannot divide by zero.
    pub fn iou(&self, other: &Rect) -> f64 {
        let x_left = self.left.max(other.left);
        let y_top = self.top.max(other.top);
        let x_right = self.right.min(other.right);
        let y_bottom = self.bottom.min(other.bottom);
        if x_right <= x_left || y_bottom <= y_top {
            return 0.0;
        }
        let inter = ((x_right - x_left) as f64) * ((y_bottom - y_top) as f64);
        let union = self.area() as f64 + other.area() as f64 - inter;
        inter / (union + 1e-6)
    }

    /// Euclidean distance between rectangle centers.
    pub fn center_distance(&self, other: &Rect) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        let dx = (ax - bx) as f64;
        let dy = (ay - by) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

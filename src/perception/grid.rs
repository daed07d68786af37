//! Grid overlay addressing.
//!
//! Partitions the screen into a rows×cols lattice of numbered cells (1-based,
//! row-major) and maps an (area, sub-position) pair to absolute pixel
//! coordinates. Used as the fallback addressing scheme when element
//! extraction is unusable or disabled.
use std::path::Path;
use std::str::FromStr;

use crate::errors::{DroidClawError, DroidClawResult};

/// Named sub-position inside a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubArea {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl FromStr for SubArea {
    type Err = DroidClawError;

    fn from_str(s: &str) -> DroidClawResult<Self> {
        match s.trim() {
            "top-left" => Ok(SubArea::TopLeft),
            "top" => Ok(SubArea::Top),
            "top-right" => Ok(SubArea::TopRight),
            "left" => Ok(SubArea::Left),
            "center" => Ok(SubArea::Center),
            "right" => Ok(SubArea::Right),
            "bottom-left" => Ok(SubArea::BottomLeft),
            "bottom" => Ok(SubArea::Bottom),
            "bottom-right" => Ok(SubArea::BottomRight),
            other => Err(DroidClawError::InvalidSubarea(other.to_string())),
        }
    }
}

impl SubArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubArea::TopLeft => "top-left",
            SubArea::Top => "top",
            SubArea::TopRight => "top-right",
            SubArea::Left => "left",
            SubArea::Center => "center",
            SubArea::Right => "right",
            SubArea::BottomLeft => "bottom-left",
            SubArea::Bottom => "bottom",
            SubArea::BottomRight => "bottom-right",
        }
    }

    /// Fractional position inside the cell: quarter points on each axis.
    fn cell_fraction(&self) -> (f64, f64) {
        match self {
            SubArea::TopLeft => (0.25, 0.25),
            SubArea::Top => (0.5, 0.25),
            SubArea::TopRight => (0.75, 0.25),
            SubArea::Left => (0.25, 0.5),
            SubArea::Center => (0.5, 0.5),
            SubArea::Right => (0.75, 0.5),
            SubArea::BottomLeft => (0.25, 0.75),
            SubArea::Bottom => (0.5, 0.75),
            SubArea::BottomRight => (0.75, 0.75),
        }
    }
}

/// Derives the lattice shape from the image dimensions and a target minimum
/// cell edge, clamped to 1..=100 per axis.
pub fn derive_grid(width: u32, height: u32, min_cell_px: u32) -> (u32, u32) {
    let min_cell_px = min_cell_px.max(1);
    let rows = (height / min_cell_px).clamp(1, 100);
    let cols = (width / min_cell_px).clamp(1, 100);
    (rows, cols)
}

/// Maps a 1-based cell number and sub-position to absolute pixel
/// coordinates. `rows == 0 || cols == 0` is the grid-unavailable sentinel
/// and never a valid lattice.
pub fn area_to_xy(
    area: u32,
    subarea: SubArea,
    width: u32,
    height: u32,
    rows: u32,
    cols: u32,
) -> DroidClawResult<(i32, i32)> {
    if rows == 0 || cols == 0 {
        return Err(DroidClawError::GridUnavailable);
    }
    if area == 0 || area > rows * cols {
        return Err(DroidClawError::IndexOutOfRange(format!(
            "grid area {area} not in 1..={}",
            rows * cols
        )));
    }
    let idx = area - 1;
    let row = idx / cols;
    let col = idx % cols;
    let cell_w = width as f64 / cols as f64;
    let cell_h = height as f64 / rows as f64;
    let (fx, fy) = subarea.cell_fraction();
    let x = (col as f64 * cell_w + cell_w * fx).round() as i32;
    let y = (row as f64 * cell_h + cell_h * fy).round() as i32;
    Ok((x, y))
}

/// Renders the numbered lattice onto the screenshot at `src`, writes the
/// annotated image to `dst`, and returns the derived `(rows, cols)`.
/// `(0, 0)` signals that the grid could not be drawn and grid mode is
/// unavailable this round.
pub fn draw_grid(
    src: &Path,
    dst: &Path,
    rows: Option<u32>,
    cols: Option<u32>,
    min_cell_px: u32,
) -> (u32, u32) {
    match render_grid(src, dst, rows, cols, min_cell_px) {
        Ok(shape) => shape,
        Err(e) => {
            tracing::warn!(error = %e, src = %src.display(), "grid overlay failed");
            (0, 0)
        }
    }
}

fn render_grid(
    src: &Path,
    dst: &Path,
    rows: Option<u32>,
    cols: Option<u32>,
    min_cell_px: u32,
) -> DroidClawResult<(u32, u32)> {
    let img = image::open(src)
        .map_err(|e| DroidClawError::Perception(format!("grid load: {e}")))?;
    let mut canvas = img.to_rgba8();
    let (w, h) = canvas.dimensions();

    let (derived_rows, derived_cols) = derive_grid(w, h, min_cell_px);
    let rows = rows.unwrap_or(derived_rows).clamp(1, 100);
    let cols = cols.unwrap_or(derived_cols).clamp(1, 100);

    let cell_w = (w / cols).max(1);
    let cell_h = (h / rows).max(1);

    // Semi-transparent lattice lines, 2 px.
    let line = [0u8, 200, 255, 130];
    for c in 1..cols {
        let x = c * cell_w;
        if x >= w {
            break;
        }
        for y in 0..h {
            blend_pixel(canvas.get_pixel_mut(x, y), line);
            if x + 1 < w {
                blend_pixel(canvas.get_pixel_mut(x + 1, y), line);
            }
        }
    }
    for r in 1..rows {
        let y = r * cell_h;
        if y >= h {
            break;
        }
        for x in 0..w {
            blend_pixel(canvas.get_pixel_mut(x, y), line);
            if y + 1 < h {
                blend_pixel(canvas.get_pixel_mut(x, y + 1), line);
            }
        }
    }

    // Cell number inside every cell, top-left corner.
    let scale: u32 = if cell_w >= 80 { 2 } else { 1 };
    let pad = 4u32;
    for r in 0..rows {
        for c in 0..cols {
            let label = (r * cols + c + 1).to_string();
            let lx = c * cell_w + pad;
            let ly = r * cell_h + pad;
            if lx < w && ly < h {
                draw_label(&mut canvas, &label, lx, ly, scale, [255, 220, 0, 255]);
            }
        }
    }

    image::DynamicImage::ImageRgba8(canvas)
        .save(dst)
        .map_err(|e| DroidClawError::Perception(format!("grid save: {e}")))?;
    Ok((rows, cols))
}

// 5x5 bitmap digits; bit4 is the leftmost pixel of each row.
const DIGIT_FONT: [[u8; 5]; 10] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // 0
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110], // 1
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111], // 2
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110], // 3
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010], // 4
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110], // 5
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110], // 6
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100], // 7
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110], // 8
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110], // 9
];

fn draw_label(
    canvas: &mut image::RgbaImage,
    text: &str,
    px: u32,
    py: u32,
    scale: u32,
    col: [u8; 4],
) {
    let step = 5 * scale + 1;
    for (i, c) in text.chars().enumerate() {
        draw_digit(canvas, c, px + i as u32 * step, py, scale, col);
    }
}

fn draw_digit(
    canvas: &mut image::RgbaImage,
    c: char,
    px: u32,
    py: u32,
    scale: u32,
    col: [u8; 4],
) {
    let Some(glyph) = c
        .to_digit(10)
        .and_then(|d| DIGIT_FONT.get(d as usize))
    else {
        return;
    };
    let (w, h) = canvas.dimensions();

    // Darken a small box behind the glyph so it reads on any background.
    let bg_x = px.saturating_sub(1);
    let bg_y = py.saturating_sub(1);
    for dy in 0..(5 * scale + 2) {
        for dx in 0..(5 * scale + 2) {
            let x = bg_x + dx;
            let y = bg_y + dy;
            if x < w && y < h {
                let p = canvas.get_pixel_mut(x, y);
                p[0] = (p[0] as f32 * 0.25) as u8;
                p[1] = (p[1] as f32 * 0.25) as u8;
                p[2] = (p[2] as f32 * 0.25) as u8;
                p[3] = 255;
            }
        }
    }

    for (row, &bits) in glyph.iter().enumerate() {
        for bit in 0..5u32 {
            if (bits >> (4 - bit)) & 1 == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + bit * scale + sx;
                    let y = py + row as u32 * scale + sy;
                    if x < w && y < h {
                        canvas.put_pixel(x, y, image::Rgba(col));
                    }
                }
            }
        }
    }
}

fn blend_pixel(pixel: &mut image::Rgba<u8>, col: [u8; 4]) {
    let alpha = col[3] as f32 / 255.0;
    pixel[0] = (pixel[0] as f32 * (1.0 - alpha) + col[0] as f32 * alpha).round() as u8;
    pixel[1] = (pixel[1] as f32 * (1.0 - alpha) + col[1] as f32 * alpha).round() as u8;
    pixel[2] = (pixel[2] as f32 * (1.0 - alpha) + col[2] as f32 * alpha).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subarea_parses_all_nine_positions() {
        for s in [
            "top-left",
            "top",
            "top-right",
            "left",
            "center",
            "right",
            "bottom-left",
            "bottom",
            "bottom-right",
        ] {
            assert_eq!(SubArea::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn subarea_rejects_unknown_input() {
        assert!(matches!(
            SubArea::from_str("middle"),
            Err(DroidClawError::InvalidSubarea(_))
        ));
    }

    #[test]
    fn derive_grid_clamps_to_valid_range() {
        assert_eq!(derive_grid(1080, 1920, 40), (48, 27));
        // Tiny image still yields at least one cell per axis.
        assert_eq!(derive_grid(10, 10, 40), (1, 1));
        // Huge image is capped at 100.
        assert_eq!(derive_grid(100_000, 100_000, 40), (100, 100));
    }

    #[test]
    fn area_to_xy_center_of_first_and_last_cell() {
        // 2x2 lattice over 100x100: cells are 50x50.
        let (x, y) = area_to_xy(1, SubArea::Center, 100, 100, 2, 2).unwrap();
        assert_eq!((x, y), (25, 25));
        let (x, y) = area_to_xy(4, SubArea::Center, 100, 100, 2, 2).unwrap();
        assert_eq!((x, y), (75, 75));
    }

    #[test]
    fn area_to_xy_quarter_point_offsets() {
        let (x, y) = area_to_xy(1, SubArea::TopLeft, 100, 100, 2, 2).unwrap();
        assert_eq!((x, y), (13, 13));
        let (x, y) = area_to_xy(1, SubArea::BottomRight, 100, 100, 2, 2).unwrap();
        assert_eq!((x, y), (38, 38));
        let (x, y) = area_to_xy(2, SubArea::Left, 100, 100, 2, 2).unwrap();
        assert_eq!((x, y), (63, 25));
    }

    #[test]
    fn area_to_xy_rejects_out_of_range_area() {
        for area in [0, 5] {
            assert!(matches!(
                area_to_xy(area, SubArea::Center, 100, 100, 2, 2),
                Err(DroidClawError::IndexOutOfRange(_))
            ));
        }
    }

    #[test]
    fn zero_shape_is_grid_unavailable() {
        assert!(matches!(
            area_to_xy(1, SubArea::Center, 100, 100, 0, 2),
            Err(DroidClawError::GridUnavailable)
        ));
        assert!(matches!(
            area_to_xy(1, SubArea::Center, 100, 100, 2, 0),
            Err(DroidClawError::GridUnavailable)
        ));
    }

    #[test]
    fn every_cell_of_a_lattice_maps_inside_the_image() {
        let (rows, cols) = derive_grid(1080, 1920, 40);
        for area in 1..=rows * cols {
            let (x, y) = area_to_xy(area, SubArea::Center, 1080, 1920, rows, cols).unwrap();
            assert!(x >= 0 && x < 1080, "x {x} out of image for area {area}");
            assert!(y >= 0 && y < 1920, "y {y} out of image for area {area}");
        }
    }

    #[test]
    fn unreadable_image_reports_zero_shape() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("missing.png");
        let dst = dir.path().join("out.png");
        assert_eq!(draw_grid(&src, &dst, None, None, 40), (0, 0));
    }

    #[test]
    fn draw_grid_returns_derived_shape() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.png");
        let dst = dir.path().join("out.png");
        let img = image::RgbaImage::from_pixel(200, 400, image::Rgba([90, 90, 90, 255]));
        img.save(&src).unwrap();
        assert_eq!(draw_grid(&src, &dst, None, None, 40), (10, 5));
        assert!(dst.exists());
    }

    #[test]
    fn explicit_shape_bypasses_derivation() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.png");
        let dst = dir.path().join("out.png");
        let img = image::RgbaImage::from_pixel(200, 400, image::Rgba([90, 90, 90, 255]));
        img.save(&src).unwrap();
        assert_eq!(draw_grid(&src, &dst, Some(3), Some(4), 40), (3, 4));
    }
}

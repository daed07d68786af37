//! Draw numbered labels and bounding boxes for the element list.
//!
//! Each interactive element gets a colour-coded rectangle and its 1-based
//! list index drawn at the element center, so the model can reference
//! elements by the number it sees on the image.
use std::path::Path;

use crate::errors::{DroidClawError, DroidClawResult};
use crate::perception::screen_model::{ElementCategory, InteractiveElement};

/// RGBA colour per element category.
fn category_colour(category: ElementCategory) -> [u8; 4] {
    match category {
        ElementCategory::Clickable => [255, 68, 68, 220],     // red
        ElementCategory::Focusable => [68, 255, 68, 220],     // green
        ElementCategory::Scrollable => [0, 200, 255, 220],    // cyan
        ElementCategory::LongClickable => [255, 170, 0, 220], // orange
    }
}

/// Annotate the screenshot at `src` with one numbered box per element and
/// write the result to `dst`. Label colours invert in dark mode so the
/// numbers stay readable on light-on-dark UIs.
pub fn draw_bbox_multi(
    src: &Path,
    dst: &Path,
    elements: &[InteractiveElement],
    dark_mode: bool,
) -> DroidClawResult<()> {
    let img = image::open(src)
        .map_err(|e| DroidClawError::Perception(format!("annotate load: {e}")))?;
    let mut canvas = img.to_rgba8();
    let (w, _) = canvas.dimensions();

    let label_scale: u32 = if w > 1600 { 3 } else { 2 };
    let box_thickness: i32 = if w > 1600 { 3 } else { 2 };
    let (fg, bg) = if dark_mode {
        ([10u8, 10, 10, 255], [230u8, 230, 230, 255])
    } else {
        ([255u8, 255, 255, 255], [25u8, 25, 25, 255])
    };

    for (i, elem) in elements.iter().enumerate() {
        let col = category_colour(elem.category);
        draw_rect(
            &mut canvas,
            elem.bbox.left,
            elem.bbox.top,
            elem.bbox.right,
            elem.bbox.bottom,
            col,
            box_thickness,
        );

        let label = (i + 1).to_string();
        let (cx, cy) = elem.bbox.center();
        let label_w = (label.len() as u32 * (5 * label_scale + 1)) as i32;
        let label_h = (5 * label_scale) as i32;
        let lx = (cx - label_w / 2).max(0);
        let ly = (cy - label_h / 2).max(0);
        draw_label(&mut canvas, &label, lx as u32, ly as u32, label_scale, fg, bg);
    }

    image::DynamicImage::ImageRgba8(canvas)
        .save(dst)
        .map_err(|e| DroidClawError::Perception(format!("annotate save: {e}")))?;
    Ok(())
}

fn draw_rect(
    canvas: &mut image::RgbaImage,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    col: [u8; 4],
    thickness: i32,
) {
    let (w, h) = canvas.dimensions();
    let (iw, ih) = (w as i32, h as i32);

    for t in 0..thickness {
        let ty = y1 + t;
        let by = y2 - t;
        for x in x1..=x2 {
            if x >= 0 && x < iw {
                if ty >= 0 && ty < ih {
                    blend(canvas, x as u32, ty as u32, col);
                }
                if by >= 0 && by < ih {
                    blend(canvas, x as u32, by as u32, col);
                }
            }
        }
    }
    for t in 0..thickness {
        let lx = x1 + t;
        let rx = x2 - t;
        for y in y1..=y2 {
            if y >= 0 && y < ih {
                if lx >= 0 && lx < iw {
                    blend(canvas, lx as u32, y as u32, col);
                }
                if rx >= 0 && rx < iw {
                    blend(canvas, rx as u32, y as u32, col);
                }
            }
        }
    }
}

fn draw_label(
    canvas: &mut image::RgbaImage,
    text: &str,
    x: u32,
    y: u32,
    scale: u32,
    fg: [u8; 4],
    bg: [u8; 4],
) {
    let (w, h) = canvas.dimensions();
    let pad = 2 * scale;
    let char_step = 5 * scale + 1;
    let label_w = text.len() as u32 * char_step + pad * 2;
    let label_h = 5 * scale + pad * 2;

    for dy in 0..label_h {
        for dx in 0..label_w {
            let px = x + dx;
            let py = y + dy;
            if px < w && py < h {
                canvas.put_pixel(px, py, image::Rgba(bg));
            }
        }
    }

    for (i, c) in text.chars().enumerate() {
        let gx = x + pad + i as u32 * char_step;
        if gx + 5 * scale >= w {
            break;
        }
        draw_digit(canvas, c, gx, y + pad, scale, fg);
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

fn blend(canvas: &mut image::RgbaImage, x: u32, y: u32, col: [u8; 4]) {
    let p = canvas.get_pixel_mut(x, y);
    let a = col[3] as f32 / 255.0;
    p[0] = (p[0] as f32 * (1.0 - a) + col[0] as f32 * a).round() as u8;
    p[1] = (p[1] as f32 * (1.0 - a) + col[1] as f32 * a).round() as u8;
    p[2] = (p[2] as f32 * (1.0 - a) + col[2] as f32 * a).round() as u8;
    p[3] = 255;
}

/// Same 5x5 bitmap digits as grid.rs.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::geometry::Rect;

    fn element(left: i32, top: i32, right: i32, bottom: i32) -> InteractiveElement {
        InteractiveElement {
            uid: "test_element".into(),
            bbox: Rect::new(left, top, right, bottom),
            category: ElementCategory::Clickable,
        }
    }

    #[test]
    fn annotates_and_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.png");
        let dst = dir.path().join("out.png");
        image::RgbaImage::from_pixel(200, 200, image::Rgba([128, 128, 128, 255]))
            .save(&src)
            .unwrap();

        let elems = vec![element(20, 20, 120, 80)];
        draw_bbox_multi(&src, &dst, &elems, false).unwrap();

        let out = image::open(&dst).unwrap().to_rgba8();
        // Box edge pixel carries the clickable colour blended over grey.
        let edge = out.get_pixel(70, 20);
        assert!(edge[0] > 200, "expected red-ish box edge, got {edge:?}");
    }

    #[test]
    fn out_of_frame_boxes_are_clipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.png");
        let dst = dir.path().join("out.png");
        image::RgbaImage::from_pixel(50, 50, image::Rgba([0, 0, 0, 255]))
            .save(&src)
            .unwrap();

        let elems = vec![element(-10, -10, 500, 500)];
        draw_bbox_multi(&src, &dst, &elems, true).unwrap();
        assert!(dst.exists());
    }

    #[test]
    fn missing_source_is_a_perception_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("missing.png");
        let dst = dir.path().join("out.png");
        let err = draw_bbox_multi(&src, &dst, &[], false).unwrap_err();
        assert!(matches!(err, DroidClawError::Perception(_)));
    }
}

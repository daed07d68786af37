//! Screen stagnation detection.
//!
//! Compares consecutive screenshots with a sampled per-channel pixel
//! difference. When the screen stops changing between rounds, a one-shot
//! recovery hint is emitted so the model can try scrolling instead of
//! repeating the same ineffective action.
use std::path::{Path, PathBuf};

use crate::config::StagnationConfig;
use crate::errors::{DroidClawError, DroidClawResult};

/// Similarity in [0, 1] between two decoded images. Identical images score
/// ~1.0; images of different dimensions score 0. Pixels are sampled so large
/// screenshots stay cheap to compare.
pub fn image_similarity(a: &Path, b: &Path) -> DroidClawResult<f64> {
    let img_a = image::open(a)
        .map_err(|e| DroidClawError::Perception(format!("similarity load {}: {e}", a.display())))?
        .to_rgba8();
    let img_b = image::open(b)
        .map_err(|e| DroidClawError::Perception(format!("similarity load {}: {e}", b.display())))?
        .to_rgba8();

    if img_a.dimensions() != img_b.dimensions() {
        return Ok(0.0);
    }

    let pixels_a = img_a.as_raw();
    let pixels_b = img_b.as_raw();
    // Cap the comparison at ~40k sampled bytes regardless of resolution.
    let step = (pixels_a.len() / 40_000).max(1) * 4;

    let mut total_diff = 0u64;
    let mut samples = 0u64;
    let mut i = 0;
    while i + 2 < pixels_a.len() {
        // RGB channels only; alpha is constant in screenshots.
        for c in 0..3 {
            total_diff += (pixels_a[i + c] as i32 - pixels_b[i + c] as i32).unsigned_abs() as u64;
        }
        samples += 3;
        i += step;
    }
    if samples == 0 {
        return Ok(0.0);
    }
    Ok(1.0 - (total_diff as f64 / samples as f64) / 255.0)
}

/// Tracks the previous round's screenshot and arms a one-shot recovery hint
/// per stagnation episode.
pub struct StagnationDetector {
    enabled: bool,
    threshold: f64,
    previous: Option<PathBuf>,
    hint_armed: bool,
}

impl StagnationDetector {
    pub fn new(config: &StagnationConfig) -> Self {
        Self {
            enabled: config.enabled,
            threshold: config.similarity_threshold,
            previous: None,
            hint_armed: true,
        }
    }

    /// Records this round's screenshot and reports whether the recovery hint
    /// should be injected into the prompt. The hint fires at most once per
    /// stagnation episode and re-arms when the screen changes again.
    pub fn observe(&mut self, screenshot: &Path) -> bool {
        if !self.enabled {
            return false;
        }
        let previous = self.previous.replace(screenshot.to_path_buf());
        let Some(previous) = previous else {
            return false;
        };

        let similarity = match image_similarity(&previous, screenshot) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "stagnation comparison failed");
                return false;
            }
        };
        tracing::debug!(similarity, "screen similarity");

        if similarity >= self.threshold {
            if self.hint_armed {
                self.hint_armed = false;
                return true;
            }
            false
        } else {
            self.hint_armed = true;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_solid(dir: &Path, name: &str, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(64, 64, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn identical_images_score_near_one() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_solid(dir.path(), "a.png", [120, 40, 200]);
        let b = write_solid(dir.path(), "b.png", [120, 40, 200]);
        assert!(image_similarity(&a, &b).unwrap() > 0.999);
    }

    #[test]
    fn inverted_images_score_low() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_solid(dir.path(), "a.png", [0, 0, 0]);
        let b = write_solid(dir.path(), "b.png", [255, 255, 255]);
        assert!(image_similarity(&a, &b).unwrap() < 0.1);
    }

    #[test]
    fn dimension_mismatch_scores_zero() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_solid(dir.path(), "a.png", [10, 10, 10]);
        let b = dir.path().join("b.png");
        image::RgbaImage::from_pixel(32, 32, image::Rgba([10, 10, 10, 255]))
            .save(&b)
            .unwrap();
        assert_eq!(image_similarity(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn hint_fires_once_per_episode_and_rearms() {
        let dir = tempfile::tempdir().unwrap();
        let same1 = write_solid(dir.path(), "s1.png", [50, 50, 50]);
        let same2 = write_solid(dir.path(), "s2.png", [50, 50, 50]);
        let same3 = write_solid(dir.path(), "s3.png", [50, 50, 50]);
        let changed = write_solid(dir.path(), "c.png", [250, 0, 0]);
        let same4 = write_solid(dir.path(), "s4.png", [250, 0, 0]);

        let mut det = StagnationDetector::new(&StagnationConfig::default());
        assert!(!det.observe(&same1)); // first round, nothing to compare
        assert!(det.observe(&same2)); // stagnant: hint fires
        assert!(!det.observe(&same3)); // still stagnant: one-shot, no repeat
        assert!(!det.observe(&changed)); // screen changed: re-arms
        assert!(det.observe(&same4)); // stagnant again: hint fires again
    }

    #[test]
    fn disabled_detector_never_hints() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_solid(dir.path(), "a.png", [50, 50, 50]);
        let b = write_solid(dir.path(), "b.png", [50, 50, 50]);
        let mut det = StagnationDetector::new(&StagnationConfig {
            enabled: false,
            similarity_threshold: 0.99,
        });
        assert!(!det.observe(&a));
        assert!(!det.observe(&b));
    }
}

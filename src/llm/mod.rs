//! Model providers and image payload preparation.
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::config::ModelConfig;
use crate::errors::{DroidClawError, DroidClawResult};

pub mod provider;
pub mod providers;

pub use provider::ModelProvider;
pub use providers::gemini::GeminiProvider;
pub use providers::openai_compatible::OpenAiCompatibleProvider;

/// Maximum upload width; screenshots wider than this are downscaled before
/// re-encoding so prompts stay within provider payload limits.
const MAX_UPLOAD_WIDTH: u32 = 800;
const JPEG_QUALITY: u8 = 75;

/// Loads a screenshot, downscales it to at most 800 px wide, re-encodes as
/// JPEG and returns the base64 payload.
pub fn encode_image(path: &Path) -> DroidClawResult<String> {
    let img = image::open(path)
        .map_err(|e| DroidClawError::Model(format!("image load {}: {e}", path.display())))?;

    let img = if img.width() > MAX_UPLOAD_WIDTH {
        let height = (img.height() as f64 * MAX_UPLOAD_WIDTH as f64 / img.width() as f64)
            .round() as u32;
        img.resize(
            MAX_UPLOAD_WIDTH,
            height.max(1),
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };

    let mut jpeg = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| DroidClawError::Model(format!("jpeg encode: {e}")))?;
    Ok(BASE64.encode(&jpeg))
}

/// Instantiates the configured provider.
pub fn build_provider(config: &ModelConfig) -> DroidClawResult<Box<dyn ModelProvider>> {
    let api_key = config.resolve_api_key()?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiCompatibleProvider::new(
            config, api_key, client,
        ))),
        "gemini" => Ok(Box::new(GeminiProvider::new(config, api_key, client))),
        other => Err(DroidClawError::Config(format!(
            "unknown model provider '{other}' (expected 'openai' or 'gemini')"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_image_downscales_wide_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        image::RgbaImage::from_pixel(1600, 900, image::Rgba([10, 200, 30, 255]))
            .save(&path)
            .unwrap();

        let b64 = encode_image(&path).unwrap();
        let jpeg = BASE64.decode(b64).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 800);
        assert_eq!(decoded.height(), 450);
    }

    #[test]
    fn encode_image_keeps_narrow_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narrow.png");
        image::RgbaImage::from_pixel(400, 700, image::Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let b64 = encode_image(&path).unwrap();
        let jpeg = BASE64.decode(b64).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 700));
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let config = ModelConfig {
            provider: "anthropic".into(),
            api_base: "https://example.invalid".into(),
            model: "m".into(),
            api_key: Some("k".into()),
            temperature: 0.0,
            max_completion_tokens: 1024,
            request_timeout_secs: 120,
        };
        assert!(matches!(
            build_provider(&config),
            Err(DroidClawError::Config(_))
        ));
    }
}

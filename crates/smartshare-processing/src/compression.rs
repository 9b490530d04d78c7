//! Compression stage: quality-reduced re-encode of media bytes.
//!
//! Images are re-encoded in their own format; videos and anything else pass through.
//! The stage never hands back a blob larger than the one it was given.

use async_trait::async_trait;
use smartshare_core::{MediaBlob, MediaCategory, Quality};

#[cfg(feature = "image")]
use image::{DynamicImage, ImageFormat};

/// Rewrites a blob into a smaller derivative of the same kind.
#[async_trait]
pub trait Compressor: Send + Sync {
    async fn compress(&self, blob: MediaBlob, quality: Quality) -> anyhow::Result<MediaBlob>;
}

/// Returns every blob unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompressor;

#[async_trait]
impl Compressor for PassthroughCompressor {
    async fn compress(&self, blob: MediaBlob, _quality: Quality) -> anyhow::Result<MediaBlob> {
        Ok(blob)
    }
}

/// Image re-encoder backed by the `image` crate.
///
/// - JPEG: lossy re-encode at the requested quality (floor 1).
/// - PNG: lossless re-encode with best compression and adaptive filtering.
/// - WebP: lossless re-encode.
/// - Other image formats and all videos pass through.
#[cfg(feature = "image")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCompressor;

#[cfg(feature = "image")]
impl ImageCompressor {
    pub fn new() -> Self {
        Self
    }

    /// Re-encode `data`. `Ok(None)` means the format is passed through untouched.
    pub fn recompress(
        data: &[u8],
        mime_type: &str,
        quality: Quality,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        let Some(declared) = ImageFormat::from_mime_type(mime_type) else {
            return Ok(None);
        };
        // Bytes that contradict their declared type keep both, untouched.
        if matches!(image::guess_format(data), Ok(actual) if actual != declared) {
            return Ok(None);
        }
        let format = declared;

        if !matches!(
            format,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP
        ) {
            return Ok(None);
        }

        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| anyhow::anyhow!("Failed to decode {:?} image: {}", format, e))?;

        let encoded = match format {
            ImageFormat::Jpeg => Self::encode_jpeg(&img, quality)?,
            ImageFormat::Png => Self::encode_png(&img)?,
            ImageFormat::WebP => Self::encode_webp(&img)?,
            _ => return Ok(None),
        };

        Ok(Some(encoded))
    }

    fn encode_jpeg(img: &DynamicImage, quality: Quality) -> anyhow::Result<Vec<u8>> {
        use image::codecs::jpeg::JpegEncoder;

        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.value().max(1));
        // JPEG has no alpha channel
        DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| anyhow::anyhow!("Failed to encode JPEG: {}", e))?;
        Ok(buffer)
    }

    fn encode_png(img: &DynamicImage) -> anyhow::Result<Vec<u8>> {
        use image::codecs::png::{CompressionType, FilterType, PngEncoder};

        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
        img.write_with_encoder(encoder)
            .map_err(|e| anyhow::anyhow!("Failed to encode PNG: {}", e))?;
        Ok(buffer)
    }

    fn encode_webp(img: &DynamicImage) -> anyhow::Result<Vec<u8>> {
        use image::codecs::webp::WebPEncoder;

        let mut buffer = Vec::new();
        let encoder = WebPEncoder::new_lossless(&mut buffer);
        DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(encoder)
            .map_err(|e| anyhow::anyhow!("Failed to encode WebP: {}", e))?;
        Ok(buffer)
    }
}

#[cfg(feature = "image")]
#[async_trait]
impl Compressor for ImageCompressor {
    async fn compress(&self, blob: MediaBlob, quality: Quality) -> anyhow::Result<MediaBlob> {
        if blob.category() != MediaCategory::Image {
            return Ok(blob);
        }

        let start = std::time::Instant::now();
        let original_len = blob.len();
        let data = blob.bytes.clone();
        let mime_type = blob.mime_type.clone();

        let encoded = tokio::task::spawn_blocking(move || {
            ImageCompressor::recompress(&data, &mime_type, quality)
        })
        .await??;

        let result = match encoded {
            Some(bytes) if bytes.len() < original_len => MediaBlob::new(bytes, blob.mime_type),
            _ => blob,
        };

        tracing::debug!(
            mime = %result.mime_type,
            quality = quality.value(),
            original_bytes = original_len,
            size_bytes = result.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Compression stage finished"
        );

        Ok(result)
    }
}

/// The compressor used when none is configured.
pub fn default_compressor() -> std::sync::Arc<dyn Compressor> {
    #[cfg(feature = "image")]
    {
        std::sync::Arc::new(ImageCompressor::new())
    }
    #[cfg(not(feature = "image"))]
    {
        std::sync::Arc::new(PassthroughCompressor)
    }
}

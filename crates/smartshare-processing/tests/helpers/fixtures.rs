use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
use smartshare_core::MediaReference;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// A noisy RGB image; noise keeps high-quality JPEGs noticeably larger than low-quality ones.
pub fn noisy_image(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    ImageBuffer::from_fn(width, height, |x, y| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let noise = (state & 0x3F) as u8;
        Rgb([
            ((x * 4) as u8).wrapping_add(noise),
            ((y * 4) as u8).wrapping_add(noise / 2),
            (((x + y) * 2) as u8).wrapping_sub(noise),
        ])
    })
}

pub fn jpeg_bytes(width: u32, height: u32, quality: u8, seed: u32) -> Vec<u8> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(noisy_image(width, height, seed))
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))
        .expect("encode jpeg");
    buffer
}

pub fn png_bytes(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(noisy_image(width, height, seed))
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}

/// Write `bytes` to `dir/name` and return the file's reference.
pub async fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> MediaReference {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.expect("create dir");
    }
    tokio::fs::write(&path, bytes).await.expect("write fixture");
    reference(&path)
}

/// High-quality JPEG fixture on disk.
pub async fn jpeg_file(dir: &Path, name: &str, seed: u32) -> MediaReference {
    write_file(dir, name, &jpeg_bytes(96, 96, 95, seed)).await
}

pub fn reference(path: &Path) -> MediaReference {
    MediaReference::new(path.to_string_lossy().into_owned())
}

pub fn path_of(reference: &MediaReference) -> PathBuf {
    PathBuf::from(reference.as_str())
}

/// Reader that yields `fail_after` bytes of its data, then an I/O error.
pub struct FailingReader {
    data: Vec<u8>,
    position: usize,
    fail_after: usize,
}

impl FailingReader {
    pub fn new(data: Vec<u8>, fail_after: usize) -> Self {
        Self {
            data,
            position: 0,
            fail_after,
        }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.position >= this.fail_after {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected read fault",
            )));
        }
        let end = this.fail_after.min(this.data.len());
        let n = (end - this.position).min(buf.remaining());
        buf.put_slice(&this.data[this.position..this.position + n]);
        this.position += n;
        Poll::Ready(Ok(()))
    }
}

/// Reader that never produces a byte.
pub struct StallingReader;

impl AsyncRead for StallingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

/// Reader that yields `data` once, then never produces another byte.
pub struct PartialReader {
    data: Option<Vec<u8>>,
}

impl PartialReader {
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: Some(data.to_vec()),
        }
    }
}

impl AsyncRead for PartialReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.data.take() {
            Some(data) => {
                buf.put_slice(&data[..data.len().min(buf.remaining())]);
                Poll::Ready(Ok(()))
            }
            None => Poll::Pending,
        }
    }
}

/// Names in `dir` another application would see: everything not hidden.
pub fn public_names(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => panic!("read_dir {}: {}", dir.display(), e),
    };
    let mut names: Vec<String> = entries
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

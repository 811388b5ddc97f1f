pub mod library;

pub use library::{ImageId, ImageLibrary, LibraryImage};

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decoded operator image. Pixels are shared, so cloning a `RawTexture` for
/// every slot it is assigned to never copies image data.
#[derive(Debug, Clone)]
pub struct RawTexture {
    pub name: String,
    pixels: Arc<RgbaImage>,
}

impl RawTexture {
    pub fn new(name: &str, pixels: RgbaImage) -> Self {
        Self {
            name: name.to_string(),
            pixels: Arc::new(pixels),
        }
    }

    pub fn solid(name: &str, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(name, RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn shares_pixels_with(&self, other: &RawTexture) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl ImageSource {
    pub fn display_name(&self) -> String {
        match self {
            ImageSource::Path(path) => path
                .file_name()
                .and_then(|value| value.to_str())
                .unwrap_or("image")
                .to_string(),
            ImageSource::Bytes { name, .. } => name.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read image at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image {name} has no pixels")]
    Empty { name: String },
}

/// Turns an upload into a decoded texture. Hosts with their own decoder
/// (e.g. one running off-thread) implement this and hand results to
/// `LiveryEngine::complete_image_load`.
pub trait ImageLoader {
    fn load(&self, source: &ImageSource) -> Result<RawTexture, LoadError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DecodingLoader;

impl ImageLoader for DecodingLoader {
    fn load(&self, source: &ImageSource) -> Result<RawTexture, LoadError> {
        let name = source.display_name();
        let decoded = match source {
            ImageSource::Path(path) => {
                let bytes = read_image_bytes(path)?;
                image::load_from_memory(&bytes)
            }
            ImageSource::Bytes { bytes, .. } => image::load_from_memory(bytes),
        }
        .map_err(|source| LoadError::Decode {
            name: name.clone(),
            source,
        })?;

        let rgba = decoded.to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(LoadError::Empty { name });
        }
        log::debug!("Decoded image '{}' ({}x{})", name, rgba.width(), rgba.height());
        Ok(RawTexture::new(&name, rgba))
    }
}

fn read_image_bytes(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Read {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{DecodingLoader, ImageLoader, ImageSource, LoadError, RawTexture};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_bytes() {
        let source = ImageSource::Bytes {
            name: "logo.png".to_string(),
            bytes: png_bytes(3, 2),
        };
        let texture = DecodingLoader.load(&source).unwrap();
        assert_eq!(texture.name, "logo.png");
        assert_eq!((texture.width(), texture.height()), (3, 2));
        assert_eq!(texture.pixels().get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let source = ImageSource::Bytes {
            name: "broken.png".to_string(),
            bytes: vec![1, 2, 3, 4],
        };
        assert!(matches!(
            DecodingLoader.load(&source),
            Err(LoadError::Decode { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImageSource::Path(dir.path().join("nope.png"));
        assert!(matches!(
            DecodingLoader.load(&source),
            Err(LoadError::Read { .. })
        ));
    }

    #[test]
    fn decodes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, png_bytes(4, 4)).unwrap();
        let texture = DecodingLoader.load(&ImageSource::Path(path)).unwrap();
        assert_eq!(texture.name, "logo.png");
        assert_eq!(texture.width(), 4);
    }

    #[test]
    fn clones_share_pixels() {
        let a = RawTexture::solid("a", 2, 2, [0; 4]);
        let b = a.clone();
        assert!(a.shares_pixels_with(&b));
        let c = RawTexture::solid("a", 2, 2, [0; 4]);
        assert!(!a.shares_pixels_with(&c));
    }
}

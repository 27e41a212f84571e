//! Asset loading collaborators.
//!
//! Two narrow interfaces: decode a texture file into normalized RGBA8 pixels, and
//! read SPIR-V byte code from disk. Both are startup-time operations; a missing or
//! corrupt file is fatal and reported through [`Error`].

use std::fs::File;
use std::path::Path;

use anyhow::Result;

use crate::Error;

/// Decoded texture data, always 4-channel 8-bit RGBA.
#[derive(Debug, Clone)]
pub struct TextureData {
    /// Pixel bytes, `width * height * 4` of them.
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Load and decode an image file, normalizing the pixel format to RGBA8.
/// # Errors
/// Fails with [`Error::ImageLoadError`] when the file is missing, corrupt, or in
/// an unsupported format.
pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureData> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|source| Error::ImageLoadError {
            path: path.display().to_string(),
            source,
        })?
        .into_rgba8();

    let (width, height) = image.dimensions();
    Ok(TextureData {
        pixels: image.into_raw(),
        width,
        height,
    })
}

/// Read SPIR-V byte code from a file. The code is handed opaquely to
/// [`ShaderModule::new`](crate::ShaderModule::new).
/// # Errors
/// Fails with [`Error::ShaderLoadError`] when the file is unreadable or not valid
/// SPIR-V (wrong magic or truncated words).
pub fn load_spirv(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|source| shader_error(path, source))?;
    let code = ash::util::read_spv(&mut file).map_err(|source| shader_error(path, source))?;
    Ok(code)
}

fn shader_error(path: &Path, source: std::io::Error) -> Error {
    Error::ShaderLoadError {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_texture_is_an_image_load_error() {
        let err = load_texture("does/not/exist.png").unwrap_err();
        let err = err.downcast::<Error>().unwrap();
        assert!(matches!(err, Error::ImageLoadError { .. }));
    }

    #[test]
    fn missing_shader_is_a_shader_load_error() {
        let err = load_spirv("does/not/exist.spv").unwrap_err();
        let err = err.downcast::<Error>().unwrap();
        assert!(matches!(err, Error::ShaderLoadError { .. }));
    }

    #[test]
    fn texture_decodes_to_rgba8() {
        // A 2x1 PNG assembled in memory; the loader must normalize it to RGBA8.
        let mut bytes = Vec::new();
        {
            use image::ImageOutputFormat;
            let img = image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
            image::DynamicImage::ImageRgb8(img)
                .write_to(&mut std::io::Cursor::new(&mut bytes), ImageOutputFormat::Png)
                .unwrap();
        }
        let dir = std::env::temp_dir().join("deimos-asset-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rg.png");
        std::fs::write(&path, &bytes).unwrap();

        let texture = load_texture(&path).unwrap();
        assert_eq!((texture.width, texture.height), (2, 1));
        assert_eq!(texture.pixels.len(), 2 * 4);
        assert_eq!(&texture.pixels[..4], &[255, 0, 0, 255]);
    }
}

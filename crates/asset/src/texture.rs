//! Texture loading: JPEG/PNG into RGBA8.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use corelib::texture::{ColorSpace, TextureData};

use crate::pending::Pending;

/// How decoded images are prepared for upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureOptions {
    /// Flip rows so the first row is the bottom of the image.
    /// glTF UVs already use a top-left origin, so baked maps keep this off.
    pub flip_y: bool,
    pub color_space: ColorSpace,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            flip_y: true,
            color_space: ColorSpace::Linear,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TextureLoader {
    options: TextureOptions,
}

impl TextureLoader {
    pub fn new(options: TextureOptions) -> Self {
        Self { options }
    }

    /// Start loading in the background.
    pub fn load(&self, path: impl Into<PathBuf>) -> Pending<TextureData> {
        let path = path.into();
        let options = self.options;
        Pending::spawn(path.display().to_string(), move || {
            load_texture(&path, options)
        })
    }
}

/// Load a texture synchronously.
pub fn load_texture(path: &Path, options: TextureOptions) -> Result<TextureData> {
    log::info!("Loading texture from {:?}", path);
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read texture {:?}", path))?;
    let texture = decode_texture(&bytes, options)
        .with_context(|| format!("Failed to decode texture {:?}", path))?;
    log::info!(
        "Loaded texture {}x{} with {} bytes",
        texture.width,
        texture.height,
        texture.data.len()
    );
    Ok(texture)
}

/// Decode an encoded image (format sniffed from the bytes).
pub fn decode_texture(bytes: &[u8], options: TextureOptions) -> Result<TextureData> {
    let img = image::load_from_memory(bytes).context("unsupported or corrupt image")?;
    let mut rgba = img.to_rgba8();
    if options.flip_y {
        image::imageops::flip_vertical_in_place(&mut rgba);
    }
    let (width, height) = rgba.dimensions();
    Ok(TextureData::new_rgba8(
        width,
        height,
        rgba.into_raw(),
        options.color_space,
    ))
}

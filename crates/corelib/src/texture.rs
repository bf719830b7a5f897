//! Texture data in CPU-friendly format before GPU upload.

use std::sync::Arc;

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
}

/// How texel values should be interpreted when sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
    /// Colour images (baked lighting, albedo).
    #[default]
    Srgb,
    /// Data textures sampled as-is.
    Linear,
}

#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub color_space: ColorSpace,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>, color_space: ColorSpace) -> Self {
        assert_eq!(
            data.len(),
            (width * height * 4) as usize,
            "Data size doesn't match RGBA8 format"
        );
        Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
            color_space,
        }
    }

    /// Single-texel texture.
    pub fn solid(rgba: [u8; 4], color_space: ColorSpace) -> Self {
        Self::new_rgba8(1, 1, rgba.to_vec(), color_space)
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}

/// Handle into [`crate::scene::Scene`] texture slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// A texture referenced by materials before its image has arrived.
/// `version` bumps every time new data is stored, so uploads can be tracked.
#[derive(Clone, Debug, Default)]
pub struct TextureSlot {
    pub label: String,
    data: Option<Arc<TextureData>>,
    version: u32,
}

impl TextureSlot {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: None,
            version: 0,
        }
    }

    pub fn set(&mut self, data: TextureData) {
        self.data = Some(Arc::new(data));
        self.version += 1;
    }

    #[inline]
    pub fn data(&self) -> Option<&Arc<TextureData>> {
        self.data.as_ref()
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }
}

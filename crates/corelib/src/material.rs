//! Surface descriptors assigned to meshes and point clouds.

use crate::texture::TextureId;

/// RGB colour in sRGB space, as authored (`0xffffe5` etc).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::rgb(channel(16), channel(8), channel(0))
    }

    /// Linear-light components for shading into an sRGB target.
    pub fn to_linear(self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Handle into [`crate::scene::Scene`] material storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    /// Unlit: `color * map`. No lighting is applied.
    Basic { color: Color, map: Option<TextureId> },
    /// Square sprites; with attenuation `size` is in world units at unit depth.
    Points {
        color: Color,
        size: f32,
        size_attenuation: bool,
    },
}

impl Material {
    pub fn basic(color: Color) -> Self {
        Material::Basic { color, map: None }
    }

    pub fn basic_map(map: TextureId) -> Self {
        Material::Basic {
            color: Color::WHITE,
            map: Some(map),
        }
    }

    pub fn points(size: f32) -> Self {
        Material::Points {
            color: Color::WHITE,
            size,
            size_attenuation: true,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Material::Basic { color, .. } | Material::Points { color, .. } => *color,
        }
    }

    pub fn map(&self) -> Option<TextureId> {
        match self {
            Material::Basic { map, .. } => *map,
            Material::Points { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        let c = Color::from_hex(0xffffe5);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 1.0);
        assert!((c.b - 229.0 / 255.0).abs() < 1e-6);
        assert_eq!(Color::from_hex(0xffffff), Color::WHITE);
    }

    #[test]
    fn linear_conversion_endpoints() {
        assert_eq!(Color::rgb(0.0, 1.0, 0.0).to_linear()[0], 0.0);
        assert!((Color::WHITE.to_linear()[1] - 1.0).abs() < 1e-6);
        assert!(Color::rgb(0.5, 0.5, 0.5).to_linear()[2] < 0.5);
    }
}

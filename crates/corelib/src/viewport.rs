//! Window size as seen by the scene: logical size plus a capped pixel ratio.

/// Upper bound for the device pixel ratio used for the render target.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    pixel_ratio: f64,
}

impl Viewport {
    /// Zero dimensions (minimised windows) are clamped to 1.
    pub fn new(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixel_ratio: clamp_pixel_ratio(device_pixel_ratio),
        }
    }

    /// Store new dimensions. Returns `true` if anything changed.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) -> bool {
        let next = Self::new(width, height, device_pixel_ratio);
        let changed = next != *self;
        *self = next;
        changed
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Physical size of the render target: logical size times pixel ratio.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        drawing_buffer_size(self.width, self.height, self.pixel_ratio)
    }
}

pub fn clamp_pixel_ratio(device_pixel_ratio: f64) -> f64 {
    if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio.min(MAX_PIXEL_RATIO)
    } else {
        1.0
    }
}

pub fn drawing_buffer_size(width: u32, height: u32, pixel_ratio: f64) -> (u32, u32) {
    let w = (width as f64 * pixel_ratio).floor() as u32;
    let h = (height as f64 * pixel_ratio).floor() as u32;
    (w.max(1), h.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        assert_eq!(Viewport::new(800, 600, 3.0).pixel_ratio(), 2.0);
        assert_eq!(Viewport::new(800, 600, 1.25).pixel_ratio(), 1.25);
        assert_eq!(Viewport::new(800, 600, f64::NAN).pixel_ratio(), 1.0);
    }

    #[test]
    fn resize_reports_changes_only() {
        let mut vp = Viewport::new(800, 600, 1.0);
        assert!(vp.resize(1024, 768, 1.0));
        assert!(!vp.resize(1024, 768, 1.0));
        assert!(vp.resize(1024, 768, 2.0));
        assert_eq!(vp.drawing_buffer_size(), (2048, 1536));
    }

    #[test]
    fn minimised_window_keeps_positive_size() {
        let vp = Viewport::new(0, 0, 1.0);
        assert_eq!((vp.width(), vp.height()), (1, 1));
        assert!(vp.aspect().is_finite());
    }
}

//! Texture images for particle shading.
//!
//! Particle quads sample one image for their shape and, optionally, a color
//! table that remaps the spawn color over the particle's life. Both are
//! described by a [`TextureConfig`]: raw RGBA pixels plus sampling options.
//!
//! # Supported Formats
//!
//! - PNG (recommended)
//! - JPEG

use std::path::Path;

use crate::error::TextureError;

/// Filter mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Smooth linear filtering (default).
    #[default]
    Linear,
    /// Sharp nearest-neighbor filtering. Good for pixel art.
    Nearest,
}

/// Address mode for texture wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    /// Clamp to edge color (default). Coordinates outside 0-1 use edge pixels.
    #[default]
    ClampToEdge,
    /// Repeat/tile the texture.
    Repeat,
    /// Mirror the texture at boundaries.
    MirrorRepeat,
}

impl FilterMode {
    pub(crate) fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Linear => wgpu::FilterMode::Linear,
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

impl AddressMode {
    pub(crate) fn to_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Pixels and sampling options for a single texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureConfig {
    /// Raw RGBA pixel data (width * height * 4 bytes).
    pub data: Vec<u8>,
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
    /// Filter mode for magnification/minification.
    pub filter: FilterMode,
    /// Address mode for UV coordinates outside 0-1.
    pub address_mode: AddressMode,
}

impl TextureConfig {
    /// Create a texture configuration from raw RGBA data.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not exactly `width * height * 4` bytes long.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // 2x1 texture, opaque white then transparent
    /// let tex = TextureConfig::from_rgba(vec![255, 255, 255, 255, 0, 0, 0, 0], 2, 1);
    /// ```
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Self {
        assert_eq!(
            data.len(),
            (width * height * 4) as usize,
            "RGBA data size mismatch"
        );
        Self {
            data,
            width,
            height,
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
        }
    }

    /// Load a texture from a PNG or JPEG file.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError`] if the file cannot be read or decoded.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let img = image::open(path.as_ref())?.into_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            data: img.into_raw(),
            width,
            height,
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
        })
    }

    /// Pixel data with color channels scaled by alpha, as the GPU samples it.
    ///
    /// Particles blend premultiplied, so a transparent texel must carry no
    /// color.
    pub fn premultiplied(&self) -> Vec<u8> {
        self.data
            .chunks_exact(4)
            .flat_map(|px| {
                let a = px[3];
                [
                    premultiply(px[0], a),
                    premultiply(px[1], a),
                    premultiply(px[2], a),
                    a,
                ]
            })
            .collect()
    }

    /// Set the filter mode.
    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    /// Set the address mode for UV wrapping.
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode = mode;
        self
    }

    /// Create a solid color texture (1x1 pixel).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let red = TextureConfig::solid(255, 0, 0, 255);
    /// ```
    pub fn solid(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            data: vec![r, g, b, a],
            width: 1,
            height: 1,
            filter: FilterMode::Nearest,
            address_mode: AddressMode::ClampToEdge,
        }
    }

    /// Create a horizontal gradient from `start` to `end`.
    ///
    /// One pixel high, which is the shape color tables are sampled in: the
    /// particle's normalized age picks the column.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // Fire color table
    /// let table = TextureConfig::gradient(256, [255, 200, 50, 255], [40, 0, 0, 0]);
    /// ```
    pub fn gradient(width: u32, start: [u8; 4], end: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width * 4) as usize);
        for x in 0..width {
            let t = x as f32 / (width - 1).max(1) as f32;
            data.extend((0..4).map(|c| lerp_u8(start[c], end[c], t)));
        }
        Self {
            data,
            width,
            height: 1,
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
        }
    }
}

/// `channel * alpha / 255`, rounded.
fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u16 * alpha as u16 + 127) / 255) as u8
}

/// Helper function for linear interpolation of u8 values.
fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let a = a as f32;
    let b = b as f32;
    (a + (b - a) * t).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premultiplied_clears_transparent_color() {
        let tex = TextureConfig::from_rgba(
            vec![255, 255, 255, 0, 255, 128, 0, 255, 200, 100, 50, 128],
            3,
            1,
        );
        assert_eq!(
            tex.premultiplied(),
            vec![0, 0, 0, 0, 255, 128, 0, 255, 100, 50, 25, 128]
        );
        // Source pixels stay straight.
        assert_eq!(&tex.data[..4], &[255, 255, 255, 0]);
    }

    #[test]
    fn test_gradient_endpoints() {
        let tex = TextureConfig::gradient(3, [0, 0, 0, 255], [255, 100, 0, 0]);
        assert_eq!(tex.width, 3);
        assert_eq!(tex.height, 1);
        assert_eq!(&tex.data[0..4], &[0, 0, 0, 255]);
        assert_eq!(&tex.data[4..8], &[128, 50, 0, 128]);
        assert_eq!(&tex.data[8..12], &[255, 100, 0, 0]);
    }

    #[test]
    fn test_single_pixel_gradient() {
        let tex = TextureConfig::gradient(1, [10, 20, 30, 40], [0, 0, 0, 0]);
        assert_eq!(tex.data, vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = TextureConfig::from_file("does/not/exist.png").unwrap_err();
        assert!(matches!(err, TextureError::ImageLoad(_) | TextureError::Io(_)));
    }

    #[test]
    #[should_panic(expected = "RGBA data size mismatch")]
    fn test_from_rgba_size_mismatch() {
        TextureConfig::from_rgba(vec![0; 7], 1, 2);
    }
}

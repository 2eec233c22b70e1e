//! Renderer configuration.
//!
//! ```ignore
//! let config = ParticleConfig::new()
//!     .with_image("assets/star.png")
//!     .with_color_table(TextureConfig::gradient(64, [255, 220, 80, 255], [80, 0, 0, 0]))
//!     .with_color(Rgba8::new(255, 128, 0, 255))
//!     .with_color_variation(0.2)
//!     .with_capacity(2000);
//! ```

use std::path::PathBuf;

use crate::error::TextureError;
use crate::textures::TextureConfig;
use crate::vertex::Rgba8;

/// Where a texture image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// PNG or JPEG file on disk, decoded at build time.
    File(PathBuf),
    /// Pixels already in memory.
    Pixels(TextureConfig),
}

impl ImageSource {
    /// Decode the image.
    pub fn load(&self) -> Result<TextureConfig, TextureError> {
        match self {
            ImageSource::File(path) => TextureConfig::from_file(path),
            ImageSource::Pixels(config) => Ok(config.clone()),
        }
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::File(path.into())
    }
}

impl From<String> for ImageSource {
    fn from(path: String) -> Self {
        ImageSource::File(path.into())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::File(path)
    }
}

impl From<TextureConfig> for ImageSource {
    fn from(config: TextureConfig) -> Self {
        ImageSource::Pixels(config)
    }
}

/// Color parameters used when a particle spawns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSettings {
    /// Base color every particle starts from.
    pub color: Rgba8,
    /// 0 keeps the base RGB, 1 makes RGB fully random.
    pub color_variation: f32,
    /// 1 zeroes the base alpha so blending becomes additive.
    pub additive: f32,
    /// 0 keeps the computed alpha, 1 makes alpha fully random.
    pub alpha_variation: f32,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            color: Rgba8::WHITE,
            color_variation: 0.5,
            additive: 1.0,
            alpha_variation: 0.0,
        }
    }
}

/// Everything the renderer builds a render unit from.
///
/// Only `capacity` changes cause a rebuild. Images take effect at the next
/// build, color settings at the next spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleConfig {
    /// Particle image. A build without one fails.
    pub image: Option<ImageSource>,
    /// Optional color table; selects the color-table shading variant.
    pub color_table: Option<ImageSource>,
    pub colors: ColorSettings,
    /// Number of particle slots. Must be in `1..=16383`.
    pub capacity: i64,
    /// Seed for spawn colors; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            image: None,
            color_table: None,
            colors: ColorSettings::default(),
            capacity: 1000,
            seed: None,
        }
    }
}

impl ParticleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, image: impl Into<ImageSource>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_color_table(mut self, table: impl Into<ImageSource>) -> Self {
        self.color_table = Some(table.into());
        self
    }

    pub fn with_color(mut self, color: Rgba8) -> Self {
        self.colors.color = color;
        self
    }

    pub fn with_color_variation(mut self, variation: f32) -> Self {
        self.colors.color_variation = variation;
        self
    }

    pub fn with_additive(mut self, additive: f32) -> Self {
        self.colors.additive = additive;
        self
    }

    pub fn with_alpha_variation(mut self, variation: f32) -> Self {
        self.colors.alpha_variation = variation;
        self
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Make spawn colors reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

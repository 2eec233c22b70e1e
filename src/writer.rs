//! Spawn color randomization.
//!
//! Each channel blends the configured base value with a uniformly random
//! byte:
//!
//! ```text
//! rgb   = base * (1 - variation) + random * variation
//! alpha = (1 - additive) * base_alpha * (1 - alpha_variation) + random * alpha_variation
//! ```
//!
//! Results truncate toward zero and saturate at the ends of the byte range.

use rand::Rng;

use crate::config::ColorSettings;
use crate::vertex::Rgba8;

/// Draw a spawn color for one particle.
pub fn spawn_color<R: Rng>(settings: &ColorSettings, rng: &mut R) -> Rgba8 {
    let var = settings.color_variation;
    let mut channel = |base: u8| mix(base as f32 * (1.0 - var), var, &mut *rng);

    let r = channel(settings.color.r);
    let g = channel(settings.color.g);
    let b = channel(settings.color.b);

    let alpha_var = settings.alpha_variation;
    let a = mix(
        (1.0 - settings.additive) * settings.color.a as f32 * (1.0 - alpha_var),
        alpha_var,
        rng,
    );

    Rgba8::new(r, g, b, a)
}

fn mix<R: Rng>(fixed: f32, variation: f32, rng: &mut R) -> u8 {
    let random = rng.gen_range(0..=255u8) as f32;
    (fixed + random * variation) as u8
}

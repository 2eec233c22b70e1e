//! Error types for tinted-quads.
//!
//! This module provides error types for quad buffer construction, slot
//! writes, shader loading, and texture loading.

use thiserror::Error;

/// Largest vertex count addressable by a 16-bit index buffer.
pub const MAX_VERTICES: i64 = 0xffff;

/// Errors that abort a single build attempt of a render unit.
///
/// A failed build leaves the renderer without a draw node; the next frame
/// tries again.
#[derive(Debug, Error)]
pub enum BuildError {
    /// `capacity * 4` does not fit into a 16-bit index space.
    #[error("Too many particles: {capacity} quads need {} vertices, limit is {}", .capacity.saturating_mul(4), MAX_VERTICES)]
    CapacityExceeded {
        /// Requested particle capacity.
        capacity: i64,
    },
    /// Capacity was zero or negative.
    #[error("Too few particles: capacity must be positive, got {capacity}")]
    EmptyCapacity {
        /// Requested particle capacity.
        capacity: i64,
    },
    /// The primary particle image could not be loaded.
    #[error("Loading particle image failed: {0}")]
    ImageLoadFailed(#[source] TextureError),
}

/// A slot write addressed a quad outside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Slot {index} is out of range for a buffer of {capacity} quads")]
pub struct SlotOutOfRange {
    /// Slot that was written.
    pub index: usize,
    /// Number of slots in the buffer.
    pub capacity: usize,
}

/// Errors raised while loading or compiling shader programs.
///
/// All of these are fatal: without shader programs nothing can render.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The resource store has no entry for a required shader source.
    #[error("Shader source '{key}' is missing from the resource store")]
    ShaderSourceMissing {
        /// Resource key that was looked up.
        key: &'static str,
    },
    /// The shader source is not valid UTF-8.
    #[error("Shader source '{key}' is not valid UTF-8")]
    InvalidEncoding {
        /// Resource key of the broken source.
        key: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },
    /// The graphics backend rejected the program.
    #[error("Failed to compile shader program '{label}': {message}")]
    ShaderCompile {
        /// Program label.
        label: String,
        /// Backend diagnostic.
        message: String,
    },
}

/// Errors that can occur during texture loading.
#[derive(Debug, Error)]
pub enum TextureError {
    /// Failed to decode image file.
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),
    /// Failed to read file from disk.
    #[error("Failed to read texture file: {0}")]
    Io(#[from] std::io::Error),
    /// No image source was configured.
    #[error("No image source configured")]
    NoSource,
}

/// Errors surfaced by renderer operations.
///
/// Only unrecoverable conditions reach the caller; build failures are logged
/// and retried instead.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Shader loading or compilation failed.
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

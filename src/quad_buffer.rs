//! Fixed-capacity quad storage for particles.
//!
//! A [`QuadBuffer`] holds `capacity` quads of four vertices each plus a
//! static 16-bit index list with two triangles per quad. Particles are
//! addressed by slot index; each slot is written in place, so the index list
//! never changes after [`QuadBuffer::build`].
//!
//! ```text
//!  o+0 ---- o+1        triangles: (o, o+1, o+2)
//!   |     /  |                    (o+1, o+3, o+2)
//!   |   /    |
//!  o+2 ---- o+3
//! ```

use std::ops::Range;

use glam::Vec2;

use crate::error::{BuildError, SlotOutOfRange, MAX_VERTICES};
use crate::vertex::{ParticleState, ParticleVertex, Rgba8};

/// Texture coordinate of each quad corner, in vertex order.
pub const CORNERS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// Index pattern of one quad, relative to its first vertex.
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 3, 2];

/// CPU-side vertex and index storage for a fixed number of particle quads.
#[derive(Debug, Clone)]
pub struct QuadBuffer {
    quads: Vec<[ParticleVertex; 4]>,
    indices: Vec<u16>,
    /// Slots written since the last [`QuadBuffer::take_dirty_range`].
    dirty: Option<Range<usize>>,
}

impl QuadBuffer {
    /// Allocate storage for `capacity` quads.
    ///
    /// Every slot starts out unborn (`t = -1`, all other fields zero) with
    /// its corner texture coordinates already in place.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyCapacity`] for `capacity <= 0`, and
    /// [`BuildError::CapacityExceeded`] when `capacity * 4` vertices cannot
    /// be addressed with 16-bit indices.
    pub fn build(capacity: i64) -> Result<Self, BuildError> {
        if capacity.saturating_mul(4) > MAX_VERTICES {
            return Err(BuildError::CapacityExceeded { capacity });
        }
        if capacity <= 0 {
            return Err(BuildError::EmptyCapacity { capacity });
        }
        let count = capacity as usize;

        let unborn = CORNERS.map(|[tx, ty]| ParticleVertex::unborn(tx, ty));
        let quads = vec![unborn; count];

        let mut indices = Vec::with_capacity(count * 6);
        for quad in 0..count {
            let o = (quad * 4) as u16;
            indices.extend(QUAD_INDICES.iter().map(|i| o + i));
        }

        Ok(Self {
            quads,
            indices,
            dirty: None,
        })
    }

    /// Number of quads in the buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.quads.len()
    }

    /// All vertices, four per slot.
    #[inline]
    pub fn vertices(&self) -> &[ParticleVertex] {
        bytemuck::cast_slice(&self.quads)
    }

    /// The static index list, six per slot.
    #[inline]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Read back the four vertices of a slot.
    pub fn read_slot(&self, index: usize) -> Result<&[ParticleVertex; 4], SlotOutOfRange> {
        self.check(index)?;
        Ok(&self.quads[index])
    }

    /// Copy a particle's physical state into all four vertices of a slot.
    ///
    /// `origin` is subtracted from the position. Texture coordinates and
    /// color stay as they are.
    pub fn write_slot(
        &mut self,
        index: usize,
        particle: &ParticleState,
        origin: Vec2,
    ) -> Result<(), SlotOutOfRange> {
        self.check(index)?;
        for vertex in &mut self.quads[index] {
            vertex.copy_state(particle, origin);
        }
        self.mark_dirty(index);
        Ok(())
    }

    /// Set the color shared by the four vertices of a slot.
    pub fn write_color(&mut self, index: usize, color: Rgba8) -> Result<(), SlotOutOfRange> {
        self.check(index)?;
        for vertex in &mut self.quads[index] {
            vertex.color = color;
        }
        self.mark_dirty(index);
        Ok(())
    }

    /// Vertex range touched since the last call, if any.
    ///
    /// Covers every slot written in between, so uploading this range keeps
    /// the GPU copy in sync.
    pub fn take_dirty_range(&mut self) -> Option<Range<usize>> {
        self.dirty
            .take()
            .map(|slots| slots.start * 4..slots.end * 4)
    }

    fn check(&self, index: usize) -> Result<(), SlotOutOfRange> {
        let capacity = self.capacity();
        if index >= capacity {
            return Err(SlotOutOfRange { index, capacity });
        }
        Ok(())
    }

    fn mark_dirty(&mut self, index: usize) {
        self.dirty = Some(match self.dirty.take() {
            Some(r) => r.start.min(index)..r.end.max(index + 1),
            None => index..index + 1,
        });
    }
}

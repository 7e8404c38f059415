//! Instance attribute stream.
//!
//! Projects the ring into the minimal per-instance payload the renderer needs:
//! emission time and seed, nothing else. Position, color and size are derived
//! from these at draw time by the [`shape`](crate::shape) function.
//!
//! The ring is the single source of truth. [`snapshot`] is a borrowed view over
//! it, and [`InstanceBuffer`] is a staging copy that is only ever overwritten
//! wholesale from a ring.

use bytemuck::{Pod, Zeroable};
use std::iter::FusedIterator;
use std::slice;

use crate::error::InvalidInputError;
use crate::ring::{ParticleSlot, SlotRing};

/// Per-instance vertex data. Matches `@location(0)` / `@location(1)` in the
/// render shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    /// Clock time of the slot's current emission.
    pub emission_time: f32,
    /// Per-emission variation seed in `[0, 1)`.
    pub random_seed: f32,
}

impl InstanceRecord {
    /// Byte stride of one record in the instance buffer.
    pub const STRIDE: usize = std::mem::size_of::<Self>();
}

impl From<&ParticleSlot> for InstanceRecord {
    fn from(slot: &ParticleSlot) -> Self {
        Self {
            emission_time: slot.emission_time(),
            random_seed: slot.random_seed(),
        }
    }
}

/// Lazy, read-only view of a ring as instance records, in slot order.
pub fn snapshot<R>(ring: &SlotRing<R>) -> InstanceStream<'_> {
    InstanceStream {
        slots: ring.slots().iter(),
    }
}

/// Iterator returned by [`snapshot`].
#[derive(Clone, Debug)]
pub struct InstanceStream<'a> {
    slots: slice::Iter<'a, ParticleSlot>,
}

impl Iterator for InstanceStream<'_> {
    type Item = InstanceRecord;

    #[inline]
    fn next(&mut self) -> Option<InstanceRecord> {
        self.slots.next().map(InstanceRecord::from)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for InstanceStream<'_> {}
impl FusedIterator for InstanceStream<'_> {}

/// Capacity-sized staging array for GPU upload.
///
/// Allocated once; [`InstanceBuffer::sync`] overwrites every record in place.
#[derive(Debug)]
pub struct InstanceBuffer {
    records: Box<[InstanceRecord]>,
}

impl InstanceBuffer {
    /// Allocate a zeroed buffer with one record per slot of `ring`.
    pub fn for_ring<R>(ring: &SlotRing<R>) -> Self {
        Self {
            records: vec![InstanceRecord::zeroed(); ring.capacity() as usize].into_boxed_slice(),
        }
    }

    /// Copy the ring's current state into the buffer.
    ///
    /// Fails without touching the buffer if the ring's capacity differs, which
    /// happens after the ring has been reconfigured.
    pub fn sync<R>(&mut self, ring: &SlotRing<R>) -> Result<&[InstanceRecord], InvalidInputError> {
        if ring.capacity() != self.capacity() {
            return Err(InvalidInputError::CapacityMismatch {
                buffer: self.capacity(),
                ring: ring.capacity(),
            });
        }
        for (record, slot) in self.records.iter_mut().zip(ring.slots()) {
            *record = InstanceRecord::from(slot);
        }
        Ok(&self.records)
    }

    /// Number of records.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.records.len() as u32
    }

    /// Records as last synced.
    #[inline]
    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    /// Records as raw bytes, ready for `queue.write_buffer`.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmissionConfig;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn ring(rate: f32, life: f32) -> SlotRing {
        SlotRing::new(
            EmissionConfig::new(rate, life).unwrap(),
            SmallRng::seed_from_u64(3),
        )
    }

    #[test]
    fn test_record_layout() {
        assert_eq!(InstanceRecord::STRIDE, 8);
        let record = InstanceRecord { emission_time: 1.5, random_seed: 0.25 };
        let bytes = bytemuck::bytes_of(&record);
        assert_eq!(&bytes[0..4], &1.5f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0.25f32.to_le_bytes());
    }

    #[test]
    fn test_snapshot_matches_slots_in_order() {
        let mut ring = ring(20.0, 1.0);
        ring.advance(2.3);

        let stream = snapshot(&ring);
        assert_eq!(stream.len(), 20);

        for (record, slot) in snapshot(&ring).zip(ring.slots()) {
            assert_eq!(record.emission_time, slot.emission_time());
            assert_eq!(record.random_seed, slot.random_seed());
        }
    }

    #[test]
    fn test_snapshot_follows_ring() {
        let mut ring = ring(10.0, 1.0);
        let before: Vec<InstanceRecord> = snapshot(&ring).collect();
        ring.advance(0.55);
        let after: Vec<InstanceRecord> = snapshot(&ring).collect();
        assert_ne!(before, after);
        assert_eq!(after[0].emission_time, ring.slot(0).unwrap().emission_time());
    }

    #[test]
    fn test_buffer_sync() {
        let mut ring = ring(16.0, 0.5);
        let mut buffer = InstanceBuffer::for_ring(&ring);
        assert_eq!(buffer.capacity(), 8);
        assert!(buffer.records().iter().all(|r| *r == InstanceRecord::default()));

        ring.advance(1.0);
        let synced = buffer.sync(&ring).unwrap().to_vec();
        let expected: Vec<InstanceRecord> = snapshot(&ring).collect();
        assert_eq!(synced, expected);
        assert_eq!(buffer.as_bytes().len(), 8 * InstanceRecord::STRIDE);
    }

    #[test]
    fn test_buffer_rejects_other_capacity() {
        let mut ring = ring(16.0, 0.5);
        let mut buffer = InstanceBuffer::for_ring(&ring);
        ring.reconfigure(EmissionConfig::new(32.0, 0.5).unwrap());

        let err = buffer.sync(&ring).unwrap_err();
        assert_eq!(err, InvalidInputError::CapacityMismatch { buffer: 8, ring: 16 });
    }
}

//! Render boundary and per-frame driver.
//!
//! The core never touches GPU handles. It hands a capacity-sized slice of
//! [`InstanceRecord`]s and a [`FrameParams`] to an [`InstanceSink`], which is
//! expected to upload the records and issue one batched draw of the
//! `visible_count` quads ending at the last slot. [`GpuRenderer`](crate::gpu::GpuRenderer) is the wgpu
//! sink; [`MemorySink`] keeps everything in memory for tests and offline use.

use rand::rngs::SmallRng;
use rand::Rng;
use std::convert::Infallible;
use std::ops::Range;
use thiserror::Error;

use crate::config::EmissionConfig;
use crate::error::InvalidInputError;
use crate::scheduler::EmissionScheduler;
use crate::stream::{InstanceBuffer, InstanceRecord};

/// Per-frame values the renderer needs besides the instance records.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameParams {
    /// Simulation clock for this frame.
    pub time: f32,
    /// Number of instances to draw.
    pub visible_count: u32,
    /// Slot index of the first drawn instance. The draw always runs to the
    /// end of the ring.
    pub first_instance: u32,
    /// Particle lifetime, for normalizing age.
    pub life_duration: f32,
    /// Quad half-size.
    pub particle_size: f32,
}

impl FrameParams {
    /// Instance range to draw; slot indices, not offsets into the range.
    #[inline]
    pub fn instances(&self) -> Range<u32> {
        self.first_instance..self.first_instance + self.visible_count
    }
}

/// Consumer of instance data: one upload and one draw per frame.
pub trait InstanceSink {
    /// Error reported by the backend.
    type Error;

    /// Replace the instance buffer contents with `records`.
    fn upload(&mut self, records: &[InstanceRecord]) -> Result<(), Self::Error>;

    /// Draw the instances in `frame.instances()` of the particle quad.
    fn draw(&mut self, frame: &FrameParams) -> Result<(), Self::Error>;
}

/// Failure while running a frame.
#[derive(Debug, Error)]
pub enum FrameError<E> {
    /// The frame's delta time was rejected; nothing was uploaded or drawn.
    #[error(transparent)]
    Input(#[from] InvalidInputError),
    /// The sink failed to upload or draw.
    #[error("render sink failed: {0}")]
    Sink(E),
}

/// Scheduler plus staging buffer, stepped once per frame.
///
/// Each [`frame`](Self::frame) runs `tick`, then `sync`, then `upload`, then
/// `draw`, in that order. The ring is fully advanced before it is copied out.
#[derive(Debug)]
pub struct FramePipeline<R = SmallRng> {
    scheduler: EmissionScheduler<R>,
    buffer: InstanceBuffer,
}

impl<R: Rng> FramePipeline<R> {
    /// Wrap a scheduler and allocate its staging buffer.
    pub fn new(scheduler: EmissionScheduler<R>) -> Self {
        let buffer = InstanceBuffer::for_ring(scheduler.ring());
        Self { scheduler, buffer }
    }

    /// Run one frame against `sink`.
    pub fn frame<S: InstanceSink>(
        &mut self,
        delta_time: f32,
        sink: &mut S,
    ) -> Result<FrameParams, FrameError<S::Error>> {
        self.scheduler.tick(delta_time)?;

        let records = self.buffer.sync(self.scheduler.ring())?;
        sink.upload(records).map_err(FrameError::Sink)?;

        let config = self.scheduler.config();
        let visible = self.scheduler.visible_range();
        let frame = FrameParams {
            time: self.scheduler.clock(),
            visible_count: visible.end - visible.start,
            first_instance: visible.start,
            life_duration: config.life_duration(),
            particle_size: config.particle_size(),
        };
        sink.draw(&frame).map_err(FrameError::Sink)?;
        Ok(frame)
    }

    /// Start a new epoch with `config`, reallocating the staging buffer.
    pub fn reconfigure(&mut self, config: EmissionConfig) {
        self.scheduler.reconfigure(config);
        self.buffer = InstanceBuffer::for_ring(self.scheduler.ring());
    }

    /// Restart the current configuration from time zero.
    pub fn reset(&mut self) {
        self.scheduler.reset();
    }
}

impl<R> FramePipeline<R> {
    /// The wrapped scheduler.
    #[inline]
    pub fn scheduler(&self) -> &EmissionScheduler<R> {
        &self.scheduler
    }

    /// Records as of the last frame.
    #[inline]
    pub fn records(&self) -> &[InstanceRecord] {
        self.buffer.records()
    }
}

/// Sink that keeps the latest upload and every draw in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Contents of the most recent upload.
    pub records: Vec<InstanceRecord>,
    /// Number of uploads received.
    pub uploads: usize,
    /// Every draw, in order.
    pub draws: Vec<FrameParams>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The records that the most recent draw would have rendered.
    pub fn visible_records(&self) -> &[InstanceRecord] {
        let Some(frame) = self.draws.last() else {
            return &[];
        };
        let len = self.records.len();
        let range = frame.instances();
        &self.records[(range.start as usize).min(len)..(range.end as usize).min(len)]
    }
}

impl InstanceSink for MemorySink {
    type Error = Infallible;

    fn upload(&mut self, records: &[InstanceRecord]) -> Result<(), Infallible> {
        self.records.clear();
        self.records.extend_from_slice(records);
        self.uploads += 1;
        Ok(())
    }

    fn draw(&mut self, frame: &FrameParams) -> Result<(), Infallible> {
        self.draws.push(*frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::snapshot;

    fn pipeline(rate: f32, life: f32) -> FramePipeline {
        let config = EmissionConfig::new(rate, life).unwrap();
        FramePipeline::new(EmissionScheduler::with_seed(config, 5))
    }

    #[test]
    fn test_frame_uploads_full_capacity() {
        let mut pipeline = pipeline(100.0, 1.0);
        let mut sink = MemorySink::new();

        let frame = pipeline.frame(0.25, &mut sink).unwrap();

        assert_eq!(sink.uploads, 1);
        assert_eq!(sink.records.len(), 100);
        assert_eq!(frame.visible_count, 25);
        assert_eq!(frame.instances(), 75..100);
        assert_eq!(sink.visible_records(), &sink.records[75..]);
        assert_eq!(sink.draws, vec![frame]);
    }

    #[test]
    fn test_frame_uploads_advanced_state() {
        let mut pipeline = pipeline(10.0, 1.0);
        let mut sink = MemorySink::new();

        pipeline.frame(0.75, &mut sink).unwrap();

        let expected: Vec<InstanceRecord> = snapshot(pipeline.scheduler().ring()).collect();
        assert_eq!(sink.records, expected);
        for record in &sink.records {
            assert!(0.75 - record.emission_time < 1.0);
        }
    }

    #[test]
    fn test_ramp_draws_emitted_particles() {
        let mut pipeline = pipeline(1000.0, 2.0);
        let mut sink = MemorySink::new();

        for _ in 0..50 {
            pipeline.frame(0.01, &mut sink).unwrap();
        }
        let frame = *sink.draws.last().unwrap();
        assert!(frame.visible_count >= 499);
        assert_eq!(frame.first_instance + frame.visible_count, 2000);

        let drawn = sink.visible_records();
        assert_eq!(drawn.len(), frame.visible_count as usize);
        for record in drawn {
            assert!(record.emission_time >= 0.0, "drawn before emission: {:?}", record);
            assert!(record.emission_time <= frame.time);
        }
    }

    #[test]
    fn test_frame_params() {
        let config = EmissionConfig::new(50.0, 2.0).unwrap().with_particle_size(0.03).unwrap();
        let mut pipeline = FramePipeline::new(EmissionScheduler::with_seed(config, 1));
        let mut sink = MemorySink::new();

        pipeline.frame(0.5, &mut sink).unwrap();
        let frame = pipeline.frame(0.5, &mut sink).unwrap();

        assert_eq!(frame.time, 1.0);
        assert_eq!(frame.visible_count, 50);
        assert_eq!(frame.instances(), 50..100);
        assert_eq!(frame.life_duration, 2.0);
        assert_eq!(frame.particle_size, 0.03);
    }

    #[test]
    fn test_rejected_frame_touches_nothing() {
        let mut pipeline = pipeline(10.0, 1.0);
        let mut sink = MemorySink::new();

        let err = pipeline.frame(-1.0, &mut sink).unwrap_err();
        assert!(matches!(err, FrameError::Input(InvalidInputError::NegativeDelta(_))));
        assert_eq!(sink.uploads, 0);
        assert!(sink.draws.is_empty());
    }

    #[test]
    fn test_reconfigure_resizes_buffer() {
        let mut pipeline = pipeline(10.0, 1.0);
        let mut sink = MemorySink::new();
        pipeline.frame(0.5, &mut sink).unwrap();

        pipeline.reconfigure(EmissionConfig::new(40.0, 1.0).unwrap());
        pipeline.frame(0.5, &mut sink).unwrap();

        assert_eq!(sink.records.len(), 40);
        assert_eq!(pipeline.records().len(), 40);
        assert_eq!(sink.draws.last().unwrap().visible_count, 20);
    }

    struct FailingSink;

    impl InstanceSink for FailingSink {
        type Error = &'static str;

        fn upload(&mut self, _records: &[InstanceRecord]) -> Result<(), Self::Error> {
            Err("device lost")
        }

        fn draw(&mut self, _frame: &FrameParams) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_error_is_reported() {
        let mut pipeline = pipeline(10.0, 1.0);
        let err = pipeline.frame(0.1, &mut FailingSink).unwrap_err();
        assert_eq!(err.to_string(), "render sink failed: device lost");
        // The clock still moved: the tick itself succeeded.
        assert!((pipeline.scheduler().clock() - 0.1).abs() < 1e-7);
    }
}

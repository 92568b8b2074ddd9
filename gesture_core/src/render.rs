//! Renderer seam for the slave.
//!
//! The render loop takes the state lock once per frame and hands the
//! renderer a [`FrameView`] borrowing the trail store. Everything a frame
//! draws is derived from that one consistent view. The helpers here
//! compute the drawing style (afterimage fade, line width, position
//! marker) so every renderer draws the same picture.

use crate::config::RenderConfig;
use crate::ring::{FifoRing, OverwriteRing};
use crate::sample::{Rgb, Sample};
use crate::trail_store::{FrameStats, Segment, TrackRecord, TrailStore};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Radius of the newest afterimage.
pub const GHOST_RADIUS: f64 = 0.1;
/// Radius lost per older afterimage.
pub const GHOST_RADIUS_STEP: f64 = 0.005;
/// Opacity lost per older afterimage.
pub const GHOST_ALPHA_STEP: f64 = 0.05;
/// Line width multiplier applied on top of the configured thickness.
pub const LINE_WIDTH_FACTOR: f64 = 1.5;
/// Segment slots an incremental renderer redraws as one unit.
pub const SEGMENT_BLOCK: usize = 1024;

/// One afterimage ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostPoint {
    pub position: Sample,
    pub radius: f64,
    pub alpha: f64,
}

/// Fading afterimages, newest first.
///
/// Nothing is drawn until the ring has filled. Points at z = 0 are
/// skipped and do not consume a fade step.
pub fn afterimage_points(ring: &FifoRing<Sample>) -> Vec<GhostPoint> {
    if !ring.is_full() {
        return Vec::new();
    }

    ring.newest_first()
        .filter(|s| s.z != 0.0)
        .enumerate()
        .map(|(i, s)| GhostPoint {
            position: *s,
            radius: (GHOST_RADIUS - GHOST_RADIUS_STEP * i as f64).max(0.0),
            alpha: (1.0 - GHOST_ALPHA_STEP * i as f64).max(0.0),
        })
        .collect()
}

/// Drawn width of a segment; lines higher up read thicker.
pub fn line_width(segment: &Segment, thickness: f64) -> f64 {
    (segment.p1.y + 2.0) * thickness * LINE_WIDTH_FACTOR
}

/// Where to draw the current-position sphere, if anywhere.
pub fn position_marker(record: &TrackRecord) -> Option<Sample> {
    let latest = record.latest();
    (latest.z != 0.0).then_some(latest)
}

/// Blocks of a segment ring written by pushes `from..to`, counted as
/// [`OverwriteRing::total_pushed`] values. Sorted, without repeats.
pub fn dirty_segment_blocks(capacity: usize, from: u64, to: u64) -> Vec<usize> {
    let capacity = capacity.max(1);
    if to <= from {
        return Vec::new();
    }
    if to - from >= capacity as u64 {
        return (0..capacity.div_ceil(SEGMENT_BLOCK)).collect();
    }

    let blocks: BTreeSet<usize> = (from..to)
        .map(|n| (n % capacity as u64) as usize / SEGMENT_BLOCK)
        .collect();
    blocks.into_iter().collect()
}

/// Segments stored in one block, in slot order.
pub fn segment_block(segments: &OverwriteRing<Segment>, block: usize) -> &[Segment] {
    let all = segments.as_slice();
    let start = (block * SEGMENT_BLOCK).min(all.len());
    let end = (start + SEGMENT_BLOCK).min(all.len());
    &all[start..end]
}

/// A read-only view of the slave state for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub store: &'a TrailStore,
    pub frame: u64,
    /// Colour-cycle value at this frame
    pub cycle_color: Rgb,
    pub style: &'a RenderConfig,
}

impl<'a> FrameView<'a> {
    pub fn new(store: &'a TrailStore, frame: u64, cycle_color: Rgb, style: &'a RenderConfig) -> Self {
        Self {
            store,
            frame,
            cycle_color,
            style,
        }
    }

    /// Known object names in first-observation order.
    pub fn names(&self) -> &'a [String] {
        let store = self.store;
        store.names()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &'a TrackRecord> + 'a {
        let store = self.store;
        store.records()
    }

    pub fn record(&self, name: &str) -> Option<&'a TrackRecord> {
        let store = self.store;
        store.record(name)
    }

    pub fn color_for(&self, name: &str) -> Rgb {
        self.store.color_for(name)
    }

    pub fn latest(&self, name: &str) -> Option<Sample> {
        self.store.record(name).map(TrackRecord::latest)
    }

    pub fn stats(&self) -> FrameStats {
        self.store.stats()
    }

    /// Current-position sphere and its colour, if the object is off the ground.
    pub fn marker(&self, record: &TrackRecord) -> Option<(Sample, Rgb)> {
        position_marker(record).map(|position| (position, self.color_for(record.name())))
    }

    pub fn ghosts(&self, record: &TrackRecord) -> Vec<GhostPoint> {
        afterimage_points(record.afterimages())
    }

    pub fn line_width(&self, segment: &Segment) -> f64 {
        line_width(segment, self.style.line_thickness)
    }
}

/// Anything that can draw a frame.
pub trait Renderer {
    fn render(&mut self, frame: &FrameView<'_>);

    /// Called once after the last frame.
    fn finish(&mut self) {}
}

/// Headless renderer: logs statistics every N frames.
#[derive(Debug, Default)]
pub struct StatsRenderer {
    every: u64,
    frames: u64,
    last: Option<FrameStats>,
}

impl StatsRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
            last: None,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Statistics of the most recent frame.
    pub fn last_stats(&self) -> Option<&FrameStats> {
        self.last.as_ref()
    }
}

impl Renderer for StatsRenderer {
    fn render(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        let stats = frame.stats();

        if self.frames % self.every.max(1) == 0 {
            debug!(
                "frame {}: {} tracks, tick {}, {} segments, {} ghosts, mean distance {:?}, speed {:.4}, {} datagrams ({} invalid)",
                frame.frame,
                stats.tracks,
                stats.ticks,
                stats.segments,
                stats.afterimages,
                stats.mean_distance,
                stats.average_speed,
                stats.counters.received,
                stats.counters.invalid
            );
        }
        self.last = Some(stats);
    }

    fn finish(&mut self) {
        if let Some(stats) = &self.last {
            info!(
                "rendered {} frames: {} tracks, {} ticks, {} valid / {} invalid datagrams",
                self.frames, stats.tracks, stats.ticks, stats.counters.valid, stats.counters.invalid
            );
        }
    }
}

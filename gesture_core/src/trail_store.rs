//! The TRAIL STORE - slave-side accumulation of everything a frame draws.
//!
//! Each datagram goes through a fixed pipeline:
//! 1. Decode (invalid payloads only bump counters)
//! 2. Lookup-or-create the per-object record
//! 3. History write at the shared tick cursor
//! 4. Afterimage sampling (every Nth sample)
//! 5. Segment recording from the current line end
//! 6. Tick advancement and the mean-distance series
//!
//! Every buffer is bounded. Nothing is ever removed: an object seen once
//! keeps its record for the life of the process.

use crate::config::{TickMode, TrailConfig};
use crate::ring::{FifoRing, OverwriteRing, TickRing};
use crate::sample::{Rgb, Sample};
use crate::stats::{average_velocity, color_for_distance, mean_pairwise_distance};
use crate::wire::{self, WireMessage};
use crate::error::WireError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

// ============================================================================
// RECORDS
// ============================================================================

/// One drawn line piece between two consecutive non-zero samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub p1: Sample,
    pub p2: Sample,
    pub color: Rgb,
}

impl Segment {
    /// True when both endpoints coincide, as for the first segment of a trail.
    pub fn is_degenerate(&self) -> bool {
        self.p1 == self.p2
    }
}

/// Everything kept for one tracked object.
#[derive(Debug, Clone)]
pub struct TrackRecord {
    name: String,
    history: TickRing<Sample>,
    afterimages: FifoRing<Sample>,
    segments: OverwriteRing<Segment>,

    /// Start point of the next segment; seeded with the first sample
    line_end: Sample,

    /// Most recent sample, whatever tick it arrived in
    latest: Sample,

    /// Samples ingested for this object
    ingested: u64,
}

impl TrackRecord {
    fn new(name: &str, first: Sample, config: &TrailConfig) -> Self {
        Self {
            name: name.to_string(),
            history: TickRing::new(config.history_capacity),
            afterimages: FifoRing::new(config.afterimage_capacity),
            segments: OverwriteRing::new(config.segment_capacity),
            line_end: first,
            latest: Sample::ZERO,
            ingested: 0,
        }
    }

    fn record(&mut self, sample: Sample, head: usize, color: Rgb, drawing: bool, stride: u64) {
        self.history.write(head, sample);
        self.latest = sample;

        if self.ingested % stride.max(1) == 0 {
            self.afterimages.push(sample);
        }
        self.ingested += 1;

        if drawing && !sample.is_zero() {
            self.segments.push(Segment {
                p1: self.line_end,
                p2: sample,
                color,
            });
            self.line_end = sample;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn history(&self) -> &TickRing<Sample> {
        &self.history
    }

    /// History samples oldest → newest.
    pub fn history_samples(&self) -> Vec<Sample> {
        self.history.iter_chronological().copied().collect()
    }

    pub fn afterimages(&self) -> &FifoRing<Sample> {
        &self.afterimages
    }

    pub fn segments(&self) -> &OverwriteRing<Segment> {
        &self.segments
    }

    pub fn latest(&self) -> Sample {
        self.latest
    }

    pub fn line_end(&self) -> Sample {
        self.line_end
    }

    pub fn ingested(&self) -> u64 {
        self.ingested
    }

    /// Mean per-tick displacement over the recent history.
    pub fn velocity(&self) -> Vector3<f64> {
        average_velocity(&self.history_samples())
    }
}

// ============================================================================
// OUTCOMES & COUNTERS
// ============================================================================

/// What a single ingest did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Accepted { new_track: bool, tick_advanced: bool },
    Rejected { reason: WireError, tick_advanced: bool },
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }

    pub fn tick_advanced(&self) -> bool {
        match self {
            IngestOutcome::Accepted { tick_advanced, .. } | IngestOutcome::Rejected { tick_advanced, .. } => {
                *tick_advanced
            }
        }
    }
}

/// Datagram counters since the store was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounters {
    pub received: u64,
    pub valid: u64,
    pub invalid: u64,
}

/// Per-frame summary handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub ticks: u64,
    pub head: usize,
    pub tracks: usize,
    pub segments: usize,
    pub afterimages: usize,
    pub mean_distance: Option<f64>,
    pub average_speed: f64,
    pub counters: MessageCounters,
}

// ============================================================================
// TRAIL STORE
// ============================================================================

/// Bounded per-object trails plus the shared tick cursor.
#[derive(Debug, Clone)]
pub struct TrailStore {
    config: TrailConfig,

    /// Known object names in first-observation order
    names: Vec<String>,
    records: HashMap<String, TrackRecord>,

    /// Mean pairwise distance per tick, aligned with the histories
    distances: TickRing<f64>,

    /// Shared write cursor of every history and the distance series
    head: usize,

    /// Valid messages since the last tick advance
    pending: usize,

    ticks: u64,
    counters: MessageCounters,

    /// Receiver-side drawing flag
    drawing: bool,
}

impl TrailStore {
    pub fn new(config: TrailConfig) -> Self {
        Self {
            distances: TickRing::new(config.history_capacity),
            drawing: config.record_segments,
            names: Vec::new(),
            records: HashMap::new(),
            head: 0,
            pending: 0,
            ticks: 0,
            counters: MessageCounters::default(),
            config,
        }
    }

    /// Decodes one datagram and ingests it if valid.
    ///
    /// `color` is the colour-cycle value given to any segment recorded.
    pub fn ingest_datagram(&mut self, payload: &[u8], color: Rgb) -> IngestOutcome {
        match wire::decode(payload, self.config.decode_policy) {
            Ok(message) => self.ingest(&message, color),
            Err(reason) => {
                trace!("dropping datagram ({} bytes): {}", payload.len(), reason);
                let tick_advanced = self.note_invalid();
                IngestOutcome::Rejected { reason, tick_advanced }
            }
        }
    }

    /// Ingests a decoded message.
    pub fn ingest(&mut self, message: &WireMessage, color: Rgb) -> IngestOutcome {
        self.counters.received += 1;
        self.counters.valid += 1;

        let head = self.head;
        let drawing = self.drawing;
        let stride = self.config.afterimage_stride;

        let new_track = !self.records.contains_key(&message.name);
        if new_track {
            debug!("new tracked object {:?} (#{})", message.name, self.names.len() + 1);
            self.names.push(message.name.clone());
            self.records
                .insert(message.name.clone(), TrackRecord::new(&message.name, message.sample, &self.config));
        }
        if let Some(record) = self.records.get_mut(&message.name) {
            record.record(message.sample, head, color, drawing, stride);
        }

        let tick_advanced = match self.config.tick_mode {
            TickMode::RoundCount => {
                self.pending += 1;
                if self.pending >= self.names.len() {
                    self.advance_tick();
                    true
                } else {
                    false
                }
            }
            TickMode::Delimited => false,
        };

        IngestOutcome::Accepted { new_track, tick_advanced }
    }

    /// Counts a rejected payload. Returns whether it closed a tick.
    pub fn note_invalid(&mut self) -> bool {
        self.counters.received += 1;
        self.counters.invalid += 1;

        match self.config.tick_mode {
            TickMode::Delimited => {
                self.advance_tick();
                true
            }
            TickMode::RoundCount => false,
        }
    }

    /// Closes the current tick: records the mean distance when every
    /// expected object is known, then moves the shared cursor.
    pub fn advance_tick(&mut self) {
        if self.names.len() == self.config.expected_objects {
            let latest: Vec<Sample> = self
                .names
                .iter()
                .filter_map(|name| self.records.get(name))
                .map(TrackRecord::latest)
                .collect();
            if let Some(mean) = mean_pairwise_distance(&latest) {
                self.distances.write(self.head, mean);
            }
        }

        self.head = (self.head + 1) % self.distances.capacity();
        self.pending = 0;
        self.ticks += 1;
        trace!("tick {} closed, head now {}", self.ticks, self.head);
    }

    fn previous_slot(&self) -> usize {
        let capacity = self.distances.capacity();
        (self.head + capacity - 1) % capacity
    }

    /// Mean distance recorded for the most recently closed tick.
    pub fn latest_mean_distance(&self) -> Option<f64> {
        self.distances.get(self.previous_slot()).copied()
    }

    /// Colour derived from the last closed tick's mean distance; white
    /// until a distance has been recorded there.
    pub fn current_color(&self) -> Rgb {
        self.latest_mean_distance()
            .map(color_for_distance)
            .unwrap_or(Rgb::WHITE)
    }

    /// Drawing colour for one object. Unknown objects are white.
    pub fn color_for(&self, name: &str) -> Rgb {
        if self.records.contains_key(name) {
            self.current_color()
        } else {
            Rgb::WHITE
        }
    }

    /// Velocity of one object; zero if unknown or too short a history.
    pub fn velocity(&self, name: &str) -> Vector3<f64> {
        self.records
            .get(name)
            .map(TrackRecord::velocity)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Mean absolute per-axis velocity over all objects.
    pub fn average_speed(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .records
            .values()
            .map(|record| record.velocity().abs().sum() / 3.0)
            .sum();
        total / self.records.len() as f64
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            ticks: self.ticks,
            head: self.head,
            tracks: self.names.len(),
            segments: self.records.values().map(|r| r.segments.len()).sum(),
            afterimages: self.records.values().map(|r| r.afterimages.len()).sum(),
            mean_distance: self.latest_mean_distance(),
            average_speed: self.average_speed(),
            counters: self.counters,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Known names in first-observation order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn record(&self, name: &str) -> Option<&TrackRecord> {
        self.records.get(name)
    }

    /// Records in first-observation order.
    pub fn records(&self) -> impl Iterator<Item = &TrackRecord> + '_ {
        self.names.iter().filter_map(|name| self.records.get(name))
    }

    pub fn track_count(&self) -> usize {
        self.names.len()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn counters(&self) -> MessageCounters {
        self.counters
    }

    pub fn distances(&self) -> &TickRing<f64> {
        &self.distances
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn set_drawing(&mut self, drawing: bool) {
        self.drawing = drawing;
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }
}

impl Default for TrailStore {
    fn default() -> Self {
        Self::new(TrailConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const PAINT: Rgb = Rgb { r: 0.2, g: 0.4, b: 0.6 };

    fn msg(name: &str, x: f64, y: f64, z: f64) -> WireMessage {
        WireMessage {
            name: name.to_string(),
            sample: Sample::new(x, y, z),
        }
    }

    fn store_for(expected: usize) -> TrailStore {
        TrailStore::new(TrailConfig {
            expected_objects: expected,
            ..TrailConfig::default()
        })
    }

    /// Introduces every name, then keeps feeding until no round is half done.
    fn prime(store: &mut TrailStore, names: &[&str]) {
        for name in names {
            store.ingest(&msg(name, 1.0, 1.0, 1.0), PAINT);
        }
        let mut i = 0;
        while store.pending() != 0 {
            store.ingest(&msg(names[i % names.len()], 1.0, 1.0, 1.0), PAINT);
            i += 1;
        }
    }

    fn assert_round_advances_once(store: &mut TrailStore, round: &[&str]) {
        let head = store.head();
        let capacity = store.distances().capacity();
        for (i, name) in round.iter().enumerate() {
            let outcome = store.ingest(&msg(name, 0.5, 0.5, 0.5), PAINT);
            let last = i + 1 == round.len();
            assert_eq!(outcome.tick_advanced(), last, "message {} of round {:?}", i, round);
        }
        assert_eq!(store.head(), (head + 1) % capacity);
    }

    #[test]
    fn test_tick_advances_per_round_two_objects() {
        let mut store = store_for(2);
        prime(&mut store, &["A", "B"]);

        assert_round_advances_once(&mut store, &["A", "B"]);
        assert_round_advances_once(&mut store, &["B", "A"]);
        // Counts messages, not distinct names
        assert_round_advances_once(&mut store, &["A", "A"]);
    }

    #[test]
    fn test_tick_advances_per_round_four_objects() {
        let mut store = store_for(4);
        prime(&mut store, &["A", "B", "C", "D"]);

        assert_round_advances_once(&mut store, &["A", "B", "C", "D"]);
        assert_round_advances_once(&mut store, &["D", "C", "B", "A"]);
        assert_round_advances_once(&mut store, &["C", "A", "D", "B"]);
    }

    #[test]
    fn test_new_objects_join_in_order() {
        let mut store = store_for(4);
        store.ingest(&msg("Wand", 0.1, 0.1, 0.1), PAINT);
        store.ingest(&msg("Hat", 0.2, 0.2, 0.2), PAINT);
        store.ingest(&msg("Wand", 0.3, 0.3, 0.3), PAINT);
        store.ingest(&msg("Glove", 0.4, 0.4, 0.4), PAINT);

        assert_eq!(store.names(), &["Wand", "Hat", "Glove"]);
        let order: Vec<&str> = store.records().map(TrackRecord::name).collect();
        assert_eq!(order, vec!["Wand", "Hat", "Glove"]);
    }

    #[test]
    fn test_history_holds_last_capacity_samples() {
        let capacity = 5;
        let mut store = TrailStore::new(TrailConfig {
            history_capacity: capacity,
            expected_objects: 2,
            ..TrailConfig::default()
        });

        let rounds = 37;
        for t in 0..rounds {
            store.ingest(&msg("A", t as f64, 0.0, 1.0), PAINT);
            store.ingest(&msg("B", 0.0, t as f64, 1.0), PAINT);
        }

        for (name, axis) in [("A", 0), ("B", 1)] {
            let record = store.record(name).unwrap();
            assert!(record.history().len() <= capacity);
            let values: Vec<f64> = record
                .history_samples()
                .iter()
                .map(|s| if axis == 0 { s.x } else { s.y })
                .collect();
            let expected: Vec<f64> = ((rounds - capacity)..rounds).map(|t| t as f64).collect();
            assert_eq!(values, expected, "history of {}", name);
        }
    }

    #[test]
    fn test_mean_distance_recorded_only_at_expected_count() {
        let mut store = store_for(2);
        assert_eq!(store.current_color(), Rgb::WHITE);

        store.ingest(&msg("A", 0.0, 0.0, 1.0), PAINT);
        // One known object: the tick closed but nothing was recorded
        assert_eq!(store.head(), 1);
        assert_eq!(store.latest_mean_distance(), None);
        assert_eq!(store.color_for("A"), Rgb::WHITE);

        store.ingest(&msg("B", 0.0, 0.0, 3.0), PAINT);
        store.ingest(&msg("A", 0.0, 0.0, 1.0), PAINT);
        assert_eq!(store.head(), 2);
        assert_relative_eq!(store.latest_mean_distance().unwrap(), 2.0);
        assert_eq!(store.color_for("A"), Rgb::new(1.0, 1.0, 0.0));
        assert_eq!(store.color_for("nobody"), Rgb::WHITE);
    }

    #[test]
    fn test_mean_distance_skipped_when_count_differs() {
        let mut store = store_for(4);
        for _ in 0..10 {
            store.ingest(&msg("A", 0.0, 0.0, 1.0), PAINT);
            store.ingest(&msg("B", 1.0, 0.0, 1.0), PAINT);
        }
        assert!(store.distances().is_empty());
        assert_eq!(store.current_color(), Rgb::WHITE);
    }

    #[test]
    fn test_identical_messages_give_two_samples_and_two_zero_segments() {
        let mut store = TrailStore::default();
        for _ in 0..2 {
            let outcome = store.ingest_datagram(b"Obj1~1.0~2.0~3.0\n", PAINT);
            assert!(outcome.is_accepted());
        }

        let record = store.record("Obj1").unwrap();
        let expected = Sample::new(1.0, 2.0, 3.0);
        assert_eq!(record.history_samples(), vec![expected, expected]);

        let segments = record.segments().as_slice();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(Segment::is_degenerate));
        assert!(segments.iter().all(|s| s.p2 == expected && s.color == PAINT));
    }

    #[test]
    fn test_garbage_only_touches_counters() {
        let mut store = TrailStore::default();
        let outcome = store.ingest_datagram(b"garbage\n", PAINT);

        assert_eq!(
            outcome,
            IngestOutcome::Rejected {
                reason: WireError::FieldCount(1),
                tick_advanced: false
            }
        );
        assert_eq!(store.track_count(), 0);
        assert_eq!(store.head(), 0);
        assert_eq!(store.ticks(), 0);
        assert_eq!(
            store.counters(),
            MessageCounters {
                received: 1,
                valid: 0,
                invalid: 1
            }
        );

        store.ingest_datagram(b"DUMMYDATA\n", PAINT);
        store.ingest_datagram(&[0xff, 0xfe, b'~', 0x00], PAINT);
        assert_eq!(store.counters().invalid, 3);
        assert_eq!(store.track_count(), 0);
    }

    #[test]
    fn test_segments_follow_the_line_end() {
        let mut store = TrailStore::default();
        store.ingest(&msg("Hand", 1.0, 0.0, 1.0), PAINT);
        store.ingest(&msg("Hand", 2.0, 0.0, 1.0), PAINT);
        store.ingest(&msg("Hand", 0.0, 0.0, 0.0), PAINT);
        store.ingest(&msg("Hand", 3.0, 0.0, 1.0), PAINT);

        let record = store.record("Hand").unwrap();
        let segments: Vec<(f64, f64)> = record
            .segments()
            .iter_chronological()
            .map(|s| (s.p1.x, s.p2.x))
            .collect();
        // The zero sample is stored in history but draws nothing
        assert_eq!(segments, vec![(1.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
        assert_eq!(record.history().len(), 4);
        assert_eq!(record.latest(), Sample::new(3.0, 0.0, 1.0));
    }

    #[test]
    fn test_drawing_flag_off_records_no_segments() {
        let mut store = TrailStore::new(TrailConfig {
            record_segments: false,
            ..TrailConfig::default()
        });
        assert!(!store.is_drawing());
        store.ingest(&msg("Hand", 1.0, 0.0, 1.0), PAINT);
        assert!(store.record("Hand").unwrap().segments().is_empty());

        store.set_drawing(true);
        store.ingest(&msg("Hand", 2.0, 0.0, 1.0), PAINT);
        let record = store.record("Hand").unwrap();
        assert_eq!(record.segments().len(), 1);
        // The line still starts where the object was first seen
        let segment = record.segments().as_slice()[0];
        assert_eq!(segment.p1, Sample::new(1.0, 0.0, 1.0));
        assert_eq!(segment.p2, Sample::new(2.0, 0.0, 1.0));
    }

    #[test]
    fn test_zero_first_sample_starts_line_at_origin() {
        let mut store = TrailStore::default();
        store.ingest_datagram(b"A~0~0~0\n", PAINT);

        let record = store.record("A").unwrap();
        assert!(record.segments().is_empty());
        assert_eq!(record.line_end(), Sample::ZERO);

        store.ingest_datagram(b"A~1~1~1\n", PAINT);
        let record = store.record("A").unwrap();
        let segments = record.segments().as_slice();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].p1, Sample::ZERO);
        assert_eq!(segments[0].p2, Sample::new(1.0, 1.0, 1.0));
        assert_eq!(record.line_end(), Sample::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_afterimages_every_third_sample() {
        let mut store = TrailStore::default();
        for i in 0..100 {
            store.ingest(&msg("Hand", i as f64 + 1.0, 0.0, 1.0), PAINT);
        }
        let record = store.record("Hand").unwrap();
        let ghosts = record.afterimages();
        assert!(ghosts.is_full());
        assert_eq!(ghosts.len(), 24);

        // Samples 0, 3, ..., 99 were taken; the last 24 remain
        let xs: Vec<f64> = ghosts.iter().map(|s| s.x).collect();
        let expected: Vec<f64> = (0..100).step_by(3).skip(34 - 24).map(|i| i as f64 + 1.0).collect();
        assert_eq!(xs, expected);
    }

    #[test]
    fn test_segment_ring_wraps_at_default_capacity() {
        let mut store = TrailStore::default();
        let capacity = store.config().segment_capacity;
        assert_eq!(capacity, 200_000);

        let pushes = capacity + 3;
        for i in 0..pushes {
            store.ingest(&msg("Hand", i as f64 + 1.0, 0.0, 1.0), PAINT);
        }

        let segments = store.record("Hand").unwrap().segments();
        assert_eq!(segments.len(), capacity);
        assert_eq!(segments.total_pushed(), pushes as u64);
        // Push number capacity + k went to slot k
        for k in 0..3 {
            assert_eq!(segments.get(k).unwrap().p2.x, (capacity + k) as f64 + 1.0);
        }
        assert_eq!(segments.get(3).unwrap().p2.x, 4.0);
    }

    #[test]
    fn test_delimited_mode_ticks_on_junk() {
        let mut store = TrailStore::new(TrailConfig {
            tick_mode: TickMode::Delimited,
            expected_objects: 2,
            ..TrailConfig::default()
        });

        store.ingest_datagram(b"A~0~0~1\n", PAINT);
        store.ingest_datagram(b"B~0~0~2\n", PAINT);
        store.ingest_datagram(b"A~0~0~1\n", PAINT);
        assert_eq!(store.head(), 0);

        let outcome = store.ingest_datagram(b"--- frame ---\n", PAINT);
        assert!(outcome.tick_advanced());
        assert_eq!(store.head(), 1);
        assert_relative_eq!(store.latest_mean_distance().unwrap(), 1.0);
    }

    #[test]
    fn test_velocity_and_stats() {
        let mut store = TrailStore::default();
        for t in 0..10 {
            store.ingest(&msg("Hand", 0.1 * t as f64, 0.0, 1.0), PAINT);
        }

        let v = store.velocity("Hand");
        assert_relative_eq!(v.x, 0.1, epsilon = 1e-9);
        assert_relative_eq!(v.z, 0.0);
        assert_eq!(store.velocity("nobody"), Vector3::zeros());
        assert_relative_eq!(store.average_speed(), 0.1 / 3.0, epsilon = 1e-9);

        let stats = store.stats();
        assert_eq!(stats.tracks, 1);
        assert_eq!(stats.ticks, 10);
        assert_eq!(stats.counters.valid, 10);
        assert_eq!(stats.mean_distance, None);
    }

    fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop_oneof![
            (0usize..4, -3.0f64..3.0, -3.0f64..3.0, 0.0f64..3.0).prop_map(|(n, x, y, z)| {
                format!("{}~{}~{}~{}\n", ["A", "B", "C", "D"][n], x, y, z).into_bytes()
            }),
            prop::collection::vec(any::<u8>(), 0..40),
        ]
    }

    proptest! {
        #[test]
        fn prop_store_stays_bounded(
            payloads in prop::collection::vec(payload_strategy(), 0..400),
            delimited in any::<bool>(),
        ) {
            let config = TrailConfig {
                history_capacity: 7,
                afterimage_capacity: 5,
                segment_capacity: 11,
                tick_mode: if delimited { TickMode::Delimited } else { TickMode::RoundCount },
                ..TrailConfig::default()
            };
            let mut store = TrailStore::new(config);

            for payload in &payloads {
                store.ingest_datagram(payload, PAINT);
                prop_assert!(store.head() < 7);
                prop_assert!(store.pending() <= store.track_count());
            }

            let counters = store.counters();
            prop_assert_eq!(counters.received, payloads.len() as u64);
            prop_assert_eq!(counters.received, counters.valid + counters.invalid);
            for record in store.records() {
                prop_assert!(record.history().len() <= 7);
                prop_assert!(record.afterimages().len() <= 5);
                prop_assert!(record.segments().len() <= 11);
            }
        }
    }
}

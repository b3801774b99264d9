//! Time-binned audience statistics.
//!
//! Observations are folded into the open [`Bin`]. Before each observation is
//! folded the accumulator checks whether it lies more than
//! `bin_duration_ms` past the last closure; if so the open bin is flushed
//! into a [`BinSummary`] and a fresh bin receives the observation. Frames
//! without observations never touch the accumulator, so a bin stays open for
//! as long as nobody is in view.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::AggregatorConfig;
use crate::histogram::{
    age_bucket, gender_bucket, pose_bucket, Histogram, AGE_BUCKETS, GENDER_BUCKETS, POSE_BUCKETS,
};
use crate::observation::Observation;

/// The open accumulation window
#[derive(Debug, Clone, Default)]
pub struct Bin {
    index: u64,
    /// Timestamp of the observation that closed the previous bin. `None`
    /// until the first observation of the session anchors the window.
    window_end_timestamp: Option<u64>,
    age: Histogram<AGE_BUCKETS>,
    gender: Histogram<GENDER_BUCKETS>,
    yaw: Histogram<POSE_BUCKETS>,
    pitch: Histogram<POSE_BUCKETS>,
    new_ids: HashSet<u64>,
    folded: u64,
}

impl Bin {
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn window_end_timestamp(&self) -> Option<u64> {
        self.window_end_timestamp
    }

    pub fn age(&self) -> &Histogram<AGE_BUCKETS> {
        &self.age
    }

    pub fn gender(&self) -> &Histogram<GENDER_BUCKETS> {
        &self.gender
    }

    pub fn yaw(&self) -> &Histogram<POSE_BUCKETS> {
        &self.yaw
    }

    pub fn pitch(&self) -> &Histogram<POSE_BUCKETS> {
        &self.pitch
    }

    pub fn new_ids(&self) -> &HashSet<u64> {
        &self.new_ids
    }

    /// Observations folded since the bin was opened
    pub fn folded(&self) -> u64 {
        self.folded
    }

    fn reset(&mut self) {
        self.age.reset();
        self.gender.reset();
        self.yaw.reset();
        self.pitch.reset();
        self.new_ids.clear();
        self.folded = 0;
    }
}

/// Immutable snapshot of a flushed bin, as handed to the sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinSummary {
    pub bin_index: u64,
    pub total_unique_ids: u64,
    pub new_ids: u64,
    pub running_people_count: u64,
    pub people_count_delta: u64,
    pub age: [u64; AGE_BUCKETS],
    pub gender: [u64; GENDER_BUCKETS],
    pub yaw: [u64; POSE_BUCKETS],
    pub pitch: [u64; POSE_BUCKETS],
    /// Timestamp of the observation that triggered the flush
    pub closed_at: u64,
}

/// Owns every piece of mutable analytics state for one session
#[derive(Debug, Clone)]
pub struct BinAccumulator {
    config: AggregatorConfig,
    bin: Bin,
    seen_ids: HashSet<u64>,
    /// Person observations folded over the whole session
    running_people_count: u64,
    people_count_at_last_flush: u64,
    bin_counter: u64,
}

impl BinAccumulator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            bin: Bin::default(),
            seen_ids: HashSet::new(),
            running_people_count: 0,
            people_count_at_last_flush: 0,
            bin_counter: 0,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn current_bin(&self) -> &Bin {
        &self.bin
    }

    pub fn seen_ids(&self) -> &HashSet<u64> {
        &self.seen_ids
    }

    pub fn total_unique(&self) -> u64 {
        self.seen_ids.len() as u64
    }

    pub fn running_people_count(&self) -> u64 {
        self.running_people_count
    }

    pub fn people_count_at_last_flush(&self) -> u64 {
        self.people_count_at_last_flush
    }

    /// Bins flushed so far
    pub fn bin_counter(&self) -> u64 {
        self.bin_counter
    }

    /// Closure check followed by the fold; the observation that closes a bin
    /// is counted in the new one.
    pub fn observe(&mut self, observation: &Observation) -> Option<BinSummary> {
        let flushed = self.maybe_close_bin(observation.timestamp);
        self.fold(observation);
        flushed
    }

    pub fn fold(&mut self, observation: &Observation) {
        let bin = &mut self.bin;
        bin.age
            .record(age_bucket(observation.age, self.config.age_bucket_width));
        bin.gender.record(gender_bucket(observation.gender));
        bin.yaw.record(pose_bucket(observation.yaw));
        bin.pitch.record(pose_bucket(observation.pitch));
        bin.folded += 1;

        if self.seen_ids.insert(observation.id) {
            bin.new_ids.insert(observation.id);
        }
        self.running_people_count += 1;
    }

    /// Flushes the open bin when `timestamp` is more than the bin duration
    /// past the last closure. Timestamps that run backwards never close a bin.
    ///
    /// Bins are aligned to the first observation of the session, not to the
    /// session start: the first call only anchors the window, so a late first
    /// visitor never produces an empty bin 0.
    pub fn maybe_close_bin(&mut self, timestamp: u64) -> Option<BinSummary> {
        let window_end = match self.bin.window_end_timestamp {
            Some(window_end) => window_end,
            None => {
                self.bin.window_end_timestamp = Some(timestamp);
                return None;
            }
        };
        if timestamp.saturating_sub(window_end) <= self.config.bin_duration_ms {
            return None;
        }

        let summary = self.summarize(timestamp);
        self.bin.reset();
        self.bin_counter += 1;
        self.bin.index = self.bin_counter;
        self.bin.window_end_timestamp = Some(timestamp);
        self.people_count_at_last_flush = self.running_people_count;

        tracing::info!(
            "bin {} closed: unique={} new={} people={} (+{})",
            summary.bin_index,
            summary.total_unique_ids,
            summary.new_ids,
            summary.running_people_count,
            summary.people_count_delta
        );
        Some(summary)
    }

    fn summarize(&self, closed_at: u64) -> BinSummary {
        BinSummary {
            bin_index: self.bin.index,
            total_unique_ids: self.total_unique(),
            new_ids: self.bin.new_ids.len() as u64,
            running_people_count: self.running_people_count,
            people_count_delta: self.running_people_count - self.people_count_at_last_flush,
            age: *self.bin.age.counts(),
            gender: *self.bin.gender.counts(),
            yaw: *self.bin.yaw.counts(),
            pitch: *self.bin.pitch.counts(),
            closed_at,
        }
    }
}

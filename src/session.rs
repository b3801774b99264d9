//! One capture session: frames in, rows and recording out.
//!
//! Each frame is handled to completion before the next is read: extraction,
//! aggregation, row emission, frame recording, then the caller's display /
//! quit hook. Sinks are opened by the caller and closed exactly once by
//! [`Session::close`] (or at the end of [`Session::run`]).

use std::io::Write;

use serde::Serialize;

use crate::aggregator::{BinAccumulator, BinSummary};
use crate::clock::FrameClock;
use crate::config::AggregatorConfig;
use crate::error::{FootfallError, Result};
use crate::event_log::EventLog;
use crate::extractor::{FrameSource, ObservationExtractor};
use crate::frame_sink::{FrameSink, FrameWriter};
use crate::gaze::{GazeCell, GazeGrid, GazeTracker};
use crate::observation::Observation;
use crate::row_sink::RowSink;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames: u64,
    pub frames_recorded: u64,
    pub observations: u64,
    pub bins_flushed: u64,
    pub unique_ids: u64,
    pub extraction_failures: u64,
    pub row_write_failures: u64,
    pub frame_write_failures: u64,
}

/// What happened to a single frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub observations: usize,
    /// Bins closed while folding this frame, in order
    pub flushed: Vec<BinSummary>,
    pub warming_up: bool,
    pub extraction_failed: bool,
}

pub struct Session<E, W, R>
where
    E: ObservationExtractor,
    W: FrameWriter<Frame = E::Frame>,
    R: Write,
{
    clock: FrameClock,
    accumulator: BinAccumulator,
    extractor: E,
    engine_ready: bool,
    extraction_failures: u64,
    rows: RowSink<R>,
    frames: FrameSink<W>,
    /// Boxed so the log stays optional without another type parameter
    events: Option<EventLog<Box<dyn Write>>>,
    gaze: Option<GazeTracker>,
}

impl<E, W, R> Session<E, W, R>
where
    E: ObservationExtractor,
    W: FrameWriter<Frame = E::Frame>,
    R: Write,
{
    pub fn new(config: AggregatorConfig, extractor: E, rows: RowSink<R>, frames: FrameSink<W>) -> Self {
        Self {
            clock: FrameClock::new(),
            accumulator: BinAccumulator::new(config),
            engine_ready: !extractor.needs_warm_up(),
            extractor,
            extraction_failures: 0,
            rows,
            frames,
            events: None,
            gaze: None,
        }
    }

    /// Attaches the JSON event log and records the session start in it
    pub fn with_event_log<L: Write + 'static>(mut self, events: EventLog<L>, source: &str) -> Self {
        let mut events = events.boxed();
        events.session_start(source, self.accumulator.config());
        self.events = Some(events);
        self
    }

    pub fn with_gaze_grid(mut self, grid: GazeGrid) -> Self {
        self.gaze = Some(GazeTracker::new(grid));
        self
    }

    /// Rejected keys are fatal; nothing has been processed yet
    pub fn authenticate(&mut self, key: &str) -> Result<()> {
        self.extractor.authenticate(key).map_err(|err| {
            tracing::error!("engine authentication failed: {}", err);
            FootfallError::from(err)
        })
    }

    pub fn accumulator(&self) -> &BinAccumulator {
        &self.accumulator
    }

    pub fn active_gaze_cell(&self) -> Option<GazeCell> {
        self.gaze.as_ref().and_then(GazeTracker::active)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames: self.clock.frames(),
            frames_recorded: self.frames.written(),
            observations: self.accumulator.running_people_count(),
            bins_flushed: self.accumulator.bin_counter(),
            unique_ids: self.accumulator.total_unique(),
            extraction_failures: self.extraction_failures,
            row_write_failures: self.rows.write_failures(),
            frame_write_failures: self.frames.write_failures(),
        }
    }

    pub fn process_frame(&mut self, frame: &E::Frame) -> FrameReport {
        let frame_index = self.clock.tick();
        let mut report = FrameReport {
            frame_index,
            warming_up: !self.engine_ready,
            ..FrameReport::default()
        };

        let observations = self.observe(frame_index, frame, &mut report);
        report.observations = observations.len();

        if observations.is_empty() {
            self.rows.emit_frame_row(frame_index, &[]);
        }
        for observation in &observations {
            // A bin row follows exactly the rows that fed it, so it lands
            // before the row of the observation that closed it.
            if let Some(summary) = self.accumulator.maybe_close_bin(observation.timestamp) {
                self.rows.emit_bin_row(&summary);
                if let Some(events) = self.events.as_mut() {
                    events.bin(frame_index, &summary);
                }
                report.flushed.push(summary);
            }
            self.rows
                .emit_frame_row(frame_index, std::slice::from_ref(observation));
            self.accumulator.fold(observation);
        }

        self.track_gaze();
        self.frames.push(frame);
        report
    }

    /// Processes frames until the source runs dry or `after_frame` asks to
    /// quit, then closes the sinks. A source error also ends the session;
    /// the sinks are still closed before it is returned.
    pub fn run<S, F>(mut self, source: &mut S, mut after_frame: F) -> Result<SessionStats>
    where
        S: FrameSource<Frame = E::Frame>,
        F: FnMut(&E::Frame, &FrameReport) -> bool,
    {
        let outcome = loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("end of stream after {} frames", self.clock.frames());
                    break Ok(());
                }
                Err(err) => {
                    tracing::error!("frame source failed: {}", err);
                    break Err(err);
                }
            };
            let report = self.process_frame(&frame);
            if after_frame(&frame, &report) {
                tracing::info!("quit requested at frame {}", report.frame_index);
                break Ok(());
            }
        };
        let closed = self.close();
        outcome?;
        closed
    }

    pub fn close(self) -> Result<SessionStats> {
        let stats = self.stats();
        let Session {
            rows,
            frames,
            events,
            ..
        } = self;

        let rows_closed = rows.close();
        let frames_closed = frames.close();
        if let Some(mut events) = events {
            events.session_end(&stats);
        }
        rows_closed?;
        frames_closed?;

        tracing::info!(
            "session closed: frames={} recorded={} bins={} unique={} extraction_failures={}",
            stats.frames,
            stats.frames_recorded,
            stats.bins_flushed,
            stats.unique_ids,
            stats.extraction_failures
        );
        Ok(stats)
    }

    /// Engine faults are logged and the frame counts as empty
    fn observe(&mut self, frame_index: u64, frame: &E::Frame, report: &mut FrameReport) -> Vec<Observation> {
        if !self.engine_ready {
            match self.extractor.warm_up(frame) {
                Ok(()) => {
                    self.engine_ready = true;
                    tracing::info!("engine ready after frame {}", frame_index);
                }
                Err(err) => {
                    self.extraction_failures += 1;
                    report.extraction_failed = true;
                    tracing::warn!("engine warm-up failed on frame {}: {}", frame_index, err);
                }
            }
            return Vec::new();
        }

        match self.extractor.extract(frame) {
            Ok(observations) => {
                tracing::debug!("frame {}: {} people", frame_index, observations.len());
                observations
            }
            Err(err) => {
                self.extraction_failures += 1;
                report.extraction_failed = true;
                tracing::warn!("extraction failed on frame {}: {}", frame_index, err);
                Vec::new()
            }
        }
    }

    fn track_gaze(&mut self) {
        let Some(tracker) = self.gaze.as_mut() else {
            return;
        };
        if let Some(transition) = tracker.update(self.extractor.gaze()) {
            tracing::debug!(
                "gaze moved to cell {} (from {:?})",
                tracker.grid().index(transition.highlighted),
                transition.released.map(|cell| tracker.grid().index(cell))
            );
        }
    }
}

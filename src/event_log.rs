//! JSON-lines session log: a `session_start` line, one `bin` line per
//! flushed bin and a closing `session_end` line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::aggregator::BinSummary;
use crate::config::AggregatorConfig;
use crate::error::SinkError;
use crate::session::SessionStats;

#[derive(Serialize)]
struct SessionStartLog<'a> {
    event: &'static str,
    timestamp: String,
    source: &'a str,
    bin_duration_ms: u64,
    age_bucket_width: f32,
}

#[derive(Serialize)]
struct BinLog<'a> {
    event: &'static str,
    timestamp: String,
    frame_index: u64,
    #[serde(flatten)]
    summary: &'a BinSummary,
}

#[derive(Serialize)]
struct SessionEndLog<'a> {
    event: &'static str,
    timestamp: String,
    #[serde(flatten)]
    stats: &'a SessionStats,
}

pub struct EventLog<W: Write> {
    writer: W,
}

impl EventLog<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|err| SinkError::open(path, err))?;
        tracing::info!("logging session events to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> EventLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Erases the writer type, for holders that keep the log optional
    pub fn boxed(self) -> EventLog<Box<dyn Write>>
    where
        W: 'static,
    {
        EventLog::new(Box::new(self.writer))
    }

    pub fn session_start(&mut self, source: &str, config: &AggregatorConfig) {
        let event = SessionStartLog {
            event: "session_start",
            timestamp: timestamp_now(),
            source,
            bin_duration_ms: config.bin_duration_ms,
            age_bucket_width: config.age_bucket_width,
        };
        self.best_effort(&event);
    }

    pub fn bin(&mut self, frame_index: u64, summary: &BinSummary) {
        let event = BinLog {
            event: "bin",
            timestamp: timestamp_now(),
            frame_index,
            summary,
        };
        self.best_effort(&event);
    }

    pub fn session_end(&mut self, stats: &SessionStats) {
        let event = SessionEndLog {
            event: "session_end",
            timestamp: timestamp_now(),
            stats,
        };
        self.best_effort(&event);
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn best_effort<T: Serialize>(&mut self, event: &T) {
        let result = self
            .write_event(event)
            .and_then(|()| self.writer.flush().map_err(SinkError::from));
        if let Err(err) = result {
            tracing::warn!("event log write failed: {}", err);
        }
    }
}

fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_object_per_event() {
        let mut log = EventLog::new(Vec::new());
        log.session_start("replay.jsonl", &AggregatorConfig::default());
        log.bin(
            42,
            &BinSummary {
                bin_index: 0,
                total_unique_ids: 2,
                new_ids: 2,
                running_people_count: 5,
                people_count_delta: 5,
                age: [0, 5, 0, 0],
                gender: [2, 3],
                yaw: [5, 0, 0],
                pitch: [0, 0, 5],
                closed_at: 12_000,
            },
        );
        log.session_end(&SessionStats::default());

        let text = String::from_utf8(log.into_inner()).unwrap();
        let events: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["event"], "session_start");
        assert_eq!(events[0]["bin_duration_ms"], 10_000);
        assert_eq!(events[1]["event"], "bin");
        assert_eq!(events[1]["frame_index"], 42);
        assert_eq!(events[1]["age"][1], 5);
        assert_eq!(events[2]["event"], "session_end");
        assert!(events[2]["timestamp"].is_string());
    }

    #[test]
    fn boxed_log_writes_to_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut log = EventLog::create(&path).unwrap().boxed();
        log.session_end(&SessionStats::default());
        drop(log);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"event\":\"session_end\""));
    }
}

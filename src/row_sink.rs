//! Append-only CSV record writer.
//!
//! Two record shapes share one file: a 10-field row per observation (or a
//! single zero-filled row for an empty frame) and a 17-field row per flushed
//! bin: five counters followed by the age, gender, yaw and pitch buckets.
//! Write failures after the sink is open are logged and counted; they never
//! stop the session.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::aggregator::BinSummary;
use crate::error::SinkError;
use crate::observation::Observation;

pub const FRAME_ROW_FIELDS: usize = 10;
pub const BIN_ROW_FIELDS: usize = 17;

pub struct RowSink<W: Write> {
    writer: csv::Writer<W>,
    rows_written: u64,
    write_failures: u64,
}

impl RowSink<File> {
    /// Opening is the one fatal failure of this sink
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|err| SinkError::open(path, err))?;
        tracing::info!("writing rows to {}", path.display());
        Ok(Self::new(file))
    }
}

impl<W: Write> RowSink<W> {
    pub fn new(writer: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(writer);
        Self {
            writer,
            rows_written: 0,
            write_failures: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// One row per observation in order, or one zero-filled row when the
    /// frame had nobody in it.
    pub fn emit_frame_row(&mut self, frame_index: u64, observations: &[Observation]) {
        if observations.is_empty() {
            let mut record = vec!["0".to_string(); FRAME_ROW_FIELDS];
            record[0] = frame_index.to_string();
            self.write(&record, frame_index);
            return;
        }
        for observation in observations {
            let record = observation_record(frame_index, observation);
            self.write(&record, frame_index);
        }
    }

    pub fn emit_bin_row(&mut self, summary: &BinSummary) {
        let record = bin_record(summary);
        self.write(&record, summary.bin_index);
        if let Err(err) = self.writer.flush() {
            self.write_failures += 1;
            tracing::warn!("failed to flush rows after bin {}: {}", summary.bin_index, err);
        }
    }

    /// Flushes and hands back the underlying writer
    pub fn close(mut self) -> Result<W, SinkError> {
        self.writer.flush()?;
        self.writer.into_inner().map_err(|err| {
            SinkError::Io(std::io::Error::new(
                err.error().kind(),
                err.error().to_string(),
            ))
        })
    }

    fn write(&mut self, record: &[String], key: u64) {
        match self.writer.write_record(record) {
            Ok(()) => self.rows_written += 1,
            Err(err) => {
                self.write_failures += 1;
                tracing::warn!("row write failed ({}): {}", key, err);
            }
        }
    }
}

fn observation_record(frame_index: u64, observation: &Observation) -> [String; FRAME_ROW_FIELDS] {
    [
        frame_index.to_string(),
        observation.id.to_string(),
        observation.timestamp.to_string(),
        observation.age.to_string(),
        observation.gender.to_string(),
        observation.face.x.to_string(),
        observation.face.y.to_string(),
        observation.face.width.to_string(),
        observation.yaw.to_string(),
        observation.pitch.to_string(),
    ]
}

fn bin_record(summary: &BinSummary) -> Vec<String> {
    let mut record = Vec::with_capacity(BIN_ROW_FIELDS);
    record.push(summary.bin_index.to_string());
    record.push(summary.total_unique_ids.to_string());
    record.push(summary.new_ids.to_string());
    record.push(summary.running_people_count.to_string());
    record.push(summary.people_count_delta.to_string());
    let buckets = summary
        .age
        .iter()
        .chain(&summary.gender)
        .chain(&summary.yaw)
        .chain(&summary.pitch);
    record.extend(buckets.map(u64::to_string));
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn written(sink: RowSink<Vec<u8>>) -> String {
        String::from_utf8(sink.close().unwrap()).unwrap()
    }

    fn summary() -> BinSummary {
        BinSummary {
            bin_index: 2,
            total_unique_ids: 9,
            new_ids: 3,
            running_people_count: 40,
            people_count_delta: 12,
            age: [1, 2, 3, 6],
            gender: [5, 7],
            yaw: [4, 4, 4],
            pitch: [0, 10, 2],
            closed_at: 30_500,
        }
    }

    #[test]
    fn empty_frame_writes_one_zero_row() {
        let mut sink = RowSink::new(Vec::new());
        sink.emit_frame_row(17, &[]);
        assert_eq!(sink.rows_written(), 1);
        assert_eq!(written(sink), "17,0,0,0,0,0,0,0,0,0\n");
    }

    #[test]
    fn observation_rows_keep_order_and_field_layout() {
        let mut sink = RowSink::new(Vec::new());
        let people = [
            Observation::new(4, 1_000)
                .with_age(31.5)
                .with_gender(-0.25)
                .with_face(10, 20, 64)
                .with_pose(0.5, 0.75),
            Observation::new(9, 1_000).with_age(8.0),
        ];
        sink.emit_frame_row(3, &people);
        let text = written(sink);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "3,4,1000,31.5,-0.25,10,20,64,0.5,0.75",
                "3,9,1000,8,0,0,0,0,0,0"
            ]
        );
        assert!(lines
            .iter()
            .all(|line| line.split(',').count() == FRAME_ROW_FIELDS));
    }

    #[test]
    fn bin_row_lists_counts_then_buckets() {
        let mut sink = RowSink::new(Vec::new());
        sink.emit_bin_row(&summary());
        let text = written(sink);
        assert_eq!(text, "2,9,3,40,12,1,2,3,6,5,7,4,4,4,0,10,2\n");
        assert_eq!(text.trim_end().split(',').count(), BIN_ROW_FIELDS);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[test]
    fn write_failures_are_counted_not_raised() {
        let mut sink = RowSink::new(BrokenPipe);
        sink.emit_frame_row(0, &[]);
        sink.emit_bin_row(&summary());
        sink.emit_frame_row(1, &[]);
        assert!(sink.write_failures() >= 1);
        assert!(sink.close().is_err());
    }
}

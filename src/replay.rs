//! Recorded observation streams.
//!
//! A replay file holds one JSON value per line, one line per frame. A line is
//! either a bare array of observations or an object
//! `{"people": [...], "gaze": {"x": .., "y": ..}}`. Replays stand in for the
//! closed perception engine: the same file always produces the same rows.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, FootfallError, ReplayError, SinkError};
use crate::extractor::{FrameSource, ObservationExtractor};
use crate::frame_sink::FrameWriter;
use crate::observation::{GazePoint, Observation};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    #[serde(default)]
    pub people: Vec<Observation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaze: Option<GazePoint>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    People(Vec<Observation>),
    Frame(ReplayFrame),
}

impl From<ReplayLine> for ReplayFrame {
    fn from(line: ReplayLine) -> Self {
        match line {
            ReplayLine::People(people) => ReplayFrame { people, gaze: None },
            ReplayLine::Frame(frame) => frame,
        }
    }
}

pub struct ReplaySource<R: BufRead> {
    lines: Lines<R>,
    line: u64,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path).map_err(|source| ReplayError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("replaying observations from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    fn read_frame(&mut self) -> Result<Option<ReplayFrame>, ReplayError> {
        for text in self.lines.by_ref() {
            let text = text?;
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            let parsed: ReplayLine =
                serde_json::from_str(&text).map_err(|source| ReplayError::Parse {
                    line: self.line,
                    source,
                })?;
            return Ok(Some(parsed.into()));
        }
        Ok(None)
    }
}

impl<R: BufRead> FrameSource for ReplaySource<R> {
    type Frame = ReplayFrame;

    fn next_frame(&mut self) -> Result<Option<ReplayFrame>, FootfallError> {
        Ok(self.read_frame()?)
    }
}

/// Reads observations straight out of replayed frames
#[derive(Debug, Default)]
pub struct ReplayExtractor {
    gaze: Option<GazePoint>,
}

impl ReplayExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObservationExtractor for ReplayExtractor {
    type Frame = ReplayFrame;

    fn needs_warm_up(&self) -> bool {
        false
    }

    fn extract(&mut self, frame: &ReplayFrame) -> Result<Vec<Observation>, ExtractionError> {
        self.gaze = frame.gaze;
        Ok(frame.people.clone())
    }

    fn gaze(&self) -> Option<GazePoint> {
        self.gaze
    }
}

/// Frame writer that appends replayed frames as JSON lines.
///
/// Behind a [`FrameSink`](crate::FrameSink) the first frame of a session is
/// never written, so a recording replays from the session's second frame.
pub struct JsonLinesRecorder<W: Write> {
    writer: W,
}

impl JsonLinesRecorder<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|err| SinkError::open(path, err))?;
        tracing::info!("recording frames to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameWriter for JsonLinesRecorder<W> {
    type Frame = ReplayFrame;

    fn write_frame(&mut self, frame: &ReplayFrame) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::FaceBox;
    use std::io::Cursor;

    const REPLAY: &str = r#"[{"id":1,"timestamp":0,"age":22.0,"gender":0.4,"yaw":0.5,"pitch":0.1}]

[]
{"people":[{"id":2,"timestamp":40,"age":61.0,"gender":-0.9,"face":{"x":5,"y":6,"width":40},"yaw":0.9,"pitch":0.9}],"gaze":{"x":100.0,"y":20.0}}
"#;

    #[test]
    fn reads_both_line_shapes_and_skips_blanks() {
        let mut source = ReplaySource::new(Cursor::new(REPLAY));
        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.people.len(), 1);
        assert_eq!(first.people[0].face, FaceBox::default());

        let empty = source.next_frame().unwrap().unwrap();
        assert!(empty.people.is_empty());

        let third = source.next_frame().unwrap().unwrap();
        assert_eq!(third.people[0].face.width, 40);
        assert_eq!(third.gaze, Some(GazePoint { x: 100.0, y: 20.0 }));

        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let mut source = ReplaySource::new(Cursor::new("[]\n{not json}\n"));
        assert!(source.next_frame().unwrap().is_some());
        match source.read_frame() {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn extractor_is_ready_without_warm_up() {
        assert!(!ReplayExtractor::new().needs_warm_up());
    }

    #[test]
    fn extractor_passes_people_and_gaze_through() {
        let frame = ReplayFrame {
            people: vec![Observation::new(7, 10)],
            gaze: Some(GazePoint { x: 1.0, y: 2.0 }),
        };
        let mut extractor = ReplayExtractor::new();
        assert_eq!(extractor.extract(&frame).unwrap(), frame.people);
        assert_eq!(extractor.gaze(), frame.gaze);
    }

    #[test]
    fn recorder_output_replays_identically() {
        let frames = vec![
            ReplayFrame {
                people: vec![Observation::new(3, 5).with_age(40.0)],
                gaze: None,
            },
            ReplayFrame::default(),
        ];
        let mut recorder = JsonLinesRecorder::new(Vec::new());
        for frame in &frames {
            recorder.write_frame(frame).unwrap();
        }
        recorder.finish().unwrap();

        let bytes = recorder.into_inner();
        let mut source = ReplaySource::new(Cursor::new(bytes));
        let mut replayed = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            replayed.push(frame);
        }
        assert_eq!(replayed, frames);
    }
}

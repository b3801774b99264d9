//! OpenCV capture and recording.
//!
//! The perception engine is closed, so in a capture session observations come
//! from a replay file kept alongside the video: line N of the replay belongs
//! to captured frame N.

use std::io::BufRead;
use std::path::Path;

use opencv::{
    core::{self, Mat, Size},
    prelude::*,
    videoio,
};

use crate::error::{ExtractionError, FootfallError, SinkError};
use crate::extractor::{FrameSource, ObservationExtractor};
use crate::frame_sink::FrameWriter;
use crate::observation::{GazePoint, Observation};
use crate::replay::ReplaySource;

pub struct CaptureSource {
    capture: videoio::VideoCapture,
    /// Camera frames are mirrored so the preview behaves like a mirror
    mirror: bool,
    label: String,
}

impl CaptureSource {
    pub fn open_file(path: &Path) -> Result<Self, FootfallError> {
        let label = path.display().to_string();
        let capture = videoio::VideoCapture::from_file(&label, videoio::CAP_ANY)
            .map_err(|err| FootfallError::frame_source(format!("failed to open {}: {}", label, err)))?;
        Self::checked(capture, false, label)
    }

    pub fn open_camera(index: i32, width: u32, height: u32) -> Result<Self, FootfallError> {
        let label = format!("camera {}", index);
        let mut capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|err| FootfallError::frame_source(format!("failed to open {}: {}", label, err)))?;
        for (property, name, value) in [
            (videoio::CAP_PROP_FRAME_WIDTH, "width", width),
            (videoio::CAP_PROP_FRAME_HEIGHT, "height", height),
        ] {
            match capture.set(property, value as f64) {
                Ok(true) => {}
                Ok(false) => tracing::warn!("{} rejected frame {} {}", label, name, value),
                Err(err) => tracing::warn!("{} rejected frame {} {}: {}", label, name, value, err),
            }
        }
        let _ = capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0);
        Self::checked(capture, true, label)
    }

    fn checked(capture: videoio::VideoCapture, mirror: bool, label: String) -> Result<Self, FootfallError> {
        let opened = capture
            .is_opened()
            .map_err(|err| FootfallError::frame_source(err.to_string()))?;
        if !opened {
            return Err(FootfallError::frame_source(format!(
                "couldn't capture video from input {}",
                label
            )));
        }
        tracing::info!("capturing from {}", label);
        Ok(Self {
            capture,
            mirror,
            label,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Frame rate reported by the backend, falling back to 25 fps
    pub fn fps(&self) -> f64 {
        match self.capture.get(videoio::CAP_PROP_FPS) {
            Ok(fps) if fps > 0.0 => fps,
            _ => 25.0,
        }
    }

    pub fn frame_size(&self) -> Size {
        let width = self.capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
        let height = self.capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
        Size::new(width as i32, height as i32)
    }
}

impl FrameSource for CaptureSource {
    type Frame = Mat;

    fn next_frame(&mut self) -> Result<Option<Mat>, FootfallError> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .map_err(|err| FootfallError::frame_source(err.to_string()))?;
        if !grabbed || frame.empty() {
            return Ok(None);
        }
        if !self.mirror {
            return Ok(Some(frame));
        }
        let mut mirrored = Mat::default();
        core::flip(&frame, &mut mirrored, 1)
            .map_err(|err| FootfallError::frame_source(err.to_string()))?;
        Ok(Some(mirrored))
    }
}

pub struct VideoRecorder {
    writer: videoio::VideoWriter,
}

impl VideoRecorder {
    pub fn create(path: &Path, fps: f64, size: Size) -> Result<Self, SinkError> {
        let open_failed = |reason: String| {
            SinkError::open(path, std::io::Error::new(std::io::ErrorKind::Other, reason))
        };
        let fourcc = videoio::VideoWriter::fourcc('M', 'J', 'P', 'G')
            .map_err(|err| open_failed(err.to_string()))?;
        let writer = videoio::VideoWriter::new(&path.display().to_string(), fourcc, fps, size, true)
            .map_err(|err| open_failed(err.to_string()))?;
        if !writer.is_opened().map_err(|err| open_failed(err.to_string()))? {
            return Err(open_failed("video writer did not open".to_string()));
        }
        tracing::info!(
            "recording {}x{} @ {:.1} fps to {}",
            size.width,
            size.height,
            fps,
            path.display()
        );
        Ok(Self { writer })
    }
}

impl FrameWriter for VideoRecorder {
    type Frame = Mat;

    fn write_frame(&mut self, frame: &Mat) -> Result<(), SinkError> {
        self.writer
            .write(frame)
            .map_err(|err| SinkError::frame(err.to_string()))
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer
            .release()
            .map_err(|err| SinkError::frame(err.to_string()))
    }
}

/// Observations for captured frames, read line by line from a replay
pub struct SidecarExtractor<R: BufRead> {
    replay: ReplaySource<R>,
    gaze: Option<GazePoint>,
    exhausted: bool,
}

impl<R: BufRead> SidecarExtractor<R> {
    pub fn new(replay: ReplaySource<R>) -> Self {
        Self {
            replay,
            gaze: None,
            exhausted: false,
        }
    }
}

impl<R: BufRead> ObservationExtractor for SidecarExtractor<R> {
    type Frame = Mat;

    fn needs_warm_up(&self) -> bool {
        false
    }

    fn extract(&mut self, _frame: &Mat) -> Result<Vec<Observation>, ExtractionError> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        match self.replay.next_frame() {
            Ok(Some(frame)) => {
                self.gaze = frame.gaze;
                Ok(frame.people)
            }
            Ok(None) => {
                self.exhausted = true;
                self.gaze = None;
                tracing::warn!("observation replay ended before the video");
                Ok(Vec::new())
            }
            Err(err) => Err(ExtractionError::engine(err.to_string())),
        }
    }

    fn gaze(&self) -> Option<GazePoint> {
        self.gaze
    }
}

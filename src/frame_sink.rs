use crate::error::SinkError;

/// Backend that persists frames in order (a video file, a replay recording)
pub trait FrameWriter {
    type Frame;

    fn write_frame(&mut self, frame: &Self::Frame) -> Result<(), SinkError>;

    /// Called exactly once when the session ends
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Records every captured frame except the first one of the session, which
/// the engine consumes for warm-up.
pub struct FrameSink<W: FrameWriter> {
    writer: W,
    received: u64,
    written: u64,
    write_failures: u64,
}

impl<W: FrameWriter> FrameSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            received: 0,
            written: 0,
            write_failures: 0,
        }
    }

    pub fn push(&mut self, frame: &W::Frame) {
        self.received += 1;
        if self.received == 1 {
            tracing::debug!("warm-up frame not recorded");
            return;
        }
        match self.writer.write_frame(frame) {
            Ok(()) => self.written += 1,
            Err(err) => {
                self.write_failures += 1;
                tracing::warn!("failed to record frame {}: {}", self.received - 1, err);
            }
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn close(mut self) -> Result<W, SinkError> {
        self.writer.finish()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        frames: Vec<u32>,
        finished: bool,
        fail_on: Option<u32>,
    }

    impl FrameWriter for Collect {
        type Frame = u32;

        fn write_frame(&mut self, frame: &u32) -> Result<(), SinkError> {
            if self.fail_on == Some(*frame) {
                return Err(SinkError::frame("encoder rejected frame"));
            }
            self.frames.push(*frame);
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SinkError> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn skips_only_the_first_frame() {
        let mut sink = FrameSink::new(Collect::default());
        for frame in 10..15 {
            sink.push(&frame);
        }
        assert_eq!(sink.received(), 5);
        assert_eq!(sink.written(), 4);
        let writer = sink.close().unwrap();
        assert_eq!(writer.frames, vec![11, 12, 13, 14]);
        assert!(writer.finished);
    }

    #[test]
    fn single_frame_session_records_nothing() {
        let mut sink = FrameSink::new(Collect::default());
        sink.push(&1);
        assert_eq!(sink.close().unwrap().frames, Vec::<u32>::new());
    }

    #[test]
    fn failed_frame_does_not_stop_recording() {
        let mut sink = FrameSink::new(Collect {
            fail_on: Some(2),
            ..Collect::default()
        });
        for frame in 0..4 {
            sink.push(&frame);
        }
        assert_eq!(sink.write_failures(), 1);
        assert_eq!(sink.close().unwrap().frames, vec![1, 3]);
    }
}

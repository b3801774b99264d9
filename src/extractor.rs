//! Seams to the outside world: where frames come from and what the
//! perception engine tells us about them.

use crate::error::{ExtractionError, FootfallError};
use crate::observation::{GazePoint, Observation};

/// Blocking frame producer. `Ok(None)` marks the end of the stream.
pub trait FrameSource {
    type Frame;

    fn next_frame(&mut self) -> Result<Option<Self::Frame>, FootfallError>;
}

/// The perception engine, reduced to what the aggregator needs
pub trait ObservationExtractor {
    type Frame;

    /// License check, run once before the first frame
    fn authenticate(&mut self, _key: &str) -> Result<(), ExtractionError> {
        Ok(())
    }

    /// Whether the first frames go to [`warm_up`](Self::warm_up). Engines
    /// that read recorded observations are ready from the first frame.
    fn needs_warm_up(&self) -> bool {
        true
    }

    /// Feeds a frame to an engine that is not ready yet. Called instead of
    /// [`extract`](Self::extract) until it succeeds.
    fn warm_up(&mut self, _frame: &Self::Frame) -> Result<(), ExtractionError> {
        Ok(())
    }

    fn extract(&mut self, frame: &Self::Frame) -> Result<Vec<Observation>, ExtractionError>;

    /// Latest on-screen gaze estimate, if the engine tracks one
    fn gaze(&self) -> Option<GazePoint> {
        None
    }
}

/// Extractor backed by a closure, for synthetic observation streams
pub struct FnExtractor<F, G> {
    extract: G,
    _frame: std::marker::PhantomData<fn(&F)>,
}

impl<F, G> FnExtractor<F, G>
where
    G: FnMut(&F) -> Result<Vec<Observation>, ExtractionError>,
{
    pub fn new(extract: G) -> Self {
        Self {
            extract,
            _frame: std::marker::PhantomData,
        }
    }
}

impl<F, G> ObservationExtractor for FnExtractor<F, G>
where
    G: FnMut(&F) -> Result<Vec<Observation>, ExtractionError>,
{
    type Frame = F;

    fn extract(&mut self, frame: &F) -> Result<Vec<Observation>, ExtractionError> {
        (self.extract)(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_extractor_sees_each_frame() {
        let mut extractor = FnExtractor::new(|frame: &u64| {
            if *frame == 3 {
                Err(ExtractionError::engine("lost tracking"))
            } else {
                Ok(vec![Observation::new(*frame, *frame * 100)])
            }
        });
        assert!(extractor.authenticate("key").is_ok());
        assert!(extractor.needs_warm_up());
        assert!(extractor.warm_up(&0).is_ok());
        assert_eq!(extractor.extract(&2).unwrap()[0].timestamp, 200);
        assert!(extractor.extract(&3).is_err());
        assert!(extractor.gaze().is_none());
    }
}

//! Audience analytics for camera demos.
//!
//! A perception engine reports the people it sees in every frame. `footfall`
//! folds those observations into fixed-duration bins (age, gender, head yaw
//! and pitch histograms plus unique and new visitor counts) and writes one
//! CSV row per observation and one per closed bin, while the frames
//! themselves go to a recording kept in step with the rows.

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod error;
pub mod event_log;
pub mod extractor;
pub mod frame_sink;
pub mod gaze;
pub mod histogram;
pub mod observation;
pub mod replay;
pub mod row_sink;
pub mod session;
pub mod shutdown;

#[cfg(feature = "opencv")]
pub mod video;

pub use aggregator::{Bin, BinAccumulator, BinSummary};
pub use config::AggregatorConfig;
pub use error::{ExtractionError, FootfallError, ReplayError, Result, SinkError};
pub use extractor::{FnExtractor, FrameSource, ObservationExtractor};
pub use frame_sink::{FrameSink, FrameWriter};
pub use observation::{FaceBox, GazePoint, Observation};
pub use row_sink::RowSink;
pub use session::{FrameReport, Session, SessionStats};
pub use shutdown::StopSignal;

use serde::{Deserialize, Serialize};

/// Face placement in frame coordinates, as reported by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
}

/// One person seen in one frame.
///
/// `id` stays stable for as long as the engine keeps tracking the person.
/// Attribute values are taken as reported; out-of-range values are clamped
/// when they are binned, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: u64,
    /// Milliseconds, non-decreasing along the stream
    pub timestamp: u64,
    pub age: f32,
    /// Signed score in [-1, 1]; the sign picks the bucket
    pub gender: f32,
    #[serde(default)]
    pub face: FaceBox,
    /// Normalised head yaw in [0, 1]
    pub yaw: f32,
    /// Normalised head pitch in [0, 1]
    pub pitch: f32,
}

impl Observation {
    pub fn new(id: u64, timestamp: u64) -> Self {
        Self {
            id,
            timestamp,
            age: 0.0,
            gender: 0.0,
            face: FaceBox::default(),
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn with_age(mut self, age: f32) -> Self {
        self.age = age;
        self
    }

    pub fn with_gender(mut self, gender: f32) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_pose(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    pub fn with_face(mut self, x: i32, y: i32, width: i32) -> Self {
        self.face = FaceBox { x, y, width };
        self
    }
}

/// Screen-space gaze estimate in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f32,
    pub y: f32,
}

//! Locates noses on still images with the MediaPipe face mesh and serves the
//! result over HTTP.

pub mod client;
pub mod config;
pub mod error;
pub mod nose;
pub mod overlay;
pub mod pipeline;
pub mod server;
mod shapes;

pub use error::DetectError;
pub use nose::NoseEstimate;
pub use pipeline::{FaceLandmarks, Landmark, LandmarkDetector, Pipeline, PipelineConfig};

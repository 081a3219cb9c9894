use anyhow::Result;
use image::RgbImage;
use std::path::PathBuf;
use tracing::{Level, info, span, trace};

use detection::FaceDetector;
use landmarks::FaceLandmarker;

mod detection;
mod landmarks;
mod model;
mod tensor;

/// Size of the face mesh topology emitted by the landmark model.
pub const NUM_LANDMARKS: usize = 468;

/// A mesh point, normalized to the frame: x and y are fractions of frame
/// width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceLandmarks {
    landmarks: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn new(landmarks: Vec<Landmark>) -> FaceLandmarks {
        FaceLandmarks { landmarks }
    }

    pub fn get(&self, idx: usize) -> Option<&Landmark> {
        self.landmarks.get(idx)
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// Anything able to find face meshes on a still image. Faces are returned in
/// the detector's own enumeration order.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceLandmarks>>;
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub models_dir: PathBuf,
    pub threads: usize,
    pub max_faces: usize,
    pub min_detection_confidence: f32,
    pub min_presence_confidence: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            models_dir: PathBuf::from("./models"),
            threads: num_cpus::get(),
            max_faces: 30,
            min_detection_confidence: 0.5,
            min_presence_confidence: 0.5,
        }
    }
}

/// Two stage MediaPipe face mesh: BlazeFace boxes, then a 468 point mesh per
/// box. Every call is independent, nothing is tracked between frames.
pub struct Pipeline {
    face_detector: FaceDetector,
    face_landmarker: FaceLandmarker,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Result<Pipeline> {
        model::initialize_runtime()?;

        info!(
            "Loading face models from {:?} (max {} faces)",
            config.models_dir, config.max_faces
        );
        Ok(Pipeline {
            face_detector: FaceDetector::new(
                &config.models_dir,
                config.threads,
                config.min_detection_confidence,
                config.max_faces,
            )?,
            face_landmarker: FaceLandmarker::new(
                &config.models_dir,
                config.threads,
                config.min_presence_confidence,
            )?,
        })
    }

    pub fn run(&self, img: &RgbImage) -> Result<Vec<FaceLandmarks>> {
        let span = span!(Level::DEBUG, "pipeline");
        let _guard = span.enter();

        let face_bounds = self.face_detector.run(img)?;
        let mut faces = Vec::with_capacity(face_bounds.len());
        for face_bound in face_bounds {
            trace!("Face bound: {face_bound:?}");

            if let Some(face) = self.face_landmarker.run(img, &face_bound)? {
                faces.push(face);
            }
        }

        Ok(faces)
    }
}

impl LandmarkDetector for Pipeline {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceLandmarks>> {
        self.run(frame)
    }
}

//! Nose position and size from a face mesh.

use crate::error::DetectError;
use crate::pipeline::{FaceLandmarks, LandmarkDetector};
use anyhow::{Error, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, span};

pub const NOSE_TIP_IDX: usize = 1;
pub const NOSE_LEFT_IDX: usize = 98;
pub const NOSE_RIGHT_IDX: usize = 327;

/// The nostril span underestimates the visible nose.
pub const WIDTH_FACTOR: f64 = 1.2;

/// Nose center and width in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoseEstimate {
    pub x: i32,
    pub y: i32,
    /// Negative when the mesh reports the nostrils mirrored.
    pub width: i32,
}

impl NoseEstimate {
    /// Values truncate toward zero, they are never rounded.
    pub fn from_landmarks(
        face: &FaceLandmarks,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<NoseEstimate> {
        let landmark = |idx: usize| {
            face.get(idx).ok_or_else(|| {
                Error::msg(format!(
                    "Face mesh has {} landmarks, nose landmark {idx} is missing",
                    face.len()
                ))
            })
        };
        let tip = landmark(NOSE_TIP_IDX)?;
        let left = landmark(NOSE_LEFT_IDX)?;
        let right = landmark(NOSE_RIGHT_IDX)?;

        let w = frame_width as f64;
        let h = frame_height as f64;

        Ok(NoseEstimate {
            x: (tip.x as f64 * w) as i32,
            y: (tip.y as f64 * h) as i32,
            width: (((right.x as f64 - left.x as f64) * w) * WIDTH_FACTOR) as i32,
        })
    }
}

/// Decodes an uploaded payload into an RGB frame, whatever the source color
/// mode.
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, DetectError> {
    let img = image::load_from_memory(bytes)?;
    debug!("Decoded {}x{} {:?} frame", img.width(), img.height(), img.color());

    Ok(img.into_rgb8())
}

/// One estimate per detected face, in detector order.
pub fn estimate_noses<D: LandmarkDetector + ?Sized>(
    detector: &mut D,
    frame: &RgbImage,
) -> Result<Vec<NoseEstimate>, DetectError> {
    let span = span!(Level::DEBUG, "estimate_noses");
    let _guard = span.enter();

    let faces = detector.detect(frame)?;
    let noses = faces
        .iter()
        .map(|face| NoseEstimate::from_landmarks(face, frame.width(), frame.height()))
        .collect::<Result<Vec<_>>>()?;
    debug!("Found {} noses", noses.len());

    Ok(noses)
}

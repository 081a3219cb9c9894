use super::model::{Session, initialize_model};
use super::tensor::{OutputRange, image_to_tensor};
use crate::shapes::point::PointF32;
use crate::shapes::rect::RectF32;
use anchors::gen_anchors;
use anyhow::{Error, Result};
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::path::Path;
use tracing::{Level, span, trace};

mod anchors;

const WIDTH: u32 = 128;
const HEIGHT: u32 = 128;
const MODEL_FILE: &str = "face_detection_short_range.onnx";

// box (4) + 6 keypoints
const REGRESSOR_LEN: usize = 16;
const SCORE_CLIP: f32 = 100.;
const MAX_OVERLAP_PCT: f32 = 30.;

pub struct FaceDetector {
    model: Session,
    anchors: Vec<RectF32>,
    min_confidence: f32,
    max_faces: usize,
}

#[derive(Debug, Clone)]
pub struct Face {
    pub bounds: RectF32,
    pub l_eye: PointF32,
    pub r_eye: PointF32,
    pub confidence: f32,
}

impl Face {
    /// Roll of the eye line, in image space.
    pub fn rot_theta(&self) -> f32 {
        let dx = self.r_eye.x - self.l_eye.x;
        let dy = self.r_eye.y - self.l_eye.y;
        dy.atan2(dx)
    }
}

impl FaceDetector {
    /*
    BlazeFace model wrapper using ort to run the model, then manually
    process the results into one or more faces

    Model Input: 128x128 f32 image in -1..1
    Model Output:
    - 896 length array of confidence logits (classificators)
    - 896x16 array of detection coords (regressors)

    The first 4 values of a regressor row are centroid offset, width and
    height relative to the anchor at the same index. The remaining 12 are
    keypoint offsets (eyes, nose, mouth, ears), of which only the eyes are
    used to estimate roll.
     */
    pub fn new(
        models_dir: &Path,
        threads: usize,
        min_confidence: f32,
        max_faces: usize,
    ) -> Result<FaceDetector> {
        Ok(FaceDetector {
            model: initialize_model(models_dir, MODEL_FILE, threads)?,
            anchors: gen_anchors(WIDTH, HEIGHT),
            min_confidence,
            max_faces,
        })
    }

    pub fn run(&self, img: &RgbImage) -> Result<Vec<Face>> {
        let span = span!(Level::DEBUG, "face_detector");
        let _guard = span.enter();

        let input_img = imageops::resize(img, WIDTH, HEIGHT, FilterType::Triangle);
        let input = image_to_tensor(&input_img, OutputRange::NegOneToOne)?;

        let outputs = self.model.run(ort::inputs!["input" => input]?)?;
        let regressors = outputs["regressors"].try_extract_tensor::<f32>()?;
        let classificators = outputs["classificators"].try_extract_tensor::<f32>()?;

        let regressors: Vec<f32> = regressors.iter().copied().collect();
        let scores: Vec<f32> = classificators.iter().copied().collect();

        decode_faces(
            &regressors,
            &scores,
            &self.anchors,
            img.width(),
            img.height(),
            self.min_confidence,
            self.max_faces,
        )
    }
}

/// Turns raw model output into faces in frame pixel space, most confident
/// first, suppressing overlapping boxes.
pub(crate) fn decode_faces(
    regressors: &[f32],
    scores: &[f32],
    anchors: &[RectF32],
    frame_width: u32,
    frame_height: u32,
    min_confidence: f32,
    max_faces: usize,
) -> Result<Vec<Face>> {
    if scores.len() != anchors.len() || regressors.len() != anchors.len() * REGRESSOR_LEN {
        return Err(Error::msg(format!(
            "Unexpected detector output: {} scores, {} regressor values for {} anchors",
            scores.len(),
            regressors.len(),
            anchors.len()
        )));
    }

    let x_scale = frame_width as f32 / WIDTH as f32;
    let y_scale = frame_height as f32 / HEIGHT as f32;

    let mut candidates: Vec<Face> = Vec::new();
    for (idx, (res, anchor)) in regressors
        .chunks_exact(REGRESSOR_LEN)
        .zip(anchors)
        .enumerate()
    {
        let score = sigmoid_stable(scores[idx].clamp(-SCORE_CLIP, SCORE_CLIP));
        if score < min_confidence {
            continue;
        }

        let (ax, ay) = (anchor.x, anchor.y);
        let mut anchor = *anchor;
        let bounds = anchor
            .adjust(res[0], res[1], res[2], res[3])
            .scale(x_scale, y_scale);

        candidates.push(Face {
            bounds,
            l_eye: PointF32::new((ax + res[4]) * x_scale, (ay + res[5]) * y_scale),
            r_eye: PointF32::new((ax + res[6]) * x_scale, (ay + res[7]) * y_scale),
            confidence: score,
        });
    }

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut results: Vec<Face> = Vec::new();
    for face in candidates {
        if results.len() >= max_faces {
            break;
        }
        let better_found = results
            .iter()
            .any(|kept| kept.bounds.overlap_pct(&face.bounds) > MAX_OVERLAP_PCT);
        if !better_found {
            results.push(face);
        }
    }

    trace!("Detected {} faces", results.len());

    Ok(results)
}

fn sigmoid_stable(x: f32) -> f32 {
    if x >= 0. {
        1. / (1. + (-x).exp())
    } else {
        x.exp() / (1. + x.exp())
    }
}

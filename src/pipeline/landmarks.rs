use super::detection;
use super::model::{Session, initialize_model};
use super::tensor::{OutputRange, image_to_tensor};
use super::{FaceLandmarks, Landmark, NUM_LANDMARKS};
use crate::shapes::point::PointF32;
use anyhow::{Error, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::path::Path;
use tracing::{Level, debug, span, trace};

const HEIGHT: u32 = 192;
const WIDTH: u32 = 192;
const MODEL_FILE: &str = "face_landmark.onnx";

const MESH_OUTPUT: &str = "conv2d_21";
const PRESENCE_OUTPUT: &str = "conv2d_31";

// pad 25% on each side of the detected box
const CROP_SCALE: f32 = 1.5;

pub struct FaceLandmarker {
    model: Session,
    min_presence: f32,
}

/// Where the model input came from in the frame: a `side` x `side` square
/// with top left at `origin`, rotated by `-theta` about its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CropTransform {
    pub origin: PointF32,
    pub side: u32,
    pub theta: f32,
}

impl CropTransform {
    pub fn for_face(face: &detection::Face) -> CropTransform {
        let side = (face.bounds.w.max(face.bounds.h) * CROP_SCALE).round().max(1.) as u32;
        let half = side as f32 / 2.;
        CropTransform {
            origin: PointF32::new(
                (face.bounds.x - half).round(),
                (face.bounds.y - half).round(),
            ),
            side,
            theta: face.rot_theta(),
        }
    }

    /// Upright, square crop of the frame. Area outside the frame is black.
    pub fn extract(&self, img: &RgbImage) -> RgbImage {
        let ox = self.origin.x as i64;
        let oy = self.origin.y as i64;
        let crop = RgbImage::from_fn(self.side, self.side, |x, y| {
            let fx = ox + x as i64;
            let fy = oy + y as i64;
            if fx < 0 || fy < 0 {
                return Rgb([0, 0, 0]);
            }
            img.get_pixel_checked(fx as u32, fy as u32)
                .copied()
                .unwrap_or(Rgb([0, 0, 0]))
        });

        if self.theta == 0. {
            crop
        } else {
            rotate_about_center(&crop, -self.theta, Interpolation::Bilinear, Rgb([0, 0, 0]))
        }
    }

    /// Maps a point of the model input back into frame pixels.
    pub fn project(&self, x: f32, y: f32) -> PointF32 {
        let scale = self.side as f32 / WIDTH as f32;
        let half = self.side as f32 / 2.;

        let mut p = PointF32::new(x * scale, y * scale);
        p.rotate(PointF32::new(half, half), self.theta);
        p.translate(self.origin.x, self.origin.y)
    }
}

impl FaceLandmarker {
    pub fn new(models_dir: &Path, threads: usize, min_presence: f32) -> Result<FaceLandmarker> {
        Ok(FaceLandmarker {
            model: initialize_model(models_dir, MODEL_FILE, threads)?,
            min_presence,
        })
    }

    /// Runs the mesh model over one detected face. Returns `None` when the
    /// model doesn't believe a face is present in the crop.
    pub fn run(&self, img: &RgbImage, face: &detection::Face) -> Result<Option<FaceLandmarks>> {
        let span = span!(Level::DEBUG, "face_landmarker");
        let _guard = span.enter();

        let crop = CropTransform::for_face(face);
        debug!("Tilt: {}", crop.theta.to_degrees());

        let face_img = crop.extract(img);
        let input_img = imageops::resize(&face_img, WIDTH, HEIGHT, FilterType::Triangle);
        let input = image_to_tensor(&input_img, OutputRange::ZeroToOne)?;

        let outputs = self.model.run(ort::inputs!["input_1" => input]?)?;
        let mesh = outputs[MESH_OUTPUT].try_extract_tensor::<f32>()?;
        let presence = outputs[PRESENCE_OUTPUT].try_extract_tensor::<f32>()?;

        let presence = presence
            .iter()
            .next()
            .map(|logit| 1. / (1. + (-logit).exp()))
            .ok_or_else(|| Error::msg("Landmark model returned no face presence score"))?;
        if presence < self.min_presence {
            trace!("Dropping face with presence {presence}");
            return Ok(None);
        }

        let mesh: Vec<f32> = mesh.iter().copied().collect();
        extract_results(&mesh, &crop, img.width(), img.height()).map(Some)
    }
}

pub(crate) fn extract_results(
    mesh: &[f32],
    crop: &CropTransform,
    frame_width: u32,
    frame_height: u32,
) -> Result<FaceLandmarks> {
    if mesh.len() != NUM_LANDMARKS * 3 {
        return Err(Error::msg(format!(
            "Expected {} mesh values, model returned {}",
            NUM_LANDMARKS * 3,
            mesh.len()
        )));
    }

    let fw = frame_width as f32;
    let fh = frame_height as f32;
    let z_scale = crop.side as f32 / WIDTH as f32;

    let landmarks = mesh
        .chunks_exact(3)
        .map(|v| {
            let p = crop.project(v[0], v[1]);
            Landmark {
                x: p.x / fw,
                y: p.y / fh,
                z: v[2] * z_scale / fw,
            }
        })
        .collect();

    Ok(FaceLandmarks::new(landmarks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::rect::RectF32;
    use std::f32::consts::FRAC_PI_2;

    fn face(bounds: RectF32, l_eye: PointF32, r_eye: PointF32) -> detection::Face {
        detection::Face {
            bounds,
            l_eye,
            r_eye,
            confidence: 0.9,
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn crop_is_padded_square_around_face() {
        let f = face(
            RectF32::from_center(100., 80., 40., 60.),
            PointF32::new(90., 70.),
            PointF32::new(110., 70.),
        );
        let crop = CropTransform::for_face(&f);
        assert_eq!(crop.side, 90);
        assert_eq!(crop.origin, PointF32::new(55., 35.));
        assert_eq!(crop.theta, 0.);
    }

    #[test]
    fn extract_pads_outside_frame_with_black() {
        let img = RgbImage::from_pixel(4, 4, Rgb([200, 100, 50]));
        let crop = CropTransform {
            origin: PointF32::new(-2., -2.),
            side: 4,
            theta: 0.,
        };
        let out = crop.extract(&img);
        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(2, 2), Rgb([200, 100, 50]));
        assert_eq!(*out.get_pixel(3, 3), Rgb([200, 100, 50]));
    }

    #[test]
    fn project_without_rotation() {
        let crop = CropTransform {
            origin: PointF32::new(10., 20.),
            side: 384,
            theta: 0.,
        };
        let p = crop.project(96., 48.);
        assert!(close(p.x, 202.) && close(p.y, 116.), "{p:?}");
    }

    #[test]
    fn project_undoes_rotation() {
        let crop = CropTransform {
            origin: PointF32::new(0., 0.),
            side: 192,
            theta: FRAC_PI_2,
        };
        // right edge middle of the upright crop came from the bottom middle
        let p = crop.project(192., 96.);
        assert!(close(p.x, 96.) && close(p.y, 192.), "{p:?}");
    }

    #[test]
    fn results_are_normalized_to_frame() {
        let crop = CropTransform {
            origin: PointF32::new(100., 50.),
            side: 192,
            theta: 0.,
        };
        let mut mesh = vec![0.; NUM_LANDMARKS * 3];
        mesh[3] = 100.;
        mesh[4] = 50.;
        mesh[5] = 8.;

        let landmarks = extract_results(&mesh, &crop, 400, 200).unwrap();
        assert_eq!(landmarks.len(), NUM_LANDMARKS);
        let lm = landmarks.get(1).unwrap();
        assert!(close(lm.x, 0.5) && close(lm.y, 0.5) && close(lm.z, 0.02), "{lm:?}");
    }

    #[test]
    fn short_mesh_is_an_error() {
        let crop = CropTransform {
            origin: PointF32::new(0., 0.),
            side: 192,
            theta: 0.,
        };
        assert!(extract_results(&[0.; 30], &crop, 100, 100).is_err());
    }
}

use anyhow::Result;
use image::RgbImage;
use ndarray::Array;
use ort::value::Tensor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputRange {
    ZeroToOne,
    NegOneToOne,
}

impl OutputRange {
    pub fn normalize(&self, v: u8) -> f32 {
        match self {
            OutputRange::ZeroToOne => v as f32 / 255.,
            OutputRange::NegOneToOne => v as f32 / 127.5 - 1.,
        }
    }
}

/// NHWC float tensor of a single RGB image.
pub fn image_to_tensor(img: &RgbImage, range: OutputRange) -> Result<Tensor<f32>> {
    let (width, height) = img.dimensions();
    let arr = Array::from_shape_fn(
        (1, height as usize, width as usize, 3),
        |(_, y, x, c)| range.normalize(img.get_pixel(x as u32, y as u32)[c]),
    );

    Ok(Tensor::from_array(arr)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_ranges() {
        assert_eq!(OutputRange::ZeroToOne.normalize(0), 0.);
        assert_eq!(OutputRange::ZeroToOne.normalize(255), 1.);
        assert_eq!(OutputRange::NegOneToOne.normalize(0), -1.);
        assert_eq!(OutputRange::NegOneToOne.normalize(255), 1.);
    }
}

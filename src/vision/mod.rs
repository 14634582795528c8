//! Frame-to-tensor preprocessing.
//!
//! Converts an encoded sensor frame into the normalized float tensor the
//! classification model consumes: decode, center-square crop, scale to the
//! model input size, optional sensor-orientation rotation, then per-channel
//! mean/std normalization. Pure and deterministic; safe from any thread.

use crate::camera::RawFrame;
use image::imageops::{self, FilterType};
use image::RgbImage;
use thiserror::Error;

/// Model input edge length; the output tensor is `IMAGE_SIZE² × 3` floats.
pub const IMAGE_SIZE: u32 = 224;

const IMAGE_MEAN: f32 = 117.0;
const IMAGE_STD: f32 = 1.0;

/// Sensor mounting orientation, applied after crop and rescale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Deg90,
    Deg180,
    Deg270,
}

/// Normalized model input of shape `[1, S, S, 3]`, channels interleaved
/// in R,G,B order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    size: u32,
    data: Vec<f32>,
}

impl Tensor {
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> [usize; 4] {
        [1, self.size as usize, self.size as usize, 3]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("frame is {width}x{height}, expected {expected_width}x{expected_height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    #[error("failed to decode frame: {0}")]
    DecodeFailed(String),
}

/// Turns raw frames into model input tensors.
pub struct ImageTensorBuilder {
    expected_width: u32,
    expected_height: u32,
    rotation: Rotation,
}

impl ImageTensorBuilder {
    pub fn new(expected_width: u32, expected_height: u32) -> Self {
        Self {
            expected_width,
            expected_height,
            rotation: Rotation::None,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Decode and normalize one frame.
    ///
    /// The frame producer guarantees matching dimensions by construction, so
    /// a size mismatch is a dropped frame, not a recoverable path. Both the
    /// declared geometry and the decoded bitmap's geometry are checked.
    pub fn build(&self, frame: &RawFrame) -> Result<Tensor, PreprocessError> {
        if frame.width != self.expected_width || frame.height != self.expected_height {
            return Err(PreprocessError::SizeMismatch {
                width: frame.width,
                height: frame.height,
                expected_width: self.expected_width,
                expected_height: self.expected_height,
            });
        }

        let decoded = image::load_from_memory(&frame.data)
            .map_err(|err| PreprocessError::DecodeFailed(err.to_string()))?
            .to_rgb8();
        if decoded.width() != frame.width || decoded.height() != frame.height {
            return Err(PreprocessError::SizeMismatch {
                width: decoded.width(),
                height: decoded.height(),
                expected_width: self.expected_width,
                expected_height: self.expected_height,
            });
        }

        let square = crop_and_rescale(&decoded, IMAGE_SIZE, self.rotation);
        Ok(Tensor {
            size: IMAGE_SIZE,
            data: normalize_pixels(&square),
        })
    }
}

/// Largest centered square crop, scaled to `target`×`target`, then rotated
/// about the center for the sensor orientation.
fn crop_and_rescale(src: &RgbImage, target: u32, rotation: Rotation) -> RgbImage {
    let min_dim = src.width().min(src.height());
    let x0 = (src.width() - min_dim) / 2;
    let y0 = (src.height() - min_dim) / 2;
    let cropped = imageops::crop_imm(src, x0, y0, min_dim, min_dim).to_image();
    let scaled = imageops::resize(&cropped, target, target, FilterType::Triangle);
    match rotation {
        Rotation::None => scaled,
        Rotation::Deg90 => imageops::rotate90(&scaled),
        Rotation::Deg180 => imageops::rotate180(&scaled),
        Rotation::Deg270 => imageops::rotate270(&scaled),
    }
}

/// 8-bit channels to mean-subtracted floats, interleaved R,G,B.
fn normalize_pixels(img: &RgbImage) -> Vec<f32> {
    let mut values = Vec::with_capacity((img.width() * img.height() * 3) as usize);
    for pixel in img.pixels() {
        values.push((f32::from(pixel[0]) - IMAGE_MEAN) / IMAGE_STD);
        values.push((f32::from(pixel[1]) - IMAGE_MEAN) / IMAGE_STD);
        values.push((f32::from(pixel[2]) - IMAGE_MEAN) / IMAGE_STD);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{IMAGE_HEIGHT, IMAGE_WIDTH};
    use image::Rgb;
    use std::io::Cursor;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("png encode");
        bytes
    }

    fn frame_from(img: &RgbImage) -> RawFrame {
        RawFrame {
            width: img.width(),
            height: img.height(),
            data: encode_png(img),
        }
    }

    fn builder() -> ImageTensorBuilder {
        ImageTensorBuilder::new(IMAGE_WIDTH, IMAGE_HEIGHT)
    }

    #[test]
    fn build_produces_normalized_tensor_of_fixed_length() {
        let img = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, Rgb([200, 117, 0]));
        let tensor = builder().build(&frame_from(&img)).expect("build");

        assert_eq!(tensor.len(), (IMAGE_SIZE * IMAGE_SIZE * 3) as usize);
        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        let data = tensor.data();
        assert_eq!(data[0], 200.0 - 117.0);
        assert_eq!(data[1], 0.0);
        assert_eq!(data[2], -117.0);
    }

    #[test]
    fn build_is_deterministic_for_identical_bytes() {
        let img = RgbImage::from_fn(IMAGE_WIDTH, IMAGE_HEIGHT, |x, y| {
            Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 255) as u8])
        });
        let frame = frame_from(&img);
        let first = builder().build(&frame).expect("build");
        let second = builder().build(&frame).expect("build");
        assert_eq!(first, second);
    }

    #[test]
    fn crop_takes_centered_square() {
        // Columns outside the centered 480x480 region are red; only green
        // may survive the crop.
        let img = RgbImage::from_fn(IMAGE_WIDTH, IMAGE_HEIGHT, |x, _| {
            if (80..560).contains(&x) {
                Rgb([0, 255, 0])
            } else {
                Rgb([255, 0, 0])
            }
        });
        let tensor = builder().build(&frame_from(&img)).expect("build");

        for chunk in tensor.data().chunks_exact(3) {
            assert_eq!(chunk, &[-117.0, 255.0 - 117.0, -117.0]);
        }
    }

    #[test]
    fn rotation_maps_top_rows_to_right_columns() {
        // Top half white, bottom half black; a clockwise quarter turn puts
        // the white half on the right.
        let img = RgbImage::from_fn(IMAGE_WIDTH, IMAGE_HEIGHT, |_, y| {
            if y < IMAGE_HEIGHT / 2 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let tensor = builder()
            .with_rotation(Rotation::Deg90)
            .build(&frame_from(&img))
            .expect("build");

        let data = tensor.data();
        let pixel = |x: usize, y: usize| {
            let base = (y * IMAGE_SIZE as usize + x) * 3;
            data[base]
        };
        // Sample well clear of the blended seam down the middle.
        assert_eq!(pixel(10, 10), -117.0);
        assert_eq!(pixel(213, 10), 255.0 - 117.0);
    }

    #[test]
    fn mismatched_frame_size_is_rejected() {
        let img = RgbImage::from_pixel(320, 240, Rgb([0, 0, 0]));
        let err = builder().build(&frame_from(&img)).unwrap_err();
        assert!(matches!(err, PreprocessError::SizeMismatch { .. }));
    }

    #[test]
    fn undecodable_frame_is_rejected() {
        let frame = RawFrame {
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
            data: vec![0x00, 0x01, 0x02, 0x03],
        };
        let err = builder().build(&frame).unwrap_err();
        assert!(matches!(err, PreprocessError::DecodeFailed(_)));
    }

    #[test]
    fn decoded_geometry_must_match_declared_geometry() {
        let img = RgbImage::from_pixel(320, 240, Rgb([0, 0, 0]));
        let frame = RawFrame {
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
            data: encode_png(&img),
        };
        let err = builder().build(&frame).unwrap_err();
        assert!(matches!(err, PreprocessError::SizeMismatch { .. }));
    }
}

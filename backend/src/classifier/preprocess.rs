use image::imageops::{self, FilterType};
use image::{ImageError, ImageReader, Limits, RgbImage};
use ndarray::Array4;
use std::io::Cursor;

use super::PredictError;
use crate::config::{DEFAULT_MAX_INPUT_DIMENSION, ImageConfig, PixelScaling, ResizeMethod};

const CHANNELS: usize = 3;

/// Turns uploaded bytes into a `(1, height, width, 3)` batch.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    width: u32,
    height: u32,
    filter: FilterType,
    scaling: PixelScaling,
    max_input_dimension: u32,
}

impl Preprocessor {
    pub fn new(width: u32, height: u32, resize: ResizeMethod, scaling: PixelScaling) -> Self {
        Self {
            width,
            height,
            filter: resize.filter(),
            scaling,
            max_input_dimension: DEFAULT_MAX_INPUT_DIMENSION,
        }
    }

    /// Largest width or height accepted from an upload, checked against the
    /// image header before any pixel buffer is allocated.
    pub fn with_max_input_dimension(mut self, max: u32) -> Self {
        self.max_input_dimension = max;
        self
    }

    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(
            config.width(),
            config.height(),
            config.preprocessing.resize_method,
            config.preprocessing.pixel_scaling,
        )
        .with_max_input_dimension(config.max_input_dimension)
    }

    pub fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, self.height as usize, self.width as usize, CHANNELS)
    }

    pub fn preprocess(&self, image: &[u8]) -> Result<Array4<f32>, PredictError> {
        // Any color mode (gray, alpha, palette, 16-bit) collapses to 8-bit RGB.
        let rgb = self.decode(image)?.to_rgb8();
        let resized = imageops::resize(&rgb, self.width, self.height, self.filter);
        Ok(self.to_batch(&resized))
    }

    fn decode(&self, image: &[u8]) -> Result<image::DynamicImage, PredictError> {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_input_dimension);
        limits.max_image_height = Some(self.max_input_dimension);

        let mut reader = ImageReader::new(Cursor::new(image))
            .with_guessed_format()
            .map_err(ImageError::from)?;
        reader.limits(limits);
        Ok(reader.decode()?)
    }

    /// All-zero input of the configured shape, used to probe the model at startup.
    pub fn blank(&self) -> Array4<f32> {
        Array4::zeros(self.input_shape())
    }

    fn to_batch(&self, resized: &RgbImage) -> Array4<f32> {
        let scaling = self.scaling;
        Array4::from_shape_fn(self.input_shape(), |(_, y, x, c)| {
            let pixel = resized.get_pixel(x as u32, y as u32);
            scaling.apply(pixel[c])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, Rgba, RgbaImage};

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn preprocessor(scaling: PixelScaling) -> Preprocessor {
        Preprocessor::new(150, 150, ResizeMethod::CatmullRom, scaling)
    }

    #[test]
    fn resizes_to_single_item_batch() {
        let bytes = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([10, 20, 30]))),
            ImageFormat::Png,
        );
        let batch = preprocessor(PixelScaling::Unit).preprocess(&bytes).unwrap();
        assert_eq!(batch.shape(), &[1, 150, 150, 3]);
    }

    #[test]
    fn non_square_target_uses_width_and_height() {
        let bytes = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))),
            ImageFormat::Png,
        );
        let batch = Preprocessor::new(64, 32, ResizeMethod::Nearest, PixelScaling::Unit)
            .preprocess(&bytes)
            .unwrap();
        assert_eq!(batch.shape(), &[1, 32, 64, 3]);
    }

    #[test]
    fn unit_scaling_maps_into_zero_one() {
        let bytes = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([255, 0, 51]))),
            ImageFormat::Png,
        );
        let batch = preprocessor(PixelScaling::Unit).preprocess(&bytes).unwrap();

        assert!((batch[[0, 75, 75, 0]] - 1.0).abs() < 1e-6);
        assert!(batch[[0, 75, 75, 1]].abs() < 1e-6);
        assert!((batch[[0, 75, 75, 2]] - 0.2).abs() < 1e-6);
        assert!(batch.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn raw_scaling_keeps_byte_values() {
        let bytes = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([255, 0, 51]))),
            ImageFormat::Png,
        );
        let batch = preprocessor(PixelScaling::Raw).preprocess(&bytes).unwrap();
        assert_eq!(batch[[0, 10, 10, 0]], 255.0);
        assert_eq!(batch[[0, 10, 10, 2]], 51.0);
    }

    #[test]
    fn grayscale_expands_to_three_equal_channels() {
        let bytes = encode(
            DynamicImage::ImageLuma8(GrayImage::from_pixel(31, 77, Luma([102]))),
            ImageFormat::Png,
        );
        let batch = preprocessor(PixelScaling::Raw).preprocess(&bytes).unwrap();
        assert_eq!(batch.shape(), &[1, 150, 150, 3]);
        for c in 0..3 {
            assert_eq!(batch[[0, 40, 40, c]], 102.0);
        }
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let bytes = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 12, Rgba([1, 2, 3, 0]))),
            ImageFormat::Png,
        );
        let batch = preprocessor(PixelScaling::Raw).preprocess(&bytes).unwrap();
        assert_eq!(batch.shape(), &[1, 150, 150, 3]);
        assert_eq!(batch[[0, 0, 0, 2]], 3.0);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = preprocessor(PixelScaling::Unit).preprocess(b"this is not an image");
        assert!(matches!(result, Err(PredictError::Decode(_))));

        let result = preprocessor(PixelScaling::Unit).preprocess(&[]);
        assert!(matches!(result, Err(PredictError::Decode(_))));
    }

    #[test]
    fn oversized_dimensions_are_rejected_before_decoding() {
        let bytes = encode(
            DynamicImage::ImageLuma8(GrayImage::new(300, 40)),
            ImageFormat::Png,
        );
        let preprocessor = preprocessor(PixelScaling::Unit).with_max_input_dimension(256);

        let result = preprocessor.preprocess(&bytes);
        assert!(matches!(
            result,
            Err(PredictError::Decode(ImageError::Limits(_)))
        ));

        let bytes = encode(
            DynamicImage::ImageLuma8(GrayImage::new(256, 256)),
            ImageFormat::Png,
        );
        assert!(preprocessor.preprocess(&bytes).is_ok());
    }

    #[test]
    fn blank_matches_input_shape() {
        let blank = preprocessor(PixelScaling::Unit).blank();
        assert_eq!(blank.shape(), &[1, 150, 150, 3]);
        assert!(blank.iter().all(|&v| v == 0.0));
    }
}

//! Image decoding and tensor preparation.

use image::imageops::{self, FilterType};

/// Number of color channels fed to the classifiers.
pub const CHANNELS: usize = 3;

/// Default square input resolution of both models.
pub const DEFAULT_TARGET_SIZE: u32 = 224;

/// A decoded, resized, normalized RGB image in NHWC order with batch size 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    size: u32,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Decode raw image bytes into a `size` x `size` x 3 tensor with values in `[0, 1]`.
    ///
    /// The format is guessed from the content. Resampling is nearest-neighbour.
    pub fn from_image_bytes(bytes: &[u8], size: u32) -> Result<Self, image::ImageError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let resized = imageops::resize(&rgb, size, size, FilterType::Nearest);

        let data = resized
            .into_raw()
            .into_iter()
            .map(|b| b as f32 / 255.0)
            .collect();

        Ok(Self { size, data })
    }

    /// `[batch, height, width, channels]`
    pub fn shape(&self) -> [usize; 4] {
        let side = self.size as usize;
        [1, side, side, CHANNELS]
    }

    /// Flat pixel data, row-major, channels interleaved.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Rows of pixels, each pixel an `[r, g, b]` triple.
    pub fn to_rows(&self) -> Vec<Vec<[f32; CHANNELS]>> {
        let side = self.size as usize;
        self.data
            .chunks_exact(side * CHANNELS)
            .map(|row| {
                row.chunks_exact(CHANNELS)
                    .map(|px| [px[0], px[1], px[2]])
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    /// Encode a solid-color PNG of the given dimensions.
    pub(crate) fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb(color));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_resizes_to_target() {
        let png = solid_png(300, 180, [255, 0, 51]);
        let tensor = ImageTensor::from_image_bytes(&png, DEFAULT_TARGET_SIZE).unwrap();

        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        assert_eq!(tensor.as_slice().len(), 224 * 224 * 3);
    }

    #[test]
    fn test_decode_normalizes_to_unit_range() {
        let png = solid_png(8, 8, [255, 0, 51]);
        let tensor = ImageTensor::from_image_bytes(&png, 4).unwrap();

        let px = &tensor.as_slice()[..3];
        assert_eq!(px[0], 1.0);
        assert_eq!(px[1], 0.0);
        assert!((px[2] - 0.2).abs() < 1e-6);
        assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_rows_layout() {
        let png = solid_png(5, 5, [0, 255, 0]);
        let tensor = ImageTensor::from_image_bytes(&png, 3).unwrap();
        let rows = tensor.to_rows();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 3));
        assert_eq!(rows[2][1], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ImageTensor::from_image_bytes(b"not an image", 224).is_err());
    }
}

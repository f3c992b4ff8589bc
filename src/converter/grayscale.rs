use crate::config::CollisionPolicy;
use crate::error::{GrayZipError, Result};
use crate::extractor::write_atomically;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const CHANNELS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub struct GrayscaleConverter {
    collision: CollisionPolicy,
}

impl GrayscaleConverter {
    pub fn new() -> Self {
        Self {
            collision: CollisionPolicy::Overwrite,
        }
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    /// Decodes `input`, averages the colour channels of every pixel and writes
    /// the result to `output` in the format named by its extension.
    ///
    /// The output directory must already exist.
    pub fn convert(&self, input: &Path, output: &Path) -> Result<ConversionOutcome> {
        let codec_error = |path: &Path, source: ImageError| GrayZipError::Codec {
            path: path.to_path_buf(),
            source,
        };

        let reader = ImageReader::open(input)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| codec_error(input, ImageError::IoError(e)))?;
        let mut pixels = reader
            .decode()
            .map_err(|e| codec_error(input, e))?
            .to_rgba8();

        desaturate(&mut pixels);

        let (width, height) = pixels.dimensions();
        let format = ImageFormat::from_path(output).map_err(|e| codec_error(output, e))?;
        let encoded = encodable(pixels, format);

        write_atomically(output, self.collision, None, |file| {
            let mut writer = BufWriter::new(file);
            encoded
                .write_to(&mut writer, format)
                .map_err(|e| codec_error(output, e))?;
            writer.flush().map_err(|e| GrayZipError::Write {
                path: output.to_path_buf(),
                source: e,
            })
        })?;

        log::debug!("converted {} -> {}", input.display(), output.display());

        Ok(ConversionOutcome {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            width,
            height,
        })
    }
}

impl Default for GrayscaleConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops the alpha channel for encoders that cannot store one.
fn encodable(pixels: RgbaImage, format: ImageFormat) -> DynamicImage {
    let image = DynamicImage::ImageRgba8(pixels);
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    }
}

/// Replaces R, G and B of every RGBA pixel with their truncated average.
/// Alpha is left as is. A trailing partial pixel is ignored.
pub fn desaturate(pixels: &mut [u8]) {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        pixels
            .par_chunks_exact_mut(CHANNELS)
            .for_each(desaturate_pixel);
    }

    #[cfg(not(feature = "parallel"))]
    pixels.chunks_exact_mut(CHANNELS).for_each(desaturate_pixel);
}

fn desaturate_pixel(pixel: &mut [u8]) {
    let sum = pixel[0] as u16 + pixel[1] as u16 + pixel[2] as u16;
    let avg = (sum / 3) as u8;
    pixel[0] = avg;
    pixel[1] = avg;
    pixel[2] = avg;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba};
    use std::fs;
    use tempfile::TempDir;

    fn write_png(path: &Path, pixels: &[[u8; 4]], width: u32) {
        let height = pixels.len() as u32 / width;
        let mut img = RgbaImage::new(width, height);
        for (i, px) in pixels.iter().enumerate() {
            let i = i as u32;
            img.put_pixel(i % width, i / width, Rgba(*px));
        }
        img.save(path).unwrap();
    }

    fn read_rgba(path: &Path) -> RgbaImage {
        image::open(path).unwrap().to_rgba8()
    }

    #[test]
    fn test_desaturate_buffer() {
        let mut buffer = vec![30, 60, 90, 255, 0, 0, 0, 0, 255, 255, 254, 7, 1, 1, 0, 128];
        desaturate(&mut buffer);

        assert_eq!(
            buffer,
            vec![60, 60, 60, 255, 0, 0, 0, 0, 254, 254, 254, 7, 0, 0, 0, 128]
        );
    }

    #[test]
    fn test_desaturate_ignores_partial_pixel() {
        let mut buffer = vec![3, 6, 9, 1, 200, 100];
        desaturate(&mut buffer);
        assert_eq!(buffer, vec![6, 6, 6, 1, 200, 100]);
    }

    #[test]
    fn test_desaturate_law_on_samples() {
        let mut buffer = Vec::new();
        let mut original = Vec::new();
        for r in (0..=255u16).step_by(51) {
            for g in (0..=255u16).step_by(85) {
                for b in [0u16, 1, 2, 127, 254, 255] {
                    let px = [r as u8, g as u8, b as u8, (r ^ b) as u8];
                    buffer.extend_from_slice(&px);
                    original.push(px);
                }
            }
        }

        desaturate(&mut buffer);

        for (out, input) in buffer.chunks_exact(4).zip(original.iter()) {
            let expected = ((input[0] as u16 + input[1] as u16 + input[2] as u16) / 3) as u8;
            assert_eq!(out, &[expected, expected, expected, input[3]]);
        }
    }

    #[test]
    fn test_convert_two_pixel_png() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.png");
        let output = temp_dir.path().join("gray.png");
        write_png(&input, &[[30, 60, 90, 255], [0, 0, 0, 0]], 2);

        let outcome = GrayscaleConverter::new().convert(&input, &output).unwrap();
        assert_eq!((outcome.width, outcome.height), (2, 1));

        let result = read_rgba(&output);
        assert_eq!(result.get_pixel(0, 0), &Rgba([60, 60, 60, 255]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));

        // The input is never touched.
        assert_eq!(read_rgba(&input).get_pixel(0, 0), &Rgba([30, 60, 90, 255]));
    }

    #[test]
    fn test_convert_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.png");
        let once = temp_dir.path().join("once.png");
        let twice = temp_dir.path().join("twice.png");
        write_png(
            &input,
            &[[10, 200, 31, 255], [255, 255, 255, 10], [7, 8, 9, 0], [100, 0, 1, 99]],
            2,
        );

        let converter = GrayscaleConverter::new();
        converter.convert(&input, &once).unwrap();
        converter.convert(&once, &twice).unwrap();

        assert_eq!(read_rgba(&once).into_raw(), read_rgba(&twice).into_raw());
    }

    #[test]
    fn test_convert_non_rgba_input() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("luma.png");
        let output = temp_dir.path().join("out.png");

        let mut img = GrayImage::new(1, 1);
        img.put_pixel(0, 0, Luma([77]));
        img.save(&input).unwrap();

        GrayscaleConverter::new().convert(&input, &output).unwrap();
        assert_eq!(read_rgba(&output).get_pixel(0, 0), &Rgba([77, 77, 77, 255]));
    }

    #[test]
    fn test_corrupt_input_is_codec_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("broken.png");
        let output = temp_dir.path().join("out.png");
        fs::write(&input, b"\x89PNG\r\n\x1a\nthis is not a real png").unwrap();

        let result = GrayscaleConverter::new().convert(&input, &output);

        assert!(result.unwrap_err().is_codec_error());
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_is_codec_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = GrayscaleConverter::new().convert(
            &temp_dir.path().join("nope.png"),
            &temp_dir.path().join("out.png"),
        );
        assert!(matches!(result, Err(GrayZipError::Codec { .. })));
    }

    #[test]
    fn test_missing_output_directory_is_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.png");
        write_png(&input, &[[1, 2, 3, 4]], 1);

        let result = GrayscaleConverter::new()
            .convert(&input, &temp_dir.path().join("missing").join("a.png"));

        let error = result.unwrap_err();
        assert!(matches!(error, GrayZipError::Write { .. }));
        assert!(error.is_io_error());
    }

    #[test]
    fn test_unknown_output_format() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.png");
        write_png(&input, &[[1, 2, 3, 4]], 1);

        let output = temp_dir.path().join("a.unknownformat");
        let result = GrayscaleConverter::new().convert(&input, &output);

        assert!(result.unwrap_err().is_codec_error());
        assert!(!output.exists());
    }

    #[test]
    fn test_collision_error_policy() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.png");
        let output = temp_dir.path().join("b.png");
        write_png(&input, &[[1, 2, 3, 4]], 1);
        fs::write(&output, "keep me").unwrap();

        let result = GrayscaleConverter::new()
            .with_collision_policy(CollisionPolicy::Error)
            .convert(&input, &output);

        assert!(matches!(result, Err(GrayZipError::OutputExists { .. })));
        assert_eq!(fs::read_to_string(&output).unwrap(), "keep me");
    }

    #[test]
    fn test_convert_jpeg_drops_alpha() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.jpg");
        let output = temp_dir.path().join("out.jpg");

        let mut img = RgbImage::new(2, 2);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgb([(x * 120) as u8, (y * 120) as u8, 60]);
        }
        img.save(&input).unwrap();

        let outcome = GrayscaleConverter::new().convert(&input, &output).unwrap();
        assert_eq!((outcome.width, outcome.height), (2, 2));

        // JPEG is lossy, but a desaturated image decodes with near-equal channels.
        for px in read_rgba(&output).pixels() {
            let [r, g, b, a] = px.0;
            assert!(r.abs_diff(g) <= 2 && g.abs_diff(b) <= 2, "not gray: {:?}", px);
            assert_eq!(a, 255);
        }
    }

    #[test]
    fn test_rgba_png_to_bmp_keeps_alpha() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.png");
        let output = temp_dir.path().join("a.bmp");
        write_png(&input, &[[30, 60, 90, 40]], 1);

        GrayscaleConverter::new().convert(&input, &output).unwrap();
        assert_eq!(read_rgba(&output).get_pixel(0, 0), &Rgba([60, 60, 60, 40]));
    }

    #[test]
    fn test_decoder_chosen_from_content() {
        let temp_dir = TempDir::new().unwrap();
        let png = temp_dir.path().join("real.png");
        let mislabeled = temp_dir.path().join("photo.jpg");
        let output = temp_dir.path().join("out.png");
        write_png(&png, &[[3, 6, 9, 255]], 1);
        fs::copy(&png, &mislabeled).unwrap();

        GrayscaleConverter::new().convert(&mislabeled, &output).unwrap();
        assert_eq!(read_rgba(&output).get_pixel(0, 0), &Rgba([6, 6, 6, 255]));
    }
}

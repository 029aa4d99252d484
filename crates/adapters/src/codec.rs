use std::io::{Cursor, Read};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::io::Reader as ImageReader;
use image::{ColorType, ImageEncoder as _};
use photo_lab_application::{ApplicationError, ImageDecoder, ImageEncoder, OutputFormat};
use photo_lab_domain::Bitmap;

/// Decodes any format the `image` crate recognises from its header.
#[derive(Debug, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, stream: &mut dyn Read) -> Result<Bitmap, ApplicationError> {
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|error| ApplicationError::SourceUnavailable(error.to_string()))?;

        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|error| ApplicationError::SourceUnavailable(error.to_string()))?
            .decode()
            .map_err(|error| ApplicationError::SourceUnavailable(error.to_string()))?;

        let rgba = image.to_rgba8();
        Bitmap::from_rgba8(rgba.width(), rgba.height(), rgba.as_raw())
            .map_err(|error| ApplicationError::SourceUnavailable(error.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct ImageCrateEncoder;

impl ImageEncoder for ImageCrateEncoder {
    fn encode(&self, bitmap: &Bitmap, format: OutputFormat) -> Result<Vec<u8>, ApplicationError> {
        let rgba = bitmap.to_rgba8();
        let mut bytes = Vec::new();
        match format {
            OutputFormat::Jpeg { quality } => {
                // JPEG has no alpha channel.
                let rgb: Vec<u8> = rgba
                    .chunks_exact(4)
                    .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
                    .collect();
                JpegEncoder::new_with_quality(&mut bytes, quality)
                    .encode(&rgb, bitmap.width(), bitmap.height(), ColorType::Rgb8)
                    .map_err(|error| ApplicationError::Encode(error.to_string()))?;
            }
            OutputFormat::Png => {
                PngEncoder::new(&mut bytes)
                    .write_image(&rgba, bitmap.width(), bitmap.height(), ColorType::Rgba8)
                    .map_err(|error| ApplicationError::Encode(error.to_string()))?;
            }
        }
        Ok(bytes)
    }
}

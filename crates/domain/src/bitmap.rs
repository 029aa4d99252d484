use crate::DomainError;

/// Straight (non-premultiplied) RGBA, each channel in `[0, 1]`.
pub type Rgba = [f32; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Decoded image pixels in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    size: PixelSize,
    pixels: Vec<Rgba>,
}

impl Bitmap {
    pub fn new(size: PixelSize, pixels: Vec<Rgba>) -> Result<Self, DomainError> {
        if size.is_empty() {
            return Err(DomainError::EmptyBitmap {
                width: size.width,
                height: size.height,
            });
        }
        if pixels.len() != size.pixel_count() {
            return Err(DomainError::PixelCountMismatch {
                width: size.width,
                height: size.height,
                expected: size.pixel_count(),
                actual: pixels.len(),
            });
        }
        Ok(Self { size, pixels })
    }

    pub fn filled(size: PixelSize, color: Rgba) -> Result<Self, DomainError> {
        Self::new(size, vec![color; size.pixel_count()])
    }

    /// Builds a bitmap from tightly packed 8-bit RGBA bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, DomainError> {
        let size = PixelSize::new(width, height);
        if !size.is_empty() && bytes.len() != size.pixel_count() * 4 {
            return Err(DomainError::PixelCountMismatch {
                width,
                height,
                expected: size.pixel_count(),
                actual: bytes.len().div_ceil(4),
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|chunk| {
                [
                    f32::from(chunk[0]) / 255.0,
                    f32::from(chunk[1]) / 255.0,
                    f32::from(chunk[2]) / 255.0,
                    f32::from(chunk[3]) / 255.0,
                ]
            })
            .collect();
        Self::new(size, pixels)
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            bytes.extend(pixel.iter().map(|channel| to_u8(*channel)));
        }
        bytes
    }

    pub fn size(&self) -> PixelSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.size.width as usize + x as usize)
            .copied()
    }

    /// Source-over composite of `top` onto this bitmap.
    pub fn composite_over(&mut self, top: &Bitmap) -> Result<(), DomainError> {
        if top.size != self.size {
            return Err(DomainError::PixelCountMismatch {
                width: self.size.width,
                height: self.size.height,
                expected: self.pixels.len(),
                actual: top.pixels.len(),
            });
        }

        for (dst, src) in self.pixels.iter_mut().zip(&top.pixels) {
            let src_alpha = src[3];
            let dst_weight = dst[3] * (1.0 - src_alpha);
            let out_alpha = src_alpha + dst_weight;
            if out_alpha <= 0.0 {
                *dst = [0.0; 4];
                continue;
            }
            for c in 0..3 {
                dst[c] = (src[c] * src_alpha + dst[c] * dst_weight) / out_alpha;
            }
            dst[3] = out_alpha;
        }
        Ok(())
    }
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_dimensions() {
        assert!(matches!(
            Bitmap::new(PixelSize::new(0, 4), Vec::new()),
            Err(DomainError::EmptyBitmap {
                width: 0,
                height: 4
            })
        ));
    }

    #[test]
    fn rejects_pixel_count_mismatch() {
        let result = Bitmap::new(PixelSize::new(2, 2), vec![[0.0; 4]; 3]);
        assert!(matches!(
            result,
            Err(DomainError::PixelCountMismatch {
                expected: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn rgba8_conversion_preserves_bytes() {
        let bytes = [0_u8, 64, 128, 255, 255, 10, 20, 30];
        let bitmap = Bitmap::from_rgba8(2, 1, &bytes).expect("bitmap");
        assert_eq!(bitmap.to_rgba8(), bytes);
        assert_eq!(bitmap.pixel(1, 0).map(|p| p[0]), Some(1.0));
        assert_eq!(bitmap.pixel(2, 0), None);
    }

    #[test]
    fn rgba8_buffers_with_trailing_bytes_are_rejected() {
        let bytes = [0_u8; 2 * 2 * 4 + 3];
        let result = Bitmap::from_rgba8(2, 2, &bytes);
        assert!(matches!(
            result,
            Err(DomainError::PixelCountMismatch {
                expected: 4,
                actual: 5,
                ..
            })
        ));
        assert!(Bitmap::from_rgba8(2, 2, &bytes[..15]).is_err());
    }

    #[test]
    fn opaque_top_replaces_destination() {
        let size = PixelSize::new(1, 1);
        let mut target = Bitmap::filled(size, [0.0, 0.0, 0.0, 1.0]).expect("target");
        let top = Bitmap::filled(size, [0.2, 0.4, 0.6, 1.0]).expect("top");
        target.composite_over(&top).expect("composite");
        assert_eq!(target.pixels()[0], [0.2, 0.4, 0.6, 1.0]);
    }

    #[test]
    fn translucent_top_blends_onto_black() {
        let size = PixelSize::new(1, 1);
        let mut target = Bitmap::filled(size, [0.0, 0.0, 0.0, 1.0]).expect("target");
        let top = Bitmap::filled(size, [1.0, 1.0, 1.0, 0.5]).expect("top");
        target.composite_over(&top).expect("composite");
        let pixel = target.pixels()[0];
        assert!((pixel[0] - 0.5).abs() < 1e-6);
        assert_eq!(pixel[3], 1.0);
    }
}

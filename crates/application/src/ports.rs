use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use photo_lab_domain::{
    Backdrop, Bitmap, EffectChain, ParameterKey, PixelSize, Rgba, REFERENCE_DPI,
};

use crate::{ApplicationError, OutputFormat};

/// A file the session can read an image from or write an export to.
pub trait StorageFile {
    /// Stable identity of the file.
    fn path(&self) -> &Path;

    fn open_readable(&self) -> Result<Box<dyn Read>, ApplicationError>;

    fn open_writable(&self) -> Result<Box<dyn Write>, ApplicationError>;

    /// Path used to decide whether two handles name the same file. Backends
    /// that can resolve links and relative segments override this.
    fn canonical_path(&self) -> PathBuf {
        self.path().to_path_buf()
    }
}

pub trait ImageDecoder {
    fn decode(&self, stream: &mut dyn Read) -> Result<Bitmap, ApplicationError>;
}

pub trait ImageEncoder {
    fn encode(&self, bitmap: &Bitmap, format: OutputFormat) -> Result<Vec<u8>, ApplicationError>;
}

/// Identifies a compiled brush inside its compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrushHandle(u64);

impl BrushHandle {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Visual attached behind the displayed image, painted with a live brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteVisual {
    pub brush: BrushHandle,
    pub size: PixelSize,
}

/// The on-screen element showing the image being edited.
pub trait DisplaySurface {
    fn set_background_visual(&mut self, visual: SpriteVisual);

    fn native_pixel_size(&self) -> PixelSize;
}

/// Backend that turns a live chain into a brush with named scalar inputs.
pub trait BrushCompiler {
    /// Compiles `chain`, registering `inputs` as values that can later be
    /// changed through [`BrushCompiler::set_input`] without recompiling.
    fn compile(
        &mut self,
        chain: &EffectChain<Backdrop>,
        inputs: &[ParameterKey],
    ) -> Result<BrushHandle, ApplicationError>;

    /// Takes effect on the next composed frame.
    fn set_input(
        &mut self,
        brush: BrushHandle,
        key: ParameterKey,
        value: f32,
    ) -> Result<(), ApplicationError>;

    /// Paints one frame of `brush` over `backdrop`.
    fn compose_frame(
        &mut self,
        brush: BrushHandle,
        backdrop: &Bitmap,
    ) -> Result<Bitmap, ApplicationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTypeChoice {
    pub label: &'static str,
    pub extensions: &'static [&'static str],
}

pub const JPEG_FILES: FileTypeChoice = FileTypeChoice {
    label: "JPEG files",
    extensions: &[".jpg", ".jpeg"],
};

pub const PNG_FILES: FileTypeChoice = FileTypeChoice {
    label: "PNG files",
    extensions: &[".png"],
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub suggested_file: PathBuf,
    pub file_types: Vec<FileTypeChoice>,
}

impl SaveRequest {
    pub fn for_source(source: &Path) -> Self {
        Self {
            suggested_file: source.to_path_buf(),
            file_types: vec![JPEG_FILES, PNG_FILES],
        }
    }
}

pub enum PickOutcome {
    Picked(Box<dyn StorageFile>),
    Cancelled,
}

pub trait DestinationPicker {
    fn pick_save_file(&mut self, request: &SaveRequest) -> Result<PickOutcome, ApplicationError>;
}

/// Pixel surface an export chain is drawn into.
#[derive(Debug, Clone)]
pub struct OffscreenTarget {
    surface: Bitmap,
    dpi: f32,
}

impl OffscreenTarget {
    pub fn new(size: PixelSize, dpi: f32) -> Result<Self, ApplicationError> {
        let bytes = size
            .pixel_count()
            .checked_mul(std::mem::size_of::<Rgba>())
            .ok_or_else(|| {
                ApplicationError::RenderTarget(format!(
                    "target of {}x{} overflows addressable memory",
                    size.width, size.height
                ))
            })?;
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(ApplicationError::RenderTarget(format!(
                "target density must be positive, got {dpi}"
            )));
        }
        let surface = Bitmap::filled(size, [0.0; 4])
            .map_err(|error| ApplicationError::RenderTarget(error.to_string()))?;
        tracing::trace!(bytes, "allocated offscreen target");
        Ok(Self { surface, dpi })
    }

    pub fn size(&self) -> PixelSize {
        self.surface.size()
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// Factor converting device-independent units into target pixels.
    pub fn pixel_scale(&self) -> f32 {
        self.dpi / REFERENCE_DPI
    }

    pub fn clear(&mut self, color: Rgba) {
        self.surface.pixels_mut().fill(color);
    }

    /// Composites `image` over the current contents.
    pub fn draw_bitmap(&mut self, image: &Bitmap) -> Result<(), ApplicationError> {
        self.surface
            .composite_over(image)
            .map_err(|error| ApplicationError::RenderTarget(error.to_string()))
    }

    pub fn into_bitmap(self) -> Bitmap {
        self.surface
    }
}

/// Backend executing export chains away from the screen.
pub trait OffscreenRenderer {
    fn allocate(&mut self, size: PixelSize, dpi: f32) -> Result<OffscreenTarget, ApplicationError>;

    fn draw(
        &mut self,
        target: &mut OffscreenTarget,
        chain: &EffectChain<Bitmap>,
    ) -> Result<(), ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_request_suggests_the_source() {
        let request = SaveRequest::for_source(Path::new("/photos/a.jpg"));
        assert_eq!(request.suggested_file, PathBuf::from("/photos/a.jpg"));
        assert_eq!(request.file_types[0].label, "JPEG files");
    }

    #[test]
    fn target_rejects_empty_size() {
        let result = OffscreenTarget::new(PixelSize::new(0, 10), 96.0);
        assert!(matches!(result, Err(ApplicationError::RenderTarget(_))));
    }

    #[test]
    fn target_rejects_non_positive_density() {
        let result = OffscreenTarget::new(PixelSize::new(2, 2), 0.0);
        assert!(matches!(result, Err(ApplicationError::RenderTarget(_))));
    }

    #[test]
    fn target_draw_requires_matching_size() {
        let mut target = OffscreenTarget::new(PixelSize::new(2, 2), 192.0).expect("target");
        assert_eq!(target.pixel_scale(), 2.0);
        let wrong = Bitmap::filled(PixelSize::new(3, 1), [1.0; 4]).expect("bitmap");
        assert!(matches!(
            target.draw_bitmap(&wrong),
            Err(ApplicationError::RenderTarget(_))
        ));
    }
}

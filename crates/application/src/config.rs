use std::path::Path;

use photo_lab_domain::{Rgba, REFERENCE_DPI};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png,
}

impl OutputFormat {
    /// Format implied by the file extension, if it names one we can write.
    pub fn from_path(path: &Path, jpeg_quality: u8) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg {
                quality: jpeg_quality,
            }),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Density of the offscreen export target.
    pub reference_dpi: f32,
    /// Used when the destination extension does not name a format.
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
    /// Colour the export target is cleared to before the chain is drawn.
    pub clear_color: Rgba,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            reference_dpi: REFERENCE_DPI,
            output_format: OutputFormat::Jpeg { quality: 95 },
            jpeg_quality: 95,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RenderConfig {
    pub fn format_for(&self, destination: &Path) -> OutputFormat {
        OutputFormat::from_path(destination, self.jpeg_quality).unwrap_or(self.output_format)
    }
}

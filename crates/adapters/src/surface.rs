use photo_lab_application::{DisplaySurface, SpriteVisual};
use photo_lab_domain::PixelSize;

/// Display surface with no window behind it. Records the attached visual so
/// a shell can composite frames itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessSurface {
    size: PixelSize,
    background: Option<SpriteVisual>,
}

impl HeadlessSurface {
    pub fn new(size: PixelSize) -> Self {
        Self {
            size,
            background: None,
        }
    }

    pub fn background(&self) -> Option<SpriteVisual> {
        self.background
    }
}

impl DisplaySurface for HeadlessSurface {
    fn set_background_visual(&mut self, visual: SpriteVisual) {
        self.background = Some(visual);
    }

    fn native_pixel_size(&self) -> PixelSize {
        self.size
    }
}
